//! # 세션 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET {base}api/session` → 세션을 열고 post 토큰을 돌려줍니다.
//!
//! ```json
//! { "ok": true, "sid_present": true, "post": "89abcdefghij", "valid_token": false, "visits": 2 }
//! ```
//! `valid_token`은 요청의 `post` 파라미터가 세션 토큰과 일치했는지를 나타냅니다.
//! `visits`는 전역 세션 값으로, 같은 세션으로 올 때마다 1씩 늘어납니다.
//! 사이트 세션 키가 설정되어 있으면 마지막 방문 경로를 사이트 세션에 남깁니다.

use axum::{extract::State, response::Response, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::{error::AppError, qrequest::Qrequest};

/// `GET /session`
pub async fn session_info(
    State(state): State<AppState>,
    mut qreq: Qrequest,
) -> Result<Response, AppError> {
    let post = qreq.post_value();

    let visits = qreq.gsession("visits").and_then(Value::as_i64).unwrap_or(0) + 1;
    qreq.set_gsession("visits", json!(visits));

    let last_page = qreq.csession("last_page").cloned();
    let here = format!("{}{}", qreq.page(), qreq.path().unwrap_or(""));
    qreq.set_csession("last_page", json!(here));

    let body = json!({
        "ok": true,
        "sid_present": qreq.qsid().is_some(),
        "post": post,
        "valid_token": qreq.valid_token(),
        "visits": visits,
        "last_page": last_page,
    });
    qreq.respond(&state.pool, Json(body)).await
}
