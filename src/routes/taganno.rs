//! # 태그 주석 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET  {base}api/taganno?tag=order` → 주석 목록
//! - `POST {base}api/taganno?tag=order` → 주석 배치 적용 (`anno` 파라미터)
//!
//! `anno`는 폼/쿼리 파라미터로 받습니다. 폼 필드가 없는 요청이면
//! JSON 본문을 그대로 `anno`로 씁니다.
//!
//! 쓰기에는 `post` 토큰이 필요합니다 (`GET /session`의 `post` 값,
//! 세션이 없으면 `.empty`).
//!
//! 응답 본문은 항상 HTTP 200이며, 실패는 `{ok: false, ...}`로 표현합니다.

use axum::{extract::State, response::Response, Json};
use serde_json::json;

use super::AppState;
use crate::{error::AppError, qrequest::Qrequest, services::tag_anno};

/// `GET /taganno`
pub async fn get_taganno(
    State(state): State<AppState>,
    qreq: Qrequest,
) -> Result<Response, AppError> {
    let result = tag_anno::get(&state.pool, qreq.user(), qreq.get("tag")).await?;
    qreq.respond(&state.pool, Json(result)).await
}

/// `POST /taganno`
pub async fn set_taganno(
    State(state): State<AppState>,
    mut qreq: Qrequest,
) -> Result<Response, AppError> {
    if !qreq.valid_post() {
        let body = json!({ "ok": false, "error": "Missing credentials" });
        return qreq.respond(&state.pool, Json(body)).await;
    }
    let anno = match qreq.get("anno") {
        Some(anno) => Some(anno.to_string()),
        None => json_body(&mut qreq).await,
    };
    let result = tag_anno::set(
        &state.pool,
        qreq.user(),
        qreq.get("tag"),
        anno.as_deref(),
    )
    .await?;
    qreq.respond(&state.pool, Json(result)).await
}

async fn json_body(qreq: &mut Qrequest) -> Option<String> {
    if !qreq.post_empty() || qreq.body_content_type().await.as_deref() != Some("application/json") {
        return None;
    }
    let body = qreq.body().await?;
    Some(String::from_utf8_lossy(body).into_owned())
}
