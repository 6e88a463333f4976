//! # 업로드 확인 핸들러
//!
//! ## 엔드포인트
//! - `POST {base}api/upload` (multipart/form-data)
//!
//! 받은 파일 목록과 전송 오류를 돌려줍니다. 파일 내용은 앞부분만 보여 줍니다.
//!
//! ```json
//! { "ok": true,
//!   "files": [{"field": "paper", "filename": "a.pdf", "mime": "application/pdf", "size": 1024, "head": "%PDF-"}],
//!   "message_list": [] }
//! ```

use axum::{extract::State, response::Response, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::{
    error::AppError,
    models::MessageItem,
    qrequest::{Qrequest, UPLOAD_ERRORS_ANNEX},
};

const HEAD_BYTES: u64 = 16;

/// `POST /upload`
pub async fn upload_files(
    State(state): State<AppState>,
    qreq: Qrequest,
) -> Result<Response, AppError> {
    let mut files = Vec::new();
    for (field, file) in qreq.files().iter() {
        let head = qreq
            .file_contents(field, 0, Some(HEAD_BYTES))
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned());
        files.push(json!({
            "field": field,
            "filename": file.name,
            "mime": file.mime,
            "size": file.size,
            "head": head,
        }));
    }

    let messages: &[MessageItem] = if qreq.has_annex(UPLOAD_ERRORS_ANNEX) {
        qreq.checked_annex::<Vec<MessageItem>>(UPLOAD_ERRORS_ANNEX)?
    } else {
        &[]
    };
    let ok = !messages.iter().any(MessageItem::is_error);
    let body: Value = json!({
        "ok": ok,
        "files": files,
        "message_list": messages,
    });
    qreq.respond(&state.pool, Json(body)).await
}
