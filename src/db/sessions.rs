//! # 세션 저장소 쿼리 모듈
//!
//! 요청 간에 공유되는 세션 데이터(`Qsession`)를 `sessions` 테이블에 보관합니다.
//! 동시 요청이 같은 세션을 쓰면 마지막 기록이 이깁니다.

use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::error::AppError;

/// 세션 데이터를 읽습니다. 없는 sid이거나 데이터가 깨졌으면 None.
pub async fn load_session(
    pool: &SqlitePool,
    sid: &str,
) -> Result<Option<Map<String, Value>>, AppError> {
    let data: Option<String> = sqlx::query_scalar("SELECT data FROM sessions WHERE sid = ?")
        .bind(sid)
        .fetch_optional(pool)
        .await?;

    Ok(data.and_then(|d| match serde_json::from_str::<Map<String, Value>>(&d) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::warn!("Discarding unreadable session data: {}", e);
            None
        }
    }))
}

/// 세션 데이터를 통째로 기록합니다 (upsert).
pub async fn save_session(
    pool: &SqlitePool,
    sid: &str,
    data: &Map<String, Value>,
) -> Result<(), AppError> {
    let data = serde_json::to_string(data)?;

    sqlx::query(
        r#"
        INSERT INTO sessions (sid, data, updated_at)
        VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        ON CONFLICT(sid) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(sid)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(())
}
