//! # 태그 주석 데이터베이스 쿼리 모듈
//!
//! `tag_annos` 테이블 조회와 배치 적용을 담당합니다.
//! 태그 이름 비교는 대소문자를 구분하지 않습니다 (`COLLATE NOCASE`).

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::models::{AnnoStatement, AnnoUpdate, TagAnnoRow};

/// 태그의 모든 주석 행을 정렬 순서대로 조회합니다.
///
/// 정렬: 태그 값(`tag_index`) → 제목 → ID
pub async fn list_tag_annos(pool: &SqlitePool, tag: &str) -> Result<Vec<TagAnnoRow>, AppError> {
    let rows = sqlx::query_as::<_, TagAnnoRow>(
        r#"
        SELECT tag, anno_id, tag_index, heading, anno_format, info_json
        FROM tag_annos
        WHERE tag = ?
        ORDER BY tag_index, heading, anno_id
        "#,
    )
    .bind(tag)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// 이 태그에서 다음에 쓸 주석 ID (현재 최댓값 + 1, 최소 1)
pub async fn next_anno_id(pool: &SqlitePool, tag: &str) -> Result<i64, AppError> {
    let next: i64 = sqlx::query_scalar(
        "SELECT MAX(COALESCE(MAX(anno_id), 0), 0) + 1 FROM tag_annos WHERE tag = ?",
    )
    .bind(tag)
    .fetch_one(pool)
    .await?;

    Ok(next)
}

/// 배치를 하나의 트랜잭션으로 적용합니다.
///
/// 문장은 주어진 순서대로 실행되고, 하나라도 실패하면 전체가 롤백됩니다
/// (`tx`가 commit 없이 drop되면 sqlx가 롤백합니다).
pub async fn apply_anno_batch(
    pool: &SqlitePool,
    tag: &str,
    statements: &[AnnoStatement],
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    for statement in statements {
        match statement {
            AnnoStatement::Insert { anno_id } => {
                sqlx::query("INSERT INTO tag_annos (tag, anno_id) VALUES (?, ?)")
                    .bind(tag)
                    .bind(anno_id)
                    .execute(&mut *tx)
                    .await?;
            }
            AnnoStatement::Update { anno_id, update } => {
                if let Some(mut query) = update_query(tag, *anno_id, update) {
                    query.build().execute(&mut *tx).await?;
                }
            }
            AnnoStatement::Delete { anno_id } => {
                sqlx::query("DELETE FROM tag_annos WHERE tag = ? AND anno_id = ?")
                    .bind(tag)
                    .bind(anno_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// 바뀐 필드만 SET 절에 넣은 UPDATE 문. 바꿀 것이 없으면 None.
fn update_query<'a>(
    tag: &'a str,
    anno_id: i64,
    update: &'a AnnoUpdate,
) -> Option<QueryBuilder<'a, Sqlite>> {
    if update.is_empty() {
        return None;
    }
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tag_annos SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(heading) = &update.heading {
            set.push("heading = ").push_bind_unseparated(heading.as_str());
            set.push("anno_format = NULL");
        }
        if let Some(tag_index) = update.tag_index {
            set.push("tag_index = ").push_bind_unseparated(tag_index);
        }
        if let Some(info_json) = &update.info_json {
            set.push("info_json = ")
                .push_bind_unseparated(info_json.as_deref());
        }
    }
    qb.push(" WHERE tag = ")
        .push_bind(tag)
        .push(" AND anno_id = ")
        .push_bind(anno_id);
    Some(qb)
}
