//! # 태그 주석 API 로직
//!
//! `get`: 태그의 주석 목록과 편집 가능 여부
//! `set`: 주석 배치(추가/수정/삭제)를 검증하고 적용한 뒤 `get` 결과를 돌려줌
//!
//! ## 쓰기 요청 형식 (`anno`)
//! 객체 하나 또는 객체 배열. 각 객체는 `annoid`를 가져야 합니다.
//! - 정수: 기존 주석
//! - `n`으로 시작하는 문자열: 새 주석 (클라이언트 임시 키)
//!
//! ```json
//! [{"annoid": "n1", "tagval": "3", "legend": "Break"},
//!  {"annoid": 4, "deleted": true}]
//! ```
//!
//! 필드 검증 오류가 하나라도 있으면 아무것도 쓰지 않고 `message_list`를 돌려줍니다.
//! 입력 형식 오류와 권한 오류는 `error` 문자열로 돌려줍니다.

use serde_json::{json, Map, Value};
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::{AnnoStatement, AnnoUpdate, Contact, MessageItem, TagAnno, ANNO_INFO_FIELDS};
use crate::services::tagger::Tagger;

/// 배치를 만들 수 없는 이유
#[derive(Debug, PartialEq)]
pub enum BatchError {
    BadRequest,
    Messages(Vec<MessageItem>),
}

fn error_json(error: &str) -> Value {
    json!({ "ok": false, "error": error })
}

pub async fn get(pool: &SqlitePool, user: &Contact, tag: Option<&str>) -> Result<Value, AppError> {
    let tag = match Tagger::new(user).check(tag.unwrap_or("")) {
        Ok(tag) => tag,
        Err(e) => return Ok(error_json(&e.to_string())),
    };

    let anno: Vec<TagAnno> = db::list_tag_annos(pool, &tag)
        .await?
        .into_iter()
        .filter_map(TagAnno::from_row)
        .collect();

    Ok(json!({
        "ok": true,
        "tag": tag,
        "editable": user.can_edit_tag_anno(&tag),
        "anno": anno,
    }))
}

pub async fn set(
    pool: &SqlitePool,
    user: &Contact,
    tag: Option<&str>,
    anno: Option<&str>,
) -> Result<Value, AppError> {
    let checked = match Tagger::new(user).check(tag.unwrap_or("")) {
        Ok(tag) => tag,
        Err(e) => return Ok(error_json(&e.to_string())),
    };
    if !user.can_edit_tag_anno(&checked) {
        return Ok(error_json("Permission error"));
    }
    let Some(request) = anno.and_then(|a| serde_json::from_str::<Value>(a).ok()) else {
        return Ok(error_json("Bad request"));
    };

    let next_id = db::next_anno_id(pool, &checked).await?;
    let statements = match plan_batch(&request, next_id) {
        Ok(statements) => statements,
        Err(BatchError::BadRequest) => return Ok(error_json("Bad request")),
        Err(BatchError::Messages(ml)) => {
            return Ok(json!({ "ok": false, "message_list": ml }));
        }
    };

    if !statements.is_empty() {
        db::apply_anno_batch(pool, &checked, &statements).await?;
        tracing::info!(
            "Applied {} tag annotation statements to {}",
            statements.len(),
            checked
        );
    }

    get(pool, user, Some(&checked)).await
}

/// 쓰기 요청을 실행할 문장 목록으로 바꿉니다. 클라이언트 배열 순서를 유지합니다.
///
/// 새 주석의 ID는 `next_id`부터 차례로 배정됩니다.
pub fn plan_batch(request: &Value, mut next_id: i64) -> Result<Vec<AnnoStatement>, BatchError> {
    let entries: Vec<&Value> = match request {
        Value::Object(_) => vec![request],
        Value::Array(list) => list.iter().collect(),
        _ => return Err(BatchError::BadRequest),
    };

    let mut statements = Vec::new();
    let mut messages = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(anno) = entry else {
            return Err(BatchError::BadRequest);
        };
        let existing = match anno.get("annoid") {
            Some(Value::Number(n)) => Some(n.as_i64().ok_or(BatchError::BadRequest)?),
            Some(Value::String(s)) if s.starts_with('n') => None,
            _ => return Err(BatchError::BadRequest),
        };

        if anno.get("deleted").is_some_and(is_truthy) {
            if let Some(anno_id) = existing {
                statements.push(AnnoStatement::Delete { anno_id });
            }
            continue;
        }

        let anno_id = match existing {
            Some(id) => id,
            None => {
                let id = next_id;
                next_id += 1;
                statements.push(AnnoStatement::Insert { anno_id: id });
                id
            }
        };

        let key = field(anno, "key")
            .map(scalar_text)
            .unwrap_or_else(|| (index + 1).to_string());
        let mut update = AnnoUpdate::default();

        if let Some(legend) = field(anno, "legend") {
            update.heading = Some(scalar_text(legend));
        }
        if let Some(tagval) = field(anno, "tagval") {
            let text = scalar_text(tagval);
            let text = match text.trim() {
                "" => "0",
                t => t,
            };
            match parse_numeric(text) {
                Some(v) => update.tag_index = Some(v),
                None => messages.push(
                    MessageItem::error("Tag value should be a number")
                        .with_landmark(Some(format!("ta/{}/tagval", key))),
                ),
            }
        }

        let info: Map<String, Value> = ANNO_INFO_FIELDS
            .iter()
            .filter_map(|k| field(anno, k).map(|v| (k.to_string(), v.clone())))
            .collect();
        if !info.is_empty() {
            update.info_json = Some(Some(Value::Object(info).to_string()));
        } else if !update.is_empty() {
            update.info_json = Some(None);
        }

        if !update.is_empty() {
            statements.push(AnnoStatement::Update { anno_id, update });
        }
    }

    if messages.is_empty() {
        Ok(statements)
    } else {
        Err(BatchError::Messages(messages))
    }
}

/// null이 아닌 필드만 "설정됨"으로 봅니다.
fn field<'a>(anno: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    anno.get(name).filter(|v| !v.is_null())
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// 십진수 표기(지수 포함)만 숫자로 인정합니다.
fn parse_numeric(s: &str) -> Option<f64> {
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
