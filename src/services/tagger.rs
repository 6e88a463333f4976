//! # 태그 이름 검사 (Tagger)
//!
//! 클라이언트가 보낸 태그 문자열을 정규화하고 검사합니다.
//!
//! ## 규칙
//! - 앞뒤 공백 제거, 맨 앞 `#` 하나 제거
//! - 값 부분(`tag#3`, `tag=3`)은 허용하지 않음
//! - 이름 문자: `A-Z a-z 0-9 _ : . ! @ * / -`, 숫자로 시작할 수 없음
//! - 접두사: `~~`(의장 전용), `~`(개인 태그), `<id>~`(특정 사용자의 개인 태그)
//! - `~name`은 현재 사용자 ID를 붙여 `<id>~name`으로 바뀝니다. 손님은 쓸 수 없습니다.

use thiserror::Error;

use crate::models::Contact;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("Tag required")]
    Required,
    #[error("Tag values not allowed here")]
    ValueNotAllowed,
    #[error("Invalid tag")]
    Invalid,
    #[error("Private tags require a signed-in user")]
    PrivateForGuest,
}

pub struct Tagger<'a> {
    user: &'a Contact,
}

impl<'a> Tagger<'a> {
    pub fn new(user: &'a Contact) -> Self {
        Self { user }
    }

    /// 값 없는 태그 하나를 검사하고 정규화된 이름을 돌려줍니다.
    pub fn check(&self, tag: &str) -> Result<String, TagError> {
        let tag = tag.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag);
        if tag.is_empty() {
            return Err(TagError::Required);
        }
        if tag.contains(['#', '=']) {
            return Err(TagError::ValueNotAllowed);
        }

        if let Some(name) = tag.strip_prefix("~~") {
            check_name(name)?;
            return Ok(tag.to_string());
        }
        if let Some(name) = tag.strip_prefix('~') {
            check_name(name)?;
            let id = self.user.id.ok_or(TagError::PrivateForGuest)?;
            return Ok(format!("{}~{}", id, name));
        }
        if let Some((owner, name)) = tag.split_once('~') {
            if owner.is_empty() || !owner.bytes().all(|b| b.is_ascii_digit()) {
                return Err(TagError::Invalid);
            }
            check_name(name)?;
            return Ok(tag.to_string());
        }
        check_name(tag)?;
        Ok(tag.to_string())
    }
}

fn check_name(name: &str) -> Result<(), TagError> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(TagError::Invalid),
        Some(c) if c.is_ascii_digit() => return Err(TagError::Invalid),
        _ => {}
    }
    if name.chars().all(is_tag_char) {
        Ok(())
    } else {
        Err(TagError::Invalid)
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '!' | '@' | '*' | '/' | '-')
}
