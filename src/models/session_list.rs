//! # 결과 목록(SessionList) 모델
//!
//! 검색 결과처럼 "지금 보고 있는 목록"을 요청 범위에서 기억하기 위한 값입니다.
//! 클라이언트 파라미터가 아니라 요청 부속물(annex)로만 전달됩니다.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionList {
    /// 목록 식별자 (예: "p/s/tag:order")
    pub listid: String,
    pub ids: Vec<i64>,
    pub description: Option<String>,
}

impl SessionList {
    pub fn new(listid: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            listid: listid.into(),
            ids,
            description: None,
        }
    }
}
