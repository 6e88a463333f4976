//! # 비즈니스 로직 모듈
//!
//! - `mimetype`: Content-Type 정규화와 본문 타입 추정
//! - `tagger`: 태그 이름 검사
//! - `tag_anno`: 태그 주석 API (get / set)

pub mod mimetype;
pub mod tag_anno;
pub mod tagger;
