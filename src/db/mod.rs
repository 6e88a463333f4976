//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `sessions`: 요청 간 공유 세션 데이터 읽기/쓰기
//! - `tag_annos`: 태그 주석 조회와 배치 적용

pub mod sessions;
pub mod tag_annos;

// `crate::db::load_session`처럼 바로 접근할 수 있게 재공개합니다.
pub use sessions::*;
pub use tag_annos::*;
