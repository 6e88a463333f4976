//! # 데이터 모델 모듈
//!
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `contact`: 현재 사용자와 권한 판정
//! - `message`: 사용자용 메시지(MessageItem)
//! - `session_list`: 요청 범위의 결과 목록
//! - `tag_anno`: 태그 주석 행과 배치 문장
//!
//! `pub use X::*;`로 재공개하므로 `crate::models::TagAnno`처럼 짧게 쓸 수 있습니다.

pub mod contact;
pub mod message;
pub mod session_list;
pub mod tag_anno;

pub use contact::*;
pub use message::*;
pub use session_list::*;
pub use tag_anno::*;
