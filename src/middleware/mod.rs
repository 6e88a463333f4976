//! # 요청 미들웨어
//!
//! - `auth`: Authorization 헤더 → 현재 사용자(`Contact`)

pub mod auth;
