//! # confreq
//!
//! 학회 관리 웹 애플리케이션의 요청/세션 계층과 태그 주석 API입니다.
//!
//! - `qrequest`: 요청 하나를 정규화한 façade (`Qrequest`)와 그 구성 요소
//! - `session`: 2단계 세션 저장소 (`Qsession`)
//! - `routes`: axum 라우터와 핸들러
//! - `services`: 태그 검사, 태그 주석 로직, MIME 유틸리티
//! - `db`: SQLite 쿼리
//!
//! 바이너리(`main.rs`)와 통합 테스트(`tests/`)가 모두 이 라이브러리를 사용합니다.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod qrequest;
pub mod routes;
pub mod services;
pub mod session;
