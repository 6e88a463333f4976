//! # 라우트 핸들러 모듈
//!
//! 모든 핸들러는 마지막 인자로 `Qrequest`를 받고, `Qrequest::respond`로 끝납니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `session`: 세션 열기와 post 토큰
//! - `taganno`: 태그 주석 조회/수정
//! - `upload`: 업로드 파일 확인

pub mod health;
pub mod session;
pub mod taganno;
pub mod upload;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;

pub use health::*;
pub use session::*;
pub use taganno::*;
pub use upload::*;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀 (내부적으로 Arc로 공유)
    pub pool: SqlitePool,
    /// 서버 설정이자 요청에 바인딩되는 사이트 컨텍스트
    pub config: Arc<Config>,
}

/// API 라우터를 만듭니다. API는 `{base_path}api` 아래에 놓입니다.
pub fn router(state: AppState) -> Router {
    let api_path = format!("{}api", state.config.base_path);
    let body_limit = state.config.max_body_bytes;

    let api_routes = Router::new()
        .route("/taganno", get(get_taganno).post(set_taganno))
        .route("/session", get(session_info))
        .route("/upload", post(upload_files))
        .route("/health", get(health_check))
        .with_state(state);

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(&api_path, api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
