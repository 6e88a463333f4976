//! 통합 테스트 공용 도구: 메모리 SQLite 위의 라우터와 응답 헬퍼

#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Response, Router};
use chrono::Duration;
use confreq::{
    config::Config,
    middleware::auth::create_access_token,
    models::Contact,
    routes::{self, AppState},
};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// 연결 하나짜리 메모리 DB. 연결이 닫히면 DB도 사라지므로 유휴 종료를 끕니다.
pub async fn test_app(config: Config) -> (Router, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config),
    };
    (routes::router(state), pool)
}

pub fn bearer(id: i64, is_pc: bool, is_chair: bool) -> String {
    let contact = Contact {
        id: Some(id),
        email: None,
        is_pc,
        is_chair,
    };
    let token =
        create_access_token(&contact, &Config::default().jwt_secret, Duration::minutes(5)).unwrap();
    format!("Bearer {}", token)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 응답의 `Set-Cookie` 중 주어진 이름의 값
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(prefix.as_str()))
        .map(|rest| rest.split(';').next().unwrap_or("").to_string())
}

pub fn form(pairs: &[(&str, &str)]) -> String {
    let mut s = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        s.append_pair(k, v);
    }
    s.finish()
}
