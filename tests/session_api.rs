mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{body_json, set_cookie_value, test_app};
use confreq::config::Config;
use serde_json::Value;
use tower::ServiceExt;

fn session_request(uri: &str, sid: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(sid) = sid {
        builder = builder.header("cookie", format!("theme=dark; confreq_session={}", sid));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn opening_a_session_sets_cookie_and_token() {
    let (app, _pool) = test_app(Config::default()).await;

    let response = app
        .clone()
        .oneshot(session_request("/api/session", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sid = set_cookie_value(&response, "confreq_session").unwrap();
    assert_eq!(sid.len(), 48);
    let raw = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    assert!(raw.contains("Path=/"));

    let body = body_json(response).await;
    assert_eq!(body["sid_present"], true);
    assert_eq!(body["post"], &sid[8..20]);
    assert_eq!(body["visits"], 1);
    assert_eq!(body["valid_token"], false);

    // 같은 세션으로 다시 오면 값이 이어지고 쿠키는 다시 보내지 않습니다
    let response = app
        .oneshot(session_request(
            &format!("/api/session?post={}", &sid[8..20]),
            Some(&sid),
        ))
        .await
        .unwrap();
    assert!(set_cookie_value(&response, "confreq_session").is_none());
    let body = body_json(response).await;
    assert_eq!(body["visits"], 2);
    assert_eq!(body["post"], &sid[8..20]);
    assert_eq!(body["valid_token"], true);
}

#[tokio::test]
async fn unknown_session_id_starts_over() {
    let (app, _pool) = test_app(Config::default()).await;

    let stale = "f".repeat(48);
    let response = app
        .oneshot(session_request("/api/session?post=ffffffffffff", Some(&stale)))
        .await
        .unwrap();
    let sid = set_cookie_value(&response, "confreq_session").unwrap();
    assert_ne!(sid, stale);
    let body = body_json(response).await;
    assert_eq!(body["visits"], 1);
    assert_eq!(body["valid_token"], false);
}

#[tokio::test]
async fn site_session_values_need_a_session_key() {
    let config = Config {
        session_key: Some("conf2026".to_string()),
        ..Config::default()
    };
    let (app, pool) = test_app(config).await;

    let response = app
        .clone()
        .oneshot(session_request("/api/session", None))
        .await
        .unwrap();
    let sid = set_cookie_value(&response, "confreq_session").unwrap();
    assert_eq!(body_json(response).await["last_page"], Value::Null);

    let response = app
        .oneshot(session_request("/api/session", Some(&sid)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["last_page"], "api/session");

    let data: String = sqlx::query_scalar("SELECT data FROM sessions WHERE sid = ?")
        .bind(&sid)
        .fetch_one(&pool)
        .await
        .unwrap();
    let data: Value = serde_json::from_str(&data).unwrap();
    assert_eq!(data["visits"], 2);
    assert_eq!(data["conf2026"]["last_page"], "api/session");
}

#[tokio::test]
async fn base_path_scopes_routes_and_cookies() {
    let config = Config {
        base_path: "/conf/".to_string(),
        ..Config::default()
    };
    let (app, _pool) = test_app(config).await;

    let response = app
        .clone()
        .oneshot(session_request("/conf/api/session", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let raw = response.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(raw.contains("Path=/conf/"));

    let response = app
        .oneshot(session_request("/api/session", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
