//! # 요청 → Qrequest 변환
//!
//! axum `FromRequest` 구현입니다. 요청마다 한 번 실행되어 `Qrequest`를 만듭니다.
//!
//! ## 처리 순서
//! 1. 메서드 확인 (모르는 메서드는 405)
//! 2. 경로 → `NavigationState`, 헤더, Referer, 수신 쿠키
//!    (`Router::nest`가 앞부분을 떼기 전의 원래 URI 기준)
//! 3. `Authorization` → 현재 사용자
//! 4. 쿼리 문자열 → 파라미터
//! 5. 본문: multipart / urlencoded 폼 → 파라미터와 업로드, 그 밖에는 원시 본문
//! 6. 세션 쿠키 → 저장된 세션 복원
//! 7. `post` 파라미터가 세션의 post 토큰과 같으면 토큰 승인

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, OriginalUri, Request},
    http::header::{CONTENT_TYPE, COOKIE, REFERER},
};

use super::body::BodyAccessor;
use super::upload::{ingest_multipart, normalize_uploads};
use super::{Method, NavigationState, Qrequest, UPLOAD_ERRORS_ANNEX};
use crate::db;
use crate::error::AppError;
use crate::models::Contact;
use crate::routes::AppState;
use crate::services::mimetype;
use crate::session::Qsession;

impl FromRequest<AppState> for Qrequest {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let conf = state.config.clone();
        let (mut parts, body) = req.into_parts();

        let method = Method::parse(parts.method.as_str())?;
        let request_path = match parts.extensions.get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path().to_string(),
            None => parts.uri.path().to_string(),
        };
        let nav = NavigationState::new(&conf.base_path, &request_path);
        let mut qreq = Qrequest::new(method, nav);
        qreq.set_conf(conf.clone());

        for (name, value) in parts.headers.iter() {
            if let Ok(v) = value.to_str() {
                qreq.set_header(name.as_str(), Some(v.to_string()));
            }
        }
        let referrer = parts
            .headers
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        qreq.set_referrer(referrer);

        for value in parts.headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in ::cookie::Cookie::split_parse(value).flatten() {
                qreq.set_incoming_cookie(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        let user = Contact::from_request_parts(&mut parts, state).await?;
        qreq.set_user(user);

        if let Some(query) = parts.uri.query() {
            qreq.params_mut().extend_from_urlencoded(query.as_bytes());
        }

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(mimetype::base_type)
            .unwrap_or_default();

        match content_type.as_str() {
            "multipart/form-data" => {
                let multipart =
                    Multipart::from_request(Request::from_parts(parts, body), state)
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let form =
                    ingest_multipart(multipart, &conf.upload_dir, conf.upload_max_filesize)
                        .await?;
                if form.fields.is_empty() {
                    qreq.set_post_empty();
                }
                for (key, value) in form.fields {
                    qreq.params_mut().insert_field(&key, value);
                }
                let (files, errors) =
                    normalize_uploads(&form.uploads, &form.spool, conf.upload_max_filesize);
                if !errors.is_empty() {
                    tracing::debug!("{} upload errors", errors.len());
                    qreq.set_annex(UPLOAD_ERRORS_ANNEX, errors);
                }
                qreq.install_uploads(files, form.spool);
            }
            "application/x-www-form-urlencoded" => {
                let bytes = axum::body::to_bytes(body, conf.max_body_bytes)
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Cannot read form body: {}", e)))?;
                let has_fields = url::form_urlencoded::parse(&bytes).next().is_some();
                qreq.params_mut().extend_from_urlencoded(&bytes);
                if !has_fields {
                    qreq.set_post_empty();
                    qreq.set_body_source(BodyAccessor::from_bytes(bytes));
                }
            }
            _ => {
                qreq.set_post_empty();
                qreq.set_body_source(BodyAccessor::from_input(body, conf.max_body_bytes));
            }
        }

        let sid = qreq.cookie(&conf.session_name).map(str::to_string);
        if let Some(sid) = sid.filter(|s| !s.is_empty()) {
            match db::load_session(&state.pool, &sid).await? {
                Some(data) => {
                    qreq.set_qsession(Qsession::restore(sid, data));
                }
                None => tracing::debug!("Ignoring unknown session id"),
            }
        }

        let token_ok = qreq
            .get("post")
            .is_some_and(|post| post == qreq.maybe_post_value());
        if token_ok {
            qreq.approve_token();
        }

        Ok(qreq)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::Request,
        routing::{get, post},
        Router,
    };
    use serde_json::{json, Value};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    async fn describe(mut qreq: Qrequest) -> axum::Json<Value> {
        let body = qreq
            .body()
            .await
            .map(|b| String::from_utf8_lossy(b).into_owned());
        axum::Json(json!({
            "page": qreq.page(),
            "path": qreq.path(),
            "post_empty": qreq.post_empty(),
            "has_body": body.is_some(),
            "body": body,
            "tag": qreq.get("tag"),
        }))
    }

    fn app(base_path: &str) -> Router {
        let config = Config {
            base_path: base_path.to_string(),
            ..Config::default()
        };
        // 세션 쿠키가 없으면 DB에 접근하지 않습니다
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let api = Router::new()
            .route("/describe", get(describe))
            .route("/taganno/{*rest}", get(describe))
            .route("/form", post(describe))
            .with_state(AppState {
                pool,
                config: Arc::new(config),
            });
        Router::new().nest(&format!("{}api", base_path), api)
    }

    async fn call(app: Router, request: Request<Body>) -> Value {
        let response = app.oneshot(request).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn navigation_sees_the_full_request_path() {
        let v = call(
            app("/"),
            Request::get("/api/describe").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(v["page"], "api");
        assert_eq!(v["path"], "/describe");

        let v = call(
            app("/conf/"),
            Request::get("/conf/api/taganno/a%20b").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(v["page"], "api");
        assert_eq!(v["path"], "/taganno/a%20b");
    }

    #[tokio::test]
    async fn form_fields_repeating_query_keys_are_not_an_empty_post() {
        let v = call(
            app("/"),
            Request::post("/api/form?tag=order")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("tag=order2"))
                .unwrap(),
        )
        .await;
        assert_eq!(v["post_empty"], false);
        assert_eq!(v["has_body"], false);
        assert_eq!(v["tag"], "order2");
    }

    #[tokio::test]
    async fn form_without_fields_exposes_raw_body() {
        let v = call(
            app("/"),
            Request::post("/api/form?tag=order")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("&"))
                .unwrap(),
        )
        .await;
        assert_eq!(v["post_empty"], true);
        assert_eq!(v["body"], "&");
        assert_eq!(v["tag"], "order");
    }
}
