mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{bearer, body_json, form, test_app};
use confreq::{config::Config, session::NO_SESSION_TOKEN};
use serde_json::json;
use sqlx::SqlitePool;
use tower::ServiceExt;

async fn insert_anno(pool: &SqlitePool, tag: &str, anno_id: i64, tag_index: f64, heading: &str) {
    sqlx::query("INSERT INTO tag_annos (tag, anno_id, tag_index, heading) VALUES (?, ?, ?, ?)")
        .bind(tag)
        .bind(anno_id)
        .bind(tag_index)
        .bind(heading)
        .execute(pool)
        .await
        .unwrap();
}

async fn count_annos(pool: &SqlitePool, tag: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tag_annos WHERE tag = ?")
        .bind(tag)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn post_anno(tag: &str, anno: &serde_json::Value, auth: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/api/taganno?tag={}&post={}", tag, NO_SESSION_TOKEN))
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder
        .body(Body::from(form(&[("anno", &anno.to_string())])))
        .unwrap()
}

#[tokio::test]
async fn guest_can_read_but_not_edit() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 1, 2.0, "Session 1").await;

    let response = app
        .clone()
        .oneshot(Request::get("/api/taganno?tag=order").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["tag"], "order");
    assert_eq!(body["editable"], false);
    assert_eq!(body["anno"][0]["legend"], "Session 1");

    let response = app
        .oneshot(post_anno("order", &json!({"annoid": 1, "legend": "x"}), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body, json!({"ok": false, "error": "Permission error"}));
}

#[tokio::test]
async fn missing_or_valued_tag_is_reported() {
    let (app, _pool) = test_app(Config::default()).await;

    let response = app
        .clone()
        .oneshot(Request::get("/api/taganno").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"ok": false, "error": "Tag required"})
    );

    let response = app
        .oneshot(Request::get("/api/taganno?tag=order%234").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["error"], "Tag values not allowed here");
}

#[tokio::test]
async fn new_row_gets_id_after_existing_max() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 5, 1.0, "Keynote").await;
    insert_anno(&pool, "other", 40, 1.0, "Unrelated").await;

    let response = app
        .clone()
        .oneshot(post_anno(
            "order",
            &json!([{"annoid": "n1", "tagval": "3", "legend": "Break"}]),
            Some(bearer(2, true, false)),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["editable"], true);
    let anno = body["anno"].as_array().unwrap();
    assert_eq!(anno.len(), 2);
    assert_eq!(anno[1]["annoid"], 6);
    assert_eq!(anno[1]["tagval"], 3.0);
    assert_eq!(anno[1]["legend"], "Break");

    // 이후 조회도 같은 상태를 보여야 합니다
    let response = app
        .oneshot(Request::get("/api/taganno?tag=ORDER").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["anno"].as_array().unwrap().len(), 2);
    assert_eq!(body["anno"][1]["annoid"], 6);
}

#[tokio::test]
async fn bad_tagval_writes_nothing() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 1, 1.0, "Keynote").await;

    let response = app
        .oneshot(post_anno(
            "order",
            &json!([
                {"annoid": "n1", "legend": "Break", "tagval": "2"},
                {"annoid": 1, "tagval": "later"}
            ]),
            Some(bearer(2, true, false)),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["message_list"][0]["landmark"], "ta/2/tagval");
    assert_eq!(body["message_list"][0]["message"], "Tag value should be a number");
    assert_eq!(body["message_list"][0]["status"], 2);

    assert_eq!(count_annos(&pool, "order").await, 1);
    let heading: String =
        sqlx::query_scalar("SELECT heading FROM tag_annos WHERE tag = 'order' AND anno_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(heading, "Keynote");
}

#[tokio::test]
async fn delete_and_update_in_one_batch() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 1, 1.0, "Keynote").await;
    insert_anno(&pool, "order", 2, 2.0, "Lunch").await;

    let response = app
        .oneshot(post_anno(
            "order",
            &json!([
                {"annoid": 1, "deleted": true},
                {"annoid": 2, "tagval": "7", "session_title": "Afternoon", "location": "Hall B"}
            ]),
            Some(bearer(9, true, true)),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    let anno = body["anno"].as_array().unwrap();
    assert_eq!(anno.len(), 1);
    assert_eq!(anno[0]["annoid"], 2);
    assert_eq!(anno[0]["tagval"], 7.0);
    // 제목을 보내지 않았으므로 기존 제목이 남습니다
    assert_eq!(anno[0]["legend"], "Lunch");
    assert_eq!(
        anno[0]["info"],
        json!({"session_title": "Afternoon", "location": "Hall B"})
    );
}

#[tokio::test]
async fn pc_cannot_edit_chair_or_foreign_private_tags() {
    let (app, _pool) = test_app(Config::default()).await;

    for tag in ["~~chairs", "3~theirs"] {
        let response = app
            .clone()
            .oneshot(post_anno(
                tag,
                &json!({"annoid": "n1", "legend": "x"}),
                Some(bearer(2, true, false)),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["error"], "Permission error", "{}", tag);
    }

    // `~mine`은 2~mine으로 바뀌고 본인 태그이므로 편집할 수 있습니다
    let response = app
        .oneshot(post_anno(
            "~mine",
            &json!({"annoid": "n1", "legend": "Mine"}),
            Some(bearer(2, true, false)),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["tag"], "2~mine");
    assert_eq!(body["anno"][0]["legend"], "Mine");
}

#[tokio::test]
async fn malformed_anno_is_bad_request() {
    let (app, _pool) = test_app(Config::default()).await;

    for anno in ["not json", "\"text\"", r#"[{"annoid": "x"}]"#] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/taganno?tag=order&post=.empty")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("authorization", bearer(2, true, false))
            .body(Body::from(form(&[("anno", anno)])))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            body_json(response).await,
            json!({"ok": false, "error": "Bad request"}),
            "{}",
            anno
        );
    }
}

#[tokio::test]
async fn json_body_is_used_when_no_form_fields() {
    let (app, _pool) = test_app(Config::default()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/taganno?tag=order&post=.empty")
        .header("content-type", "application/json")
        .header("authorization", bearer(2, true, false))
        .body(Body::from(r#"{"annoid": "n7", "legend": "Posters", "tagval": 12}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["anno"][0]["annoid"], 1);
    assert_eq!(body["anno"][0]["tagval"], 12.0);
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let (app, _pool) = test_app(Config::default()).await;

    let response = app
        .oneshot(
            Request::get("/api/taganno?tag=order")
                .header("authorization", "Bearer nonsense")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn write_without_post_token_is_refused() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 1, 1.0, "Keynote").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/taganno?tag=order")
        .header("content-type", "application/x-www-form-urlencoded")
        .header("authorization", bearer(9, true, true))
        .body(Body::from(form(&[("anno", r#"{"annoid": 1, "deleted": true}"#)])))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"ok": false, "error": "Missing credentials"})
    );
    assert_eq!(count_annos(&pool, "order").await, 1);
}

#[tokio::test]
async fn placeholder_rows_are_not_listed() {
    let (app, pool) = test_app(Config::default()).await;
    insert_anno(&pool, "order", 3, 1.0, "Keynote").await;
    sqlx::query("INSERT INTO tag_annos (tag, anno_id, tag_index) VALUES ('order', NULL, 0.5)")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(count_annos(&pool, "order").await, 2);

    let response = app
        .clone()
        .oneshot(Request::get("/api/taganno?tag=order").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    let anno = body["anno"].as_array().unwrap();
    assert_eq!(anno.len(), 1);
    assert_eq!(anno[0]["annoid"], 3);

    // 자리표시 행은 새 ID 배정에도 영향을 주지 않습니다
    let response = app
        .oneshot(post_anno(
            "order",
            &json!({"annoid": "n1", "legend": "Break"}),
            Some(bearer(9, true, true)),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["anno"].as_array().unwrap().len(), 2);
    assert!(body["anno"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["annoid"] == 4 && a["legend"] == "Break"));
}
