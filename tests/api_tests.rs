use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use doorman::api::AppState;
use doorman::config::Config;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

/// Admin account seeded by the initial migration.
const ADMIN_USER: &str = "admin";
const ADMIN_PASS: &str = "admin123";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = doorman::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    (doorman::api::router(state.clone()).await, state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_and_verify() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["user"]["username"], "admin");
    assert_eq!(body["data"]["user"]["role"], "admin");
    // The password hash must never leave the server.
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert!(body["data"]["user"].get("password_hash").is_none());

    let token = body["data"]["token"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get("/api/auth/verify", Some(token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["username"], "admin");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let (app, _) = spawn_app().await;

    let response = app.clone().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    // The fallback path goes through the same layers.
    let response = app.clone().oneshot(get("/nope", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_login_missing_field_gets_envelope_400() {
    let (app, _) = spawn_app().await;

    for body in [
        serde_json::json!({ "username": ADMIN_USER }),
        serde_json::json!({ "password": ADMIN_PASS }),
        serde_json::json!({ "username": "", "password": ADMIN_PASS }),
        serde_json::json!({}),
    ] {
        let response = app
            .clone()
            .oneshot(send_json("POST", "/api/auth/login", None, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Username and password are required");
    }
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": "nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn test_login_rejects_deactivated_user() {
    let (app, state) = spawn_app().await;

    state
        .store()
        .set_user_active(ADMIN_USER, false)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Same message as a wrong password, so account state cannot be probed.
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn test_verify_fails_after_deactivation() {
    let (app, state) = spawn_app().await;
    let token = login(&app).await;

    state
        .store()
        .set_user_active(ADMIN_USER, false)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/auth/verify", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_change_takes_effect() {
    let (app, state) = spawn_app().await;

    state
        .store()
        .update_user_password(ADMIN_USER, "swordfish", None)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": ADMIN_PASS }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            None,
            serde_json::json!({ "username": ADMIN_USER, "password": "swordfish" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/history", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/history", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/rfid/cards", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = spawn_app().await;

    let response = app.clone().oneshot(get("/api/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_history_create_requires_type_and_title() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/history",
            Some(&token),
            serde_json::json!({ "type": "system" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/history",
            Some(&token),
            serde_json::json!({ "title": "no type" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Neither rejected request may leave a row behind.
    let response = app
        .clone()
        .oneshot(get("/api/history", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_history_filter_and_order() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    for (kind, title) in [
        ("rfid", "first scan"),
        ("unlock", "door opened"),
        ("rfid", "second scan"),
    ] {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/history",
                Some(&token),
                serde_json::json!({ "type": kind, "title": title, "desc": "", "icon": "id-card" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/api/history?type=rfid", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["title"], "second scan");
    assert_eq!(entries[1]["title"], "first scan");
    assert!(entries[0]["timestamp"].is_i64());

    // `all` behaves like no filter.
    let response = app
        .clone()
        .oneshot(get("/api/history?type=all", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(get("/api/history?limit=1", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_delete_one_and_all() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/history",
            Some(&token),
            serde_json::json!({ "type": "system", "title": "keep" }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/history/{id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Deleting the same id again is a no-op, not an error.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/history/{id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/history")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/history", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_duplicate_card_uid_rejected() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    let card = serde_json::json!({ "uid": "04A1B2C3", "ownerName": "Alice" });

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/rfid/cards", Some(&token), card.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/rfid/cards", Some(&token), card))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);

    let response = app
        .clone()
        .oneshot(get("/api/rfid/cards", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_card_update_validates_fields() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/rfid/cards",
            Some(&token),
            serde_json::json!({ "uid": "AA11BB22", "ownerName": "Bob" }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/rfid/cards/{id}"),
            Some(&token),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/rfid/cards/{id}"),
            Some(&token),
            serde_json::json!({ "status": "inactive" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/rfid/cards?status=inactive", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let cards = body["data"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["ownerName"], "Bob");
}

#[tokio::test]
async fn test_card_verification() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    app.clone()
        .oneshot(send_json(
            "POST",
            "/api/rfid/cards",
            Some(&token),
            serde_json::json!({ "uid": "GOODCARD", "ownerName": "Alice", "status": "active" }),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(send_json(
            "POST",
            "/api/rfid/cards",
            Some(&token),
            serde_json::json!({ "uid": "OLDCARD", "ownerName": "Mallory", "status": "inactive" }),
        ))
        .await
        .unwrap();

    // Verification is public: the device has no bearer token.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/rfid/verify",
            None,
            serde_json::json!({ "uid": "GOODCARD" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["data"]["ownerName"], "Alice");

    // Inactive and unknown cards both answer 200 with valid:false.
    for uid in ["OLDCARD", "NEVERSEEN"] {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/rfid/verify",
                None,
                serde_json::json!({ "uid": uid }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["valid"], false);
        assert!(body.get("data").is_none());
    }

    let response = app
        .clone()
        .oneshot(get("/api/rfid/cards", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    for card in body["data"].as_array().unwrap() {
        match card["uid"].as_str().unwrap() {
            "GOODCARD" => assert!(card["lastUsed"].is_string()),
            "OLDCARD" => assert!(card["lastUsed"].is_null()),
            other => panic!("unexpected card {other}"),
        }
    }
}

#[tokio::test]
async fn test_unknown_endpoint_returns_envelope() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/not-a-real-endpoint", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_dashboard_unlock_flow() {
    let (app, _) = spawn_app().await;
    let token = login(&app).await;

    // A dashboard unlock mirrors itself into the history the same way
    // the web client does.
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/history",
            Some(&token),
            serde_json::json!({
                "type": "unlock",
                "title": "Mở khóa cửa",
                "desc": "Thời gian: 2000ms",
                "icon": "lock-open",
                "metadata": { "durationMs": 2000 },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/api/history?limit=1", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "Mở khóa cửa");
    assert_eq!(entries[0]["type"], "unlock");
    assert_eq!(entries[0]["metadata"]["durationMs"], 2000);
}
