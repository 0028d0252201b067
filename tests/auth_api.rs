//! HTTP surface tests against a server backed by the in-memory store

mod common;

use common::{extract_reset_token, spawn_app, TestApp};
use serde_json::{json, Value};

async fn post(app: &TestApp, path: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(&format!("{}{}", &app.address, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

async fn register(app: &TestApp, email: &str) -> Value {
    let response = post(
        app,
        "/auth/register",
        json!({
            "email": email,
            "username": "John Doe",
            "password": "secret123"
        }),
    )
    .await;
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "");
}

#[tokio::test]
async fn health_reports_the_store() {
    let app = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "up");
    assert_eq!(body["db"]["status"], "up");
}

// --- Registration and login ---

#[tokio::test]
async fn register_returns_201_with_a_token_pair() {
    let app = spawn_app();

    let body = register(&app, "john@example.com").await;

    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
}

#[tokio::test]
async fn register_returns_409_for_a_taken_email() {
    let app = spawn_app();
    register(&app, "john@example.com").await;

    let response = post(
        &app,
        "/auth/register",
        json!({
            "email": "john@example.com",
            "username": "Someone Else",
            "password": "secret123"
        }),
    )
    .await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "USER_ALREADY_EXISTS");
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({"email": "not-an-email", "username": "john", "password": "secret123"}), "invalid email"),
        (json!({"email": "john@example.com", "username": "john", "password": "short"}), "short password"),
        (json!({"email": "john@example.com", "username": "jo", "password": "secret123"}), "short username"),
        (json!({"email": "john@example.com"}), "missing fields"),
    ];

    for (body, description) in test_cases {
        let response = post(&app, "/auth/register", body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
    }
}

#[tokio::test]
async fn login_returns_401_with_the_same_body_for_any_failure() {
    let app = spawn_app();
    register(&app, "john@example.com").await;

    let wrong_password = post(
        &app,
        "/auth/login",
        json!({"email": "john@example.com", "password": "wrong-password"}),
    )
    .await;
    let unknown_email = post(
        &app,
        "/auth/login",
        json!({"email": "nobody@example.com", "password": "secret123"}),
    )
    .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
}

// --- Refresh and logout ---

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() {
    let app = spawn_app();
    let tokens = register(&app, "john@example.com").await;
    let r0 = tokens["refresh_token"].as_str().unwrap().to_string();

    let response = post(&app, "/auth/refresh", json!({"refresh_token": r0})).await;
    assert_eq!(200, response.status().as_u16());
    let rotated: Value = response.json().await.unwrap();
    let r1 = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(r0, r1);

    let replay = post(&app, "/auth/refresh", json!({"refresh_token": r0})).await;
    assert_eq!(401, replay.status().as_u16());

    let successor = post(&app, "/auth/refresh", json!({"refresh_token": r1})).await;
    assert_eq!(401, successor.status().as_u16());
}

#[tokio::test]
async fn logout_returns_204_and_revokes_the_token() {
    let app = spawn_app();
    let tokens = register(&app, "john@example.com").await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let response = post(&app, "/auth/logout", json!({"refresh_token": refresh_token})).await;
    assert_eq!(204, response.status().as_u16());

    let refresh = post(&app, "/auth/refresh", json!({"refresh_token": refresh_token})).await;
    assert_eq!(401, refresh.status().as_u16());
}

// --- Protected routes ---

#[tokio::test]
async fn me_requires_a_bearer_token() {
    let app = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", &app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", &app.address))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn me_returns_the_authenticated_user() {
    let app = spawn_app();
    let tokens = register(&app, "john@example.com").await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", &app.address))
        .bearer_auth(tokens["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "john@example.com");
    assert_eq!(body["username"], "John Doe");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = spawn_app();
    let first = register(&app, "john@example.com").await;
    let second: Value = post(
        &app,
        "/auth/login",
        json!({"email": "john@example.com", "password": "secret123"}),
    )
    .await
    .json()
    .await
    .unwrap();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/logout-all", &app.address))
        .bearer_auth(first["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());

    for tokens in [&first, &second] {
        let refresh = post(
            &app,
            "/auth/refresh",
            json!({"refresh_token": tokens["refresh_token"]}),
        )
        .await;
        assert_eq!(401, refresh.status().as_u16());
    }
}

// --- Password recovery ---

#[tokio::test]
async fn recover_password_answers_the_same_for_unknown_emails() {
    let app = spawn_app();
    register(&app, "john@example.com").await;

    let known = post(&app, "/auth/recover-password", json!({"email": "john@example.com"})).await;
    let unknown = post(&app, "/auth/recover-password", json!({"email": "nobody@example.com"})).await;

    assert_eq!(200, known.status().as_u16());
    assert_eq!(200, unknown.status().as_u16());
    assert_eq!(known.text().await.unwrap(), unknown.text().await.unwrap());
}

#[tokio::test]
async fn reset_password_flow_over_http() {
    let app = spawn_app();
    register(&app, "john@example.com").await;

    post(&app, "/auth/recover-password", json!({"email": "john@example.com"})).await;
    let (_, link) = app.outbox.next_link().await.expect("No reset link delivered");
    let token = extract_reset_token(&link);

    let response = post(
        &app,
        "/auth/reset-password",
        json!({"token": token, "new_password": "brand-new-secret"}),
    )
    .await;
    assert_eq!(200, response.status().as_u16());

    let reused = post(
        &app,
        "/auth/reset-password",
        json!({"token": token, "new_password": "another-secret"}),
    )
    .await;
    assert_eq!(401, reused.status().as_u16());

    let login = post(
        &app,
        "/auth/login",
        json!({"email": "john@example.com", "password": "brand-new-secret"}),
    )
    .await;
    assert_eq!(200, login.status().as_u16());
}

#[tokio::test]
async fn reset_token_is_refused_by_protected_routes() {
    let app = spawn_app();
    register(&app, "john@example.com").await;

    post(&app, "/auth/recover-password", json!({"email": "john@example.com"})).await;
    let (_, link) = app.outbox.next_link().await.expect("No reset link delivered");
    let token = extract_reset_token(&link);

    let response = reqwest::Client::new()
        .get(&format!("{}/api/me", &app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}
