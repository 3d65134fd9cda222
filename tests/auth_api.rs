use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use plotline_server::db::DocumentStore;
use plotline_server::{configure, AppState, MemoryStore, Settings};
use serde_json::json;
use std::sync::Arc;

fn test_state() -> (web::Data<AppState>, MemoryStore) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = MemoryStore::new();
    let state = AppState::with_store(config, Arc::new(store.clone()));
    (web::Data::new(state), store)
}

fn signup_body() -> serde_json::Value {
    json!({
        "name": "A",
        "phone": "1",
        "email": "a@x.com",
        "password": "p",
        "address": "addr"
    })
}

#[actix_web::test]
async fn test_signup_then_duplicate() {
    let (state, _) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let resp = test::TestRequest::post()
        .uri("/signup")
        .set_json(signup_body())
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Signup successful!");

    let resp = test::TestRequest::post()
        .uri("/signup")
        .set_json(signup_body())
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User already exists");
}

#[actix_web::test]
async fn test_signup_missing_field() {
    let (state, store) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let resp = test::TestRequest::post()
        .uri("/signup")
        .set_json(json!({
            "name": "A",
            "phone": "1",
            "email": "a@x.com",
            "password": ""
        }))
        .send_request(&app)
        .await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "All fields are required");
    assert_eq!(store.len("users").await, 0);
}

#[actix_web::test]
async fn test_login_outcomes() {
    let (state, _) = test_state();
    let app = test::init_service(
        App::new().app_data(state.clone()).configure(configure),
    )
    .await;

    test::TestRequest::post()
        .uri("/signup")
        .set_json(signup_body())
        .send_request(&app)
        .await;

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@x.com", "password": "p"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Login successful");
    let token = body["token"].as_str().expect("token in body");
    assert_eq!(state.tokens.verify(token).unwrap(), "a@x.com");

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@x.com", "password": "P"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "nobody@x.com", "password": "p"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User not found");

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"password": "p"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_user_details_with_login_token() {
    let (state, _) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    test::TestRequest::post()
        .uri("/signup")
        .set_json(signup_body())
        .send_request(&app)
        .await;

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "a@x.com", "password": "p"}))
        .send_request(&app)
        .await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let resp = test::TestRequest::get()
        .uri("/protected/user-details")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["name"], "A");
    assert_eq!(body["user"]["address"], "addr");
}

#[actix_web::test]
async fn test_protected_route_rejections() {
    let (state, _) = test_state();
    let app = test::init_service(
        App::new().app_data(state.clone()).configure(configure),
    )
    .await;

    let resp = test::TestRequest::get()
        .uri("/protected/user-details")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Token is missing!");

    let resp = test::TestRequest::get()
        .uri("/protected/user-details")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid token!");

    let expired = state
        .tokens
        .issue_at("a@x.com", Utc::now() - Duration::minutes(61))
        .unwrap();
    let resp = test::TestRequest::get()
        .uri("/protected/user-details")
        .insert_header(("Authorization", format!("Bearer {}", expired)))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Token has expired!");
}

#[actix_web::test]
async fn test_valid_token_for_missing_user() {
    let (state, store) = test_state();
    let app = test::init_service(
        App::new().app_data(state.clone()).configure(configure),
    )
    .await;

    test::TestRequest::post()
        .uri("/signup")
        .set_json(signup_body())
        .send_request(&app)
        .await;
    let token = state.tokens.issue("a@x.com").unwrap();
    assert!(store.delete("users", "a@x.com").await);

    let resp = test::TestRequest::get()
        .uri("/protected/user-details")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User not found!");
}

#[actix_web::test]
async fn test_signup_and_login_with_numeric_fields() {
    let (state, store) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let resp = test::TestRequest::post()
        .uri("/signup")
        .set_json(json!({
            "name": "A",
            "phone": 5551234,
            "email": "n@x.com",
            "password": 1234,
            "address": "addr"
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);

    let stored = store.get("users", "n@x.com").await.unwrap().expect("stored user");
    assert_eq!(stored["phone"], 5551234);
    assert_eq!(stored["password"], 1234);

    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "n@x.com", "password": 1234}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);

    // Same characters, different type.
    let resp = test::TestRequest::post()
        .uri("/login")
        .set_json(json!({"email": "n@x.com", "password": "1234"}))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_signup_zero_and_false_count_as_missing() {
    let (state, store) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    for (field, value) in [("phone", json!(0)), ("name", json!(false)), ("address", json!([]))] {
        let mut body = signup_body();
        body[field] = value;
        let resp = test::TestRequest::post()
            .uri("/signup")
            .set_json(body)
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400, "{} should be rejected", field);
    }
    assert_eq!(store.len("users").await, 0);
}

#[actix_web::test]
async fn test_malformed_body_is_json_error() {
    let (state, _) = test_state();
    let app = test::init_service(App::new().app_data(state).configure(configure)).await;

    let resp = test::TestRequest::post()
        .uri("/signup")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"name\": ")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    let resp = test::TestRequest::post()
        .uri("/login")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"email\": \"a@x.com\"")
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}
