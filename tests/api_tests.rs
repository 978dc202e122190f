//! API integration tests.
//!
//! These run against a live server with a seeded admin account. Start the
//! server, then: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000/api";

fn admin_credentials() -> (String, String) {
    (
        std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@biblio.local".to_string()),
        std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
    )
}

/// Log in and return the bearer token
async fn login(client: &Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert!(response.status().is_success(), "login failed");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    let (email, password) = admin_credentials();
    login(client, &email, &password).await
}

/// Register a throwaway user and return its token
async fn register_user(client: &Client) -> String {
    let email = format!("user-{}@test.local", uuid_suffix());

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);

    login(client, &email, "secret123").await
}

fn uuid_suffix() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

/// Create a book as admin and return its id
async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let form = reqwest::multipart::Form::new()
        .text("title", format!("Test Book {}", uuid_suffix()))
        .text("author", "Test Author")
        .text("total_copies", copies.to_string());

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book");
    body["id"].as_i64().expect("No book id")
}

async fn request_borrow(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@biblio.local",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_and_profile() {
    let client = Client::new();
    let token = register_user(&client).await;

    let response = client
        .get(format!("{}/auth/profile", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to fetch profile");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse profile");
    assert_eq!(body["role"], "USER");
    // the password hash must never leave the server
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_rejected() {
    let client = Client::new();
    let email = format!("dup-{}@test.local", uuid_suffix());
    let payload = json!({
        "name": "Dup",
        "email": email,
        "password": "secret123"
    });

    let first = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to register twice");
    assert_eq!(second.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_book_crud_requires_admin() {
    let client = Client::new();
    let user_token = register_user(&client).await;

    let form = reqwest::multipart::Form::new()
        .text("title", "Forbidden")
        .text("author", "Nobody");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&user_token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_pending_request_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let user = register_user(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    let first = request_borrow(&client, &user, book_id).await;
    assert_eq!(first.status(), 201);

    let second = request_borrow(&client, &user, book_id).await;
    assert_eq!(second.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_pending_request_quota() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let user = register_user(&client).await;

    for _ in 0..3 {
        let book_id = create_book(&client, &admin, 1).await;
        let response = request_borrow(&client, &user, book_id).await;
        assert_eq!(response.status(), 201);
    }

    // fourth pending request breaches the quota
    let book_id = create_book(&client, &admin, 1).await;
    let response = request_borrow(&client, &user, book_id).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_validate_and_return_flow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let user = register_user(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let response = request_borrow(&client, &user, book_id).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let borrow_id = body["borrowId"].as_i64().unwrap();

    // validation takes the only copy
    let response = client
        .put(format!("{}/borrows/validate/{}", BASE_URL, borrow_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to validate");
    assert!(response.status().is_success());

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 0);

    // a second validation of the same borrow must fail
    let response = client
        .put(format!("{}/borrows/validate/{}", BASE_URL, borrow_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // returning puts the copy back
    let response = client
        .put(format!("{}/borrows/return/{}", BASE_URL, borrow_id))
        .bearer_auth(&user)
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 1);

    // a returned borrow cannot be returned again
    let response = client
        .put(format!("{}/borrows/return/{}", BASE_URL, borrow_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_validation_fails_when_no_copy_left() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let first_user = register_user(&client).await;
    let second_user = register_user(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let first: Value = request_borrow(&client, &first_user, book_id)
        .await
        .json()
        .await
        .unwrap();
    let second: Value = request_borrow(&client, &second_user, book_id)
        .await
        .json()
        .await
        .unwrap();

    let response = client
        .put(format!(
            "{}/borrows/validate/{}",
            BASE_URL,
            first["borrowId"].as_i64().unwrap()
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // the last copy is gone, the second request cannot be validated
    let response = client
        .put(format!(
            "{}/borrows/validate/{}",
            BASE_URL,
            second["borrowId"].as_i64().unwrap()
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_refuse_requires_reason_and_is_audited() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let user = register_user(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let body: Value = request_borrow(&client, &user, book_id).await.json().await.unwrap();
    let borrow_id = body["borrowId"].as_i64().unwrap();

    let response = client
        .put(format!("{}/borrows/refuse/{}", BASE_URL, borrow_id))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .put(format!("{}/borrows/refuse/{}", BASE_URL, borrow_id))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "Damaged copy" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let history: Value = client
        .get(format!("{}/borrows/history/{}", BASE_URL, borrow_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let entries = history.as_array().expect("history should be a list");
    assert_eq!(entries[0]["action"], "REFUSE");
    assert_eq!(entries[0]["reason"], "Damaged copy");
}

#[tokio::test]
#[ignore]
async fn test_cancel_own_pending_request() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let user = register_user(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let body: Value = request_borrow(&client, &user, book_id).await.json().await.unwrap();
    let borrow_id = body["borrowId"].as_i64().unwrap();

    let response = client
        .put(format!("{}/borrows/cancel/{}", BASE_URL, borrow_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // cancellation shares the REFUSED state, the audit tag tells them apart
    let history: Value = client
        .get(format!("{}/borrows/history/{}", BASE_URL, borrow_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["action"], "CANCEL");
}

#[tokio::test]
#[ignore]
async fn test_user_cannot_read_others_borrow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let owner = register_user(&client).await;
    let other = register_user(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let body: Value = request_borrow(&client, &owner, book_id).await.json().await.unwrap();
    let borrow_id = body["borrowId"].as_i64().unwrap();

    let response = client
        .get(format!("{}/borrows/{}", BASE_URL, borrow_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_overdue_sweep_is_idempotent() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let first: Value = client
        .post(format!("{}/borrows/check-overdue", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // a second sweep right after must find nothing new
    let second: Value = client
        .post(format!("{}/borrows/check-overdue", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(first["updated"].is_u64());
    assert_eq!(second["updated"], 0);
}

#[tokio::test]
#[ignore]
async fn test_book_stats_are_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/stats", BASE_URL))
        .send()
        .await
        .expect("Failed to fetch stats");

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.expect("Failed to parse stats");
    assert!(body["total"].is_i64() || body["total"].is_u64());
    assert!(body["available"].is_i64() || body["available"].is_u64());
    assert!(body["borrowed"].is_i64() || body["borrowed"].is_u64());
}

#[tokio::test]
#[ignore]
async fn test_book_search_pagination() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page=1&limit=5", BASE_URL))
        .send()
        .await
        .expect("Failed to list books");

    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert!(body["items"].is_array());
    assert!(body["total"].is_i64() || body["total"].is_u64());
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 5);
    assert!(body["totalPages"].is_i64() || body["totalPages"].is_u64());
}
