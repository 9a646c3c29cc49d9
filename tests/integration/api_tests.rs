//! API integration tests
//!
//! These drive a running server backed by a migrated database.
//! Run with: cargo test -- --ignored

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Suffix keeping serials and emails unique across runs
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn post(client: &Client, path: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}{}", BASE_URL, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn put(client: &Client, path: &str, body: Value) -> reqwest::Response {
    client
        .put(format!("{}{}", BASE_URL, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

async fn get(client: &Client, path: &str) -> Value {
    let response = client
        .get(format!("{}{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success(), "GET {} -> {}", path, response.status());
    response.json().await.expect("Failed to parse response")
}

async fn create_user(client: &Client, role: &str, password: &str) -> Value {
    let response = post(
        client,
        "/users",
        json!({
            "full_name": "Integration User",
            "email": format!("{}@school.edu", unique(role)),
            "password": password,
            "role": role
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse user")
}

async fn create_equipment(client: &Client, category_id: Option<i64>) -> Value {
    let response = post(
        client,
        "/equipment",
        json!({
            "name": "Projector",
            "serial": unique("SN"),
            "category_id": category_id
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse equipment")
}

async fn request_loan(
    client: &Client,
    equipment_id: i64,
    user_id: i64,
    days: Option<i32>,
) -> reqwest::Response {
    post(
        client,
        "/loans",
        json!({ "equipment_id": equipment_id, "user_id": user_id, "requested_days": days }),
    )
    .await
}

async fn equipment_status(client: &Client, id: i64) -> String {
    let equipment = get(client, &format!("/equipment/{}", id)).await;
    equipment["status"].as_str().unwrap_or_default().to_string()
}

fn id_of(resource: &Value) -> i64 {
    resource["id"].as_i64().expect("Resource has no id")
}

fn due_at(loan: &Value) -> DateTime<Utc> {
    loan["due_at"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .expect("Loan has no due date")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();
    let body = get(&client, "/health").await;
    assert_eq!(body["status"], "healthy");

    let body = get(&client, "/ready").await;
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let user = create_user(&client, "manager", "s3cret").await;

    let response = post(
        &client,
        "/auth/login",
        json!({ "email": user["email"], "password": "s3cret" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["id"], user["id"]);
    assert_eq!(body["views"], json!(["loan_management"]));
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let user = create_user(&client, "requester", "s3cret").await;

    let response = post(
        &client,
        "/auth/login",
        json!({ "email": user["email"], "password": "wrong" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "InvalidCredentials");
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let equipment = create_equipment(&client, None).await;
    let equipment_id = equipment["id"].as_i64().unwrap();
    assert_eq!(equipment["status"], "available");

    let response = request_loan(&client, equipment_id, id_of(&requester), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();
    assert_eq!(loan["status"], "pending");
    assert_eq!(equipment_status(&client, equipment_id).await, "loaned");

    let before = Utc::now();
    let response = put(
        &client,
        &format!("/loans/{}/status", loan_id),
        json!({ "approve": true, "requested_days": 5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "active");
    let due = due_at(&loan);
    assert!(due >= before + Duration::days(5) - Duration::minutes(1));
    assert!(due <= Utc::now() + Duration::days(5) + Duration::minutes(1));

    let response = put(
        &client,
        &format!("/loans/{}/finalize", loan_id),
        json!({ "condition": "good" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "finalized");
    assert!(loan["returned_at"].is_string());
    assert_eq!(equipment_status(&client, equipment_id).await, "available");

    let details = get(&client, &format!("/loans/{}", loan_id)).await;
    assert_eq!(details["equipment"]["id"], equipment_id);
    assert_eq!(details["is_overdue"], false);
}

#[tokio::test]
#[ignore]
async fn test_reject_releases_equipment() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let loan: Value = request_loan(&client, equipment_id, id_of(&requester), Some(2))
        .await
        .json()
        .await
        .unwrap();

    let response = put(
        &client,
        &format!("/loans/{}/status", loan["id"]),
        json!({ "approve": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "rejected");
    assert_eq!(equipment_status(&client, equipment_id).await, "available");

    // Terminal: a second decision is refused
    let response = put(
        &client,
        &format!("/loans/{}/status", loan["id"]),
        json!({ "approve": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InvalidTransition");
}

#[tokio::test]
#[ignore]
async fn test_finalize_damaged_goes_to_maintenance() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let loan: Value = request_loan(&client, equipment_id, id_of(&requester), None)
        .await
        .json()
        .await
        .unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    put(&client, &format!("/loans/{}/status", loan_id), json!({ "approve": true })).await;
    let response = put(
        &client,
        &format!("/loans/{}/finalize", loan_id),
        json!({ "condition": "damaged" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(equipment_status(&client, equipment_id).await, "maintenance");

    // Maintenance equipment cannot be requested
    let response = request_loan(&client, equipment_id, id_of(&requester), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 6);
    assert_eq!(body["error"], "EquipmentUnavailable");
}

#[tokio::test]
#[ignore]
async fn test_request_unknown_equipment_is_not_found() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;

    let response = request_loan(&client, i32::MAX as i64, id_of(&requester), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_requests_only_one_wins() {
    let client = Client::new();
    let first = create_user(&client, "requester", "pw1").await;
    let second = create_user(&client, "requester", "pw2").await;
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let (a, b) = tokio::join!(
        request_loan(&client, equipment_id, first["id"].as_i64().unwrap(), None),
        request_loan(&client, equipment_id, second["id"].as_i64().unwrap(), None),
    );

    let statuses = [a.status(), b.status()];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count(), 1);

    let loans = get(&client, "/loans").await;
    let open = loans
        .as_array()
        .unwrap()
        .iter()
        .filter(|l| l["equipment"]["id"] == equipment_id)
        .count();
    assert_eq!(open, 1);
}

#[tokio::test]
#[ignore]
async fn test_rejected_renewal_keeps_due_date() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let user_id = id_of(&requester);
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let loan: Value = request_loan(&client, equipment_id, user_id, Some(4))
        .await
        .json()
        .await
        .unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    let status_path = format!("/loans/{}/status", loan_id);
    let active: Value = put(&client, &status_path, json!({ "approve": true }))
        .await
        .json()
        .await
        .unwrap();
    let original_due = due_at(&active);

    let response = put(&client, &format!("/loans/{}/renew", loan_id), json!({ "days": 10 })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let renewal: Value = response.json().await.unwrap();
    assert_eq!(renewal["status"], "in_renewal");
    assert_eq!(renewal["requested_days"], 10);

    let response = put(&client, &status_path, json!({ "approve": false })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "active");
    assert_eq!(due_at(&loan), original_due);
    assert!(loan["requested_days"].is_null());
    assert_eq!(equipment_status(&client, equipment_id).await, "loaned");

    let mine = get(&client, &format!("/users/{}/loans", user_id)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_notify_return_note() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let loan: Value = request_loan(&client, equipment_id, id_of(&requester), None)
        .await
        .json()
        .await
        .unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    // Pending loans cannot be annotated
    let notify_path = format!("/loans/{}/notify", loan_id);
    let response = put(&client, &notify_path, json!({ "note": "hi" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    put(&client, &format!("/loans/{}/status", loan_id), json!({ "approve": true })).await;
    let response = put(
        &client,
        &format!("/loans/{}/notify", loan_id),
        json!({ "note": "Left it with the porter" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "active");
    assert_eq!(loan["return_note"], "Left it with the porter");
}

#[tokio::test]
#[ignore]
async fn test_delete_referenced_category_is_refused() {
    let client = Client::new();
    let response = post(&client, "/categories", json!({ "name": unique("Cameras") })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let category: Value = response.json().await.unwrap();
    let category_id = category["id"].as_i64().unwrap();

    create_equipment(&client, Some(category_id)).await;

    let response = client
        .delete(format!("{}/categories/{}", BASE_URL, category_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InUse");

    let still_there = get(&client, &format!("/categories/{}", category_id)).await;
    assert_eq!(still_there["id"], category_id);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_serial_and_body_errors() {
    let client = Client::new();
    let equipment = create_equipment(&client, None).await;

    let response = post(
        &client,
        "/equipment",
        json!({ "name": "Clone", "serial": equipment["serial"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Duplicate");

    // Missing required field
    let response = post(&client, "/equipment", json!({ "name": "No serial" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "BadValue");

    // Body id must match the path
    let response = put(
        &client,
        &format!("/equipment/{}", equipment["id"]),
        json!({ "id": equipment["id"].as_i64().unwrap() + 1, "name": "Renamed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Sends a DELETE and returns the error envelope of a refused delete
async fn refused_delete(client: &Client, path: &str) -> Value {
    let response = client
        .delete(format!("{}{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST, "DELETE {}", path);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore]
async fn test_delete_equipment_with_loans_is_refused() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let response = request_loan(&client, equipment_id, id_of(&requester), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = refused_delete(&client, &format!("/equipment/{}", equipment_id)).await;
    assert_eq!(body["error"], "InUse");
    assert_eq!(body["code"], 7);

    let still_there = get(&client, &format!("/equipment/{}", equipment_id)).await;
    assert_eq!(still_there["id"], equipment_id);
    assert_eq!(still_there["status"], "loaned");
}

#[tokio::test]
#[ignore]
async fn test_delete_user_with_loans_is_refused() {
    let client = Client::new();
    let requester = create_user(&client, "requester", "pw1").await;
    let user_id = id_of(&requester);
    let equipment_id = create_equipment(&client, None).await["id"].as_i64().unwrap();

    let loan: Value = request_loan(&client, equipment_id, user_id, None)
        .await
        .json()
        .await
        .unwrap();

    // Closed loans still reference the user
    put(&client, &format!("/loans/{}/status", loan["id"]), json!({ "approve": false })).await;

    let body = refused_delete(&client, &format!("/users/{}", user_id)).await;
    assert_eq!(body["error"], "InUse");

    let still_there = get(&client, &format!("/users/{}", user_id)).await;
    assert_eq!(still_there["id"], user_id);
    let loans = get(&client, &format!("/users/{}/loans", user_id)).await;
    assert_eq!(loans.as_array().unwrap().len(), 1);
}
