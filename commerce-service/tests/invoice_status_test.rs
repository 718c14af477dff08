//! Invoice lifecycle tests: status transitions and the confirmation
//! side-channel.

mod common;

use common::TestApp;
use serde_json::{json, Value};

async fn seed_invoice(app: &TestApp) -> String {
    let company_id = app.seed_company("CV Jaya Abadi").await;
    let customer_id = app.seed_customer("Dewi Lestari", Some("0812 9876 5432")).await;

    let res = app
        .client
        .post(app.url("/invoices"))
        .json(&json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "items": [{ "name": "Jasa Pasang", "quantity": 1, "unit_price": 500000 }],
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.expect("Invalid JSON");
    body["data"]["invoice_id"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, invoice_id: &str, status: &str) -> (u16, Value) {
    let res = app
        .client
        .put(app.url(&format!("/invoices/{}/status", invoice_id)))
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Request failed");
    let code = res.status().as_u16();
    let body = res.json().await.expect("Invalid JSON");
    (code, body)
}

#[tokio::test]
async fn draft_sent_paid_happy_path() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;

    let (code, body) = set_status(&app, &invoice_id, "sent").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "sent");

    let (code, body) = set_status(&app, &invoice_id, "paid").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "paid");
}

#[tokio::test]
async fn skipping_sent_is_a_conflict() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;

    let (code, body) = set_status(&app, &invoice_id, "paid").await;
    assert_eq!(code, 409);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn paid_is_terminal() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;

    set_status(&app, &invoice_id, "sent").await;
    set_status(&app, &invoice_id, "paid").await;

    for next in ["sent", "draft", "cancelled", "overdue"] {
        let (code, _) = set_status(&app, &invoice_id, next).await;
        assert_eq!(code, 409, "paid -> {} should be rejected", next);
    }
}

#[tokio::test]
async fn cancel_works_from_draft_and_sent_but_never_exits() {
    let app = TestApp::spawn().await;

    let from_draft = seed_invoice(&app).await;
    let (code, body) = set_status(&app, &from_draft, "cancelled").await;
    assert_eq!(code, 200);
    assert_eq!(body["data"]["status"], "cancelled");

    let from_sent = seed_invoice(&app).await;
    set_status(&app, &from_sent, "sent").await;
    let (code, _) = set_status(&app, &from_sent, "cancelled").await;
    assert_eq!(code, 200);

    let (code, _) = set_status(&app, &from_sent, "sent").await;
    assert_eq!(code, 409);
}

#[tokio::test]
async fn unknown_status_value_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;

    let (code, body) = set_status(&app, &invoice_id, "void").await;
    assert_eq!(code, 400);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn confirming_a_draft_advances_it_to_sent_and_links_whatsapp() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;

    let res = app
        .client
        .post(app.url(&format!("/invoices/{}/confirm", invoice_id)))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("Invalid JSON");

    assert_eq!(body["data"]["invoice"]["status"], "sent");

    let link = body["data"]["confirmation_link"].as_str().unwrap();
    assert!(link.starts_with("https://wa.me/081298765432?text="));
    assert!(link.contains("INV-000001"));

    let confirmations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoice_confirmations WHERE invoice_id = ?")
            .bind(&invoice_id)
            .fetch_one(app.db.pool())
            .await
            .expect("Failed to count confirmations");
    assert_eq!(confirmations, 1);
}

#[tokio::test]
async fn confirming_a_sent_invoice_keeps_it_sent() {
    let app = TestApp::spawn().await;
    let invoice_id = seed_invoice(&app).await;
    set_status(&app, &invoice_id, "sent").await;

    let res = app
        .client
        .post(app.url(&format!("/invoices/{}/confirm", invoice_id)))
        .json(&json!({ "channel": "email" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["invoice"]["status"], "sent");

    let channel: String =
        sqlx::query_scalar("SELECT channel FROM invoice_confirmations WHERE invoice_id = ?")
            .bind(&invoice_id)
            .fetch_one(app.db.pool())
            .await
            .expect("Failed to read confirmation");
    assert_eq!(channel, "email");
}
