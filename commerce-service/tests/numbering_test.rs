//! Invoice number allocation tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};
use std::collections::HashSet;

async fn seed_parties(app: &TestApp) -> (String, String) {
    let company_id = app.seed_company("PT Nomor Urut").await;
    let customer_id = app.seed_customer("Agus", None).await;
    (company_id, customer_id)
}

fn invoice_body(company_id: &str, customer_id: &str) -> Value {
    json!({
        "company_id": company_id,
        "customer_id": customer_id,
        "items": [{ "name": "Item", "quantity": 1, "unit_price": 1000 }],
    })
}

#[tokio::test]
async fn sequential_numbers_are_gap_free() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    for expected in ["INV-000001", "INV-000002", "INV-000003"] {
        let res = app
            .client
            .post(app.url("/invoices"))
            .json(&invoice_body(&company_id, &customer_id))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(res.status(), 201);
        let body: Value = res.json().await.expect("Invalid JSON");
        assert_eq!(body["data"]["invoice_number"], expected);
    }
}

#[tokio::test]
async fn deleting_the_latest_invoice_reuses_its_number() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let res = app
        .client
        .post(app.url("/invoices"))
        .json(&invoice_body(&company_id, &customer_id))
        .send()
        .await
        .expect("Request failed");
    let body: Value = res.json().await.expect("Invalid JSON");
    let invoice_id = body["data"]["invoice_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["invoice_number"], "INV-000001");

    app.client
        .delete(app.url(&format!("/invoices/{}", invoice_id)))
        .send()
        .await
        .expect("Request failed");

    // Allocation reads the latest surviving invoice, so the sequence restarts
    let res = app
        .client
        .post(app.url("/invoices"))
        .json(&invoice_body(&company_id, &customer_id))
        .send()
        .await
        .expect("Request failed");
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["invoice_number"], "INV-000001");
}

#[tokio::test]
async fn concurrent_creation_never_duplicates_numbers() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = app.client.clone();
        let url = app.url("/invoices");
        let body = invoice_body(&company_id, &customer_id);
        handles.push(tokio::spawn(async move {
            let res = client
                .post(url)
                .json(&body)
                .send()
                .await
                .expect("Request failed");
            assert_eq!(res.status(), 201);
            let body: Value = res.json().await.expect("Invalid JSON");
            body["data"]["invoice_number"].as_str().unwrap().to_string()
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle.await.unwrap();
        assert!(numbers.insert(number.clone()), "duplicate number {}", number);
    }
    assert_eq!(numbers.len(), 4);
}
