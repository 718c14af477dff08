//! Product CRUD tests, including the denormalized total invariant.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
async fn create_product_computes_the_denormalized_total() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/products"))
        .json(&json!({
            "name": "Semen 50kg",
            "unit": "sak",
            "unit_price": 75000,
            "quantity_available": 10,
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["total"], 750_000);
}

#[tokio::test]
async fn updating_quantity_or_price_keeps_total_in_sync() {
    let app = TestApp::spawn().await;
    let product_id = app.seed_product("Pasir", 300_000, 2).await;

    let res = app
        .client
        .put(app.url(&format!("/products/{}", product_id)))
        .json(&json!({ "quantity_available": 5 }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["total"], 1_500_000);

    let res = app
        .client
        .put(app.url(&format!("/products/{}", product_id)))
        .json(&json!({ "unit_price": 310_000 }))
        .send()
        .await
        .expect("Request failed");
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["total"], 1_550_000);
    assert_eq!(body["data"]["quantity_available"], 5);
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/products"))
        .json(&json!({ "name": "Broken", "unit_price": -5 }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.expect("Invalid JSON");
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn deleted_products_are_gone() {
    let app = TestApp::spawn().await;
    let product_id = app.seed_product("Sementara", 1000, 1).await;

    let res = app
        .client
        .delete(app.url(&format!("/products/{}", product_id)))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .get(app.url(&format!("/products/{}", product_id)))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 404);
}
