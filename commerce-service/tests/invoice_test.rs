//! Invoice creation, listing, and deletion tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};

async fn seed_parties(app: &TestApp) -> (String, String) {
    let company_id = app.seed_company("PT Sumber Makmur").await;
    let customer_id = app.seed_customer("Budi Santoso", Some("+62 812-3456-7890")).await;
    (company_id, customer_id)
}

async fn create_invoice(app: &TestApp, body: Value) -> (u16, Value) {
    let res = app
        .client
        .post(app.url("/invoices"))
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    let status = res.status().as_u16();
    let body = res.json().await.expect("Invalid JSON");
    (status, body)
}

#[tokio::test]
async fn create_invoice_returns_created_with_full_view() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let (status, body) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "items": [
                { "name": "Semen 50kg", "quantity": 10, "unit": "sak", "unit_price": 75000 },
                { "name": "Pasir", "quantity": 2, "unit": "m3", "unit_price": 300000 },
            ],
            "tax": 0,
            "service_charge": 0,
        }),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["invoice_number"], "INV-000001");
    assert_eq!(data["status"], "draft");
    assert_eq!(data["subtotal"], 1_350_000);
    assert_eq!(data["total"], 1_350_000);
    assert_eq!(data["company"]["name"], "PT Sumber Makmur");
    assert_eq!(data["customer"]["name"], "Budi Santoso");

    // Items come back in input order
    let items = data["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Semen 50kg");
    assert_eq!(items[0]["sort_order"], 0);
    assert_eq!(items[0]["total"], 750_000);
    assert_eq!(items[1]["name"], "Pasir");
    assert_eq!(items[1]["sort_order"], 1);
}

#[tokio::test]
async fn empty_item_list_is_rejected() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let (status, body) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "items": [],
        }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_company_is_not_found() {
    let app = TestApp::spawn().await;
    let customer_id = app.seed_customer("Siti", None).await;

    let (status, _) = create_invoice(
        &app,
        json!({
            "company_id": "no-such-company",
            "customer_id": customer_id,
            "items": [{ "name": "Item", "quantity": 1, "unit_price": 1000 }],
        }),
    )
    .await;

    assert_eq!(status, 404);
}

#[tokio::test]
async fn totals_add_up_with_tax_and_service_charge() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let (status, body) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "items": [
                { "name": "A", "quantity": 3, "unit_price": 10000 },
                { "name": "B", "quantity": 1, "unit_price": 5000 },
            ],
            "tax": 3850,
            "service_charge": 1000,
        }),
    )
    .await;

    assert_eq!(status, 201);
    let data = &body["data"];
    let item_sum: i64 = data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["total"].as_i64().unwrap())
        .sum();
    assert_eq!(data["subtotal"].as_i64().unwrap(), item_sum);
    assert_eq!(data["subtotal"], 35000);
    assert_eq!(data["total"], 35000 + 3850 + 1000);
}

#[tokio::test]
async fn cart_checkout_builds_the_invoice_and_consumes_the_cart() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    // quantity_available of 1 keeps the stored per-unit total equal to the
    // unit price
    let p1 = app.seed_product("P1", 100_000, 1).await;
    let p2 = app.seed_product("P2", 50_000, 1).await;

    for (product_id, quantity) in [(&p1, 2), (&p2, 1)] {
        let res = app
            .client
            .post(app.url("/cart"))
            .json(&json!({
                "session_id": "session-checkout",
                "product_id": product_id,
                "quantity": quantity,
            }))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(res.status(), 200);
    }

    let cart: Value = app
        .client
        .get(app.url("/cart?session_id=session-checkout"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(cart["data"]["total_price"], 250_000);

    // 11% of 250,000 plus a (deliberately outsized) service charge
    let (status, body) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "session_id": "session-checkout",
            "tax": 27_500,
            "service_charge": 12_737_500,
        }),
    )
    .await;

    assert_eq!(status, 201);
    let data = &body["data"];
    assert_eq!(data["subtotal"], 250_000);
    assert_eq!(data["total"], 13_015_000);
    assert_eq!(data["items"].as_array().unwrap().len(), 2);

    // The cart is consumed by checkout
    let cart: Value = app
        .client
        .get(app.url("/cart?session_id=session-checkout"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(cart["data"]["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn checkout_of_an_empty_cart_is_rejected() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    // Cart exists but holds nothing
    app.client
        .get(app.url("/cart?session_id=session-empty"))
        .send()
        .await
        .expect("Request failed");

    let (status, _) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "session_id": "session-empty",
        }),
    )
    .await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn listing_paginates_and_filters_by_status() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    for n in 0..3 {
        let (status, _) = create_invoice(
            &app,
            json!({
                "company_id": company_id,
                "customer_id": customer_id,
                "items": [{ "name": format!("Item {}", n), "quantity": 1, "unit_price": 1000 }],
            }),
        )
        .await;
        assert_eq!(status, 201);
    }

    let body: Value = app
        .client
        .get(app.url("/invoices?page=1&limit=2"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    let data = &body["data"];
    assert_eq!(data["invoices"].as_array().unwrap().len(), 2);
    assert_eq!(data["total"], 3);
    assert_eq!(data["total_pages"], 2);

    let body: Value = app
        .client
        .get(app.url("/invoices?status=paid"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(body["data"]["total"], 0);

    let body: Value = app
        .client
        .get(app.url("/invoices?search=INV-000002"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn deleting_an_invoice_removes_its_items() {
    let app = TestApp::spawn().await;
    let (company_id, customer_id) = seed_parties(&app).await;

    let (_, body) = create_invoice(
        &app,
        json!({
            "company_id": company_id,
            "customer_id": customer_id,
            "items": [{ "name": "Item", "quantity": 1, "unit_price": 1000 }],
        }),
    )
    .await;
    let invoice_id = body["data"]["invoice_id"].as_str().unwrap().to_string();

    let res = app
        .client
        .delete(app.url(&format!("/invoices/{}", invoice_id)))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 200);

    let res = app
        .client
        .get(app.url(&format!("/invoices/{}", invoice_id)))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(res.status(), 404);

    let item_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoice_items WHERE invoice_id = ?")
            .bind(&invoice_id)
            .fetch_one(app.db.pool())
            .await
            .expect("Failed to count items");
    assert_eq!(item_count, 0);
}
