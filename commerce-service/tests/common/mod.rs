//! Test helper module for commerce-service integration tests.
//!
//! Each test gets its own temp-file SQLite database and a server on a
//! random port, so tests run in parallel without stepping on each other.

#![allow(dead_code)]

use commerce_service::config::{CommerceConfig, DatabaseConfig, InvoicingConfig};
use commerce_service::services::{init_metrics, Database};
use commerce_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use tempfile::TempDir;

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub client: reqwest::Client,
    // Holds the database file alive for the duration of the test.
    _db_dir: TempDir,
}

impl TestApp {
    /// Spawn a new test application on a random port.
    pub async fn spawn() -> Self {
        init_metrics();

        let db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = db_dir.path().join("commerce-test.db");
        let database_url = format!("sqlite://{}", db_path.display());

        let config = CommerceConfig {
            common: CoreConfig { port: 0 }, // Random port
            service_name: "commerce-service-test".to_string(),
            service_version: "0.1.0".to_string(),
            log_level: "warn".to_string(),
            database: DatabaseConfig {
                url: database_url.clone(),
                max_connections: 5,
                min_connections: 1,
            },
            invoicing: InvoicingConfig {
                number_prefix: "INV".to_string(),
                number_pad_width: 6,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        let db = Database::new(&database_url, 5, 1)
            .await
            .expect("Failed to open test database");

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to answer health checks
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if let Ok(res) = client.get(&health_url).send().await {
                if res.status().is_success() {
                    break;
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            client,
            _db_dir: db_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> Value {
        let res = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed");
        assert!(
            res.status().is_success(),
            "POST {} failed: {}",
            path,
            res.status()
        );
        res.json().await.expect("Invalid JSON response")
    }

    /// Create a product via the API and return its id.
    pub async fn seed_product(&self, name: &str, unit_price: i64, quantity_available: i64) -> String {
        let body = self
            .post_json(
                "/products",
                json!({
                    "name": name,
                    "unit": "pcs",
                    "unit_price": unit_price,
                    "quantity_available": quantity_available,
                }),
            )
            .await;
        body["data"]["product_id"]
            .as_str()
            .expect("Missing product_id")
            .to_string()
    }

    /// Create a company via the API and return its id.
    pub async fn seed_company(&self, name: &str) -> String {
        let body = self.post_json("/companies", json!({ "name": name })).await;
        body["data"]["company_id"]
            .as_str()
            .expect("Missing company_id")
            .to_string()
    }

    /// Create a customer via the API and return its id.
    pub async fn seed_customer(&self, name: &str, phone: Option<&str>) -> String {
        let body = self
            .post_json("/customers", json!({ "name": name, "phone": phone }))
            .await;
        body["data"]["customer_id"]
            .as_str()
            .expect("Missing customer_id")
            .to_string()
    }
}
