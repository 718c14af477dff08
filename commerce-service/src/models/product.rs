//! Product model (catalogue reference).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Catalogue product. `total` is the denormalized "jumlah" field
/// (`quantity_available * unit_price`), kept consistent with its inputs by
/// recomputing it inside every mutating statement. Amounts are whole rupiah.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub specification: Option<String>,
    pub unit: String,
    pub unit_price: i64,
    pub quantity_available: i64,
    pub total: Option<i64>,
    pub photo_url: Option<String>,
    pub category: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a product through the API.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub specification: Option<String>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[validate(range(min = 0, message = "unit_price must not be negative"))]
    #[serde(default)]
    pub unit_price: i64,
    #[validate(range(min = 0, message = "quantity_available must not be negative"))]
    #[serde(default)]
    pub quantity_available: i64,
    pub photo_url: Option<String>,
    pub category: Option<String>,
}

/// Input for updating a product. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub specification: Option<String>,
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "unit_price must not be negative"))]
    pub unit_price: Option<i64>,
    #[validate(range(min = 0, message = "quantity_available must not be negative"))]
    pub quantity_available: Option<i64>,
    pub photo_url: Option<String>,
    pub category: Option<String>,
}

/// Normalized product record produced by the CSV mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub specification: Option<String>,
    pub unit: String,
    pub unit_price: i64,
    pub quantity_available: i64,
    pub photo_url: Option<String>,
    pub category: Option<String>,
}

pub(crate) fn default_unit() -> String {
    "pcs".to_string()
}
