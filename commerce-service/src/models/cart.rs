//! Cart and cart-item models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Session-scoped cart. Created lazily on first interaction and destroyed
/// only by explicit clear; `session_id` is an opaque client-supplied token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cart {
    pub cart_id: String,
    pub session_id: String,
    pub created_utc: DateTime<Utc>,
}

/// One (cart, product) row. The `(cart_id, product_id)` pair is unique;
/// re-adding a product merges into `quantity` instead of inserting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub cart_item_id: String,
    pub cart_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_snapshot: i64,
    pub created_utc: DateTime<Utc>,
}

/// Cart line joined with live product fields at read time.
///
/// `price_snapshot` is display-only; the authoritative unit amount is
/// re-read from the product on every read.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub unit_price: i64,
    pub product_total: Option<i64>,
    pub photo_url: Option<String>,
    pub quantity: i64,
    pub price_snapshot: i64,
}

impl CartLine {
    /// Unit amount used for cart totals: the product's denormalized
    /// "jumlah" total wins over `unit_price` when present. This precedence
    /// is a business rule, not a fallback.
    pub fn effective_unit_amount(&self) -> i64 {
        self.product_total.unwrap_or(self.unit_price)
    }

    pub fn line_total(&self) -> i64 {
        self.effective_unit_amount() * self.quantity
    }
}

/// Full reconstructed cart returned by every cart operation.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: String,
    pub session_id: String,
    pub items: Vec<CartLineView>,
    pub total_price: i64,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub unit_price: i64,
    pub product_total: Option<i64>,
    pub photo_url: Option<String>,
    pub quantity: i64,
    pub price_snapshot: i64,
    pub line_total: i64,
}

impl CartView {
    pub fn from_lines(cart: Cart, lines: Vec<CartLine>) -> Self {
        let total_price = lines.iter().map(CartLine::line_total).sum();
        let item_count = lines.iter().map(|l| l.quantity).sum();
        let items = lines
            .into_iter()
            .map(|line| {
                let line_total = line.line_total();
                CartLineView {
                    product_id: line.product_id,
                    name: line.name,
                    unit: line.unit,
                    unit_price: line.unit_price,
                    product_total: line.product_total,
                    photo_url: line.photo_url,
                    quantity: line.quantity,
                    price_snapshot: line.price_snapshot,
                    line_total,
                }
            })
            .collect();
        Self {
            cart_id: cart.cart_id,
            session_id: cart.session_id,
            items,
            total_price,
            item_count,
        }
    }
}

/// Request body for `POST /cart`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddCartItem {
    #[validate(length(min = 1, message = "session_id must not be empty"))]
    pub session_id: String,
    #[validate(length(min = 1, message = "product_id must not be empty"))]
    pub product_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
}

/// Request body for `PUT /cart`. Quantity 0 removes the line.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCartItem {
    #[validate(length(min = 1, message = "session_id must not be empty"))]
    pub session_id: String,
    #[validate(length(min = 1, message = "product_id must not be empty"))]
    pub product_id: String,
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}
