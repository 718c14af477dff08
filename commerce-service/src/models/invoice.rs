//! Invoice model and status lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::party::{Company, Customer};

/// Invoice status.
///
/// Initial state is `Draft`; `Paid` and `Cancelled` are terminal. All other
/// transitions are rejected with an invalid-transition error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Legal transition table. `Sent -> Overdue` is time-driven and never
    /// triggered directly by a user action, but must be representable.
    pub fn can_transition(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Draft, Cancelled)
                | (Sent, Cancelled)
                | (Overdue, Cancelled)
        )
    }
}

/// Invoice row. Company/customer fields are joined live at read time; only
/// the foreign keys are frozen here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub company_id: String,
    pub customer_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub subtotal: i64,
    pub tax: i64,
    pub service_charge: i64,
    pub total: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status).unwrap_or(InvoiceStatus::Draft)
    }
}

/// Invoice line item, immutable once created. `sort_order` preserves the
/// 0-based input position; `total` is quantity * unit_price, frozen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub invoice_item_id: String,
    pub invoice_id: String,
    pub name: String,
    pub specification: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub unit_price: i64,
    pub total: i64,
    pub sort_order: i64,
}

/// Confirmation event recorded by the messaging side-channel.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceConfirmation {
    pub confirmation_id: String,
    pub invoice_id: String,
    pub channel: String,
    pub confirmed_utc: DateTime<Utc>,
}

/// One line-item request when building an invoice.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoiceItem {
    #[validate(length(min = 1, message = "item name must not be empty"))]
    pub name: String,
    pub specification: Option<String>,
    #[validate(range(min = 1, message = "item quantity must be at least 1"))]
    pub quantity: i64,
    #[serde(default = "super::product::default_unit")]
    pub unit: String,
    #[validate(range(min = 0, message = "unit_price must not be negative"))]
    pub unit_price: i64,
}

/// Request body for `POST /invoices`.
///
/// Either `items` carries an explicit line-item list, or `session_id` names
/// a cart to check out (the cart is consumed on success).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInvoice {
    #[validate(length(min = 1, message = "company_id must not be empty"))]
    pub company_id: String,
    #[validate(length(min = 1, message = "customer_id must not be empty"))]
    pub customer_id: String,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<CreateInvoiceItem>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub service_charge: i64,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone)]
pub struct ListInvoicesFilter {
    pub page: i64,
    pub limit: i64,
    pub status: Option<InvoiceStatus>,
    pub search: Option<String>,
}

impl Default for ListInvoicesFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            search: None,
        }
    }
}

/// Invoice list row with live-joined party names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub invoice_number: String,
    pub company_name: String,
    pub customer_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total: i64,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Paginated invoice list.
#[derive(Debug, Clone, Serialize)]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceSummary>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Full invoice with items and live-joined company/customer.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub company: Company,
    pub customer: Customer,
}
