//! Invoice handlers.

use crate::models::{CreateInvoice, CreateInvoiceItem, InvoiceStatus, ListInvoicesFilter};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use service_core::response::ok;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfirmBody {
    pub channel: Option<String>,
}

fn parse_status(raw: &str) -> Result<InvoiceStatus, AppError> {
    InvoiceStatus::from_string(raw)
        .ok_or_else(|| AppError::BadRequest(anyhow!("Unknown invoice status: {}", raw)))
}

/// `POST /invoices` - build a numbered invoice, either from an explicit item
/// list or by checking out a cart (`session_id`). The cart is cleared after
/// a successful checkout.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(input): Json<CreateInvoice>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;

    let mut checkout_session = None;
    let items: Vec<CreateInvoiceItem> = if !input.items.is_empty() {
        input.items.clone()
    } else if let Some(session_id) = input.session_id.as_deref() {
        let cart = state.db.cart_view(session_id).await?;
        if cart.items.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "Cart is empty, nothing to invoice"
            )));
        }
        checkout_session = Some(session_id.to_string());
        let mut items = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            let specification = state
                .db
                .get_product(&line.product_id)
                .await?
                .and_then(|p| p.specification);
            items.push(CreateInvoiceItem {
                name: line.name.clone(),
                specification,
                quantity: line.quantity,
                unit: line.unit.clone(),
                // Jumlah precedence carries over from cart totals.
                unit_price: line.product_total.unwrap_or(line.unit_price),
            });
        }
        items
    } else {
        return Err(AppError::BadRequest(anyhow!(
            "Invoice must have at least one item"
        )));
    };

    let view = state
        .db
        .create_invoice(
            &input,
            &items,
            &state.config.invoicing.number_prefix,
            state.config.invoicing.number_pad_width,
        )
        .await?;

    if let Some(session_id) = checkout_session {
        // The invoice is already committed; a failed cleanup only leaves a
        // stale cart behind.
        if let Err(e) = state.db.clear_cart(&session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to clear cart after checkout");
        }
    }

    Ok((StatusCode::CREATED, ok(view)))
}

/// `GET /invoices` - paginated list with status filter and search.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let defaults = ListInvoicesFilter::default();
    let filter = ListInvoicesFilter {
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
        status: query.status.as_deref().map(parse_status).transpose()?,
        search: query.search,
    };
    let page = state.db.list_invoices(&filter).await?;
    Ok(ok(page))
}

/// `GET /invoices/:id`
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .db
        .get_invoice_view(&invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;
    Ok(ok(view))
}

/// `PUT /invoices/:id/status`
pub async fn update_invoice_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<impl IntoResponse, AppError> {
    let next = parse_status(&body.status)?;
    let view = state.db.update_invoice_status(&invoice_id, next).await?;
    Ok(ok(view))
}

/// `POST /invoices/:id/confirm` - record a confirmation event and hand back
/// a WhatsApp deep link for the customer. A draft invoice is advanced to
/// sent as part of confirming.
pub async fn confirm_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    body: Option<Json<ConfirmBody>>,
) -> Result<impl IntoResponse, AppError> {
    let channel = body
        .and_then(|Json(b)| b.channel)
        .unwrap_or_else(|| "whatsapp".to_string());

    let view = state.db.confirm_invoice(&invoice_id, &channel).await?;

    let message = format!(
        "Konfirmasi pembayaran invoice {} atas nama {} sebesar Rp {}",
        view.invoice.invoice_number, view.customer.name, view.invoice.total
    );
    let phone: String = view
        .customer
        .phone
        .as_deref()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let confirmation_link = format!(
        "https://wa.me/{}?text={}",
        phone,
        urlencoding::encode(&message)
    );

    Ok(ok(json!({
        "invoice": view,
        "confirmation_link": confirmation_link,
    })))
}

/// `DELETE /invoices/:id` - removes the invoice and its items together.
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_invoice(&invoice_id).await? {
        return Err(AppError::NotFound(anyhow!("Invoice not found")));
    }
    Ok(ok(json!({ "deleted": true })))
}
