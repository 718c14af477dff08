//! Product catalogue handlers, including CSV import/export.

use crate::csv;
use crate::models::{CreateProduct, UpdateProduct};
use crate::services::metrics::CSV_IMPORT_ROWS_TOTAL;
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::response::ok;
use validator::Validate;

/// `GET /products`
pub async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = state.db.list_products().await?;
    Ok(ok(products))
}

/// `POST /products`
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProduct>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let product = state.db.create_product(&input).await?;
    Ok((StatusCode::CREATED, ok(product)))
}

/// `GET /products/:id`
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .db
        .get_product(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Product not found")))?;
    Ok(ok(product))
}

/// `PUT /products/:id`
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(input): Json<UpdateProduct>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let product = state
        .db
        .update_product(&product_id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Product not found")))?;
    Ok(ok(product))
}

/// `DELETE /products/:id`
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_product(&product_id).await? {
        return Err(AppError::NotFound(anyhow!("Product not found")));
    }
    Ok(ok(json!({ "deleted": true })))
}

/// Pull the CSV payload and the `replace_existing` flag out of a multipart
/// upload. The file must arrive under the `file` field.
pub(super) async fn read_csv_upload(
    mut multipart: Multipart,
) -> Result<(String, bool), AppError> {
    let mut text = None;
    let mut replace_existing = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid multipart payload: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(anyhow!("Failed to read upload: {}", e)))?;
                text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            "replace_existing" => {
                let value = field.text().await.unwrap_or_default();
                replace_existing = matches!(value.trim(), "true" | "1" | "yes");
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| AppError::BadRequest(anyhow!("Missing 'file' field")))?;
    Ok((text, replace_existing))
}

/// `POST /products/import` - multipart CSV upload. Bad rows are dropped,
/// not fatal; the response reports `{created, total}`.
pub async fn import_products(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (text, replace_existing) = read_csv_upload(multipart).await?;

    let (products, report) = csv::map_products(&text);
    let created = state.db.import_products(&products, replace_existing).await?;

    CSV_IMPORT_ROWS_TOTAL
        .with_label_values(&["product", "accepted"])
        .inc_by(report.accepted as f64);
    CSV_IMPORT_ROWS_TOTAL
        .with_label_values(&["product", "dropped"])
        .inc_by((report.seen - report.accepted) as f64);

    Ok(ok(json!({ "created": created, "total": report.seen })))
}

/// `GET /products/export` - the catalogue as CSV, header-compatible with
/// the importer.
pub async fn export_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.db.list_products().await?;
    let body = csv::products_to_csv(&products);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"products.csv\"",
            ),
        ],
        body,
    ))
}
