//! Pricing plan handlers. Same CSV machinery as products.

use crate::csv;
use crate::models::PricingPlan;
use crate::services::metrics::CSV_IMPORT_ROWS_TOTAL;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::response::ok;

use super::products::read_csv_upload;

/// `GET /pricing-plans` - plans in display order, multi-value fields split.
pub async fn list_pricing_plans(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let plans = state.db.list_pricing_plans().await?;
    let views: Vec<_> = plans.into_iter().map(PricingPlan::into_view).collect();
    Ok(ok(views))
}

/// `POST /pricing-plans/import`
pub async fn import_pricing_plans(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (text, replace_existing) = read_csv_upload(multipart).await?;

    let (plans, report) = csv::map_pricing_plans(&text);
    let created = state
        .db
        .import_pricing_plans(&plans, replace_existing)
        .await?;

    CSV_IMPORT_ROWS_TOTAL
        .with_label_values(&["pricing_plan", "accepted"])
        .inc_by(report.accepted as f64);
    CSV_IMPORT_ROWS_TOTAL
        .with_label_values(&["pricing_plan", "dropped"])
        .inc_by((report.seen - report.accepted) as f64);

    Ok(ok(json!({ "created": created, "total": report.seen })))
}

/// `GET /pricing-plans/export`
pub async fn export_pricing_plans(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let plans = state.db.list_pricing_plans().await?;
    let body = csv::pricing_plans_to_csv(&plans);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"pricing-plans.csv\"",
            ),
        ],
        body,
    ))
}
