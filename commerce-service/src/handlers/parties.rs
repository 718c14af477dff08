//! Company and customer directory handlers.

use crate::models::{CreateCompany, CreateCustomer};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::response::ok;
use validator::Validate;

/// `POST /companies`
pub async fn create_company(
    State(state): State<AppState>,
    Json(input): Json<CreateCompany>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let company = state.db.create_company(&input).await?;
    Ok((StatusCode::CREATED, ok(company)))
}

/// `GET /companies`
pub async fn list_companies(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let companies = state.db.list_companies().await?;
    Ok(ok(companies))
}

/// `GET /companies/:id`
pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let company = state
        .db
        .get_company(&company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;
    Ok(ok(company))
}

/// `POST /customers`
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomer>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let customer = state.db.create_customer(&input).await?;
    Ok((StatusCode::CREATED, ok(customer)))
}

/// `GET /customers`
pub async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let customers = state.db.list_customers().await?;
    Ok(ok(customers))
}

/// `GET /customers/:id`
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state
        .db
        .get_customer(&customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Customer not found")))?;
    Ok(ok(customer))
}
