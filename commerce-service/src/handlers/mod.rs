//! HTTP handlers for commerce-service.

pub mod cart;
pub mod invoices;
pub mod parties;
pub mod pricing_plans;
pub mod products;
