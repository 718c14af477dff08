//! commerce-service: catalogue, session carts, and the invoice lifecycle.

pub mod config;
pub mod csv;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
