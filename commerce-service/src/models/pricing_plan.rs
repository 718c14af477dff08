//! Pricing plan model.
//!
//! Independent catalogue-like entity, not linked to invoices; imported and
//! exported through the same CSV machinery as products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Multi-value field separator inside a single CSV cell. Never `,`.
pub const MULTI_VALUE_SEPARATOR: char = '|';

/// Stored pricing plan row; `features` and `limitations` are ordered,
/// '|'-joined lists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricingPlan {
    pub plan_id: String,
    pub name: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount: Option<String>,
    pub features: String,
    pub limitations: String,
    pub popular: bool,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_utc: DateTime<Utc>,
}

impl PricingPlan {
    pub fn into_view(self) -> PricingPlanView {
        PricingPlanView {
            plan_id: self.plan_id,
            name: self.name,
            price: self.price,
            original_price: self.original_price,
            discount: self.discount,
            features: split_multi_value(&self.features),
            limitations: split_multi_value(&self.limitations),
            popular: self.popular,
            is_active: self.is_active,
            sort_order: self.sort_order,
            created_utc: self.created_utc,
        }
    }
}

/// API shape with the multi-value fields split out.
#[derive(Debug, Clone, Serialize)]
pub struct PricingPlanView {
    pub plan_id: String,
    pub name: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount: Option<String>,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
    pub popular: bool,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_utc: DateTime<Utc>,
}

/// Normalized pricing-plan record produced by the CSV mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPricingPlan {
    pub name: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount: Option<String>,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
    pub popular: bool,
    pub is_active: bool,
    pub sort_order: i64,
}

pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(MULTI_VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_multi_value(values: &[String]) -> String {
    values.join(&MULTI_VALUE_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_value_round_trip_preserves_order() {
        let values = vec![
            "Unlimited listings".to_string(),
            "Priority support".to_string(),
            "Custom domain".to_string(),
        ];
        let joined = join_multi_value(&values);
        assert_eq!(joined, "Unlimited listings|Priority support|Custom domain");
        assert_eq!(split_multi_value(&joined), values);
    }

    #[test]
    fn split_drops_empty_segments() {
        assert_eq!(split_multi_value("a||b|"), vec!["a", "b"]);
        assert!(split_multi_value("").is_empty());
    }
}
