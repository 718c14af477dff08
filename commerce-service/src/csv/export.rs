//! CSV export. Headers are spellings the importer accepts, so an export
//! re-imports field-for-field.

use crate::models::{PricingPlan, Product};

const PRODUCT_HEADER: &str = "name,specification,unit,unit_price,quantity,photo_url,category";
const PRICING_PLAN_HEADER: &str =
    "name,price,original_price,discount,features,limitations,popular,is_active,sort_order";

pub fn products_to_csv(products: &[Product]) -> String {
    let mut out = String::from(PRODUCT_HEADER);
    out.push('\n');
    for product in products {
        let row = [
            quote(&product.name),
            quote(product.specification.as_deref().unwrap_or("")),
            quote(&product.unit),
            product.unit_price.to_string(),
            product.quantity_available.to_string(),
            quote(product.photo_url.as_deref().unwrap_or("")),
            quote(product.category.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn pricing_plans_to_csv(plans: &[PricingPlan]) -> String {
    let mut out = String::from(PRICING_PLAN_HEADER);
    out.push('\n');
    for plan in plans {
        let row = [
            quote(&plan.name),
            plan.price.to_string(),
            plan.original_price.map(|p| p.to_string()).unwrap_or_default(),
            quote(plan.discount.as_deref().unwrap_or("")),
            quote(&plan.features),
            quote(&plan.limitations),
            plan.popular.to_string(),
            plan.is_active.to_string(),
            plan.sort_order.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it contains the delimiter, a quote, or a newline;
/// embedded quotes are doubled. Newlines are replaced with spaces because
/// the parser treats every newline as a row boundary.
fn quote(field: &str) -> String {
    let field = if field.contains('\n') || field.contains('\r') {
        field.replace(['\n', '\r'], " ")
    } else {
        field.to_string()
    };
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::mapping::map_products;
    use chrono::Utc;

    fn product(name: &str, spec: Option<&str>, unit_price: i64, quantity: i64) -> Product {
        Product {
            product_id: "ignored".to_string(),
            name: name.to_string(),
            specification: spec.map(str::to_string),
            unit: "sak".to_string(),
            unit_price,
            quantity_available: quantity,
            total: Some(unit_price * quantity),
            photo_url: None,
            category: Some("material".to_string()),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn export_reimports_field_for_field() {
        let products = vec![
            product("Semen 50kg", Some("Tiga Roda"), 65_000, 120),
            product("Pasir, halus", Some("per m3, cuci"), 250_000, 8),
        ];
        let csv = products_to_csv(&products);
        let (reimported, report) = map_products(&csv);

        assert_eq!(report.seen, 2);
        assert_eq!(report.accepted, 2);
        for (original, mapped) in products.iter().zip(&reimported) {
            assert_eq!(mapped.name, original.name);
            assert_eq!(mapped.specification, original.specification);
            assert_eq!(mapped.unit, original.unit);
            assert_eq!(mapped.unit_price, original.unit_price);
            assert_eq!(mapped.quantity_available, original.quantity_available);
            assert_eq!(mapped.category, original.category);
        }
    }

    #[test]
    fn embedded_quotes_survive_the_round_trip() {
        let products = vec![product("Pipa 5\"", None, 30_000, 40)];
        let csv = products_to_csv(&products);
        let (reimported, _) = map_products(&csv);
        assert_eq!(reimported[0].name, "Pipa 5\"");
    }
}
