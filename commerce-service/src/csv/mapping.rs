//! Header-alias mapping from parsed rows to normalized records.

use std::collections::HashMap;

use crate::models::pricing_plan::split_multi_value;
use crate::models::{NewPricingPlan, NewProduct};

use super::parser::parse_delimited;

/// One canonical field with its accepted header spellings, in precedence
/// order: the first alias with a non-empty value wins.
pub struct FieldAliases {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

pub const PRODUCT_FIELDS: &[FieldAliases] = &[
    FieldAliases {
        canonical: "name",
        aliases: &["nama", "nama barang", "namabarang", "name", "product", "produk"],
    },
    FieldAliases {
        canonical: "specification",
        aliases: &["spesifikasi", "spec", "specification"],
    },
    FieldAliases {
        canonical: "unit",
        aliases: &["satuan", "unit"],
    },
    FieldAliases {
        canonical: "unit_price",
        aliases: &[
            "hargasatuan",
            "harga_satuan",
            "harga satuan",
            "price",
            "harga",
            "unit_price",
        ],
    },
    FieldAliases {
        canonical: "quantity",
        aliases: &["quantity", "qty", "jumlah barang", "jumlahbarang", "stok", "stock"],
    },
    FieldAliases {
        canonical: "photo_url",
        aliases: &["photo_url", "photo", "foto", "gambar", "image"],
    },
    FieldAliases {
        canonical: "category",
        aliases: &["kategori", "category"],
    },
];

pub const PRICING_PLAN_FIELDS: &[FieldAliases] = &[
    FieldAliases {
        canonical: "name",
        aliases: &["nama", "name", "plan", "paket"],
    },
    FieldAliases {
        canonical: "price",
        aliases: &["harga", "price"],
    },
    FieldAliases {
        canonical: "original_price",
        aliases: &["harga asli", "hargaasli", "original_price", "originalprice"],
    },
    FieldAliases {
        canonical: "discount",
        aliases: &["diskon", "discount"],
    },
    FieldAliases {
        canonical: "features",
        aliases: &["fitur", "features"],
    },
    FieldAliases {
        canonical: "limitations",
        aliases: &["keterbatasan", "batasan", "limitations"],
    },
    FieldAliases {
        canonical: "popular",
        aliases: &["populer", "popular"],
    },
    FieldAliases {
        canonical: "is_active",
        aliases: &["aktif", "is_active", "active", "isactive"],
    },
    FieldAliases {
        canonical: "sort_order",
        aliases: &["urutan", "sort_order", "sortorder"],
    },
];

/// Rows seen vs. rows accepted, so callers can report "created N of M".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub seen: usize,
    pub accepted: usize,
}

/// Index of lower-cased, trimmed header names to column positions.
fn header_index(header_row: &[String]) -> HashMap<String, usize> {
    header_row
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().to_lowercase(), idx))
        .collect()
}

/// Resolve one canonical field from a data row: first alias present in the
/// header whose cell is non-empty wins.
fn resolve<'a>(
    row: &'a [String],
    header: &HashMap<String, usize>,
    fields: &[FieldAliases],
    canonical: &str,
) -> Option<&'a str> {
    let aliases = fields
        .iter()
        .find(|f| f.canonical == canonical)
        .map(|f| f.aliases)?;
    for alias in aliases {
        if let Some(&idx) = header.get(*alias) {
            if let Some(value) = row.get(idx) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Permissive whole-rupiah parse: plain integer, then a decimal number
/// (truncated), then digits extracted from decorated values like
/// "Rp 1.500.000". Unparseable values become 0, never a row failure.
pub fn parse_amount(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return value.trunc() as i64;
        }
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(0)
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "ya" | "y"
    )
}

/// Map raw CSV text to normalized product records. Rows without a name are
/// dropped; the report carries both counts.
pub fn map_products(text: &str) -> (Vec<NewProduct>, ImportReport) {
    let rows = parse_delimited(text);
    let Some((header_row, data_rows)) = rows.split_first() else {
        return (Vec::new(), ImportReport { seen: 0, accepted: 0 });
    };
    let header = header_index(header_row);

    let mut products = Vec::new();
    for row in data_rows {
        let Some(name) = resolve(row, &header, PRODUCT_FIELDS, "name") else {
            continue;
        };
        products.push(NewProduct {
            name: name.to_string(),
            specification: resolve(row, &header, PRODUCT_FIELDS, "specification")
                .map(str::to_string),
            unit: resolve(row, &header, PRODUCT_FIELDS, "unit")
                .unwrap_or("pcs")
                .to_string(),
            unit_price: resolve(row, &header, PRODUCT_FIELDS, "unit_price")
                .map(parse_amount)
                .unwrap_or(0),
            quantity_available: resolve(row, &header, PRODUCT_FIELDS, "quantity")
                .map(parse_amount)
                .unwrap_or(0),
            photo_url: resolve(row, &header, PRODUCT_FIELDS, "photo_url").map(str::to_string),
            category: resolve(row, &header, PRODUCT_FIELDS, "category").map(str::to_string),
        });
    }

    let report = ImportReport {
        seen: data_rows.len(),
        accepted: products.len(),
    };
    (products, report)
}

/// Map raw CSV text to normalized pricing-plan records. Multi-value fields
/// use '|' inside a cell, never the delimiter.
pub fn map_pricing_plans(text: &str) -> (Vec<NewPricingPlan>, ImportReport) {
    let rows = parse_delimited(text);
    let Some((header_row, data_rows)) = rows.split_first() else {
        return (Vec::new(), ImportReport { seen: 0, accepted: 0 });
    };
    let header = header_index(header_row);

    let mut plans = Vec::new();
    for (position, row) in data_rows.iter().enumerate() {
        let Some(name) = resolve(row, &header, PRICING_PLAN_FIELDS, "name") else {
            continue;
        };
        plans.push(NewPricingPlan {
            name: name.to_string(),
            price: resolve(row, &header, PRICING_PLAN_FIELDS, "price")
                .map(parse_amount)
                .unwrap_or(0),
            original_price: resolve(row, &header, PRICING_PLAN_FIELDS, "original_price")
                .map(parse_amount),
            discount: resolve(row, &header, PRICING_PLAN_FIELDS, "discount").map(str::to_string),
            features: resolve(row, &header, PRICING_PLAN_FIELDS, "features")
                .map(split_multi_value)
                .unwrap_or_default(),
            limitations: resolve(row, &header, PRICING_PLAN_FIELDS, "limitations")
                .map(split_multi_value)
                .unwrap_or_default(),
            popular: resolve(row, &header, PRICING_PLAN_FIELDS, "popular")
                .map(parse_bool)
                .unwrap_or(false),
            is_active: resolve(row, &header, PRICING_PLAN_FIELDS, "is_active")
                .map(parse_bool)
                .unwrap_or(true),
            sort_order: resolve(row, &header, PRICING_PLAN_FIELDS, "sort_order")
                .map(parse_amount)
                .unwrap_or(position as i64),
        });
    }

    let report = ImportReport {
        seen: data_rows.len(),
        accepted: plans.len(),
    };
    (plans, report)
}
