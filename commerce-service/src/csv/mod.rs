//! Delimited-text import/export.
//!
//! One shared parser and a declarative header-alias table replace the
//! per-screen scan-and-match loops this logic tends to accumulate. The
//! whole module is pure: same text in, same records out.

pub mod export;
pub mod mapping;
pub mod parser;

pub use export::{pricing_plans_to_csv, products_to_csv};
pub use mapping::{map_pricing_plans, map_products, ImportReport};
pub use parser::parse_delimited;
