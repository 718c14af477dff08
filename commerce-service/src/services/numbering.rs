//! Invoice number allocation.
//!
//! Numbers have the shape `PREFIX-000123`: a configurable prefix, a dash,
//! and a zero-padded sequence. The next number is derived from the most
//! recently created invoice, which makes allocation a read-then-write
//! counter; the `invoice_number` UNIQUE constraint is the real guard, and
//! the invoice builder retries allocation from fresh state when an insert
//! loses that race.

use anyhow::anyhow;
use service_core::error::AppError;
use sqlx::SqlitePool;

/// Format a sequence number. Sequences wider than `width` render unpadded,
/// so allocation keeps working past the padding range.
pub fn format_number(prefix: &str, sequence: u64, width: usize) -> String {
    format!("{prefix}-{sequence:0width$}")
}

/// Extract the numeric suffix of an invoice number, if any.
pub fn parse_suffix(number: &str) -> Option<u64> {
    number.rsplit('-').next()?.parse().ok()
}

/// Read the latest invoice and compute the next number. Starts at 1 when no
/// invoice exists or the latest number has no parseable suffix.
pub async fn next_number(
    pool: &SqlitePool,
    prefix: &str,
    width: usize,
) -> Result<String, AppError> {
    let latest: Option<String> = sqlx::query_scalar(
        r#"
        SELECT invoice_number
        FROM invoices
        ORDER BY created_utc DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow!("Failed to read latest invoice number: {}", e)))?;

    let next = latest.as_deref().and_then(parse_suffix).unwrap_or(0) + 1;
    Ok(format_number(prefix, next, width))
}
