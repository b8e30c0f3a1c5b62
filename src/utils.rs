use std::sync::atomic::{AtomicU64, Ordering};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

static RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a unique run ID
pub fn generate_run_id() -> u64 {
    RUN_ID.fetch_add(1, Ordering::SeqCst)
}

/// Current UTC time formatted as RFC 3339
pub fn timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
