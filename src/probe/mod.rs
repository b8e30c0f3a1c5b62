//! Outbound probe: one request, one classified outcome.

mod classify;
mod http;
mod result;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::ProbeError;

pub use classify::{classify, is_blocked, BlockRule, Verdict, BLOCK_RULES};
pub use http::HttpProber;
pub use result::{ProbeResult, ProbeStatus};

/// Reported when the outbound IP cannot be determined
pub const UNKNOWN_IP: &str = "Unknown";

#[async_trait]
pub trait Prober: Send + Sync {
    /// Issue one probe. `label` is carried for logging only.
    ///
    /// Transport failures and refusals are reported through the returned
    /// `ProbeResult`; `Err` means the probe itself could not be performed.
    async fn probe(&self, label: &str) -> Result<ProbeResult, ProbeError>;

    /// Current outbound IP, or [`UNKNOWN_IP`]
    async fn current_ip(&self) -> String;
}
