//! Prometheus metrics for the template service.
//!
//! Covers template lifecycle (creates, updates, deletes), provider
//! submissions by provider and outcome, and status reconciliation.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "tpl";

lazy_static! {
    /// Templates created (persisted with a successful submission)
    pub static ref TEMPLATES_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_templates_created_total", METRIC_PREFIX),
        "Total templates created"
    ).unwrap();

    /// Templates deleted
    pub static ref TEMPLATES_DELETED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_templates_deleted_total", METRIC_PREFIX),
        "Total templates deleted"
    ).unwrap();

    /// Provider submissions by provider and result
    pub static ref PROVIDER_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_provider_submissions_total", METRIC_PREFIX),
        "Total template submissions to providers",
        &["provider", "result"]
    ).unwrap();

    /// Canonical status transitions applied during reconciliation
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_status_transitions_total", METRIC_PREFIX),
        "Provider approval status transitions",
        &["provider", "to"]
    ).unwrap();

    /// Reconciliation attempts that failed to reach a provider
    pub static ref RECONCILE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_reconcile_failures_total", METRIC_PREFIX),
        "Per-provider reconciliation failures",
        &["provider"]
    ).unwrap();
}

/// Encode all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        TEMPLATES_CREATED_TOTAL.inc();
        let encoded = encode_metrics().unwrap();
        assert!(encoded.contains("tpl_templates_created_total"));
    }
}
