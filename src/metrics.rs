// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the operator, all prefixed `rook_ceph_operator_`.
//!
//! - reconciliations by kind and outcome, with durations
//! - requeues by kind and reason
//! - owned resources created, updated and deleted
//! - errors by kind and [`ReconcileError`](crate::errors::ReconcileError) reason
//! - cephx key rotations
//! - storage-cluster commands by binary and outcome
//!
//! Metrics are served on `/metrics` by the HTTP server started in `main`.

use prometheus::core::Collector;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Prefix for every metric name
const METRICS_NAMESPACE: &str = "rook_ceph_operator";

/// Registry exposed on `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Metric definitions are static and unique, so registration cannot fail at runtime.
fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    METRICS_REGISTRY
        .register(Box::new(collector.clone()))
        .unwrap();
    collector
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    registered(CounterVec::new(opts, labels).unwrap())
}

/// Labels: `resource_type`, `status` (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Labels: `resource_type`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    registered(HistogramVec::new(opts, &["resource_type"]).unwrap())
});

/// Labels: `resource_type`, `reason`
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

/// Labels: `resource_type`, `operation` (`create`, `update`, `delete`)
pub static RESOURCE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "resource_operations_total",
        "Owned resources created, updated or deleted by type",
        &["resource_type", "operation"],
    )
});

/// Labels: `resource_type`, `error_type`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "errors_total",
        "Total number of reconcile errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

/// Labels: `resource_type`
pub static CEPHX_ROTATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "cephx_key_rotations_total",
        "Cephx daemon key rotations performed by resource type",
        &["resource_type"],
    )
});

/// Labels: `binary`, `outcome` (`success`, `failure`)
pub static CEPH_COMMANDS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "ceph_commands_total",
        "Storage cluster commands executed by binary and outcome",
        &["binary", "outcome"],
    )
});

/// Labels: `binary`
pub static CEPH_COMMAND_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_ceph_command_duration_seconds"),
        "Duration of storage cluster commands in seconds",
    )
    .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 30.0]);
    registered(HistogramVec::new(opts, &["binary"]).unwrap())
});

pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Records a failed reconciliation and its error category.
pub fn record_reconciliation_error(resource_type: &str, error_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_resource_created(resource_type: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[resource_type, "create"])
        .inc();
}

pub fn record_resource_updated(resource_type: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[resource_type, "update"])
        .inc();
}

pub fn record_resource_deleted(resource_type: &str) {
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[resource_type, "delete"])
        .inc();
}

pub fn record_key_rotation(resource_type: &str) {
    CEPHX_ROTATIONS_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_ceph_command(binary: &str, success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "failure" };
    CEPH_COMMANDS_TOTAL
        .with_label_values(&[binary, outcome])
        .inc();
    CEPH_COMMAND_DURATION_SECONDS
        .with_label_values(&[binary])
        .observe(duration.as_secs_f64());
}

/// Encodes every registered metric in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        record_reconciliation_success("SuccessKind", Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["SuccessKind", "success"]);
        assert!(counter.get() > 0.0);
        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&["SuccessKind"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error_counts_category() {
        record_reconciliation_error("ErrorKind", "Remote", Duration::from_millis(250));

        assert!(
            ERRORS_TOTAL
                .with_label_values(&["ErrorKind", "Remote"])
                .get()
                > 0.0
        );
        assert!(
            RECONCILIATION_TOTAL
                .with_label_values(&["ErrorKind", "error"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_resource_operations_are_split_by_operation() {
        record_resource_created("OpsKind");
        record_resource_created("OpsKind");
        record_resource_deleted("OpsKind");

        let created = RESOURCE_OPERATIONS_TOTAL.with_label_values(&["OpsKind", "create"]);
        let deleted = RESOURCE_OPERATIONS_TOTAL.with_label_values(&["OpsKind", "delete"]);
        assert!((created.get() - 2.0).abs() < f64::EPSILON);
        assert!((deleted.get() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherKind", Duration::from_millis(100));
        record_ceph_command("ceph", true, Duration::from_millis(20));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("rook_ceph_operator_reconciliations_total"));
        assert!(metrics_text.contains("rook_ceph_operator_ceph_commands_total"));
    }
}
