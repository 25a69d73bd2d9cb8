// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Phase strings and event reasons for Ceph custom resources.
//!
//! Every reconciled CR reports a single `.status.phase` string reflecting the terminal
//! outcome of the most recent reconcile, together with `.status.observedGeneration`.
//! Failures are additionally surfaced as Kubernetes Events on the CR using the
//! `REASON_*` constants below.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   phase: Ready
//!   observedGeneration: 4
//!   cephx:
//!     daemon:
//!       keyGeneration: 2
//!       keyCephVersion: "20.2.1-0"
//! ```

// ============================================================================
// Phases
// ============================================================================

/// Reconcile finished and the resource matches its spec.
pub const PHASE_READY: &str = "Ready";

/// Reconcile started but has not finished.
pub const PHASE_RECONCILING: &str = "Reconciling";

/// Most recent reconcile failed. The resource keeps being requeued unless the failure
/// is a validation error.
pub const PHASE_RECONCILE_FAILED: &str = "ReconcileFailed";

/// Phase of a freshly created resource.
pub const PHASE_EMPTY: &str = "";

/// Phase reported by `CephCluster` when connected to an external cluster.
pub const PHASE_CONNECTED: &str = "Connected";

// ============================================================================
// Event Reasons
// ============================================================================

/// Reconcile failed. The note carries the error message.
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

/// Owned resource was created.
pub const REASON_CREATED: &str = "Created";

/// Deletion path ran and the finalizer was removed.
pub const REASON_DELETED: &str = "Deleted";

/// Deletion path skipped storage-cluster cleanup because the cluster is gone.
pub const REASON_CLUSTER_DELETED: &str = "CephClusterDeleted";

/// A daemon key was rotated.
pub const REASON_KEY_ROTATED: &str = "CephxKeyRotated";

// ============================================================================
// Event Actions
// ============================================================================

/// Action recorded on reconcile events
pub const ACTION_RECONCILE: &str = "Reconcile";

/// Action recorded on deletion events
pub const ACTION_DELETE: &str = "Delete";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
