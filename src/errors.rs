// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcile error classification.
//!
//! Every failure leaving a reconciler is one of the [`ReconcileError`] kinds. The kind
//! decides three things in the controller runner:
//!
//! - whether the failure is requeued, and how ([`Requeue`])
//! - whether `.status.phase` is changed
//! - which Event reason is published on the resource

use crate::cephx::CephxError;
use crate::status_reasons::{PHASE_RECONCILE_FAILED, REASON_RECONCILE_FAILED};
use crate::version::VersionError;
use std::time::Duration;
use thiserror::Error;

/// How a failed reconcile is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Not requeued; the next spec change triggers a new reconcile
    Never,
    /// Requeued after a fixed delay
    After(Duration),
    /// Requeued with per-key exponential backoff
    Backoff,
}

/// Errors returned by reconcilers.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The resource spec fails its preconditions. Not retried.
    #[error("invalid configuration: {reason}")]
    Validation {
        /// What is wrong with the spec
        reason: String,
    },

    /// An external precondition is not met yet (cluster not ready, upgrade in progress).
    ///
    /// Logged at info and requeued after a fixed delay without touching status.
    #[error("{reason}")]
    PreconditionNotMet {
        /// Human readable description
        reason: String,
        /// Delay before the next attempt
        requeue_after: Duration,
    },

    /// A Secret or ConfigMap referenced by the resource does not exist.
    #[error("referenced {kind} \"{namespace}/{name}\" not found")]
    ReferencedObjectMissing {
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object
        name: String,
        /// Namespace of the missing object
        namespace: String,
    },

    /// Optimistic concurrency clash that survived the in-reconcile retries.
    #[error("conflict updating {name}")]
    Conflict {
        /// Name of the object being updated
        name: String,
    },

    /// The reconcile panicked.
    #[error("reconcile panicked: {0}")]
    Panic(String),

    /// An orchestration API or storage cluster call failed.
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Builds a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Builds a precondition error requeued after `secs` seconds.
    pub fn precondition(reason: impl Into<String>, secs: u64) -> Self {
        Self::PreconditionNotMet {
            reason: reason.into(),
            requeue_after: Duration::from_secs(secs),
        }
    }

    /// Builds a missing Secret error.
    pub fn missing_secret(namespace: &str, name: &str) -> Self {
        Self::ReferencedObjectMissing {
            kind: "Secret".to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Builds a missing ConfigMap error.
    pub fn missing_config_map(namespace: &str, name: &str) -> Self {
        Self::ReferencedObjectMissing {
            kind: "ConfigMap".to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    /// Returns how the failure is retried.
    #[must_use]
    pub fn requeue(&self) -> Requeue {
        match self {
            Self::Validation { .. } => Requeue::Never,
            Self::PreconditionNotMet { requeue_after, .. } => Requeue::After(*requeue_after),
            Self::ReferencedObjectMissing { .. }
            | Self::Conflict { .. }
            | Self::Panic(_)
            | Self::Remote(_) => Requeue::Backoff,
        }
    }

    /// Returns the phase to record for this failure.
    ///
    /// `consecutive_failures` counts failed reconciles of the same key, this one included.
    /// Remote failures only surface after `threshold` consecutive attempts.
    #[must_use]
    pub fn phase(&self, consecutive_failures: u32, threshold: u32) -> Option<&'static str> {
        match self {
            Self::Validation { .. } | Self::ReferencedObjectMissing { .. } | Self::Panic(_) => {
                Some(PHASE_RECONCILE_FAILED)
            }
            Self::Remote(_) if consecutive_failures >= threshold => Some(PHASE_RECONCILE_FAILED),
            Self::Remote(_) | Self::PreconditionNotMet { .. } | Self::Conflict { .. } => None,
        }
    }

    /// Returns `true` if a Warning Event is published for this failure.
    #[must_use]
    pub fn publishes_event(&self) -> bool {
        !matches!(
            self,
            Self::PreconditionNotMet { .. } | Self::Conflict { .. }
        )
    }

    /// Event / metric reason for this failure.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "InvalidConfiguration",
            Self::PreconditionNotMet { .. } => "PreconditionNotMet",
            Self::ReferencedObjectMissing { .. } => "ReferencedObjectMissing",
            Self::Conflict { .. } => "Conflict",
            Self::Panic(_) => "Panic",
            Self::Remote(_) => REASON_RECONCILE_FAILED,
        }
    }
}

impl From<CephxError> for ReconcileError {
    fn from(err: CephxError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<crate::exec::CommandError> for ReconcileError {
    fn from(err: crate::exec::CommandError) -> Self {
        Self::Remote(err.into())
    }
}

impl From<VersionError> for ReconcileError {
    fn from(err: VersionError) -> Self {
        Self::Remote(err.into())
    }
}

impl From<kube::Error> for ReconcileError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(response) if response.code == 409 && !is_already_exists(&err) => {
                Self::Conflict {
                    name: response.message.clone(),
                }
            }
            _ => Self::Remote(err.into()),
        }
    }
}

/// Returns `true` if the error is a Kubernetes 404.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// Returns `true` if the error is a Kubernetes 409 AlreadyExists or Conflict.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// Returns `true` if a create failed because the object already exists.
#[must_use]
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409 && response.reason == "AlreadyExists")
}

/// Returns `true` if the API server rejected the object as invalid (422), e.g. an
/// immutable field changed.
#[must_use]
pub fn is_invalid(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 422)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
