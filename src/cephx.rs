// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cephx key rotation decisions.
//!
//! A daemon's recorded key state is a [`CephxStatus`]. Three shapes matter:
//!
//! - **uninitialized** (`{0, "Uninitialized"}`): stamped on a resource seen for the first
//!   time. The next status write initializes it, whatever the policy.
//! - **brownfield** (`{0, ""}`): a daemon created before key state was recorded. It keeps
//!   the zero value until a policy change causes a rotation.
//! - **recorded** (`{N, "X.Y.Z-B"}`): the key's generation and the Ceph version that made it.
//!
//! [`should_rotate`] decides whether the current reconcile rotates the key;
//! [`updated_status`] computes the status to write once the reconcile has succeeded.

use crate::crd::{CephxConfig, CephxStatus};
use crate::version::CephVersion;
use std::str::FromStr;
use thiserror::Error;

/// Version marker of a status that has never been written.
pub const UNINITIALIZED_VERSION: &str = "Uninitialized";

/// Errors raised while evaluating a rotation policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CephxError {
    /// Policy string is not one of the known policies
    #[error("invalid cephx key rotation policy {0:?}")]
    InvalidPolicy(String),
}

/// Key rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRotationPolicy {
    /// Keys are never rotated
    Disabled,
    /// Rotate when the requested generation exceeds the recorded one
    KeyGeneration,
    /// Rotate when the cluster moves to a newer Ceph version
    WithCephVersionUpdate,
}

impl FromStr for KeyRotationPolicy {
    type Err = CephxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "Disabled" => Ok(Self::Disabled),
            "KeyGeneration" => Ok(Self::KeyGeneration),
            "WithCephVersionUpdate" => Ok(Self::WithCephVersionUpdate),
            other => Err(CephxError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Status stamped on a resource observed for the first time.
#[must_use]
pub fn uninitialized_status() -> CephxStatus {
    CephxStatus {
        key_generation: 0,
        key_ceph_version: UNINITIALIZED_VERSION.to_string(),
    }
}

/// Returns `true` for the first-observation marker.
#[must_use]
pub fn is_uninitialized(status: &CephxStatus) -> bool {
    status.key_ceph_version == UNINITIALIZED_VERSION
}

/// Formats a version the way it is recorded in status.
#[must_use]
pub fn status_version(version: &CephVersion) -> String {
    version.to_string()
}

/// Decides whether the daemon key must be rotated during this reconcile.
///
/// `desired` is the version the cluster is moving to, `None` when it cannot be determined.
/// Running versions that cannot rotate keys never rotate, whatever the policy.
///
/// # Errors
///
/// Returns [`CephxError::InvalidPolicy`] for an unknown policy string.
pub fn should_rotate(
    config: &CephxConfig,
    running: &CephVersion,
    desired: Option<&CephVersion>,
    status: &CephxStatus,
) -> Result<bool, CephxError> {
    if !running.supports_key_rotation() {
        return Ok(false);
    }

    let policy = KeyRotationPolicy::from_str(&config.key_rotation_policy)?;
    if is_uninitialized(status) {
        // initialization creates the key, nothing to rotate yet
        return Ok(false);
    }

    match policy {
        KeyRotationPolicy::Disabled => Ok(false),
        KeyRotationPolicy::KeyGeneration => Ok(config.key_generation > status.key_generation),
        KeyRotationPolicy::WithCephVersionUpdate => {
            let Some(desired) = desired else {
                return Ok(false);
            };
            if status.key_ceph_version.is_empty() {
                return Ok(true);
            }
            match CephVersion::parse_status(&status.key_ceph_version) {
                Ok(recorded) => Ok(!recorded.is_at_least(desired)),
                // an unreadable recorded version is treated as unknown
                Err(_) => Ok(true),
            }
        }
    }
}

/// Computes the status to record after a successful reconcile.
///
/// - uninitialized: generation becomes `max(1, policy generation)`, version the running one
/// - rotated: generation becomes `max(recorded + 1, policy generation)`, version the running one
/// - otherwise the recorded status is kept unchanged, including the brownfield zero value
#[must_use]
pub fn updated_status(
    did_rotate: bool,
    config: &CephxConfig,
    running: &CephVersion,
    status: &CephxStatus,
) -> CephxStatus {
    if is_uninitialized(status) {
        return CephxStatus {
            key_generation: config.key_generation.max(1),
            key_ceph_version: status_version(running),
        };
    }

    if !did_rotate {
        return status.clone();
    }

    CephxStatus {
        key_generation: status
            .key_generation
            .saturating_add(1)
            .max(config.key_generation),
        key_ceph_version: status_version(running),
    }
}

#[cfg(test)]
#[path = "cephx_tests.rs"]
mod cephx_tests;
