// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcilers for the Ceph auxiliary daemon resources.
//!
//! Each reconciled kind has a module holding its convergence logic and a
//! `run_controller` entry point that wires the kind into the generic runner in
//! [`crate::controller`]:
//!
//! - [`nvmeof`] - `CephNVMeOFGateway`: per-instance ConfigMap, Deployment and Service
//! - [`rbd_mirror`] - `CephRBDMirror`: daemon keyrings, Deployments and bootstrap peers
//! - [`object_user`] - `CephObjectStoreUser`: RGW user, managed or explicit keys
//! - [`bucket_topic`] - `CephBucketTopic`: RGW topic with credentials from Secrets
//! - [`cluster_config`] - mon config store bootstrap and the cluster config Secret
//!
//! Shared building blocks:
//!
//! - [`cluster`] - readiness and upgrade gates against the referenced `CephCluster`
//! - [`finalizers`], [`resources`], [`status`] - object lifecycle and status writeback
//! - [`retry`] - backoff and bounded polling
//! - [`secret_index`], [`secret_refs`] - referenced Secrets and the resources using them

pub mod bucket_topic;
pub mod cluster;
pub mod cluster_config;
pub mod finalizers;
pub mod nvmeof;
pub mod object_user;
pub mod rbd_mirror;
pub mod resources;
pub mod retry;
pub mod secret_index;
pub mod secret_refs;
pub mod status;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

/// Check if a resource's spec has changed by comparing generation with `observed_generation`.
///
/// `metadata.generation` only moves when the spec changes, so matching values mean the
/// last reconcile already saw this spec.
///
/// # Example
///
/// ```rust
/// use rook_ceph_operator::reconcilers::should_reconcile;
///
/// assert!(should_reconcile(Some(2), Some(1)));
/// assert!(should_reconcile(Some(1), None));
/// assert!(!should_reconcile(Some(3), Some(3)));
/// ```
#[must_use]
pub fn should_reconcile(current_generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (current_generation, observed_generation) {
        (Some(current), Some(observed)) => current != observed,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Controller owner reference pointing at `owner`, for objects it creates.
///
/// Returns `None` if the owner has no name or UID yet.
#[must_use]
pub fn owner_reference<T: Resource<DynamicType = ()>>(owner: &T) -> Option<OwnerReference> {
    owner.controller_owner_ref(&())
}

/// Returns `true` if `object` has an owner reference with `owner_uid`.
#[must_use]
pub fn is_owned_by<T: Resource>(object: &T, owner_uid: &str) -> bool {
    object
        .meta()
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == owner_uid))
}

#[cfg(test)]
mod mod_tests;
