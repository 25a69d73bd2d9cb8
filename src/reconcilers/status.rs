// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status writeback with optimistic concurrency.
//!
//! Every attempt re-fetches the live object, applies the caller's changes to its status
//! and writes the result with a JSON merge patch carrying the live `resourceVersion`.
//! Fields present on the live status but absent from the desired one are sent as `null`,
//! so emptied lists, maps and options are cleared on the server. A 409 Conflict starts a new attempt, up to [`STATUS_UPDATE_MAX_RETRIES`] times. An
//! unchanged status is not written.
//!
//! # Example
//!
//! ```rust,no_run
//! use rook_ceph_operator::crd::CephRBDMirror;
//! use rook_ceph_operator::reconcilers::status::update_status;
//! use kube::Client;
//!
//! async fn mark_ready(client: &Client) -> anyhow::Result<()> {
//!     update_status::<CephRBDMirror, _>(client, "rook-ceph", "mirror", |status| {
//!         status.phase = "Ready".to_string();
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

use crate::constants::STATUS_UPDATE_MAX_RETRIES;
use crate::crd::{
    BucketTopicStatus, CephBucketTopic, CephNVMeOFGateway, CephObjectStoreUser, CephRBDMirror,
    NVMeOFGatewayStatus, ObjectStoreUserStatus, RBDMirrorStatus,
};
use crate::errors::{is_conflict, ReconcileError};
use crate::reconcilers::resources::OwnedObject;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use tracing::{debug, warn};

/// A resource whose status carries a phase and an observed generation.
pub trait HasStatus: OwnedObject {
    type Status: Clone + Debug + Default + PartialEq + Serialize + Send + Sync;

    fn status(&self) -> Option<&Self::Status>;
    fn phase(status: &mut Self::Status) -> &mut String;
    fn observed_generation(status: &mut Self::Status) -> &mut Option<i64>;
}

macro_rules! impl_has_status {
    ($kind:ty, $status:ty) => {
        impl HasStatus for $kind {
            type Status = $status;

            fn status(&self) -> Option<&Self::Status> {
                self.status.as_ref()
            }

            fn phase(status: &mut Self::Status) -> &mut String {
                &mut status.phase
            }

            fn observed_generation(status: &mut Self::Status) -> &mut Option<i64> {
                &mut status.observed_generation
            }
        }
    };
}

impl_has_status!(CephObjectStoreUser, ObjectStoreUserStatus);
impl_has_status!(CephBucketTopic, BucketTopicStatus);
impl_has_status!(CephNVMeOFGateway, NVMeOFGatewayStatus);
impl_has_status!(CephRBDMirror, RBDMirrorStatus);

/// Merge patch turning `current` into `desired`, guarded by `resource_version` when known.
///
/// Every key of `current` missing from `desired` is written as `null`, recursively for
/// nested objects. Arrays and scalars are replaced whole.
#[must_use]
pub fn status_patch<S: Serialize>(
    resource_version: Option<String>,
    current: Option<&S>,
    desired: &S,
) -> Value {
    let desired = serde_json::to_value(desired).unwrap_or(Value::Null);
    let status = match current.and_then(|c| serde_json::to_value(c).ok()) {
        Some(current) => merge_diff(&current, desired),
        None => desired,
    };
    match resource_version {
        Some(rv) => json!({ "metadata": { "resourceVersion": rv }, "status": status }),
        None => json!({ "status": status }),
    }
}

fn merge_diff(current: &Value, desired: Value) -> Value {
    match (current, desired) {
        (Value::Object(current), Value::Object(mut desired)) => {
            for (key, value) in current {
                match desired.remove(key) {
                    Some(next) => {
                        let next = merge_diff(value, next);
                        desired.insert(key.clone(), next);
                    }
                    None => {
                        desired.insert(key.clone(), Value::Null);
                    }
                }
            }
            Value::Object(desired)
        }
        (_, desired) => desired,
    }
}

/// Applies `mutate` to the live status and writes it back.
///
/// Returns the written status, or `None` if the object no longer exists.
///
/// # Errors
///
/// Returns [`ReconcileError::Conflict`] if every attempt conflicted and
/// [`ReconcileError::Remote`] for any other API failure.
pub async fn update_status<T, F>(
    client: &Client,
    namespace: &str,
    name: &str,
    mut mutate: F,
) -> Result<Option<T::Status>, ReconcileError>
where
    T: HasStatus,
    F: FnMut(&mut T::Status) + Send,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    for attempt in 1..=STATUS_UPDATE_MAX_RETRIES {
        let Some(live) = api.get_opt(name).await? else {
            debug!(namespace = %namespace, name = %name, "object gone, skipping status update");
            return Ok(None);
        };

        let current = live.status().cloned();
        let mut desired = current.clone().unwrap_or_default();
        mutate(&mut desired);
        if current.as_ref() == Some(&desired) {
            debug!(namespace = %namespace, name = %name, "status unchanged");
            return Ok(Some(desired));
        }

        let patch = status_patch(live.resource_version(), current.as_ref(), &desired);
        match api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                debug!(kind = %T::kind(&()), namespace = %namespace, name = %name, "updated status");
                return Ok(Some(desired));
            }
            Err(e) if is_conflict(&e) => {
                warn!(
                    kind = %T::kind(&()),
                    namespace = %namespace,
                    name = %name,
                    attempt,
                    "status update conflicted, retrying"
                );
            }
            Err(e) => return Err(ReconcileError::Remote(e.into())),
        }
    }

    Err(ReconcileError::Conflict {
        name: format!("{namespace}/{name}"),
    })
}

/// Sets `.status.phase`, and `.status.observedGeneration` when `generation` is given.
///
/// # Errors
///
/// See [`update_status`].
pub async fn set_phase<T: HasStatus>(
    client: &Client,
    namespace: &str,
    name: &str,
    phase: &str,
    generation: Option<i64>,
) -> Result<(), ReconcileError> {
    update_status::<T, _>(client, namespace, name, |status| {
        *T::phase(status) = phase.to_string();
        if generation.is_some() {
            *T::observed_generation(status) = generation;
        }
    })
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
