// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for reconciled resources.
//!
//! A resource observed for the first time gets its finalizer and the reconcile returns
//! immediately; the metadata write triggers the next reconcile. A resource with a
//! deletion timestamp runs its deletion path, then the finalizer is removed.
//!
//! # Example
//!
//! ```rust,no_run
//! use rook_ceph_operator::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//! use rook_ceph_operator::crd::CephRBDMirror;
//! use kube::Client;
//! use anyhow::Result;
//!
//! const FINALIZER: &str = "cephrbdmirror.ceph.rook.io";
//!
//! async fn reconcile(client: Client, mirror: CephRBDMirror) -> Result<()> {
//!     if mirror.metadata.deletion_timestamp.is_some() {
//!         // run the deletion path, then:
//!         return remove_finalizer(&client, &mirror, FINALIZER).await;
//!     }
//!     if ensure_finalizer(&client, &mirror, FINALIZER).await? {
//!         return Ok(());
//!     }
//!     Ok(())
//! }
//! ```

use crate::reconcilers::resources::OwnedObject;
use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Returns `true` if `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Returns `true` if the resource has a deletion timestamp.
#[must_use]
pub fn is_being_deleted<T: Resource>(resource: &T) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

async fn patch_finalizers<T: OwnedObject>(
    client: &Client,
    resource: &T,
    finalizers: Vec<String>,
) -> Result<()> {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| {
            format!(
                "failed to patch finalizers of {} {namespace}/{name}",
                T::kind(&())
            )
        })?;
    Ok(())
}

/// Adds `finalizer` if missing.
///
/// Returns `true` if the finalizer was added, in which case the caller ends the
/// reconcile and waits for the update event.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<T: OwnedObject>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<bool> {
    if has_finalizer(resource, finalizer) {
        return Ok(false);
    }

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    patch_finalizers(client, resource, finalizers).await?;

    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer = %finalizer,
        "added finalizer"
    );
    Ok(true)
}

/// Removes `finalizer` if present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<T: OwnedObject>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<()> {
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);
    patch_finalizers(client, resource, finalizers).await?;

    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer = %finalizer,
        "removed finalizer"
    );
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
