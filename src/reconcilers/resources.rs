// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Create, update and delete helpers for owned Kubernetes objects.
//!
//! Each owned kind is written with the strategy that suits it:
//!
//! - **Apply**: server-side apply, for Secrets the operator fully owns
//! - **Create if absent**: Services, which are left alone once they exist
//! - **Create or update**: ConfigMaps, replaced on `AlreadyExists`
//! - **Create or replace**: Deployments, recreated when an immutable field (the pod
//!   selector) changed
//!
//! Deletes come in two modes: idempotent (a missing object is success) and strict (a
//! missing object is an error).
//!
//! # Example
//!
//! ```rust,no_run
//! use rook_ceph_operator::reconcilers::resources::{create_if_absent, Applied};
//! use k8s_openapi::api::core::v1::Service;
//! use kube::Client;
//! use anyhow::Result;
//!
//! async fn example(client: &Client, svc: Service) -> Result<()> {
//!     if create_if_absent(client, "rook-ceph", &svc).await? == Applied::Created {
//!         println!("service created");
//!     }
//!     Ok(())
//! }
//! ```

use crate::errors::{is_already_exists, is_invalid, is_not_found};
use crate::metrics;
use crate::reconcilers::retry::{retry_api_call, RetryBudget};
use anyhow::{anyhow, Context, Result};
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

/// What a write did to the live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Created,
    Updated,
    Unchanged,
}

/// How a delete treats a missing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// A missing object is success
    Idempotent,
    /// A missing object is an error
    Strict,
}

/// Bounds shared by every namespaced object written by these helpers.
pub trait OwnedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> OwnedObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

fn object_name<T: OwnedObject>(resource: &T) -> Result<&str> {
    resource
        .meta()
        .name
        .as_deref()
        .ok_or_else(|| anyhow!("{} must have a name", T::kind(&())))
}

/// Creates or updates a resource with server-side apply.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API call fails.
pub async fn create_or_apply<T: OwnedObject>(
    client: &Client,
    namespace: &str,
    resource: &T,
    field_manager: &str,
) -> Result<Applied> {
    let name = object_name(resource)?;
    let kind = T::kind(&());
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    let existed = api.get_opt(name).await?.is_some();
    let params = PatchParams::apply(field_manager).force();
    let patch = Patch::Apply(resource);
    retry_api_call(|| api.patch(name, &params, &patch), "server-side apply")
    .await
    .with_context(|| format!("failed to apply {kind} {namespace}/{name}"))?;

    if existed {
        debug!(kind = %kind, namespace = %namespace, name = %name, "applied update");
        metrics::record_resource_updated(&kind);
        Ok(Applied::Updated)
    } else {
        info!(kind = %kind, namespace = %namespace, name = %name, "created");
        metrics::record_resource_created(&kind);
        Ok(Applied::Created)
    }
}

/// Creates a resource unless one with the same name exists. An existing object is left
/// untouched.
///
/// # Errors
///
/// Returns an error if the resource has no name or the create fails for any reason other
/// than `AlreadyExists`.
pub async fn create_if_absent<T: OwnedObject>(
    client: &Client,
    namespace: &str,
    resource: &T,
) -> Result<Applied> {
    let name = object_name(resource)?;
    let kind = T::kind(&());
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    match api.create(&PostParams::default(), resource).await {
        Ok(_) => {
            info!(kind = %kind, namespace = %namespace, name = %name, "created");
            metrics::record_resource_created(&kind);
            Ok(Applied::Created)
        }
        Err(e) if is_already_exists(&e) => {
            debug!(kind = %kind, namespace = %namespace, name = %name, "already exists");
            Ok(Applied::Unchanged)
        }
        Err(e) => Err(e).with_context(|| format!("failed to create {kind} {namespace}/{name}")),
    }
}

/// Creates a resource, replacing the live object on `AlreadyExists`.
///
/// The replacement carries the live `resourceVersion`, so a concurrent writer surfaces as
/// a conflict instead of being overwritten.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API call fails.
pub async fn create_or_update<T: OwnedObject>(
    client: &Client,
    namespace: &str,
    resource: &T,
) -> Result<Applied> {
    let name = object_name(resource)?;
    let kind = T::kind(&());
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    match api.create(&PostParams::default(), resource).await {
        Ok(_) => {
            info!(kind = %kind, namespace = %namespace, name = %name, "created");
            metrics::record_resource_created(&kind);
            Ok(Applied::Created)
        }
        Err(e) if is_already_exists(&e) => {
            replace_live(&api, name, resource).await?;
            debug!(kind = %kind, namespace = %namespace, name = %name, "updated");
            metrics::record_resource_updated(&kind);
            Ok(Applied::Updated)
        }
        Err(e) => Err(e).with_context(|| format!("failed to create {kind} {namespace}/{name}")),
    }
}

/// Creates or replaces a resource. If the API server rejects the replacement as invalid
/// (an immutable field such as a Deployment selector changed), the object is deleted and
/// created again.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API call fails.
pub async fn create_or_replace<T: OwnedObject>(
    client: &Client,
    namespace: &str,
    resource: &T,
) -> Result<Applied> {
    let name = object_name(resource)?;
    let kind = T::kind(&());
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    if api.get_opt(name).await?.is_none() {
        api.create(&PostParams::default(), resource)
            .await
            .with_context(|| format!("failed to create {kind} {namespace}/{name}"))?;
        info!(kind = %kind, namespace = %namespace, name = %name, "created");
        metrics::record_resource_created(&kind);
        return Ok(Applied::Created);
    }

    match replace_live(&api, name, resource).await {
        Ok(()) => {
            debug!(kind = %kind, namespace = %namespace, name = %name, "replaced");
            metrics::record_resource_updated(&kind);
            Ok(Applied::Updated)
        }
        Err(e) if e.downcast_ref::<kube::Error>().is_some_and(is_invalid) => {
            info!(
                kind = %kind,
                namespace = %namespace,
                name = %name,
                "immutable field changed, recreating"
            );
            api.delete(name, &DeleteParams::foreground())
                .await
                .with_context(|| format!("failed to delete {kind} {namespace}/{name}"))?;
            let live = &api;
            RetryBudget::default()
                .poll(&format!("deletion of {kind} {namespace}/{name}"), || async move {
                    Ok::<_, anyhow::Error>(live.get_opt(name).await?.is_none())
                })
                .await?;
            api.create(&PostParams::default(), resource)
                .await
                .with_context(|| format!("failed to recreate {kind} {namespace}/{name}"))?;
            metrics::record_resource_updated(&kind);
            Ok(Applied::Updated)
        }
        Err(e) => Err(e),
    }
}

async fn replace_live<T: OwnedObject>(api: &Api<T>, name: &str, resource: &T) -> Result<()> {
    let live = api
        .get_opt(name)
        .await?
        .ok_or_else(|| anyhow!("{} {name} disappeared during update", T::kind(&())))?;
    let mut desired = resource.clone();
    desired.meta_mut().resource_version = live.resource_version();
    api.replace(name, &PostParams::default(), &desired)
        .await
        .map_err(anyhow::Error::from)?;
    Ok(())
}

/// Deletes a resource by name with foreground propagation.
///
/// Returns `true` if a delete was issued.
///
/// # Errors
///
/// Returns an error if the API call fails, or if the object is missing in
/// [`DeleteMode::Strict`].
pub async fn delete_resource<T: OwnedObject>(
    client: &Client,
    namespace: &str,
    name: &str,
    mode: DeleteMode,
) -> Result<bool> {
    let kind = T::kind(&());
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    match api.delete(name, &DeleteParams::foreground()).await {
        Ok(_) => {
            info!(kind = %kind, namespace = %namespace, name = %name, "deleted");
            metrics::record_resource_deleted(&kind);
            Ok(true)
        }
        Err(e) if is_not_found(&e) && mode == DeleteMode::Idempotent => {
            debug!(kind = %kind, namespace = %namespace, name = %name, "already deleted");
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("failed to delete {kind} {namespace}/{name}")),
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
