// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gates against the `CephCluster` a resource belongs to.
//!
//! Before substantive work every reconciler checks that:
//!
//! - a `CephCluster` exists in the namespace and is `Ready` (`Connected` for external
//!   clusters)
//! - no upgrade is in progress: the least up-to-date mon runs the version the cluster
//!   image asks for
//!
//! A failed gate is a [`ReconcileError::PreconditionNotMet`] requeued after a fixed delay;
//! status is not touched.

use crate::constants::{
    CEPH_BINARY, CLUSTER_NOT_READY_REQUEUE_SECS, MON_SECRET, MON_SECRET_ADMIN_KEY,
    MON_SECRET_FSID_KEY, NOT_READY_REQUEUE_SECS, OPERATOR_NOT_INITIALIZED_REQUEUE_SECS,
    UPGRADE_IN_PROGRESS_REQUEUE_SECS,
};
use crate::context::Context;
use crate::crd::{CephCluster, CephClusterSpec, CephObjectStore};
use crate::errors::ReconcileError;
use crate::exec::{args, CephExecutor};
use crate::reconcilers::secret_refs::secret_value;
use crate::status_reasons::{PHASE_CONNECTED, PHASE_READY};
use crate::version::{least_mon_version, CephVersion};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{debug, warn};

/// A cluster that passed both gates.
#[derive(Debug, Clone)]
pub struct ReadyCluster {
    pub cluster: CephCluster,
    /// Least up-to-date mon version
    pub running: CephVersion,
    /// Version of the cluster image, if it can be parsed
    pub desired: Option<CephVersion>,
}

/// Identity of the cluster, read from the mon Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub fsid: String,
    pub admin_secret: String,
}

/// The `CephObjectStore` `namespace/name`.
///
/// # Errors
///
/// Returns [`ReconcileError::PreconditionNotMet`] if the store does not exist yet.
pub async fn find_object_store(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<CephObjectStore, ReconcileError> {
    let api: Api<CephObjectStore> = Api::namespaced(client.clone(), namespace);
    api.get_opt(name).await?.ok_or_else(|| {
        ReconcileError::precondition(
            format!("CephObjectStore {namespace}/{name} not found"),
            NOT_READY_REQUEUE_SECS,
        )
    })
}

/// First `CephCluster` in `namespace`, if any.
///
/// # Errors
///
/// Returns [`ReconcileError::Remote`] if the list fails.
pub async fn find_cluster(
    client: &Client,
    namespace: &str,
) -> Result<Option<CephCluster>, ReconcileError> {
    let api: Api<CephCluster> = Api::namespaced(client.clone(), namespace);
    let clusters = api.list(&ListParams::default()).await?;
    Ok(clusters.items.into_iter().next())
}

/// Readiness gate.
///
/// # Errors
///
/// Returns a precondition error if the cluster is absent or not ready.
pub fn check_ready<'a>(
    namespace: &str,
    cluster: Option<&'a CephCluster>,
) -> Result<&'a CephCluster, ReconcileError> {
    let Some(cluster) = cluster else {
        return Err(ReconcileError::precondition(
            format!("no CephCluster found in namespace {namespace:?}"),
            CLUSTER_NOT_READY_REQUEUE_SECS,
        ));
    };
    let phase = cluster
        .status
        .as_ref()
        .map(|s| s.phase.as_str())
        .unwrap_or_default();
    let ready = phase == PHASE_READY || (cluster.spec.external.enable && phase == PHASE_CONNECTED);
    if ready {
        Ok(cluster)
    } else {
        Err(ReconcileError::precondition(
            format!("CephCluster in namespace {namespace:?} is not ready (phase {phase:?})"),
            CLUSTER_NOT_READY_REQUEUE_SECS,
        ))
    }
}

/// Version the cluster is moving to: the image tag, else the version in status.
#[must_use]
pub fn desired_version(cluster: &CephCluster) -> Option<CephVersion> {
    CephVersion::parse_image(&cluster.spec.ceph_version.image)
        .ok()
        .or_else(|| {
            cluster
                .status
                .as_ref()
                .and_then(|s| s.version.as_ref())
                .and_then(|v| CephVersion::parse_status(&v.version).ok())
        })
}

/// Upgrade gate. External clusters are never gated.
///
/// Versions must match on major, minor and extra; the build number is ignored.
///
/// # Errors
///
/// Returns a precondition error while running and desired versions differ.
pub fn upgrade_gate(
    spec: &CephClusterSpec,
    running: &CephVersion,
    desired: Option<&CephVersion>,
) -> Result<(), ReconcileError> {
    if spec.external.enable {
        return Ok(());
    }
    let Some(desired) = desired else {
        return Ok(());
    };
    let same = (running.major, running.minor, running.extra)
        == (desired.major, desired.minor, desired.extra);
    if same {
        Ok(())
    } else {
        Err(ReconcileError::precondition(
            format!("ceph upgrade in progress: running {running}, desired {desired}"),
            UPGRADE_IN_PROGRESS_REQUEUE_SECS,
        ))
    }
}

/// Least up-to-date mon version, from `ceph versions`.
///
/// # Errors
///
/// Returns [`ReconcileError::Remote`] if the command fails or its output is unusable.
pub async fn running_version(
    executor: &dyn CephExecutor,
    namespace: &str,
) -> Result<CephVersion, ReconcileError> {
    let output = executor
        .run(namespace, CEPH_BINARY, &args(&["versions", "--format", "json"]))
        .await
        .map_err(anyhow::Error::from)?;
    let version = least_mon_version(&output)?;
    debug!(namespace = %namespace, version = %version, "running ceph version");
    Ok(version)
}

/// Runs both gates for `namespace`.
///
/// # Errors
///
/// See [`check_ready`], [`upgrade_gate`] and [`running_version`].
pub async fn ready_cluster(ctx: &Context, namespace: &str) -> Result<ReadyCluster, ReconcileError> {
    let found = find_cluster(&ctx.client, namespace).await?;
    let cluster = check_ready(namespace, found.as_ref())?.clone();
    let running = running_version(ctx.executor.as_ref(), namespace).await?;
    let desired = desired_version(&cluster);
    upgrade_gate(&cluster.spec, &running, desired.as_ref())?;
    Ok(ReadyCluster {
        cluster,
        running,
        desired,
    })
}

/// Parses the mon Secret.
///
/// # Errors
///
/// Returns a precondition error if the fsid or admin secret is missing; the mon
/// controller writes them once the cluster is initialized.
pub fn cluster_info(namespace: &str, secret: &Secret) -> Result<ClusterInfo, ReconcileError> {
    let value = |key: &str| secret_value(secret, key).filter(|v| !v.is_empty());
    match (value(MON_SECRET_FSID_KEY), value(MON_SECRET_ADMIN_KEY)) {
        (Some(fsid), Some(admin_secret)) => Ok(ClusterInfo { fsid, admin_secret }),
        _ => Err(ReconcileError::precondition(
            format!("cluster identity in secret {namespace}/{MON_SECRET} is incomplete"),
            OPERATOR_NOT_INITIALIZED_REQUEUE_SECS,
        )),
    }
}

/// Reads the cluster identity of `namespace`.
///
/// # Errors
///
/// Returns a precondition error if the mon Secret does not exist yet.
pub async fn load_cluster_info(
    client: &Client,
    namespace: &str,
) -> Result<ClusterInfo, ReconcileError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let Some(secret) = api.get_opt(MON_SECRET).await? else {
        warn!(namespace = %namespace, "mon secret not found, cluster not initialized");
        return Err(ReconcileError::precondition(
            format!("secret {namespace}/{MON_SECRET} not found"),
            OPERATOR_NOT_INITIALIZED_REQUEUE_SECS,
        ));
    };
    cluster_info(namespace, &secret)
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
