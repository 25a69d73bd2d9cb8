// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-cluster configuration owned by the operator.
//!
//! For every ready `CephCluster` this reconciler keeps:
//!
//! - the connection files used by the CLI executor (`<ns>.config`, `client.admin.keyring`
//!   under `<config_dir>/<ns>/`)
//! - the `rook-ceph-config` Secret read by daemon pods
//! - the `rook-ceph-admin-keyring` Secret mounted by NVMe-oF gateways
//! - the default options in the mon config store, plus the Multus network CIDRs
//!
//! The `CephCluster` itself belongs to the cluster controller, so this loop writes neither
//! its status nor a finalizer. Deleting the cluster only removes the local connection
//! files; everything else is garbage collected through owner references.

use crate::config::cluster_secret::{
    load_mon_endpoints, mon_host, mon_initial_members, upsert_cluster_config_secret,
    MonEndpoint,
};
use crate::config::defaults::bootstrap_options;
use crate::config::mon_store::MonStore;
use crate::config::network::{apply_network_cidrs, resolve_network_cidrs};
use crate::constants::{
    ADMIN_KEYRING_SECRET, KIND_CEPH_CLUSTER, OPERATOR_NOT_INITIALIZED_REQUEUE_SECS,
    READY_REQUEUE_SECS,
};
use crate::context::{Context, EventSeverity};
use crate::controller::{panic_message, publish_event, requeue_action, watched_api};
use crate::crd::CephCluster;
use crate::errors::{ReconcileError, Requeue};
use crate::exec::CliExecutor;
use crate::keyring::admin_keyring;
use crate::metrics;
use crate::reconcilers::cluster::{check_ready, load_cluster_info, running_version, ClusterInfo};
use crate::reconcilers::owner_reference;
use crate::reconcilers::resources::Applied;
use crate::status_reasons::{ACTION_RECONCILE, REASON_RECONCILE_FAILED};
use anyhow::{Context as _, Result};
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::ResourceExt;
use std::os::unix::fs::PermissionsExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const CONFIG_FILE_MODE: u32 = 0o644;
const KEYRING_FILE_MODE: u32 = 0o600;

/// Renders the `[global]` section the CLI tools connect with.
#[must_use]
pub fn render_config(fsid: &str, mons: &[MonEndpoint]) -> String {
    format!(
        "[global]\nfsid = {fsid}\nmon_host = {}\nmon_initial_members = {}\n",
        mon_host(mons),
        mon_initial_members(mons)
    )
}

async fn write_if_changed(path: &Path, content: &str, mode: u32) -> Result<bool> {
    if let Ok(current) = tokio::fs::read_to_string(path).await {
        if current == content {
            return Ok(false);
        }
    }
    tokio::fs::write(path, content.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .with_context(|| format!("failed to set mode of {}", path.display()))?;
    Ok(true)
}

/// Writes the config file and admin keyring of `namespace`. Returns whether either file
/// changed.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub async fn write_connection_files(
    paths: &CliExecutor,
    namespace: &str,
    info: &ClusterInfo,
    mons: &[MonEndpoint],
) -> Result<bool> {
    let dir = paths.cluster_dir(namespace);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let config = render_config(&info.fsid, mons);
    let keyring = admin_keyring(&info.admin_secret);
    let config_changed =
        write_if_changed(&paths.config_path(namespace), &config, CONFIG_FILE_MODE).await?;
    let keyring_changed =
        write_if_changed(&paths.keyring_path(namespace), &keyring, KEYRING_FILE_MODE).await?;
    Ok(config_changed || keyring_changed)
}

/// Removes the connection files of `namespace`. A missing directory is success.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub async fn remove_connection_files(paths: &CliExecutor, namespace: &str) -> Result<()> {
    let dir = paths.cluster_dir(namespace);
    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", dir.display())),
    }
}

fn connection_paths(ctx: &Context) -> CliExecutor {
    CliExecutor::new(
        ctx.settings.config_dir.clone(),
        ctx.settings.ceph_command_timeout,
    )
}

async fn sync_cluster_config(cluster: &CephCluster, ctx: &Context) -> Result<Action, ReconcileError> {
    let namespace = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    if cluster.metadata.deletion_timestamp.is_some() {
        info!(namespace = %namespace, name = %name, "CephCluster deleted, removing connection files");
        remove_connection_files(&connection_paths(ctx), &namespace).await?;
        return Ok(Action::await_change());
    }

    check_ready(&namespace, Some(cluster))?;
    let info = load_cluster_info(&ctx.client, &namespace).await?;
    let mons = load_mon_endpoints(&ctx.client, &namespace)
        .await
        .map_err(|e| {
            ReconcileError::precondition(
                format!("mon endpoints unavailable: {e:#}"),
                OPERATOR_NOT_INITIALIZED_REQUEUE_SECS,
            )
        })?;

    if write_connection_files(&connection_paths(ctx), &namespace, &info, &mons).await? {
        info!(namespace = %namespace, mons = mons.len(), "connection files updated");
    }

    let owner = owner_reference(cluster);
    if upsert_cluster_config_secret(&ctx.client, &namespace, &mons, owner.clone()).await?
        != Applied::Unchanged
    {
        debug!(namespace = %namespace, "cluster config secret changed");
    }
    ctx.keyrings
        .put(
            &namespace,
            ADMIN_KEYRING_SECRET,
            &admin_keyring(&info.admin_secret),
            owner,
        )
        .await?;

    if cluster.spec.external.enable {
        debug!(namespace = %namespace, "external cluster, leaving mon config store alone");
        return Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)));
    }

    let running = running_version(ctx.executor.as_ref(), &namespace).await?;
    let store = MonStore::new(ctx.executor.clone(), &namespace);
    let options = bootstrap_options(&running, &cluster.spec.ceph_config);
    store
        .set_all(&options)
        .await
        .map_err(anyhow::Error::from)?;

    if let Some(cidrs) = resolve_network_cidrs(&ctx.client, &namespace, &cluster.spec.network).await? {
        apply_network_cidrs(&store, &cidrs).await?;
    }

    info!(
        namespace = %namespace,
        name = %name,
        version = %running,
        options = options.len(),
        "cluster configuration reconciled"
    );
    Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)))
}

fn failure_key(cluster: &CephCluster) -> String {
    format!(
        "{KIND_CEPH_CLUSTER}/{}/{}",
        cluster.namespace().unwrap_or_default(),
        cluster.name_any()
    )
}

async fn reconcile(cluster: Arc<CephCluster>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let key = failure_key(&cluster);

    let result = AssertUnwindSafe(sync_cluster_config(&cluster, &ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(ReconcileError::Panic(panic_message(payload.as_ref()))));

    match result {
        Ok(action) => {
            ctx.failures.reset(&key);
            metrics::record_reconciliation_success(KIND_CEPH_CLUSTER, start.elapsed());
            Ok(action)
        }
        Err(err) => {
            let failures = if err.requeue() == Requeue::Backoff {
                ctx.failures.record(&key)
            } else {
                ctx.failures.count(&key)
            };
            if matches!(err, ReconcileError::PreconditionNotMet { .. }) {
                info!(namespace = ?cluster.namespace(), name = %cluster.name_any(), "{err}");
            } else {
                warn!(
                    namespace = ?cluster.namespace(),
                    name = %cluster.name_any(),
                    failures,
                    error = %err,
                    "cluster config reconcile failed"
                );
            }
            if err.publishes_event() {
                publish_event(
                    &ctx,
                    cluster.as_ref(),
                    EventSeverity::Warning,
                    REASON_RECONCILE_FAILED,
                    ACTION_RECONCILE,
                    &err.to_string(),
                )
                .await;
            }
            metrics::record_reconciliation_error(KIND_CEPH_CLUSTER, err.reason(), start.elapsed());
            Err(err)
        }
    }
}

#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(cluster: Arc<CephCluster>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_CEPH_CLUSTER, err.reason());
    requeue_action(err.requeue(), ctx.failures.count(&failure_key(&cluster)))
}

/// Runs the cluster config controller. Changes to the owned config Secret and to the mon
/// endpoints ConfigMap re-trigger the owning cluster.
pub async fn run_controller(ctx: Arc<Context>) {
    info!(kind = %KIND_CEPH_CLUSTER, "starting cluster config controller");
    Controller::new(watched_api::<CephCluster>(&ctx), WatcherConfig::default())
        .owns(watched_api::<Secret>(&ctx), WatcherConfig::default())
        .owns(watched_api::<ConfigMap>(&ctx), WatcherConfig::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(kind = %KIND_CEPH_CLUSTER, error = %e, "reconcile loop error");
            }
            futures::future::ready(())
        })
        .await;
    info!(kind = %KIND_CEPH_CLUSTER, "cluster config controller stopped");
}

#[cfg(test)]
#[path = "cluster_config_tests.rs"]
mod cluster_config_tests;
