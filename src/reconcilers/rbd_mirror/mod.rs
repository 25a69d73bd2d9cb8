// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CephRBDMirror` reconciliation.
//!
//! Keeps `spec.count` single-replica mirror daemons `rook-ceph-rbd-mirror-<id>`, each with
//! its own cephx entity `client.rbd-mirror.<id>` and keyring Secret. Daemons beyond the
//! count are deleted together with their keys. Bootstrap peers listed in
//! `spec.peers.secretNames` are imported on every reconcile; the import is idempotent on
//! the cluster side.

pub mod peers;
pub mod resources;

use crate::cephx::{should_rotate, uninitialized_status, updated_status};
use crate::constants::{
    FINALIZER_RBD_MIRROR, KIND_RBD_MIRROR, RBD_MIRROR_APP_NAME, READY_REQUEUE_SECS,
};
use crate::context::{Context, EventSeverity};
use crate::controller::{controller_for, publish_event, run, watched_api, Reconciled};
use crate::crd::{CephRBDMirror, RBDMirroringSpec};
use crate::errors::ReconcileError;
use crate::exec::{CephExecutor, CommandError};
use crate::keyring::{
    delete_key, get_or_create_key, rbd_mirror_keyring, rbd_mirror_user, rotate_key,
    RBD_MIRROR_ACCESS,
};
use crate::labels::instance_selector;
use crate::metrics;
use crate::naming::{full_name_to_index, index_to_name, stale_indices};
use crate::reconcilers::cluster::{check_ready, find_cluster, load_cluster_info, ready_cluster};
use crate::reconcilers::owner_reference;
use crate::reconcilers::resources::{create_or_replace, delete_resource, DeleteMode};
use crate::reconcilers::status::update_status;
use crate::status_reasons::{
    ACTION_DELETE, ACTION_RECONCILE, PHASE_EMPTY, PHASE_READY, REASON_CLUSTER_DELETED,
    REASON_KEY_ROTATED,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use kube::api::ListParams;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, ResourceExt};
use peers::{import_peer, peer_from_secret};
use resources::{build_deployment, deployment_name, keyring_hash, keyring_secret_name, MirrorDaemon};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Checks the daemon count.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] when `count < 1`.
pub fn validate(spec: &RBDMirroringSpec) -> Result<(), ReconcileError> {
    if spec.count < 1 {
        return Err(ReconcileError::validation(
            "rbd-mirror count must be at least one",
        ));
    }
    Ok(())
}

/// Returns the key of daemon `daemon_id`, creating the entity if needed and rotating the
/// key when `rotate` is set.
///
/// # Errors
///
/// Returns the first failing `ceph auth` command.
pub async fn daemon_key(
    executor: &dyn CephExecutor,
    namespace: &str,
    daemon_id: &str,
    rotate: bool,
) -> Result<String, CommandError> {
    let user = rbd_mirror_user(daemon_id);
    let key = get_or_create_key(executor, namespace, &user, &RBD_MIRROR_ACCESS).await?;
    if rotate {
        return rotate_key(executor, namespace, &user).await;
    }
    Ok(key)
}

async fn observed_daemons(
    ctx: &Context,
    namespace: &str,
    mirror_name: &str,
) -> Result<Vec<String>, ReconcileError> {
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), namespace);
    let selector = instance_selector(RBD_MIRROR_APP_NAME, mirror_name);
    Ok(api
        .list(&ListParams::default().labels(&selector))
        .await?
        .items
        .iter()
        .map(ResourceExt::name_any)
        .collect())
}

async fn remove_daemon(ctx: &Context, namespace: &str, daemon_id: &str) -> Result<(), ReconcileError> {
    info!(namespace = %namespace, daemon = %daemon_id, "removing rbd mirror daemon");
    delete_resource::<Deployment>(
        &ctx.client,
        namespace,
        &deployment_name(daemon_id),
        DeleteMode::Idempotent,
    )
    .await?;
    ctx.keyrings
        .remove(namespace, &keyring_secret_name(daemon_id))
        .await?;
    delete_key(ctx.executor.as_ref(), namespace, &rbd_mirror_user(daemon_id)).await?;
    Ok(())
}

async fn import_peers(ctx: &Context, mirror: &CephRBDMirror, namespace: &str) -> Result<(), ReconcileError> {
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), namespace);
    let token_dir = ctx.settings.config_dir.join(namespace);
    for secret_name in &mirror.spec.peers.secret_names {
        let secret = api
            .get_opt(secret_name)
            .await?
            .ok_or_else(|| ReconcileError::missing_secret(namespace, secret_name))?;
        let peer = peer_from_secret(&secret)?;
        import_peer(ctx.executor.as_ref(), namespace, &token_dir, &peer).await?;
    }
    Ok(())
}

async fn reconcile_mirror(mirror: &CephRBDMirror, ctx: &Context) -> Result<Action, ReconcileError> {
    let namespace = mirror.namespace().unwrap_or_default();
    let name = mirror.name_any();

    let mut status = mirror.status.clone().unwrap_or_default();
    if mirror.status.is_none() {
        debug!(namespace = %namespace, name = %name, "first observation, stamping cephx status");
        status.cephx.daemon = uninitialized_status();
        update_status::<CephRBDMirror, _>(&ctx.client, &namespace, &name, |s| {
            s.phase = PHASE_EMPTY.to_string();
            s.cephx.daemon = uninitialized_status();
        })
        .await?;
    }

    let ready = ready_cluster(ctx, &namespace).await?;
    validate(&mirror.spec)?;
    let cluster_info = load_cluster_info(&ctx.client, &namespace).await?;

    let cephx_config = &ready.cluster.spec.security.cephx.daemon;
    let rotate = should_rotate(
        cephx_config,
        &ready.running,
        ready.desired.as_ref(),
        &status.cephx.daemon,
    )?;

    #[allow(clippy::cast_sign_loss)] // validated >= 1
    let count = mirror.spec.count as usize;
    for index in 0..count {
        let daemon_id = index_to_name(index);
        let key = daemon_key(ctx.executor.as_ref(), &namespace, &daemon_id, rotate).await?;
        let keyring = rbd_mirror_keyring(&daemon_id, &key);
        ctx.keyrings
            .put(
                &namespace,
                &keyring_secret_name(&daemon_id),
                &keyring,
                owner_reference(mirror),
            )
            .await?;

        let daemon = MirrorDaemon {
            mirror,
            cluster: &ready.cluster,
            fsid: &cluster_info.fsid,
            daemon_id: &daemon_id,
        };
        let deployment = build_deployment(&daemon, &keyring_hash(&keyring))?;
        create_or_replace(&ctx.client, &namespace, &deployment).await?;
    }

    let observed = observed_daemons(ctx, &namespace, &name).await?;
    for index in stale_indices(&observed, count) {
        remove_daemon(ctx, &namespace, &index_to_name(index)).await?;
    }

    import_peers(ctx, mirror, &namespace).await?;

    let cephx = updated_status(rotate, cephx_config, &ready.running, &status.cephx.daemon);
    let generation = mirror.metadata.generation;
    update_status::<CephRBDMirror, _>(&ctx.client, &namespace, &name, |s| {
        s.phase = PHASE_READY.to_string();
        s.observed_generation = generation;
        s.cephx.daemon = cephx.clone();
    })
    .await?;

    if rotate {
        metrics::record_key_rotation(KIND_RBD_MIRROR);
        publish_event(
            ctx,
            mirror,
            EventSeverity::Normal,
            REASON_KEY_ROTATED,
            ACTION_RECONCILE,
            &format!("cephx key generation advanced to {}", cephx.key_generation),
        )
        .await;
    }

    info!(namespace = %namespace, name = %name, count, "rbd mirror reconciled");
    Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)))
}

async fn cleanup_mirror(mirror: &CephRBDMirror, ctx: &Context) -> Result<(), ReconcileError> {
    let namespace = mirror.namespace().unwrap_or_default();
    let cluster = find_cluster(&ctx.client, &namespace).await?;
    if cluster.is_none() {
        warn!(namespace = %namespace, name = %mirror.name_any(), "CephCluster gone, removing finalizer");
        publish_event(
            ctx,
            mirror,
            EventSeverity::Normal,
            REASON_CLUSTER_DELETED,
            ACTION_DELETE,
            "CephCluster deleted, removing finalizer without teardown",
        )
        .await;
        return Ok(());
    }
    check_ready(&namespace, cluster.as_ref())?;

    // Deployments and keyring Secrets go with their owner; the cephx entities do not
    for name in observed_daemons(ctx, &namespace, &mirror.name_any()).await? {
        let Ok(index) = full_name_to_index(&name) else {
            continue;
        };
        delete_key(
            ctx.executor.as_ref(),
            &namespace,
            &rbd_mirror_user(&index_to_name(index)),
        )
        .await?;
    }
    Ok(())
}

impl Reconciled for CephRBDMirror {
    const KIND: &'static str = KIND_RBD_MIRROR;
    const FINALIZER: &'static str = FINALIZER_RBD_MIRROR;

    async fn apply(resource: Arc<Self>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
        reconcile_mirror(&resource, &ctx).await
    }

    async fn cleanup(resource: Arc<Self>, ctx: Arc<Context>) -> Result<(), ReconcileError> {
        cleanup_mirror(&resource, &ctx).await
    }
}

/// Runs the mirror controller, watching owned Deployments and keyring Secrets.
pub async fn run_controller(ctx: Arc<Context>) {
    let controller = controller_for::<CephRBDMirror>(&ctx)
        .owns(watched_api::<Deployment>(&ctx), WatcherConfig::default())
        .owns(watched_api::<Secret>(&ctx), WatcherConfig::default());
    run(controller, ctx).await;
}
