// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CephNVMeOFGateway` reconciliation.
//!
//! A gateway with `instances = N` owns `N` Deployment, Service and ConfigMap triples with
//! daemon ids `a`, `b`, ... Scaling down deletes the triples whose index is `>= N` before
//! the remaining ones are converged.
//!
//! Gateways authenticate with the admin keyring, so a cephx rotation decision only
//! advances `.status.cephx.daemon`.
//!
//! # Example
//!
//! ```rust,no_run
//! use rook_ceph_operator::context::{Context, OperatorSettings};
//! use rook_ceph_operator::reconcilers::nvmeof;
//! use std::sync::Arc;
//!
//! async fn start(client: kube::Client) {
//!     let ctx = Arc::new(Context::new(client, OperatorSettings::default()));
//!     nvmeof::run_controller(ctx).await;
//! }
//! ```

pub mod config;
pub mod resources;

use crate::cephx::{should_rotate, uninitialized_status, updated_status};
use crate::constants::{
    FINALIZER_NVMEOF_GATEWAY, KIND_NVMEOF_GATEWAY, NVMEOF_APP_NAME, READY_REQUEUE_SECS,
};
use crate::context::{Context, EventSeverity};
use crate::controller::{controller_for, publish_event, run, watched_api, Reconciled};
use crate::crd::{CephNVMeOFGateway, CephNVMeOFGatewaySpec};
use crate::errors::ReconcileError;
use crate::labels::instance_selector;
use crate::metrics;
use crate::naming::{index_to_name, stale_indices};
use crate::reconcilers::cluster::{check_ready, find_cluster, load_cluster_info, ready_cluster};
use crate::reconcilers::resources::{
    create_if_absent, create_or_replace, create_or_update, delete_resource, Applied, DeleteMode,
};
use crate::reconcilers::status::update_status;
use crate::status_reasons::{
    ACTION_DELETE, ACTION_RECONCILE, PHASE_EMPTY, PHASE_READY, REASON_CLUSTER_DELETED,
    REASON_CREATED, REASON_KEY_ROTATED,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::ListParams;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, ResourceExt};
use resources::{
    build_configmap, build_deployment, build_service, config_map_name, configmap_hash,
    instance_name, GatewayInstance,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Checks the fields every gateway needs.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] naming the first invalid field.
pub fn validate(spec: &CephNVMeOFGatewaySpec) -> Result<(), ReconcileError> {
    if spec.instances < 1 {
        return Err(ReconcileError::validation(
            "at least one gateway instance is required",
        ));
    }
    if spec.group.is_empty() {
        return Err(ReconcileError::validation("gateway group name is required"));
    }
    if spec.pool.is_empty() {
        return Err(ReconcileError::validation("pool name is required"));
    }
    Ok(())
}

async fn prune_instances(
    ctx: &Context,
    namespace: &str,
    gateway_name: &str,
    instances: usize,
) -> Result<(), ReconcileError> {
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), namespace);
    let selector = instance_selector(NVMEOF_APP_NAME, gateway_name);
    let observed: Vec<String> = api
        .list(&ListParams::default().labels(&selector))
        .await?
        .items
        .iter()
        .map(ResourceExt::name_any)
        .collect();

    for index in stale_indices(&observed, instances) {
        let daemon_id = index_to_name(index);
        let name = instance_name(gateway_name, &daemon_id);
        info!(namespace = %namespace, gateway = %gateway_name, instance = %name, "removing gateway instance");
        delete_resource::<Deployment>(&ctx.client, namespace, &name, DeleteMode::Idempotent)
            .await?;
        delete_resource::<Service>(&ctx.client, namespace, &name, DeleteMode::Idempotent).await?;
        delete_resource::<ConfigMap>(
            &ctx.client,
            namespace,
            &config_map_name(gateway_name, &daemon_id),
            DeleteMode::Idempotent,
        )
        .await?;
    }
    Ok(())
}

/// Converges one instance and reports whether its Deployment was created.
async fn apply_instance(
    ctx: &Context,
    namespace: &str,
    instance: &GatewayInstance<'_>,
) -> Result<bool, ReconcileError> {
    let hash = match &instance.gateway.spec.config_map_ref {
        Some(name) => {
            let api: Api<ConfigMap> = Api::namespaced(ctx.client.clone(), namespace);
            if api.get_opt(name).await?.is_none() {
                return Err(ReconcileError::missing_config_map(namespace, name));
            }
            configmap_hash(None)
        }
        None => {
            let config_map = build_configmap(instance);
            create_or_update(&ctx.client, namespace, &config_map).await?;
            configmap_hash(Some(&config_map))
        }
    };

    let deployment = build_deployment(instance, &hash)?;
    let created = create_or_replace(&ctx.client, namespace, &deployment).await? == Applied::Created;
    create_if_absent(&ctx.client, namespace, &build_service(instance)).await?;
    Ok(created)
}

async fn reconcile_gateway(
    gateway: &CephNVMeOFGateway,
    ctx: &Context,
) -> Result<Action, ReconcileError> {
    let namespace = gateway.namespace().unwrap_or_default();
    let name = gateway.name_any();

    let mut status = gateway.status.clone().unwrap_or_default();
    if gateway.status.is_none() {
        debug!(namespace = %namespace, name = %name, "first observation, stamping cephx status");
        status.phase = PHASE_EMPTY.to_string();
        status.cephx.daemon = uninitialized_status();
        update_status::<CephNVMeOFGateway, _>(&ctx.client, &namespace, &name, |s| {
            s.phase = PHASE_EMPTY.to_string();
            s.cephx.daemon = uninitialized_status();
        })
        .await?;
    }

    let ready = ready_cluster(ctx, &namespace).await?;
    validate(&gateway.spec)?;
    let cluster_info = load_cluster_info(&ctx.client, &namespace).await?;

    let cephx_config = &ready.cluster.spec.security.cephx.daemon;
    let rotate = should_rotate(
        cephx_config,
        &ready.running,
        ready.desired.as_ref(),
        &status.cephx.daemon,
    )?;

    #[allow(clippy::cast_sign_loss)] // validated >= 1
    let instances = gateway.spec.instances as usize;
    prune_instances(ctx, &namespace, &name, instances).await?;

    let mut created = Vec::new();
    for index in 0..instances {
        let daemon_id = index_to_name(index);
        let instance = GatewayInstance {
            gateway,
            cluster: &ready.cluster,
            fsid: &cluster_info.fsid,
            daemon_id: &daemon_id,
            default_image: &ctx.settings.nvmeof_default_image,
        };
        if apply_instance(ctx, &namespace, &instance).await? {
            created.push(instance_name(&name, &daemon_id));
        }
    }

    let cephx = updated_status(rotate, cephx_config, &ready.running, &status.cephx.daemon);
    let generation = gateway.metadata.generation;
    update_status::<CephNVMeOFGateway, _>(&ctx.client, &namespace, &name, |s| {
        s.phase = PHASE_READY.to_string();
        s.observed_generation = generation;
        s.cephx.daemon = cephx.clone();
    })
    .await?;

    if rotate {
        metrics::record_key_rotation(KIND_NVMEOF_GATEWAY);
        publish_event(
            ctx,
            gateway,
            EventSeverity::Normal,
            REASON_KEY_ROTATED,
            ACTION_RECONCILE,
            &format!("cephx key generation advanced to {}", cephx.key_generation),
        )
        .await;
    }
    if !created.is_empty() {
        publish_event(
            ctx,
            gateway,
            EventSeverity::Normal,
            REASON_CREATED,
            ACTION_RECONCILE,
            &format!("created gateway instances {}", created.join(", ")),
        )
        .await;
    }

    info!(namespace = %namespace, name = %name, instances, "gateway reconciled");
    Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)))
}

async fn cleanup_gateway(gateway: &CephNVMeOFGateway, ctx: &Context) -> Result<(), ReconcileError> {
    let namespace = gateway.namespace().unwrap_or_default();
    let cluster = find_cluster(&ctx.client, &namespace).await?;
    if cluster.is_none() {
        warn!(namespace = %namespace, name = %gateway.name_any(), "CephCluster gone, removing finalizer");
        publish_event(
            ctx,
            gateway,
            EventSeverity::Normal,
            REASON_CLUSTER_DELETED,
            ACTION_DELETE,
            "CephCluster deleted, removing finalizer without teardown",
        )
        .await;
        return Ok(());
    }
    // owned objects are garbage collected through their owner references
    check_ready(&namespace, cluster.as_ref())?;
    Ok(())
}

impl Reconciled for CephNVMeOFGateway {
    const KIND: &'static str = KIND_NVMEOF_GATEWAY;
    const FINALIZER: &'static str = FINALIZER_NVMEOF_GATEWAY;

    async fn apply(resource: Arc<Self>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
        reconcile_gateway(&resource, &ctx).await
    }

    async fn cleanup(resource: Arc<Self>, ctx: Arc<Context>) -> Result<(), ReconcileError> {
        cleanup_gateway(&resource, &ctx).await
    }
}

/// Runs the gateway controller, watching owned Deployments, Services and ConfigMaps.
pub async fn run_controller(ctx: Arc<Context>) {
    let controller = controller_for::<CephNVMeOFGateway>(&ctx)
        .owns(watched_api::<Deployment>(&ctx), WatcherConfig::default())
        .owns(watched_api::<Service>(&ctx), WatcherConfig::default())
        .owns(watched_api::<ConfigMap>(&ctx), WatcherConfig::default());
    run(controller, ctx).await;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
