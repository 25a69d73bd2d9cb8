// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CephObjectStoreUser` reconciliation.
//!
//! Each resource is one RGW user whose uid is the resource name. Its keys are in one of two
//! modes, chosen by whether `spec.keys` is set:
//!
//! - **Managed**: the user keeps exactly one key, published in the canonical Secret
//!   `rook-ceph-object-user-<namespace>-<name>` owned by the resource
//! - **Explicit**: the user's key set equals the pairs read from the referenced Secrets;
//!   their identities are recorded in `.status.keys`
//!
//! Switching to explicit keys drops the owner reference from the canonical Secret. Switching
//! back trims the user to one key, generating one only if none remain.
//!
//! Referenced Secrets are tracked in a reverse index so that a change to one of them
//! re-enqueues every user that reads it.

use crate::constants::{
    FIELD_MANAGER, FINALIZER_OBJECT_STORE_USER, KIND_OBJECT_STORE_USER,
    OBJECT_USER_SECRET_PREFIX, READY_REQUEUE_SECS, RGW_APP_NAME, ROOK_SECRET_TYPE,
    SECRET_ACCESS_KEY, SECRET_ENDPOINT_KEY, SECRET_SECRET_KEY,
};
use crate::context::Context;
use crate::controller::{controller_for, run, watched_api, Reconciled};
use crate::crd::{
    CephObjectStore, CephObjectStoreUser, ObjectStoreUserSpec, ObjectUserKey, SecretIdentity,
};
use crate::errors::ReconcileError;
use crate::exec::CommandError;
use crate::labels::{APP, ROOK_CLUSTER, ROOK_OBJECT_STORE, USER};
use crate::reconcilers::cluster::{find_cluster, find_object_store, ready_cluster};
use crate::reconcilers::resources::{create_or_apply, delete_resource, DeleteMode};
use crate::reconcilers::secret_refs::{resolve_secret_key, unique_identities};
use crate::reconcilers::status::update_status;
use crate::reconcilers::{is_owned_by, owner_reference};
use crate::rgw::keys::{dedupe_keys, sync_explicit, sync_managed};
use crate::rgw::user::{
    caps_diff, desired_caps, needs_modify, needs_quota, normalize_op_mask, quota_params,
    user_params,
};
use crate::rgw::{QuotaParams, RgwAdmin, S3Key, StoreRef, UserCap, UserParams};
use crate::status_reasons::PHASE_READY;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Status `info` key naming the canonical Secret
pub const SECRET_NAME_INFO_KEY: &str = "secretName";

/// Key mode of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMode {
    /// One operator-generated key published in the canonical Secret
    Managed,
    /// Exactly these keys
    Explicit(Vec<S3Key>),
}

/// Name of the canonical Secret of a managed user.
#[must_use]
pub fn canonical_secret_name(namespace: &str, name: &str) -> String {
    format!("{OBJECT_USER_SECRET_PREFIX}-{namespace}-{name}")
}

/// Namespace of the object store the user lives in.
#[must_use]
pub fn store_namespace(spec: &ObjectStoreUserSpec, user_namespace: &str) -> String {
    spec.cluster_namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| user_namespace.to_string())
}

/// Returns `true` if users in `user_namespace` may be created in `store`.
#[must_use]
pub fn namespace_allowed(store: &CephObjectStore, user_namespace: &str) -> bool {
    store.namespace().as_deref() == Some(user_namespace)
        || store
            .spec
            .allow_users_in_namespaces
            .iter()
            .any(|ns| ns == "*" || ns == user_namespace)
}

/// Validates fields that need no lookups.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] for an empty store name or an op mask naming an
/// unknown operation.
pub fn validate(spec: &ObjectStoreUserSpec) -> Result<(), ReconcileError> {
    if spec.store.is_empty() {
        return Err(ReconcileError::validation("object store name is required"));
    }
    if let Some(mask) = &spec.op_mask {
        normalize_op_mask(mask)?;
    }
    Ok(())
}

/// Every `(namespace, secret)` a user reads: its key references plus the Secrets
/// recorded in status.
#[must_use]
pub fn referenced_secrets(user: &CephObjectStoreUser) -> Vec<(String, String)> {
    let namespace = user.namespace().unwrap_or_default();
    let mut refs: Vec<(String, String)> = user
        .spec
        .keys
        .iter()
        .flatten()
        .flat_map(|k| [&k.access_key_ref.name, &k.secret_key_ref.name])
        .map(|name| (namespace.clone(), name.clone()))
        .collect();
    if let Some(status) = &user.status {
        refs.extend(
            status
                .keys
                .iter()
                .map(|k| (k.namespace.clone(), k.name.clone())),
        );
    }
    refs
}

/// Owner references of `secret` without those pointing at `owner_uid`.
#[must_use]
pub fn without_owner(secret: &Secret, owner_uid: &str) -> Vec<OwnerReference> {
    secret
        .metadata
        .owner_references
        .iter()
        .flatten()
        .filter(|o| o.uid != owner_uid)
        .cloned()
        .collect()
}

/// Canonical Secret carrying a managed user's key.
#[must_use]
pub fn build_user_secret(
    user: &CephObjectStoreUser,
    store_namespace: &str,
    key: &S3Key,
    endpoint: Option<&str>,
) -> Secret {
    let namespace = user.namespace().unwrap_or_default();
    let labels = BTreeMap::from([
        (APP.to_string(), RGW_APP_NAME.to_string()),
        (USER.to_string(), user.name_any()),
        (ROOK_CLUSTER.to_string(), store_namespace.to_string()),
        (ROOK_OBJECT_STORE.to_string(), user.spec.store.clone()),
    ]);
    let mut data = BTreeMap::from([
        (
            SECRET_ACCESS_KEY.to_string(),
            ByteString(key.access_key.clone().into_bytes()),
        ),
        (
            SECRET_SECRET_KEY.to_string(),
            ByteString(key.secret_key.clone().into_bytes()),
        ),
    ]);
    if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
        data.insert(
            SECRET_ENDPOINT_KEY.to_string(),
            ByteString(endpoint.as_bytes().to_vec()),
        );
    }
    Secret {
        metadata: ObjectMeta {
            name: Some(canonical_secret_name(&namespace, &user.name_any())),
            namespace: Some(namespace),
            labels: Some(labels),
            owner_references: owner_reference(user).map(|o| vec![o]),
            ..Default::default()
        },
        type_: Some(ROOK_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// Desired RGW attributes of a user.
#[derive(Debug, Clone)]
pub struct DesiredUser {
    pub params: UserParams,
    pub caps: Vec<UserCap>,
    pub quota: Option<QuotaParams>,
    pub mode: KeyMode,
}

/// Converges the RGW user to `desired`. Returns the managed key in managed mode.
///
/// Order: create, attributes, caps, quota, then keys.
///
/// # Errors
///
/// Returns the first failing admin call.
pub async fn converge_user(
    admin: &dyn RgwAdmin,
    store: &StoreRef,
    desired: &DesiredUser,
) -> Result<Option<S3Key>, CommandError> {
    let uid = &desired.params.uid;
    let mut live = match admin.get_user(store, uid).await? {
        Some(user) => user,
        None => admin.create_user(store, &desired.params).await?,
    };

    if needs_modify(&live, &desired.params) {
        debug!(store = %store, uid = %uid, "updating rgw user attributes");
        live = admin.modify_user(store, &desired.params).await?;
    }

    let (remove, add) = caps_diff(&live.caps, &desired.caps);
    admin.remove_caps(store, uid, &remove).await?;
    admin.add_caps(store, uid, &add).await?;

    if let Some(quota) = &desired.quota {
        if needs_quota(&live, quota) {
            admin.set_quota(store, uid, quota).await?;
        }
    }

    match &desired.mode {
        KeyMode::Explicit(keys) => {
            sync_explicit(admin, store, &live, keys).await?;
            Ok(None)
        }
        KeyMode::Managed => sync_managed(admin, store, &live).await.map(Some),
    }
}

/// Resolves explicit key pairs and the identities of the Secrets they came from.
async fn resolve_keys(
    client: &Client,
    namespace: &str,
    keys: &[ObjectUserKey],
) -> Result<(Vec<S3Key>, Vec<SecretIdentity>), ReconcileError> {
    let mut resolved = Vec::with_capacity(keys.len());
    let mut identities = Vec::new();
    for key in keys {
        let access = resolve_secret_key(client, namespace, &key.access_key_ref).await?;
        let secret = resolve_secret_key(client, namespace, &key.secret_key_ref).await?;
        resolved.push(S3Key::new(&access.value, &secret.value));
        identities.push(access.identity);
        identities.push(secret.identity);
    }
    let resolved = dedupe_keys(resolved).map_err(ReconcileError::validation)?;
    Ok((resolved, unique_identities(identities)))
}

/// Drops this user's owner reference from the canonical Secret, if it has one.
async fn disown_canonical_secret(
    client: &Client,
    user: &CephObjectStoreUser,
) -> Result<(), ReconcileError> {
    let namespace = user.namespace().unwrap_or_default();
    let name = canonical_secret_name(&namespace, &user.name_any());
    let uid = user.uid().unwrap_or_default();
    let api: Api<Secret> = Api::namespaced(client.clone(), &namespace);
    let Some(secret) = api.get_opt(&name).await? else {
        return Ok(());
    };
    if !is_owned_by(&secret, &uid) {
        return Ok(());
    }
    let patch = json!({ "metadata": { "ownerReferences": without_owner(&secret, &uid) } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    info!(namespace = %namespace, secret = %name, "released canonical secret to explicit keys");
    Ok(())
}

async fn reconcile_user(
    user: &CephObjectStoreUser,
    ctx: &Context,
) -> Result<Action, ReconcileError> {
    let namespace = user.namespace().unwrap_or_default();
    let name = user.name_any();
    ctx.user_secrets
        .update(&namespace, &name, referenced_secrets(user));

    validate(&user.spec)?;
    let cluster_namespace = store_namespace(&user.spec, &namespace);
    let store = find_object_store(&ctx.client, &cluster_namespace, &user.spec.store).await?;
    if !namespace_allowed(&store, &namespace) {
        return Err(ReconcileError::validation(format!(
            "namespace {namespace:?} is not allowed to create users in object store {cluster_namespace}/{}",
            user.spec.store
        )));
    }
    ready_cluster(ctx, &cluster_namespace).await?;

    let (mode, identities) = match user.spec.keys.as_deref() {
        Some(keys) if !keys.is_empty() => {
            let (resolved, identities) = resolve_keys(&ctx.client, &namespace, keys).await?;
            (KeyMode::Explicit(resolved), identities)
        }
        _ => (KeyMode::Managed, Vec::new()),
    };

    let desired = DesiredUser {
        params: user_params(&name, &user.spec)?,
        caps: desired_caps(user.spec.capabilities.as_ref()),
        quota: quota_params(&user.spec),
        mode,
    };
    let store_ref = StoreRef::new(&cluster_namespace, &user.spec.store);
    let managed_key = converge_user(ctx.rgw.as_ref(), &store_ref, &desired).await?;

    let mut info = BTreeMap::new();
    match &managed_key {
        Some(key) => {
            let endpoint = store
                .status
                .as_ref()
                .and_then(|s| s.info.get("endpoint"))
                .map(String::as_str);
            let secret = build_user_secret(user, &cluster_namespace, key, endpoint);
            create_or_apply(&ctx.client, &namespace, &secret, FIELD_MANAGER).await?;
            info.insert(
                SECRET_NAME_INFO_KEY.to_string(),
                canonical_secret_name(&namespace, &name),
            );
        }
        None => disown_canonical_secret(&ctx.client, user).await?,
    }

    ctx.user_secrets.update(
        &namespace,
        &name,
        referenced_secrets(user)
            .into_iter()
            .chain(identities.iter().map(|i| (i.namespace.clone(), i.name.clone()))),
    );

    let generation = user.metadata.generation;
    update_status::<CephObjectStoreUser, _>(&ctx.client, &namespace, &name, |s| {
        s.phase = PHASE_READY.to_string();
        s.observed_generation = generation;
        s.info = info.clone();
        s.keys = identities.clone();
    })
    .await?;

    info!(namespace = %namespace, name = %name, store = %store_ref, "object store user reconciled");
    Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)))
}

async fn cleanup_user(user: &CephObjectStoreUser, ctx: &Context) -> Result<(), ReconcileError> {
    let namespace = user.namespace().unwrap_or_default();
    let name = user.name_any();
    ctx.user_secrets.remove(&namespace, &name);

    let cluster_namespace = store_namespace(&user.spec, &namespace);
    if user.spec.store.is_empty() || find_cluster(&ctx.client, &cluster_namespace).await?.is_none()
    {
        warn!(namespace = %namespace, name = %name, "no object store cluster, skipping rgw user removal");
    } else {
        let store_ref = StoreRef::new(&cluster_namespace, &user.spec.store);
        ctx.rgw.delete_user(&store_ref, &name).await?;
        info!(store = %store_ref, uid = %name, "deleted rgw user");
    }

    let secret_name = canonical_secret_name(&namespace, &name);
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &namespace);
    if let Some(secret) = api.get_opt(&secret_name).await? {
        if is_owned_by(&secret, &user.uid().unwrap_or_default()) {
            delete_resource::<Secret>(&ctx.client, &namespace, &secret_name, DeleteMode::Idempotent)
                .await?;
        }
    }
    Ok(())
}

impl Reconciled for CephObjectStoreUser {
    const KIND: &'static str = KIND_OBJECT_STORE_USER;
    const FINALIZER: &'static str = FINALIZER_OBJECT_STORE_USER;

    async fn apply(resource: Arc<Self>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
        reconcile_user(&resource, &ctx).await
    }

    async fn cleanup(resource: Arc<Self>, ctx: Arc<Context>) -> Result<(), ReconcileError> {
        cleanup_user(&resource, &ctx).await
    }
}

/// Runs the user controller. Owned Secrets and referenced Secrets both enqueue users.
pub async fn run_controller(ctx: Arc<Context>) {
    let index = ctx.user_secrets.clone();
    let controller = controller_for::<CephObjectStoreUser>(&ctx)
        .owns(watched_api::<Secret>(&ctx), WatcherConfig::default())
        .watches(
            watched_api::<Secret>(&ctx),
            WatcherConfig::default(),
            move |secret: Secret| {
                index.object_refs::<CephObjectStoreUser>(
                    &secret.namespace().unwrap_or_default(),
                    &secret.name_any(),
                )
            },
        );
    run(controller, ctx).await;
}

#[cfg(test)]
#[path = "object_user_tests.rs"]
mod object_user_tests;
