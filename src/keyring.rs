// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cephx keys and the Secrets that carry them into daemon pods.
//!
//! Keys are created, rotated and removed through the `ceph auth` verbs. The rendered
//! keyring file is stored in a Secret owned by the daemon's custom resource.

use crate::constants::{CEPH_BINARY, KEYRING_SECRET_KEY, ROOK_SECRET_TYPE};
use crate::exec::{run_json, CephExecutor, CommandError};
use crate::reconcilers::resources::{create_or_apply, delete_resource, DeleteMode};
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct AuthKey {
    key: String,
}

/// `auth rotate` prints either one entity or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RotateOutput {
    One(AuthKey),
    Many(Vec<AuthKey>),
}

fn auth_args(verb: &str, user: &str) -> Vec<String> {
    vec![
        "auth".to_string(),
        verb.to_string(),
        user.to_string(),
    ]
}

/// Returns the key of `user`, creating the entity with `access` caps if needed.
///
/// `access` alternates entity type and capability, e.g. `["mon", "profile rbd-mirror"]`.
///
/// # Errors
///
/// Returns the command error if the storage cluster rejects the request.
pub async fn get_or_create_key(
    executor: &dyn CephExecutor,
    namespace: &str,
    user: &str,
    access: &[&str],
) -> Result<String, CommandError> {
    let mut args = auth_args("get-or-create-key", user);
    args.extend(access.iter().map(|a| (*a).to_string()));
    args.extend(["--format".to_string(), "json".to_string()]);

    let out: AuthKey = run_json(executor, namespace, CEPH_BINARY, &args).await?;
    debug!(user = %user, "fetched cephx key");
    Ok(out.key)
}

/// Rotates the key of `user` and returns the new key.
///
/// # Errors
///
/// Returns the command error, or [`CommandError::Failed`] if the output holds no key.
pub async fn rotate_key(
    executor: &dyn CephExecutor,
    namespace: &str,
    user: &str,
) -> Result<String, CommandError> {
    let mut args = auth_args("rotate", user);
    args.extend(["--format".to_string(), "json".to_string()]);

    let key = match run_json::<RotateOutput>(executor, namespace, CEPH_BINARY, &args).await? {
        RotateOutput::One(entry) => Some(entry.key),
        RotateOutput::Many(entries) => entries.into_iter().next().map(|e| e.key),
    };

    match key {
        Some(key) => {
            info!(user = %user, "rotated cephx key");
            Ok(key)
        }
        None => Err(CommandError::Failed {
            command: format!("ceph auth rotate {user}"),
            code: None,
            stderr: "no key in output".to_string(),
        }),
    }
}

/// Removes `user`. A missing entity is success.
///
/// # Errors
///
/// Returns the command error for any failure other than `ENOENT`.
pub async fn delete_key(
    executor: &dyn CephExecutor,
    namespace: &str,
    user: &str,
) -> Result<(), CommandError> {
    match executor
        .run(namespace, CEPH_BINARY, &auth_args("del", user))
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(user = %user, "cephx entity already removed");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Cephx entity of an RBD mirror daemon.
#[must_use]
pub fn rbd_mirror_user(daemon_id: &str) -> String {
    format!("client.rbd-mirror.{daemon_id}")
}

/// Caps granted to RBD mirror daemons.
pub const RBD_MIRROR_ACCESS: [&str; 4] = ["mon", "profile rbd-mirror", "osd", "profile rbd"];

/// Renders the keyring file of an RBD mirror daemon.
#[must_use]
pub fn rbd_mirror_keyring(daemon_id: &str, key: &str) -> String {
    format!(
        "\n[client.rbd-mirror.{daemon_id}]\n\tkey = {key}\n\tcaps mon = \"profile rbd-mirror\"\n\tcaps osd = \"profile rbd\"\n"
    )
}

/// Renders the `client.admin` keyring.
#[must_use]
pub fn admin_keyring(key: &str) -> String {
    format!(
        "[client.admin]\n\tkey = {key}\n\tcaps mds = \"allow *\"\n\tcaps mon = \"allow *\"\n\tcaps osd = \"allow *\"\n\tcaps mgr = \"allow *\"\n"
    )
}

/// Builds the Secret holding a daemon keyring.
#[must_use]
pub fn keyring_secret(
    namespace: &str,
    name: &str,
    keyring: &str,
    owner: Option<OwnerReference>,
) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        KEYRING_SECRET_KEY.to_string(),
        ByteString(keyring.as_bytes().to_vec()),
    );
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: owner.map(|o| vec![o]),
            ..Default::default()
        },
        data: Some(data),
        type_: Some(ROOK_SECRET_TYPE.to_string()),
        ..Default::default()
    }
}

/// Persists rendered keyrings.
#[async_trait]
pub trait KeyringStore: Send + Sync {
    /// Creates or updates the keyring Secret `name`.
    async fn put(
        &self,
        namespace: &str,
        name: &str,
        keyring: &str,
        owner: Option<OwnerReference>,
    ) -> Result<()>;

    /// Deletes the keyring Secret `name`. A missing Secret is success.
    async fn remove(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`KeyringStore`] backed by Kubernetes Secrets.
#[derive(Clone)]
pub struct SecretKeyringStore {
    client: Client,
    field_manager: String,
}

impl SecretKeyringStore {
    #[must_use]
    pub fn new(client: Client, field_manager: &str) -> Self {
        Self {
            client,
            field_manager: field_manager.to_string(),
        }
    }
}

#[async_trait]
impl KeyringStore for SecretKeyringStore {
    async fn put(
        &self,
        namespace: &str,
        name: &str,
        keyring: &str,
        owner: Option<OwnerReference>,
    ) -> Result<()> {
        let secret = keyring_secret(namespace, name, keyring, owner);
        create_or_apply(&self.client, namespace, &secret, &self.field_manager).await?;
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> Result<()> {
        delete_resource::<Secret>(&self.client, namespace, name, DeleteMode::Idempotent).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "keyring_tests.rs"]
mod keyring_tests;
