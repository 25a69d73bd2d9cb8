// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Key-value records that hold per-node OSD state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Named records of string keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the value of `key` in record `store`, or `None` if either is missing.
    async fn get(&self, store: &str, key: &str) -> Result<Option<String>>;

    /// Sets `key` in record `store`, creating the record if needed.
    async fn set(&self, store: &str, key: &str, value: &str) -> Result<()>;
}

/// Records kept as ConfigMaps in one namespace.
pub struct ConfigMapKvStore {
    client: Client,
    namespace: String,
    owner: Option<OwnerReference>,
}

impl ConfigMapKvStore {
    #[must_use]
    pub fn new(client: Client, namespace: &str, owner: Option<OwnerReference>) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            owner,
        }
    }
}

#[async_trait]
impl KvStore for ConfigMapKvStore {
    async fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let cm = api
            .get_opt(store)
            .await
            .with_context(|| format!("failed to read configmap {}/{store}", self.namespace))?;
        Ok(cm.and_then(|cm| cm.data).and_then(|mut data| data.remove(key)))
    }

    async fn set(&self, store: &str, key: &str, value: &str) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        if api.get_opt(store).await?.is_some() {
            let patch = json!({ "data": { key: value } });
            api.patch(store, &PatchParams::default(), &Patch::Merge(&patch))
                .await
                .with_context(|| format!("failed to update configmap {}/{store}", self.namespace))?;
            debug!(namespace = %self.namespace, name = %store, key = %key, "updated configmap key");
            return Ok(());
        }

        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some(store.to_string()),
                namespace: Some(self.namespace.clone()),
                owner_references: self.owner.clone().map(|o| vec![o]),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(key.to_string(), value.to_string())])),
            ..Default::default()
        };
        api.create(&PostParams::default(), &cm)
            .await
            .with_context(|| format!("failed to create configmap {}/{store}", self.namespace))?;
        debug!(namespace = %self.namespace, name = %store, key = %key, "created configmap");
        Ok(())
    }
}

/// Records kept as directories under `root`, one file per key.
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, store: &str, key: &str) -> PathBuf {
        self.root.join(store).join(key)
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, store: &str, key: &str) -> Result<Option<String>> {
        let path = self.path(store, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn set(&self, store: &str, key: &str, value: &str) -> Result<()> {
        let dir = self.root.join(store);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = self.path(store, key);
        tokio::fs::write(&path, value)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
