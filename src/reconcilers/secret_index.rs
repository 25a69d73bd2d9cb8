// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse index from referenced Secrets to the resources that reference them.
//!
//! Object store users and bucket topics read credentials from Secrets they do not own.
//! Modelling that as ownership would make the Secret a garbage collection parent of the
//! resource, so instead each controller keeps this index and its Secret watch maps a
//! changed Secret back to the affected resources.
//!
//! Entries are replaced wholesale on every reconcile of the referencing resource (from its
//! spec references plus the identities recorded in its status), and dropped when the
//! resource is deleted.

use kube::runtime::reflector::ObjectRef;
use kube::Resource;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

type Key = (String, String);

#[derive(Default)]
struct Inner {
    /// `(namespace, secret)` to referencing `(namespace, name)` pairs
    by_secret: BTreeMap<Key, BTreeSet<Key>>,
    /// referencing `(namespace, name)` to the Secrets it was last indexed with
    by_owner: BTreeMap<Key, BTreeSet<Key>>,
}

/// Shared, cloneable Secret reverse index.
#[derive(Clone, Default)]
pub struct SecretIndex {
    inner: Arc<RwLock<Inner>>,
}

impl SecretIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the Secrets referenced by `namespace/name`.
    ///
    /// `secrets` are `(namespace, secret name)` pairs; empty names are skipped.
    pub fn update<I>(&self, namespace: &str, name: &str, secrets: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let owner = (namespace.to_string(), name.to_string());
        let secrets: BTreeSet<Key> = secrets
            .into_iter()
            .filter(|(_, secret)| !secret.is_empty())
            .collect();

        let mut inner = self.write();
        inner.unlink(&owner);
        for secret in &secrets {
            inner
                .by_secret
                .entry(secret.clone())
                .or_default()
                .insert(owner.clone());
        }
        if !secrets.is_empty() {
            inner.by_owner.insert(owner, secrets);
        }
    }

    /// Drops every entry for `namespace/name`.
    pub fn remove(&self, namespace: &str, name: &str) {
        let owner = (namespace.to_string(), name.to_string());
        self.write().unlink(&owner);
    }

    /// Resources referencing Secret `namespace/secret`, as `(namespace, name)` pairs.
    #[must_use]
    pub fn owners_of(&self, namespace: &str, secret: &str) -> Vec<(String, String)> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner
            .by_secret
            .get(&(namespace.to_string(), secret.to_string()))
            .map(|owners| owners.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Watch mapper output for a changed Secret.
    #[must_use]
    pub fn object_refs<K>(&self, namespace: &str, secret: &str) -> Vec<ObjectRef<K>>
    where
        K: Resource<DynamicType = ()>,
    {
        self.owners_of(namespace, secret)
            .into_iter()
            .map(|(ns, name)| ObjectRef::new(&name).within(&ns))
            .collect()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Inner {
    fn unlink(&mut self, owner: &Key) {
        let Some(previous) = self.by_owner.remove(owner) else {
            return;
        };
        for secret in previous {
            if let Some(owners) = self.by_secret.get_mut(&secret) {
                owners.remove(owner);
                if owners.is_empty() {
                    self.by_secret.remove(&secret);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "secret_index_tests.rs"]
mod secret_index_tests;
