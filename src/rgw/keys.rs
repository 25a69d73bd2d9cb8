// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access key convergence for object store users.
//!
//! A user is in one of two key modes:
//!
//! - **explicit**: the key set is exactly the pairs resolved from referenced Secrets
//! - **managed**: the user has exactly one key, published in an operator-owned Secret
//!
//! The `plan_*` functions compute the changes; the `sync_*` functions apply them through
//! [`RgwAdmin`]. Keys are always added before others are removed so the user never
//! passes through a state with no key.

use super::types::{RgwUser, S3Key, StoreRef};
use super::RgwAdmin;
use crate::exec::CommandError;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Changes that turn a live key set into a desired one.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeyPlan {
    /// Keys to create; an existing access key is overwritten with the new secret
    pub add: Vec<S3Key>,
    /// Access keys to remove
    pub remove: Vec<String>,
}

impl KeyPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Deduplicates desired keys by access key.
///
/// # Errors
///
/// Returns a description if one access key is paired with two different secrets.
pub fn dedupe_keys(keys: Vec<S3Key>) -> Result<Vec<S3Key>, String> {
    let mut seen: BTreeMap<String, S3Key> = BTreeMap::new();
    let mut ordered = Vec::new();
    for key in keys {
        match seen.get(&key.access_key) {
            Some(existing) if existing.secret_key != key.secret_key => {
                return Err(format!(
                    "access key {:?} is configured with two different secret keys",
                    key.access_key
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(key.access_key.clone(), key.clone());
                ordered.push(key);
            }
        }
    }
    Ok(ordered)
}

/// Plans the explicit mode: the final key set equals `desired` exactly.
#[must_use]
pub fn plan_explicit(live: &[S3Key], desired: &[S3Key]) -> KeyPlan {
    let add = desired
        .iter()
        .filter(|d| !live.contains(d))
        .cloned()
        .collect();
    let remove = live
        .iter()
        .filter(|l| !desired.iter().any(|d| d.access_key == l.access_key))
        .map(|l| l.access_key.clone())
        .collect();
    KeyPlan { add, remove }
}

/// Plan for the managed mode.
#[derive(Debug, PartialEq, Eq)]
pub struct ManagedPlan {
    /// Key that stays, if any
    pub keep: Option<S3Key>,
    /// Access keys to remove
    pub remove: Vec<String>,
    /// Generate a new key because none remain
    pub generate: bool,
}

/// Plans the managed mode: keep one existing key, remove the rest, generate only if
/// the user has no key.
#[must_use]
pub fn plan_managed(live: &[S3Key]) -> ManagedPlan {
    match live.split_first() {
        Some((keep, rest)) => ManagedPlan {
            keep: Some(keep.clone()),
            remove: rest.iter().map(|k| k.access_key.clone()).collect(),
            generate: false,
        },
        None => ManagedPlan {
            keep: None,
            remove: Vec::new(),
            generate: true,
        },
    }
}

/// Converges `user` to exactly the `desired` keys.
///
/// # Errors
///
/// Returns the first failing admin call.
pub async fn sync_explicit(
    admin: &dyn RgwAdmin,
    store: &StoreRef,
    user: &RgwUser,
    desired: &[S3Key],
) -> Result<(), CommandError> {
    let plan = plan_explicit(&user.keys, desired);
    if plan.is_empty() {
        debug!(store = %store, uid = %user.user_id, "rgw user keys up to date");
        return Ok(());
    }

    for key in &plan.add {
        admin.create_key(store, &user.user_id, Some(key)).await?;
    }
    for access_key in &plan.remove {
        admin.remove_key(store, &user.user_id, access_key).await?;
    }
    info!(
        store = %store,
        uid = %user.user_id,
        added = plan.add.len(),
        removed = plan.remove.len(),
        "synchronized rgw user keys"
    );
    Ok(())
}

/// Converges `user` to a single key and returns it.
///
/// # Errors
///
/// Returns the first failing admin call, or [`CommandError::Failed`] if RGW reports no
/// key after generation.
pub async fn sync_managed(
    admin: &dyn RgwAdmin,
    store: &StoreRef,
    user: &RgwUser,
) -> Result<S3Key, CommandError> {
    let plan = plan_managed(&user.keys);
    for access_key in &plan.remove {
        admin.remove_key(store, &user.user_id, access_key).await?;
    }
    if let Some(key) = plan.keep {
        return Ok(key);
    }

    let updated = admin.create_key(store, &user.user_id, None).await?;
    info!(store = %store, uid = %user.user_id, "generated rgw user key");
    updated
        .keys
        .into_iter()
        .next()
        .ok_or_else(|| CommandError::Failed {
            command: "radosgw-admin key create".to_string(),
            code: None,
            stderr: format!("user {:?} has no key after generation", user.user_id),
        })
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod keys_tests;
