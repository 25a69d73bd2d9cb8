// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reading values out of Secrets referenced by a resource.
//!
//! Referenced Secrets are never written. Their identity (`uid`, `resourceVersion`) is
//! recorded in the referencing resource's status, which makes a Secret data change
//! visible as a status change.

use crate::crd::{SecretIdentity, SecretKeyRef};
use crate::errors::ReconcileError;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};

/// Value of `key` in `secret`, from `data` or `stringData`.
#[must_use]
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return Some(String::from_utf8_lossy(&value.0).into_owned());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned()
}

/// Identity tuple recorded in status for a referenced Secret.
#[must_use]
pub fn secret_identity(secret: &Secret) -> SecretIdentity {
    SecretIdentity {
        name: secret.name_any(),
        namespace: secret.namespace().unwrap_or_default(),
        uid: secret.uid().unwrap_or_default(),
        resource_version: secret.resource_version().unwrap_or_default(),
    }
}

/// A value resolved from a referenced Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub value: String,
    pub identity: SecretIdentity,
}

/// Reads the value `reference` points at in `namespace`.
///
/// # Errors
///
/// Returns [`ReconcileError::ReferencedObjectMissing`] if the Secret or the key does not
/// exist, and [`ReconcileError::Remote`] for API failures.
pub async fn resolve_secret_key(
    client: &Client,
    namespace: &str,
    reference: &SecretKeyRef,
) -> Result<ResolvedValue, ReconcileError> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get_opt(&reference.name)
        .await?
        .ok_or_else(|| ReconcileError::missing_secret(namespace, &reference.name))?;
    value_from(&secret, namespace, reference)
}

/// Extracts the value `reference` points at from an already fetched Secret.
///
/// # Errors
///
/// Returns [`ReconcileError::ReferencedObjectMissing`] if the key is absent.
pub fn value_from(
    secret: &Secret,
    namespace: &str,
    reference: &SecretKeyRef,
) -> Result<ResolvedValue, ReconcileError> {
    let value = secret_value(secret, &reference.key).ok_or_else(|| {
        ReconcileError::missing_secret(namespace, &format!("{}[{}]", reference.name, reference.key))
    })?;
    Ok(ResolvedValue {
        value,
        identity: secret_identity(secret),
    })
}

/// Deduplicates identities by Secret name, keeping the first occurrence.
#[must_use]
pub fn unique_identities(identities: Vec<SecretIdentity>) -> Vec<SecretIdentity> {
    let mut seen = std::collections::BTreeSet::new();
    identities
        .into_iter()
        .filter(|identity| seen.insert((identity.namespace.clone(), identity.name.clone())))
        .collect()
}

#[cfg(test)]
#[path = "secret_refs_tests.rs"]
mod secret_refs_tests;
