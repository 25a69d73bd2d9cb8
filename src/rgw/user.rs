// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RGW user attributes derived from a `CephObjectStoreUser` spec.

use super::types::{QuotaParams, RgwUser, UserCap, UserParams};
use crate::crd::{ObjectStoreUserSpec, ObjectUserCapSpec};
use crate::errors::ReconcileError;
use std::collections::BTreeSet;

const OP_ORDER: [&str; 3] = ["read", "write", "delete"];

/// Normalizes an op mask to RGW's rendering (`read, write, delete`).
///
/// `*` expands to every operation. Empty words are ignored.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] naming the first word that is not an operation.
pub fn normalize_op_mask(mask: &str) -> Result<String, ReconcileError> {
    let words: BTreeSet<&str> = mask
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect();
    if let Some(unknown) = words.iter().find(|w| **w != "*" && !OP_ORDER.contains(*w)) {
        return Err(ReconcileError::validation(format!(
            "unknown operation {unknown:?} in opMask {mask:?}"
        )));
    }
    let all = words.contains("*");
    Ok(OP_ORDER
        .iter()
        .filter(|op| all || words.contains(*op))
        .copied()
        .collect::<Vec<_>>()
        .join(", "))
}

/// Desired caps, one entry per configured capability type.
#[must_use]
pub fn desired_caps(spec: Option<&ObjectUserCapSpec>) -> Vec<UserCap> {
    let Some(spec) = spec else {
        return Vec::new();
    };
    [
        ("user", &spec.user),
        ("users", &spec.users),
        ("bucket", &spec.bucket),
        ("buckets", &spec.buckets),
        ("metadata", &spec.metadata),
        ("usage", &spec.usage),
        ("zone", &spec.zone),
        ("roles", &spec.roles),
        ("info", &spec.info),
    ]
    .into_iter()
    .filter_map(|(cap_type, perm)| {
        perm.as_ref().filter(|p| !p.is_empty()).map(|p| UserCap {
            cap_type: cap_type.to_string(),
            perm: p.replace(' ', ""),
        })
    })
    .collect()
}

/// Renders caps as the `--caps` argument: `users=read;buckets=*`.
#[must_use]
pub fn caps_arg(caps: &[UserCap]) -> String {
    caps.iter()
        .map(|c| format!("{}={}", c.cap_type, c.perm))
        .collect::<Vec<_>>()
        .join(";")
}

/// Caps to remove from and add to `live` so that it matches `desired`.
///
/// A cap whose permission changed is removed and re-added.
#[must_use]
pub fn caps_diff(live: &[UserCap], desired: &[UserCap]) -> (Vec<UserCap>, Vec<UserCap>) {
    let normalize = |caps: &[UserCap]| -> BTreeSet<UserCap> {
        caps.iter()
            .map(|c| UserCap {
                cap_type: c.cap_type.clone(),
                perm: c.perm.replace(' ', ""),
            })
            .collect()
    };
    let live = normalize(live);
    let desired = normalize(desired);
    let remove = live.difference(&desired).cloned().collect();
    let add = desired.difference(&live).cloned().collect();
    (remove, add)
}

/// User parameters for a resource named `cr_name`.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] for an invalid op mask.
pub fn user_params(
    cr_name: &str,
    spec: &ObjectStoreUserSpec,
) -> Result<UserParams, ReconcileError> {
    Ok(UserParams {
        uid: cr_name.to_string(),
        display_name: spec
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| cr_name.to_string()),
        op_mask: spec.op_mask.as_deref().map(normalize_op_mask).transpose()?,
        max_buckets: spec.quotas.as_ref().and_then(|q| q.max_buckets),
    })
}

/// Quota parameters, if the spec sets a size or object limit.
#[must_use]
pub fn quota_params(spec: &ObjectStoreUserSpec) -> Option<QuotaParams> {
    let quotas = spec.quotas.as_ref()?;
    if quotas.max_size.is_none() && quotas.max_objects.is_none() {
        return None;
    }
    Some(QuotaParams {
        max_size: quotas.max_size,
        max_objects: quotas.max_objects,
    })
}

/// Returns `true` if the live user differs from `params` in a way `user modify` fixes.
#[must_use]
pub fn needs_modify(live: &RgwUser, params: &UserParams) -> bool {
    if live.display_name != params.display_name {
        return true;
    }
    if let Some(mask) = &params.op_mask {
        if normalize_op_mask(&live.op_mask).ok().as_ref() != Some(mask) {
            return true;
        }
    }
    params.max_buckets.is_some_and(|max| max != live.max_buckets)
}

/// Returns `true` if the live quota differs from `quota`.
#[must_use]
pub fn needs_quota(live: &RgwUser, quota: &QuotaParams) -> bool {
    !live.user_quota.enabled
        || quota
            .max_size
            .is_some_and(|size| size != live.user_quota.max_size)
        || quota
            .max_objects
            .is_some_and(|objects| objects != live.user_quota.max_objects)
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod user_tests;
