// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Daemon identifiers and derived resource names.
//!
//! Multi-instance daemons are identified by a short alphabetic id derived from the
//! instance index using bijective base-26: `0 -> a`, `25 -> z`, `26 -> aa`, `702 -> aaa`.

use anyhow::{bail, Result};
use std::collections::BTreeSet;

const ALPHABET_LEN: usize = 26;

/// Maximum length of a DNS-1123 label
pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;

/// Converts an instance index to its daemon id.
#[must_use]
pub fn index_to_name(index: usize) -> String {
    let mut n = index;
    let mut chars = Vec::new();
    loop {
        // n % 26 < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        chars.push(char::from(b'a' + (n % ALPHABET_LEN) as u8));
        n /= ALPHABET_LEN;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    chars.iter().rev().collect()
}

/// Converts a daemon id back to its instance index.
///
/// # Errors
///
/// Returns an error if the name is empty, contains characters outside `a-z`, or
/// overflows `usize`.
pub fn name_to_index(name: &str) -> Result<usize> {
    if name.is_empty() {
        bail!("daemon name must not be empty");
    }

    let mut result: usize = 0;
    for c in name.chars() {
        if !c.is_ascii_lowercase() {
            bail!("daemon name {name:?} contains invalid character {c:?}");
        }
        let digit = (c as usize) - ('a' as usize) + 1;
        result = result
            .checked_mul(ALPHABET_LEN)
            .and_then(|r| r.checked_add(digit))
            .ok_or_else(|| anyhow::anyhow!("daemon name {name:?} is too long"))?;
    }
    Ok(result - 1)
}

/// Extracts the daemon index from a full resource name such as `rook-ceph-nvmeof-gw-c`.
///
/// # Errors
///
/// Returns an error if the name has no `-` separated suffix or the suffix is not a valid
/// daemon id.
pub fn full_name_to_index(full_name: &str) -> Result<usize> {
    match full_name.rsplit_once('-') {
        Some((_, id)) => name_to_index(id),
        None => bail!("resource name {full_name:?} has no daemon id suffix"),
    }
}

/// Indices of instances to remove when scaling to `instances`.
///
/// Covers `[instances, observed.len())` plus any observed resource whose decoded index
/// is out of range. Names without a valid daemon id are ignored.
#[must_use]
pub fn stale_indices(observed: &[String], instances: usize) -> BTreeSet<usize> {
    let mut stale: BTreeSet<usize> = (instances..observed.len()).collect();
    stale.extend(
        observed
            .iter()
            .filter_map(|name| full_name_to_index(name).ok())
            .filter(|index| *index >= instances),
    );
    stale
}

/// Name of the per-instance Deployment/Service for a daemon: `<app>-<cr>-<id>`.
#[must_use]
pub fn instance_resource_name(app_name: &str, cr_name: &str, daemon_id: &str) -> String {
    format!("{app_name}-{cr_name}-{daemon_id}")
}

/// Returns `true` if `value` is a valid RFC 1123 DNS label.
#[must_use]
pub fn is_dns1123_label(value: &str) -> bool {
    if value.is_empty() || value.len() > DNS1123_LABEL_MAX_LENGTH {
        return false;
    }
    let bytes = value.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes.iter().all(|&b| alnum(b) || b == b'-')
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
