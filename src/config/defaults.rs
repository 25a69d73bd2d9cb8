// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Options pushed to the mon config store when a cluster is bootstrapped.
//!
//! Three layers are merged in order, later layers winning for the same `(who, option)`:
//! release defaults, legacy overrides, then the user's `spec.cephConfig`.

use super::mon_store::ConfigOption;
use crate::version::CephVersion;
use std::collections::BTreeMap;

const PACIFIC: CephVersion = CephVersion::new(16, 0, 0, 0);
const QUINCY: CephVersion = CephVersion::new(17, 0, 0, 0);

/// Release defaults for `version`.
#[must_use]
pub fn default_centralized_configs(version: &CephVersion) -> Vec<ConfigOption> {
    let mut options = vec![
        ConfigOption::new("global", "mon allow pool delete", "true"),
        ConfigOption::new("global", "mon cluster log file", ""),
        // daemons log to stderr, collected by the container runtime
        ConfigOption::new("global", "log to file", "false"),
        ConfigOption::new("global", "mon cluster log to file", "false"),
    ];
    if version.is_at_least(&PACIFIC) {
        options.push(ConfigOption::new("global", "mon allow pool size one", "true"));
    }
    // Quincy enables automatic PG repair by itself
    if !version.is_at_least(&QUINCY) {
        options.push(ConfigOption::new("global", "osd scrub auto repair", "true"));
    }
    options
}

/// Overrides kept for older clients.
#[must_use]
pub fn default_legacy_configs() -> Vec<ConfigOption> {
    vec![ConfigOption::new("global", "rbd_default_features", "3")]
}

/// Options from a cluster's `spec.cephConfig` (`who -> option -> value`).
#[must_use]
pub fn user_overrides(ceph_config: &BTreeMap<String, BTreeMap<String, String>>) -> Vec<ConfigOption> {
    ceph_config
        .iter()
        .flat_map(|(who, options)| {
            options
                .iter()
                .map(move |(option, value)| ConfigOption::new(who, option, value))
        })
        .collect()
}

/// Merges option layers. Each `(who, option)` appears once, at the position of its first
/// occurrence, with the value of its last.
#[must_use]
pub fn merge(layers: &[Vec<ConfigOption>]) -> Vec<ConfigOption> {
    let mut merged: Vec<ConfigOption> = Vec::new();
    for option in layers.iter().flatten() {
        match merged
            .iter_mut()
            .find(|o| o.who == option.who && o.option == option.option)
        {
            Some(existing) => existing.value.clone_from(&option.value),
            None => merged.push(option.clone()),
        }
    }
    merged
}

/// Complete bootstrap option set for a cluster running `version`.
#[must_use]
pub fn bootstrap_options(
    version: &CephVersion,
    ceph_config: &BTreeMap<String, BTreeMap<String, String>>,
) -> Vec<ConfigOption> {
    merge(&[
        default_centralized_configs(version),
        default_legacy_configs(),
        user_overrides(ceph_config),
    ])
}

#[cfg(test)]
#[path = "defaults_tests.rs"]
mod defaults_tests;
