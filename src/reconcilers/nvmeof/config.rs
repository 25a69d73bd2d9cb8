// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `nvmeof.conf` generation.
//!
//! The gateway reads an INI file. The operator renders a fixed set of defaults, overlays
//! `spec.nvmeOFConfig` section by section and stores the result in a ConfigMap. The pod
//! IP is not known at render time, so `addr` carries [`POD_IP_SENTINEL`] and the init
//! container substitutes it at pod start.

use crate::constants::{NVMEOF_DISCOVERY_PORT, NVMEOF_GATEWAY_PORT, NVMEOF_MONITOR_PORT, POD_IP_SENTINEL};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// One `[section]` with its keys in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    fn new(name: &str, entries: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            entries: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Value of `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }
}

/// Ordered INI document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IniDocument {
    pub sections: Vec<IniSection>,
}

impl IniDocument {
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Section `name`, appended empty if missing.
    pub fn section_mut(&mut self, name: &str) -> &mut IniSection {
        let index = match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(IniSection::new(name, &[]));
                self.sections.len() - 1
            }
        };
        &mut self.sections[index]
    }

    /// Overlays `overrides`. Unknown sections and keys are added verbatim.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, BTreeMap<String, String>>) {
        for (section, options) in overrides {
            let target = self.section_mut(section);
            for (key, value) in options {
                target.set(key, value);
            }
        }
    }

    /// Renders `[section]` headers followed by `key = value` lines, sections separated by a
    /// blank line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.entries {
                let _ = writeln!(out, "{key} = {value}");
            }
        }
        out
    }
}

/// Default gateway configuration for gateway `name` serving `pool` in ANA group `group`.
#[must_use]
pub fn default_config(name: &str, pool: &str, group: &str) -> IniDocument {
    let gateway_port = NVMEOF_GATEWAY_PORT.to_string();
    let discovery_port = NVMEOF_DISCOVERY_PORT.to_string();
    let monitor_port = NVMEOF_MONITOR_PORT.to_string();
    IniDocument {
        sections: vec![
            IniSection::new(
                "gateway",
                &[
                    ("name", name),
                    ("group", group),
                    ("addr", POD_IP_SENTINEL),
                    ("port", &gateway_port),
                    ("enable_auth", "False"),
                    ("state_update_notify", "True"),
                    ("state_update_timeout_in_msec", "2000"),
                    ("state_update_interval_sec", "5"),
                    ("enable_spdk_discovery_controller", "False"),
                    ("encryption_key", "/etc/ceph/encryption.key"),
                    ("rebalance_period_sec", "7"),
                    ("max_gws_in_grp", "16"),
                    ("max_ns_to_change_lb_grp", "8"),
                    ("verify_listener_ip", "False"),
                    ("enable_monitor_client", "True"),
                ],
            ),
            IniSection::new("discovery", &[("addr", "0.0.0.0"), ("port", &discovery_port)]),
            IniSection::new(
                "ceph",
                &[
                    ("id", "admin"),
                    ("pool", pool),
                    ("config_file", "/etc/ceph/ceph.conf"),
                ],
            ),
            IniSection::new(
                "mtls",
                &[
                    ("server_key", "./server.key"),
                    ("client_key", "./client.key"),
                    ("server_cert", "./server.crt"),
                    ("client_cert", "./client.crt"),
                ],
            ),
            IniSection::new(
                "spdk",
                &[
                    ("bdevs_per_cluster", "32"),
                    ("mem_size", "4096"),
                    ("tgt_path", "/usr/local/bin/nvmf_tgt"),
                    ("timeout", "60.0"),
                    ("rpc_socket", "/var/tmp/spdk.sock"),
                ],
            ),
            IniSection::new("monitor", &[("port", &monitor_port)]),
        ],
    }
}

/// Rendered `nvmeof.conf` with user overrides applied.
#[must_use]
pub fn gateway_config(
    name: &str,
    pool: &str,
    group: &str,
    overrides: Option<&BTreeMap<String, BTreeMap<String, String>>>,
) -> String {
    let mut doc = default_config(name, pool, group);
    if let Some(overrides) = overrides {
        doc.apply_overrides(overrides);
    }
    doc.render()
}

/// SHA-256 over ConfigMap data, hex encoded. Stable for equal data.
#[must_use]
pub fn config_hash(data: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(value.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
