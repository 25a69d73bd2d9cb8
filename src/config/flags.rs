// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line flags and environment shared by Ceph daemon containers.

use super::cluster_secret::stored_mon_host_env_vars;
use super::mon_store::flag_key;
use crate::constants::{ADMIN_KEYRING_PATH, ENV_MON_HOST, ENV_MON_INITIAL_MEMBERS};
use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};

/// Renders `--<option>=<value>` with the option in flag form.
#[must_use]
pub fn new_flag(option: &str, value: &str) -> String {
    format!("--{}={value}", flag_key(option))
}

/// `$(NAME)`: a reference Kubernetes expands from the container environment.
#[must_use]
pub fn env_var_reference(name: &str) -> String {
    format!("$({name})")
}

/// Flags every daemon starts with: identity, stderr logging and the mon addresses taken
/// from the environment.
#[must_use]
pub fn default_flags(fsid: &str, keyring_path: &str) -> Vec<String> {
    vec![
        new_flag("fsid", fsid),
        new_flag("keyring", keyring_path),
        new_flag("log to stderr", "true"),
        new_flag("err to stderr", "true"),
        new_flag("mon cluster log to stderr", "true"),
        new_flag("log stderr prefix", "debug"),
        new_flag("default log to file", "false"),
        new_flag("default mon cluster log to file", "false"),
        new_flag("mon host", &env_var_reference(ENV_MON_HOST)),
        new_flag("mon initial members", &env_var_reference(ENV_MON_INITIAL_MEMBERS)),
    ]
}

/// Flags for containers running admin commands with the admin keyring.
#[must_use]
pub fn admin_flags(fsid: &str) -> Vec<String> {
    let mut flags = default_flags(fsid, ADMIN_KEYRING_PATH);
    flags.push(new_flag("setuser", "ceph"));
    flags.push(new_flag("setgroup", "ceph"));
    flags
}

/// Flags for a long-running daemon identified by `daemon_id`.
#[must_use]
pub fn daemon_flags(fsid: &str, keyring_path: &str, daemon_id: &str) -> Vec<String> {
    let mut flags = default_flags(fsid, keyring_path);
    flags.push(new_flag("id", daemon_id));
    flags.push(new_flag("setuser", "ceph"));
    flags.push(new_flag("setgroup", "ceph"));
    flags
}

/// Replaces the value of every `--<option>=` flag.
#[must_use]
pub fn replace_flag(flags: &[String], option: &str, value: &str) -> Vec<String> {
    let prefix = format!("--{}=", flag_key(option));
    flags
        .iter()
        .map(|f| {
            if f.starts_with(&prefix) {
                format!("{prefix}{value}")
            } else {
                f.clone()
            }
        })
        .collect()
}

fn field_ref(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Environment of every daemon container: image, pod identity and mon addresses.
#[must_use]
pub fn daemon_env_vars(ceph_image: &str) -> Vec<EnvVar> {
    let mut env = vec![
        EnvVar {
            name: "CONTAINER_IMAGE".to_string(),
            value: Some(ceph_image.to_string()),
            ..Default::default()
        },
        field_ref("POD_NAME", "metadata.name"),
        field_ref("POD_NAMESPACE", "metadata.namespace"),
        field_ref("NODE_NAME", "spec.nodeName"),
    ];
    env.extend(stored_mon_host_env_vars());
    env
}

/// `POD_IP` from the downward API.
#[must_use]
pub fn pod_ip_env_var() -> EnvVar {
    field_ref("POD_IP", "status.podIP")
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod flags_tests;
