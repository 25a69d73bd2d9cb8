// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The `rook-ceph-config` Secret.
//!
//! It carries `mon_host` and `mon_initial_members` for every daemon pod, which read them
//! through `secretKeyRef` environment variables. The Secret is derived from the mon
//! endpoints recorded in the `rook-ceph-mon-endpoints` ConfigMap.

use crate::constants::{
    CLUSTER_CONFIG_SECRET, ENV_MON_HOST, ENV_MON_INITIAL_MEMBERS, FIELD_MANAGER,
    MON_ENDPOINTS_CONFIGMAP, MON_ENDPOINTS_KEY, MON_HOST_KEY, MON_INITIAL_MEMBERS_KEY,
    MSGR1_PORT, MSGR2_PORT, ROOK_SECRET_TYPE,
};
use crate::reconcilers::resources::{create_or_apply, Applied};
use anyhow::{anyhow, bail, Context, Result};
use k8s_openapi::api::core::v1::{ConfigMap, EnvVar, EnvVarSource, Secret, SecretKeySelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// One mon as recorded in the endpoints ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonEndpoint {
    pub name: String,
    pub ip: String,
    pub port: u16,
}

impl MonEndpoint {
    fn host(&self, port: u16) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{port}", self.ip)
        } else {
            format!("{}:{port}", self.ip)
        }
    }

    /// `mon_host` entry. A mon on the default msgr1 port also speaks msgr2 on 3300; a mon on
    /// any other port is addressed with msgr1 only.
    #[must_use]
    pub fn mon_host_entry(&self) -> String {
        if self.port == MSGR1_PORT {
            format!(
                "[v2:{},v1:{}]",
                self.host(MSGR2_PORT),
                self.host(self.port)
            )
        } else {
            format!("v1:{}", self.host(self.port))
        }
    }
}

/// Parses `a=10.0.0.1:6789,b=[fd00::2]:6789`.
///
/// # Errors
///
/// Returns an error for an entry without a name, without a port, or with a bad port.
pub fn parse_mon_endpoints(data: &str) -> Result<Vec<MonEndpoint>> {
    data.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, addr) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("mon endpoint {entry:?} has no name"))?;
            let (ip, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("mon endpoint {entry:?} has no port"))?;
            let port = port
                .parse::<u16>()
                .with_context(|| format!("mon endpoint {entry:?} has an invalid port"))?;
            let ip = ip.trim_start_matches('[').trim_end_matches(']');
            if name.is_empty() || ip.is_empty() {
                bail!("mon endpoint {entry:?} is incomplete");
            }
            Ok(MonEndpoint {
                name: name.to_string(),
                ip: ip.to_string(),
                port,
            })
        })
        .collect()
}

/// Comma-joined `mon_host` value.
#[must_use]
pub fn mon_host(mons: &[MonEndpoint]) -> String {
    mons.iter()
        .map(MonEndpoint::mon_host_entry)
        .collect::<Vec<_>>()
        .join(",")
}

/// Comma-joined `mon_initial_members` value.
#[must_use]
pub fn mon_initial_members(mons: &[MonEndpoint]) -> String {
    mons.iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the cluster config Secret.
#[must_use]
pub fn cluster_config_secret(
    namespace: &str,
    mons: &[MonEndpoint],
    owner: Option<OwnerReference>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(CLUSTER_CONFIG_SECRET.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: owner.map(|o| vec![o]),
            ..Default::default()
        },
        string_data: Some(BTreeMap::from([
            (MON_HOST_KEY.to_string(), mon_host(mons)),
            (MON_INITIAL_MEMBERS_KEY.to_string(), mon_initial_members(mons)),
        ])),
        type_: Some(ROOK_SECRET_TYPE.to_string()),
        ..Default::default()
    }
}

/// Reads the mon endpoints of the cluster in `namespace`.
///
/// # Errors
///
/// Returns an error if the ConfigMap is missing, has no endpoint list, or the list does
/// not parse.
pub async fn load_mon_endpoints(client: &Client, namespace: &str) -> Result<Vec<MonEndpoint>> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let cm = api
        .get_opt(MON_ENDPOINTS_CONFIGMAP)
        .await?
        .ok_or_else(|| anyhow!("configmap {namespace}/{MON_ENDPOINTS_CONFIGMAP} not found"))?;
    let data = cm
        .data
        .as_ref()
        .and_then(|d| d.get(MON_ENDPOINTS_KEY))
        .ok_or_else(|| {
            anyhow!("configmap {namespace}/{MON_ENDPOINTS_CONFIGMAP} has no {MON_ENDPOINTS_KEY:?} key")
        })?;
    parse_mon_endpoints(data)
}

/// Creates or updates the cluster config Secret.
///
/// # Errors
///
/// Returns an error if there are no mons or the write fails.
pub async fn upsert_cluster_config_secret(
    client: &Client,
    namespace: &str,
    mons: &[MonEndpoint],
    owner: Option<OwnerReference>,
) -> Result<Applied> {
    if mons.is_empty() {
        bail!("cannot write {CLUSTER_CONFIG_SECRET} for {namespace}: no mon endpoints");
    }
    let secret = cluster_config_secret(namespace, mons, owner);
    let applied = create_or_apply(client, namespace, &secret, FIELD_MANAGER).await?;
    debug!(namespace = %namespace, mons = mons.len(), "cluster config secret written");
    Ok(applied)
}

fn secret_env(name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: CLUSTER_CONFIG_SECRET.to_string(),
                key: key.to_string(),
                optional: None,
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `ROOK_CEPH_MON_HOST` and `ROOK_CEPH_MON_INITIAL_MEMBERS` read from the Secret.
#[must_use]
pub fn stored_mon_host_env_vars() -> Vec<EnvVar> {
    vec![
        secret_env(ENV_MON_HOST, MON_HOST_KEY),
        secret_env(ENV_MON_INITIAL_MEMBERS, MON_INITIAL_MEMBERS_KEY),
    ]
}

#[cfg(test)]
#[path = "cluster_secret_tests.rs"]
mod cluster_secret_tests;
