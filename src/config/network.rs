// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Public and cluster network selection.
//!
//! With Multus, each network is a NetworkAttachmentDefinition named by
//! `spec.network.selectors.{public,cluster}`. The CIDR of each network is the IPAM
//! subnet of its definition. When only `public` is selected, replication traffic shares
//! it and both `public_network` and `cluster_network` take the public subnet.

use super::mon_store::MonStore;
use crate::crd::NetworkSpec;
use crate::labels::MULTUS_NETWORKS_ANNOTATION;
use anyhow::{anyhow, bail, Context, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Selector key of the client-facing network
pub const PUBLIC_NETWORK: &str = "public";

/// Selector key of the replication network
pub const CLUSTER_NETWORK: &str = "cluster";

/// A network attachment reference `<namespace>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub namespace: String,
    pub name: String,
}

impl NetworkRef {
    /// Parses `<namespace>/<name>` or `<name>`, the latter in `default_namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name or more than one `/`.
    pub fn parse(selector: &str, default_namespace: &str) -> Result<Self> {
        let parts: Vec<&str> = selector.trim().split('/').collect();
        let (namespace, name) = match parts.as_slice() {
            [name] => (default_namespace, *name),
            [namespace, name] => (*namespace, *name),
            _ => bail!("network selector {selector:?} must be <namespace>/<name> or <name>"),
        };
        if name.is_empty() || namespace.is_empty() {
            bail!("network selector {selector:?} is incomplete");
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

/// Public and cluster CIDRs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkCidrs {
    pub public: String,
    pub cluster: String,
}

/// Pairs the public and (optional) cluster subnets.
///
/// # Errors
///
/// Returns an error if a subnet is empty.
pub fn network_cidrs(public: &str, cluster: Option<&str>) -> Result<NetworkCidrs> {
    if public.trim().is_empty() {
        bail!("public network has no subnet");
    }
    let cluster = match cluster {
        Some(c) if c.trim().is_empty() => bail!("cluster network has no subnet"),
        Some(c) => c.trim(),
        None => public.trim(),
    };
    Ok(NetworkCidrs {
        public: public.trim().to_string(),
        cluster: cluster.to_string(),
    })
}

#[derive(Deserialize)]
struct CniConfig {
    #[serde(default)]
    ipam: Ipam,
}

#[derive(Default, Deserialize)]
struct Ipam {
    #[serde(default)]
    subnet: String,
    // whereabouts
    #[serde(default)]
    range: String,
}

/// Extracts the IPAM subnet from a NetworkAttachmentDefinition's `spec.config`.
///
/// # Errors
///
/// Returns an error if the config is not JSON or carries no subnet.
pub fn subnet_from_config(config: &str) -> Result<String> {
    let cni: CniConfig =
        serde_json::from_str(config).context("network attachment config is not valid JSON")?;
    let subnet = if cni.ipam.subnet.is_empty() {
        cni.ipam.range
    } else {
        cni.ipam.subnet
    };
    if subnet.trim().is_empty() {
        bail!("network attachment config has an empty IPAM subnet");
    }
    Ok(subnet.trim().to_string())
}

fn nad_api(client: &Client, namespace: &str) -> Api<DynamicObject> {
    let gvk = GroupVersionKind::gvk("k8s.cni.cncf.io", "v1", "NetworkAttachmentDefinition");
    let resource = ApiResource::from_gvk(&gvk);
    Api::namespaced_with(client.clone(), namespace, &resource)
}

async fn subnet_of(client: &Client, network: &NetworkRef) -> Result<String> {
    let nad = nad_api(client, &network.namespace)
        .get(&network.name)
        .await
        .with_context(|| {
            format!(
                "failed to get network attachment definition {}/{}",
                network.namespace, network.name
            )
        })?;
    let config = nad
        .data
        .pointer("/spec/config")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            anyhow!(
                "network attachment definition {}/{} has no spec.config",
                network.namespace,
                network.name
            )
        })?;
    subnet_from_config(config)
        .with_context(|| format!("network {}/{}", network.namespace, network.name))
}

/// Resolves the CIDRs of a Multus cluster. Returns `None` for other network providers.
///
/// # Errors
///
/// Returns an error if the public selector is missing, a definition cannot be read, or a
/// subnet is empty.
pub async fn resolve_network_cidrs(
    client: &Client,
    cluster_namespace: &str,
    network: &NetworkSpec,
) -> Result<Option<NetworkCidrs>> {
    if !network.is_multus() {
        return Ok(None);
    }
    let public = network
        .selectors
        .get(PUBLIC_NETWORK)
        .ok_or_else(|| anyhow!("multus network requires a {PUBLIC_NETWORK:?} selector"))?;
    let public = subnet_of(client, &NetworkRef::parse(public, cluster_namespace)?).await?;
    let cluster = match network.selectors.get(CLUSTER_NETWORK) {
        Some(selector) => {
            Some(subnet_of(client, &NetworkRef::parse(selector, cluster_namespace)?).await?)
        }
        None => None,
    };
    network_cidrs(&public, cluster.as_deref()).map(Some)
}

/// Writes `public_network` and `cluster_network` to the mon store when they changed.
///
/// # Errors
///
/// Returns the failing mon store call.
pub async fn apply_network_cidrs(store: &MonStore, cidrs: &NetworkCidrs) -> Result<()> {
    for (option, value) in [
        ("public_network", &cidrs.public),
        ("cluster_network", &cidrs.cluster),
    ] {
        if store.set_if_changed("global", option, value).await? {
            info!(option = %option, cidr = %value, "network configuration changed");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct NetworkSelection<'a> {
    name: &'a str,
    namespace: &'a str,
    interface: &'a str,
}

/// Value of the Multus networks annotation for a pod of the cluster in
/// `cluster_namespace`. `with_cluster_network` attaches the replication network as well.
///
/// Returns `None` when no Multus attachment applies.
///
/// # Errors
///
/// Returns an error if a selector does not parse.
pub fn multus_annotation(
    network: &NetworkSpec,
    cluster_namespace: &str,
    with_cluster_network: bool,
) -> Result<Option<String>> {
    if !network.is_multus() || network.is_host() {
        return Ok(None);
    }
    let mut keys = vec![PUBLIC_NETWORK];
    if with_cluster_network {
        keys.push(CLUSTER_NETWORK);
    }
    let refs = keys
        .into_iter()
        .filter_map(|key| network.selectors.get(key).map(|s| (key, s)))
        .map(|(key, s)| NetworkRef::parse(s, cluster_namespace).map(|r| (key, r)))
        .collect::<Result<Vec<_>>>()?;
    if refs.is_empty() {
        return Ok(None);
    }
    let selections: Vec<NetworkSelection<'_>> = refs
        .iter()
        .map(|(key, r)| NetworkSelection {
            name: &r.name,
            namespace: &r.namespace,
            interface: *key,
        })
        .collect();
    Ok(Some(serde_json::to_string(&selections)?))
}

/// Adds the Multus annotation to pod metadata, if any applies.
///
/// # Errors
///
/// Returns an error if a selector does not parse.
pub fn apply_multus(
    network: &NetworkSpec,
    cluster_namespace: &str,
    with_cluster_network: bool,
    meta: &mut ObjectMeta,
) -> Result<()> {
    if let Some(value) = multus_annotation(network, cluster_namespace, with_cluster_network)? {
        meta.annotations
            .get_or_insert_with(Default::default)
            .insert(MULTUS_NETWORKS_ANNOTATION.to_string(), value);
    }
    Ok(())
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod network_tests;
