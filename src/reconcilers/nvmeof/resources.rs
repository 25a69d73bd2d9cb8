// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes objects for one NVMe-oF gateway instance.
//!
//! Each instance `<id>` of a `CephNVMeOFGateway` named `<cr>` gets:
//!
//! - ConfigMap `rook-ceph-nvmeof-<cr>-<id>-config` holding `nvmeof.conf`
//! - Deployment `rook-ceph-nvmeof-<cr>-<id>` with one replica
//! - Service `rook-ceph-nvmeof-<cr>-<id>` exposing the four gateway ports
//!
//! All three carry a controller owner reference to the gateway.

use super::config::{config_hash, gateway_config};
use crate::config::flags::{
    admin_flags, daemon_env_vars, default_flags, pod_ip_env_var, replace_flag,
};
use crate::config::network::apply_multus;
use crate::constants::{
    ADMIN_KEYRING_DIR, ADMIN_KEYRING_SECRET, CEPH_CONFIG_DIR, DAEMON_KEYRING_PATH,
    KEYRING_SECRET_KEY, LIVENESS_INITIAL_DELAY_SECS, NVMEOF_APP_NAME, NVMEOF_CONFIG_FILE,
    NVMEOF_CONFIG_KEY, NVMEOF_CONTAINER, NVMEOF_DAEMON_TYPE, NVMEOF_DISCOVERY_PORT,
    NVMEOF_GATEWAY_PORT, NVMEOF_INIT_CONTAINER, NVMEOF_IO_PORT, NVMEOF_MONITOR_PORT,
    NVMEOF_RESOURCE_KIND, NVMEOF_SERVICE_ACCOUNT,
};
use crate::crd::{CephCluster, CephNVMeOFGateway, NVMeOFPorts, ProbeSpec};
use crate::labels::{apply_user_metadata, ceph_daemon_app_labels, CONFIG_HASH_ANNOTATION};
use crate::naming::{instance_resource_name, is_dns1123_label};
use crate::reconcilers::owner_reference;
use anyhow::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource,
    EnvVar, KeyToPath, PodSpec, PodTemplateSpec, Probe, SecretVolumeSource, SecurityContext,
    Service, ServicePort, ServiceSpec, TCPSocketAction, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::warn;

const CEPH_CONFIG_VOLUME: &str = "ceph-conf-emptydir";
const ADMIN_KEYRING_VOLUME: &str = "ceph-admin-keyring";
const GATEWAY_CONFIG_VOLUME: &str = "gateway-config";
const GATEWAY_CONFIG_MOUNT: &str = "/config";

/// Mode of the mounted admin keyring (0444)
const ADMIN_KEYRING_MODE: i32 = 0o444;

/// Runs in the init container. Mon addresses come from the environment, the pod IP from
/// the downward API.
const INIT_SCRIPT: &str = r#"set -euo pipefail
cat > /etc/ceph/ceph.conf <<EOF
[global]
mon_host = ${ROOK_CEPH_MON_HOST}
mon_initial_members = ${ROOK_CEPH_MON_INITIAL_MEMBERS}

[client.admin]
keyring = /etc/ceph/keyring
EOF
cp /etc/ceph/admin-keyring-store/keyring /etc/ceph/keyring
sed "s/@@POD_IP@@/${POD_IP}/g" /config/nvmeof.conf > /etc/ceph/nvmeof.conf
echo "gateway ${GATEWAY_NAME} in group ${ANA_GROUP} serving pool ${POOL_NAME}"
"#;

/// Ports of one gateway after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPorts {
    pub io: i32,
    pub gateway: i32,
    pub monitor: i32,
    pub discovery: i32,
}

impl GatewayPorts {
    /// Named ports in Service order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, i32); 4] {
        [
            ("io", self.io),
            ("gateway", self.gateway),
            ("monitor", self.monitor),
            ("discovery", self.discovery),
        ]
    }
}

/// Resolves port overrides; zero keeps the default.
#[must_use]
pub fn resolve_ports(ports: Option<&NVMeOFPorts>) -> GatewayPorts {
    let pick = |value: i32, default: i32| if value > 0 { value } else { default };
    let ports = ports.cloned().unwrap_or_default();
    GatewayPorts {
        io: pick(ports.io_port, NVMEOF_IO_PORT),
        gateway: pick(ports.gateway_port, NVMEOF_GATEWAY_PORT),
        monitor: pick(ports.monitor_port, NVMEOF_MONITOR_PORT),
        discovery: pick(ports.discovery_port, NVMEOF_DISCOVERY_PORT),
    }
}

/// Deployment and Service name of instance `daemon_id`.
#[must_use]
pub fn instance_name(gateway_name: &str, daemon_id: &str) -> String {
    instance_resource_name(NVMEOF_APP_NAME, gateway_name, daemon_id)
}

/// Name of the generated ConfigMap of instance `daemon_id`.
#[must_use]
pub fn config_map_name(gateway_name: &str, daemon_id: &str) -> String {
    format!("{NVMEOF_APP_NAME}-{gateway_name}-{daemon_id}-config")
}

/// Everything needed to render one gateway instance.
#[derive(Debug, Clone, Copy)]
pub struct GatewayInstance<'a> {
    pub gateway: &'a CephNVMeOFGateway,
    pub cluster: &'a CephCluster,
    pub fsid: &'a str,
    pub daemon_id: &'a str,
    /// Image used when the gateway does not name one
    pub default_image: &'a str,
}

impl GatewayInstance<'_> {
    fn namespace(&self) -> String {
        self.gateway.namespace().unwrap_or_default()
    }

    fn name(&self) -> String {
        instance_name(&self.gateway.name_any(), self.daemon_id)
    }

    fn host_network(&self) -> bool {
        self.gateway.spec.is_host_network(&self.cluster.spec)
    }

    /// ConfigMap mounted into the pod: the user's when referenced, else the generated one.
    #[must_use]
    pub fn mounted_config_map(&self) -> String {
        self.gateway
            .spec
            .config_map_ref
            .clone()
            .unwrap_or_else(|| config_map_name(&self.gateway.name_any(), self.daemon_id))
    }

    /// Daemon labels, also used as pod selector.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        ceph_daemon_app_labels(
            NVMEOF_APP_NAME,
            &self.namespace(),
            NVMEOF_DAEMON_TYPE,
            self.daemon_id,
            &self.gateway.name_any(),
            NVMEOF_RESOURCE_KIND,
        )
    }

    fn metadata(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace()),
            labels: Some(self.labels()),
            owner_references: owner_reference(self.gateway).map(|o| vec![o]),
            ..Default::default()
        }
    }
}

/// Builds the generated ConfigMap of one instance.
#[must_use]
pub fn build_configmap(instance: &GatewayInstance<'_>) -> ConfigMap {
    let spec = &instance.gateway.spec;
    let rendered = gateway_config(
        &instance.name(),
        &spec.pool,
        &spec.group,
        spec.nvmeof_config.as_ref(),
    );
    ConfigMap {
        metadata: instance.metadata(config_map_name(
            &instance.gateway.name_any(),
            instance.daemon_id,
        )),
        data: Some(BTreeMap::from([(NVMEOF_CONFIG_KEY.to_string(), rendered)])),
        ..Default::default()
    }
}

/// Hash recorded on the pod template; empty for a referenced ConfigMap.
#[must_use]
pub fn configmap_hash(config_map: Option<&ConfigMap>) -> String {
    config_map
        .and_then(|cm| cm.data.as_ref())
        .map(config_hash)
        .unwrap_or_default()
}

/// Liveness probe of the gateway container.
///
/// The handler is always a TCP check on `io_port`; only scalar fields are taken from the
/// user's probe. `None` when disabled.
#[must_use]
pub fn liveness_probe(spec: Option<&ProbeSpec>, io_port: i32) -> Option<Probe> {
    if spec.is_some_and(|s| s.disabled) {
        return None;
    }
    let mut probe = Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(io_port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(LIVENESS_INITIAL_DELAY_SECS),
        ..Default::default()
    };
    if let Some(user) = spec.and_then(|s| s.probe.as_ref()) {
        if user.initial_delay_seconds.is_some() {
            probe.initial_delay_seconds = user.initial_delay_seconds;
        }
        probe.period_seconds = user.period_seconds;
        probe.timeout_seconds = user.timeout_seconds;
        probe.success_threshold = user.success_threshold;
        probe.failure_threshold = user.failure_threshold;
        probe.termination_grace_period_seconds = user.termination_grace_period_seconds;
    }
    Some(probe)
}

fn security_context() -> SecurityContext {
    SecurityContext {
        privileged: Some(true),
        capabilities: Some(Capabilities {
            add: Some(vec!["SYS_ADMIN".to_string()]),
            drop: Some(vec!["NET_RAW".to_string()]),
        }),
        ..Default::default()
    }
}

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn mount(name: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: read_only.then_some(true),
        ..Default::default()
    }
}

fn volumes(config_map: &str) -> Vec<Volume> {
    vec![
        Volume {
            name: CEPH_CONFIG_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
        Volume {
            name: ADMIN_KEYRING_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(ADMIN_KEYRING_SECRET.to_string()),
                items: Some(vec![KeyToPath {
                    key: KEYRING_SECRET_KEY.to_string(),
                    path: KEYRING_SECRET_KEY.to_string(),
                    ..Default::default()
                }]),
                default_mode: Some(ADMIN_KEYRING_MODE),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: GATEWAY_CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map.to_string(),
                items: Some(vec![KeyToPath {
                    key: NVMEOF_CONFIG_KEY.to_string(),
                    path: NVMEOF_CONFIG_FILE.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        },
    ]
}

fn init_container(instance: &GatewayInstance<'_>) -> Container {
    let cluster_image = &instance.cluster.spec.ceph_version;
    let spec = &instance.gateway.spec;
    let mut env_vars = daemon_env_vars(&cluster_image.image);
    env_vars.push(env("GATEWAY_NAME", &instance.name()));
    env_vars.push(env("POOL_NAME", &spec.pool));
    env_vars.push(env("ANA_GROUP", &spec.group));
    env_vars.push(pod_ip_env_var());

    Container {
        name: NVMEOF_INIT_CONTAINER.to_string(),
        image: Some(cluster_image.image.clone()),
        image_pull_policy: cluster_image.image_pull_policy.clone(),
        command: Some(vec![
            "/bin/bash".to_string(),
            "-c".to_string(),
            INIT_SCRIPT.to_string(),
        ]),
        args: Some(replace_flag(
            &admin_flags(instance.fsid),
            "keyring",
            DAEMON_KEYRING_PATH,
        )),
        env: Some(env_vars),
        volume_mounts: Some(vec![
            mount(ADMIN_KEYRING_VOLUME, ADMIN_KEYRING_DIR, true),
            mount(CEPH_CONFIG_VOLUME, CEPH_CONFIG_DIR, false),
            mount(GATEWAY_CONFIG_VOLUME, GATEWAY_CONFIG_MOUNT, true),
        ]),
        resources: spec.resources.clone(),
        security_context: Some(security_context()),
        ..Default::default()
    }
}

fn gateway_container(instance: &GatewayInstance<'_>, ports: GatewayPorts) -> Container {
    let spec = &instance.gateway.spec;
    let mut env_vars = daemon_env_vars(&instance.cluster.spec.ceph_version.image);
    env_vars.push(env(
        "CEPH_ARGS",
        &default_flags(instance.fsid, DAEMON_KEYRING_PATH).join(" "),
    ));

    Container {
        name: NVMEOF_CONTAINER.to_string(),
        image: Some(
            spec.image
                .clone()
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| instance.default_image.to_string()),
        ),
        image_pull_policy: Some("IfNotPresent".to_string()),
        args: Some(vec![
            "-c".to_string(),
            format!("{CEPH_CONFIG_DIR}/{NVMEOF_CONFIG_FILE}"),
        ]),
        env: Some(env_vars),
        ports: Some(
            ports
                .named()
                .into_iter()
                .map(|(name, port)| ContainerPort {
                    name: Some(name.to_string()),
                    container_port: port,
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
        volume_mounts: Some(vec![mount(CEPH_CONFIG_VOLUME, CEPH_CONFIG_DIR, false)]),
        liveness_probe: liveness_probe(spec.liveness_probe.as_ref(), ports.io),
        resources: spec.resources.clone(),
        security_context: Some(security_context()),
        ..Default::default()
    }
}

/// Builds the Deployment of one instance, annotated with `config_hash`.
///
/// # Errors
///
/// Returns an error if the cluster's Multus selectors do not parse.
pub fn build_deployment(instance: &GatewayInstance<'_>, config_hash: &str) -> Result<Deployment> {
    let spec = &instance.gateway.spec;
    let name = instance.name();
    let labels = instance.labels();
    let ports = resolve_ports(spec.ports.as_ref());
    let host_network = instance.host_network();

    let hostname = if is_dns1123_label(&name) {
        Some(name.clone())
    } else {
        warn!(name = %name, "gateway name is not a valid DNS-1123 label, leaving pod hostname unset");
        None
    };

    let mut pod_spec = PodSpec {
        init_containers: Some(vec![init_container(instance)]),
        containers: vec![gateway_container(instance, ports)],
        volumes: Some(volumes(&instance.mounted_config_map())),
        restart_policy: Some("Always".to_string()),
        host_network: host_network.then_some(true),
        dns_policy: host_network.then(|| "ClusterFirstWithHostNet".to_string()),
        hostname,
        priority_class_name: spec.priority_class_name.clone(),
        service_account_name: Some(NVMEOF_SERVICE_ACCOUNT.to_string()),
        ..Default::default()
    };
    if let Some(placement) = &spec.placement {
        placement.apply_to_pod_spec(&mut pod_spec);
    }

    let mut pod_meta = ObjectMeta {
        name: Some(name.clone()),
        labels: Some(labels.clone()),
        annotations: Some(BTreeMap::from([(
            CONFIG_HASH_ANNOTATION.to_string(),
            config_hash.to_string(),
        )])),
        ..Default::default()
    };
    apply_user_metadata(&mut pod_meta, spec.labels.as_ref(), spec.annotations.as_ref());
    if !host_network {
        apply_multus(
            &instance.cluster.spec.network,
            &instance.namespace(),
            false,
            &mut pod_meta,
        )?;
    }

    let mut metadata = instance.metadata(name);
    apply_user_metadata(&mut metadata, spec.labels.as_ref(), spec.annotations.as_ref());

    Ok(Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(pod_meta),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Builds the Service of one instance. Headless in host-network mode.
#[must_use]
pub fn build_service(instance: &GatewayInstance<'_>) -> Service {
    let ports = resolve_ports(instance.gateway.spec.ports.as_ref());
    Service {
        metadata: instance.metadata(instance.name()),
        spec: Some(ServiceSpec {
            selector: Some(instance.labels()),
            ports: Some(
                ports
                    .named()
                    .into_iter()
                    .map(|(name, port)| ServicePort {
                        name: Some(name.to_string()),
                        port,
                        target_port: Some(IntOrString::Int(port)),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            cluster_ip: instance.host_network().then(|| "None".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
