// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment and keyring Secret of one RBD mirror daemon.

use crate::config::datapath::DataPathMap;
use crate::config::flags::{daemon_env_vars, daemon_flags};
use crate::config::network::apply_multus;
use crate::constants::{
    DAEMON_KEYRING_DIR, KEYRING_SECRET_KEY, RBD_MIRROR_APP_NAME, RBD_MIRROR_CONTAINER,
    RBD_MIRROR_DAEMON_TYPE, RBD_MIRROR_RESOURCE_KIND, RBD_MIRROR_SERVICE_ACCOUNT,
};
use crate::crd::{CephCluster, CephRBDMirror};
use crate::labels::{apply_user_metadata, ceph_daemon_app_labels, CONFIG_HASH_ANNOTATION};
use crate::reconcilers::owner_reference;
use anyhow::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, PodSpec, PodTemplateSpec, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const KEYRING_VOLUME: &str = "rook-ceph-rbd-mirror-keyring";

/// `rook-ceph-rbd-mirror-<id>`
#[must_use]
pub fn deployment_name(daemon_id: &str) -> String {
    format!("{RBD_MIRROR_APP_NAME}-{daemon_id}")
}

/// `rook-ceph-rbd-mirror-<id>-keyring`
#[must_use]
pub fn keyring_secret_name(daemon_id: &str) -> String {
    format!("{RBD_MIRROR_APP_NAME}-{daemon_id}-keyring")
}

/// Hash of a rendered keyring, stamped on the pod template so a rotated key restarts
/// the daemon.
#[must_use]
pub fn keyring_hash(keyring: &str) -> String {
    format!("{:x}", Sha256::digest(keyring.as_bytes()))
}

/// One mirror daemon to render.
#[derive(Debug, Clone, Copy)]
pub struct MirrorDaemon<'a> {
    pub mirror: &'a CephRBDMirror,
    pub cluster: &'a CephCluster,
    pub fsid: &'a str,
    pub daemon_id: &'a str,
}

impl MirrorDaemon<'_> {
    fn namespace(&self) -> String {
        self.mirror.namespace().unwrap_or_default()
    }

    /// Daemon labels, also used as pod selector.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        ceph_daemon_app_labels(
            RBD_MIRROR_APP_NAME,
            &self.namespace(),
            RBD_MIRROR_DAEMON_TYPE,
            self.daemon_id,
            &self.mirror.name_any(),
            RBD_MIRROR_RESOURCE_KIND,
        )
    }

    fn data_paths(&self) -> DataPathMap {
        DataPathMap::dataless(&self.namespace(), &self.cluster.spec.data_dir_host_path)
    }

    fn container(&self) -> Container {
        let image = &self.cluster.spec.ceph_version;
        let keyring_path = format!("{DAEMON_KEYRING_DIR}/{KEYRING_SECRET_KEY}");
        let mut args = daemon_flags(
            self.fsid,
            &keyring_path,
            &format!("rbd-mirror.{}", self.daemon_id),
        );
        args.push("--foreground".to_string());

        let mut mounts = vec![VolumeMount {
            name: KEYRING_VOLUME.to_string(),
            mount_path: DAEMON_KEYRING_DIR.to_string(),
            read_only: Some(true),
            ..Default::default()
        }];
        mounts.extend(self.data_paths().volume_mounts());

        Container {
            name: RBD_MIRROR_CONTAINER.to_string(),
            image: Some(image.image.clone()),
            image_pull_policy: image.image_pull_policy.clone(),
            command: Some(vec!["rbd-mirror".to_string()]),
            args: Some(args),
            env: Some(daemon_env_vars(&image.image)),
            volume_mounts: Some(mounts),
            resources: self.mirror.spec.resources.clone(),
            ..Default::default()
        }
    }

    fn volumes(&self) -> Vec<Volume> {
        let mut volumes = vec![Volume {
            name: KEYRING_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(keyring_secret_name(self.daemon_id)),
                ..Default::default()
            }),
            ..Default::default()
        }];
        volumes.extend(self.data_paths().volumes());
        volumes
    }
}

/// Builds the Deployment of one daemon. `keyring_hash` restarts the pod when its key
/// changes.
///
/// # Errors
///
/// Returns an error if the cluster's Multus selectors do not parse.
pub fn build_deployment(daemon: &MirrorDaemon<'_>, keyring_hash: &str) -> Result<Deployment> {
    let spec = &daemon.mirror.spec;
    let name = deployment_name(daemon.daemon_id);
    let labels = daemon.labels();
    let host_network = daemon.cluster.spec.network.is_host();

    let mut pod_spec = PodSpec {
        containers: vec![daemon.container()],
        volumes: Some(daemon.volumes()),
        restart_policy: Some("Always".to_string()),
        host_network: host_network.then_some(true),
        dns_policy: host_network.then(|| "ClusterFirstWithHostNet".to_string()),
        priority_class_name: spec.priority_class_name.clone(),
        service_account_name: Some(RBD_MIRROR_SERVICE_ACCOUNT.to_string()),
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
            keyring_hash.to_string(),
        )])),
        ..Default::default()
    };
    apply_user_metadata(&mut pod_meta, spec.labels.as_ref(), spec.annotations.as_ref());
    if !host_network {
        apply_multus(
            &daemon.cluster.spec.network,
            &daemon.namespace(),
            false,
            &mut pod_meta,
        )?;
    }

    let mut metadata = ObjectMeta {
        name: Some(name),
        namespace: Some(daemon.namespace()),
        labels: Some(labels.clone()),
        owner_references: owner_reference(daemon.mirror).map(|o| vec![o]),
        ..Default::default()
    };
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

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
