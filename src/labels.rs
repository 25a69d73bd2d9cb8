// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and Rook/Ceph-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "ceph-nvmeof")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application (e.g., "ceph-nvmeof")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Label recording which CR kind created the resource
pub const K8S_CREATED_BY: &str = "app.kubernetes.io/created-by";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_ROOK: &str = "rook-ceph-operator";

/// Value for `app.kubernetes.io/created-by`
pub const CREATED_BY_ROOK: &str = "rook-ceph-operator";

// ============================================================================
// Rook Labels
// ============================================================================

/// Application label (`rook-ceph-nvmeof`, `rook-ceph-rbd-mirror`, ...)
pub const APP: &str = "app";

/// Namespace of the owning CephCluster
pub const ROOK_CLUSTER: &str = "rook_cluster";

/// Object store a user Secret belongs to
pub const ROOK_OBJECT_STORE: &str = "rook_object_store";

/// RGW user id a Secret belongs to
pub const USER: &str = "user";

/// Ceph daemon type (`nvmeof`, `rbdmirror`)
pub const CEPH_DAEMON_TYPE: &str = "ceph_daemon_type";

/// Ceph daemon id (`a`, `b`, ...)
pub const CEPH_DAEMON_ID: &str = "ceph_daemon_id";

/// Per-node partition scheme ConfigMaps carry the node name here
pub const NODE_NAME: &str = "node_name";

// ============================================================================
// Annotations
// ============================================================================

/// Pod-template annotation carrying the hash of the generated config
pub const CONFIG_HASH_ANNOTATION: &str = "config-hash";

/// Multus network selection annotation
pub const MULTUS_NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";

/// Builds the `app` + `rook_cluster` labels common to every daemon resource.
#[must_use]
pub fn app_labels(app_name: &str, namespace: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP.to_string(), app_name.to_string());
    labels.insert(ROOK_CLUSTER.to_string(), namespace.to_string());
    labels
}

/// Builds pod labels for a Ceph daemon.
///
/// Daemon type is the Ceph daemon type (`nvmeof`, `rbdmirror`), daemon id is the short
/// alphabetic instance id, parent name is the owning CR and resource kind its plural
/// resource name. The daemon id is also reported keyed by daemon type (`nvmeof: a`).
#[must_use]
pub fn ceph_daemon_app_labels(
    app_name: &str,
    namespace: &str,
    daemon_type: &str,
    daemon_id: &str,
    parent_name: &str,
    resource_kind: &str,
) -> BTreeMap<String, String> {
    let mut labels = app_labels(app_name, namespace);
    labels.insert(CEPH_DAEMON_TYPE.to_string(), daemon_type.to_string());
    labels.insert(CEPH_DAEMON_ID.to_string(), daemon_id.to_string());
    labels.insert(daemon_type.to_string(), daemon_id.to_string());
    labels.insert(K8S_NAME.to_string(), format!("ceph-{daemon_type}"));
    labels.insert(K8S_INSTANCE.to_string(), daemon_id.to_string());
    labels.insert(K8S_COMPONENT.to_string(), resource_kind.to_string());
    labels.insert(K8S_PART_OF.to_string(), parent_name.to_string());
    labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_ROOK.to_string());
    labels.insert(K8S_CREATED_BY.to_string(), CREATED_BY_ROOK.to_string());
    labels
}

/// Label selector string matching every daemon of `app_name` created for `parent_name`.
#[must_use]
pub fn instance_selector(app_name: &str, parent_name: &str) -> String {
    format!("{APP}={app_name},{K8S_PART_OF}={parent_name}")
}

/// Merges user supplied labels and annotations into `meta`. User values win.
pub fn apply_user_metadata(
    meta: &mut ObjectMeta,
    labels: Option<&BTreeMap<String, String>>,
    annotations: Option<&BTreeMap<String, String>>,
) {
    if let Some(labels) = labels.filter(|l| !l.is_empty()) {
        meta.labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(annotations) = annotations.filter(|a| !a.is_empty()) {
        meta.annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
