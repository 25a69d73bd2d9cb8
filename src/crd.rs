// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Ceph auxiliary daemons.
//!
//! This module defines the Kubernetes Custom Resource Definitions reconciled by the
//! operator, plus the subset of the `CephCluster` and `CephObjectStore` resources the
//! reconcilers read.
//!
//! # Resource Types
//!
//! ## Referenced (read-only)
//!
//! - [`CephCluster`] - The storage cluster every other resource runs against
//! - [`CephObjectStore`] - A named RGW deployment that users and topics target
//!
//! ## Reconciled
//!
//! - [`CephNVMeOFGateway`] - Multi-instance NVMe-oF gateway deployment
//! - [`CephRBDMirror`] - Multi-instance RBD mirror daemon deployment
//! - [`CephObjectStoreUser`] - An S3 user with managed or explicit access keys
//! - [`CephBucketTopic`] - A bucket notification topic with a push endpoint
//!
//! # Example: Creating an NVMe-oF gateway
//!
//! ```rust,no_run
//! use rook_ceph_operator::crd::CephNVMeOFGatewaySpec;
//!
//! let spec = CephNVMeOFGatewaySpec {
//!     instances: 2,
//!     pool: "nvmeof".to_string(),
//!     group: "group-a".to_string(),
//!     ..Default::default()
//! };
//! ```

use k8s_openapi::api::core::v1::{Affinity, PodSpec, Probe, ResourceRequirements, Toleration};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Shared types
// ============================================================================

/// Reference to a key inside a Secret in the same namespace as the referring resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Name of the Secret
    pub name: String,

    /// Key within the Secret's data
    pub key: String,
}

/// Identity of a Secret whose content was last used by a reconcile.
///
/// Recorded in status so that Secret changes can be mapped back to the resources
/// that consumed them.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretIdentity {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub resource_version: String,
}

/// Cephx key rotation policy for a class of daemons.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephxConfig {
    /// One of `Disabled`, `KeyGeneration`, `WithCephVersionUpdate`. Empty means disabled.
    #[serde(default)]
    pub key_rotation_policy: String,

    /// Desired key generation for the `KeyGeneration` policy.
    ///
    /// Increasing this value past the generation recorded in status rotates the key.
    #[serde(default)]
    pub key_generation: u32,
}

/// Recorded cephx key state of a daemon.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephxStatus {
    /// Generation of the daemon's current key. Never decreases.
    #[serde(default)]
    pub key_generation: u32,

    /// Ceph version (`MAJOR.MINOR.EXTRA-BUILD`) that created the current key.
    #[serde(default)]
    pub key_ceph_version: String,
}

/// Cephx status of the daemons owned by a single resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalCephxStatus {
    #[serde(default)]
    pub daemon: CephxStatus,
}

/// Pod scheduling constraints applied to daemon pods.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub affinity: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub tolerations: Option<Vec<Toleration>>,
}

impl Placement {
    /// Applies the scheduling constraints to `spec`. Unset fields leave `spec` untouched.
    pub fn apply_to_pod_spec(&self, spec: &mut PodSpec) {
        if let Some(node_selector) = &self.node_selector {
            spec.node_selector = Some(node_selector.clone());
        }
        if let Some(affinity) = &self.affinity {
            spec.affinity = Some(affinity.clone());
        }
        if let Some(tolerations) = &self.tolerations {
            spec.tolerations
                .get_or_insert_with(Vec::new)
                .extend(tolerations.iter().cloned());
        }
    }
}

/// Liveness probe overrides.
///
/// The probe handler is always the operator's default; only scalar fields of `probe`
/// (delays, thresholds, timeouts) are taken from here.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSpec {
    /// Removes the liveness probe entirely
    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub probe: Option<Probe>,
}

/// Schema for embedded Kubernetes core types, accepted as-is by the API server.
fn preserve_unknown_fields(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

// ============================================================================
// CephCluster (referenced)
// ============================================================================

/// Ceph container image settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephVersionSpec {
    /// Ceph image, e.g. `quay.io/ceph/ceph:v20.2.0`
    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
}

/// External cluster settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSpec {
    /// The cluster is managed outside this operator; the upgrade gate is skipped.
    #[serde(default)]
    pub enable: bool,
}

/// Cluster network settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Network provider: empty (pod network), `host` or `multus`
    #[serde(default)]
    pub provider: String,

    /// Legacy switch equivalent to `provider: host`
    #[serde(default)]
    pub host_network: bool,

    /// Network attachment definitions keyed by `public` / `cluster`.
    ///
    /// Values are `<namespace>/<name>` or `<name>` (cluster namespace implied).
    #[serde(default)]
    pub selectors: BTreeMap<String, String>,
}

impl NetworkSpec {
    /// Returns `true` if daemons run in the host network namespace.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.host_network || self.provider == "host"
    }

    /// Returns `true` if Multus attachments are configured.
    #[must_use]
    pub fn is_multus(&self) -> bool {
        self.provider == "multus"
    }
}

/// Cluster-wide security settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    #[serde(default)]
    pub cephx: ClusterCephxConfig,
}

/// Cephx policies per daemon class.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCephxConfig {
    /// Policy for Ceph daemons run by the operator
    #[serde(default)]
    pub daemon: CephxConfig,
}

/// `CephCluster` describes the storage cluster. Only the fields read by this operator
/// are modelled; unknown fields are preserved by the API server.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephCluster",
    namespaced,
    doc = "CephCluster is the storage cluster that auxiliary daemons attach to."
)]
#[kube(status = "CephClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct CephClusterSpec {
    #[serde(default)]
    pub ceph_version: CephVersionSpec,

    #[serde(default)]
    pub external: ExternalSpec,

    #[serde(default)]
    pub network: NetworkSpec,

    #[serde(default)]
    pub security: SecuritySpec,

    /// Host path for daemon data. Empty means daemons use emptyDir volumes.
    #[serde(default)]
    pub data_dir_host_path: String,

    /// User overrides pushed to the mon config store, keyed by `who` then option.
    #[serde(default)]
    pub ceph_config: BTreeMap<String, BTreeMap<String, String>>,
}

/// Version reported by the cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersion {
    #[serde(default)]
    pub image: String,

    /// Version in `MAJOR.MINOR.EXTRA-BUILD` form
    #[serde(default)]
    pub version: String,
}

/// `CephCluster` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephClusterStatus {
    #[serde(default)]
    pub phase: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ClusterVersion>,
}

// ============================================================================
// CephObjectStore (referenced)
// ============================================================================

/// RGW gateway settings of an object store.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    #[serde(default)]
    pub port: i32,

    #[serde(default)]
    pub secure_port: i32,
}

/// `CephObjectStore` identifies an RGW deployment.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephObjectStore",
    namespaced,
    doc = "CephObjectStore is an RGW object store that users and topics are created in."
)]
#[kube(status = "CephObjectStoreStatus")]
#[serde(rename_all = "camelCase")]
pub struct CephObjectStoreSpec {
    #[serde(default)]
    pub gateway: GatewaySpec,

    /// Namespaces, other than the store's own, allowed to create users and topics in this
    /// store. `*` allows every namespace.
    #[serde(default)]
    pub allow_users_in_namespaces: Vec<String>,
}

/// `CephObjectStore` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephObjectStoreStatus {
    #[serde(default)]
    pub phase: String,

    /// Connection details; `endpoint` holds the in-cluster S3 endpoint.
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

// ============================================================================
// CephObjectStoreUser
// ============================================================================

/// An explicit access key pair sourced from Secrets.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUserKey {
    pub access_key_ref: SecretKeyRef,
    pub secret_key_ref: SecretKeyRef,
}

/// Admin capabilities granted to an RGW user. Each value is `read`, `write`, `*` or
/// `read, write`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUserCapSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

/// User quotas. Unset fields leave the RGW default in place.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUserQuotaSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buckets: Option<i64>,

    /// Maximum total size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_objects: Option<i64>,
}

/// `CephObjectStoreUser` is an S3 user in a `CephObjectStore`.
///
/// # Example
///
/// ```yaml
/// apiVersion: ceph.rook.io/v1
/// kind: CephObjectStoreUser
/// metadata:
///   name: app-user
///   namespace: app
/// spec:
///   store: my-store
///   clusterNamespace: rook-ceph
///   opMask: "read, write"
///   keys:
///     - accessKeyRef: {name: app-key-1, key: access}
///       secretKeyRef: {name: app-key-1, key: secret}
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephObjectStoreUser",
    namespaced,
    shortname = "rcou",
    doc = "CephObjectStoreUser is an S3 user in a CephObjectStore. Without explicit keys the operator manages one key and publishes it in a Secret."
)]
#[kube(status = "ObjectStoreUserStatus")]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreUserSpec {
    /// Name of the `CephObjectStore`
    #[serde(default)]
    pub store: String,

    /// Namespace of the `CephObjectStore`. Defaults to the user's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_namespace: Option<String>,

    /// Display name. Defaults to the resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ObjectUserCapSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotas: Option<ObjectUserQuotaSpec>,

    /// Allowed operations: any of `read`, `write`, `delete` or `*`, comma separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^(\*|((read|write|delete)(\s*,\s*(read|write|delete))*))$"))]
    pub op_mask: Option<String>,

    /// Explicit access keys. Empty means the operator manages a single key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<ObjectUserKey>>,
}

/// `CephObjectStoreUser` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreUserStatus {
    #[serde(default)]
    pub phase: String,

    /// `secretName` of the managed Secret when the operator manages the key
    #[serde(default)]
    pub info: BTreeMap<String, String>,

    /// Secrets whose keys were applied in explicit mode
    #[serde(default)]
    pub keys: Vec<SecretIdentity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

// ============================================================================
// CephBucketTopic
// ============================================================================

/// HTTP push endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpEndpointSpec {
    /// `http://` or `https://` URI
    pub uri: String,

    #[serde(default)]
    pub disable_verify_ssl: bool,

    #[serde(default)]
    pub send_cloud_events: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_secret_ref: Option<SecretKeyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_ref: Option<SecretKeyRef>,
}

/// AMQP push endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmqpEndpointSpec {
    /// `amqp://` or `amqps://` URI
    pub uri: String,

    #[serde(default)]
    pub disable_verify_ssl: bool,

    /// `none`, `broker` or `routable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_level: Option<String>,

    pub exchange: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_secret_ref: Option<SecretKeyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_ref: Option<SecretKeyRef>,
}

/// Kafka push endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaEndpointSpec {
    /// `kafka://` URI
    pub uri: String,

    #[serde(default, rename = "useSSL")]
    pub use_ssl: bool,

    #[serde(default)]
    pub disable_verify_ssl: bool,

    /// `none` or `broker`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_level: Option<String>,

    /// SASL mechanism, e.g. `PLAIN` or `SCRAM-SHA-512`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_secret_ref: Option<SecretKeyRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_secret_ref: Option<SecretKeyRef>,
}

/// Push endpoint of a topic. Exactly one variant must be set.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicEndpointSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpEndpointSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amqp: Option<AmqpEndpointSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaEndpointSpec>,
}

/// `CephBucketTopic` is a bucket notification topic in a `CephObjectStore`.
///
/// # Example
///
/// ```yaml
/// apiVersion: ceph.rook.io/v1
/// kind: CephBucketTopic
/// metadata:
///   name: events
///   namespace: app
/// spec:
///   objectStoreName: my-store
///   objectStoreNamespace: rook-ceph
///   endpoint:
///     kafka:
///       uri: kafka://kafka.app.svc:9092
///       userSecretRef: {name: kafka-creds, key: user}
///       passwordSecretRef: {name: kafka-creds, key: password}
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephBucketTopic",
    namespaced,
    doc = "CephBucketTopic is a bucket notification topic whose push endpoint credentials are sourced from Secrets."
)]
#[kube(status = "BucketTopicStatus")]
#[serde(rename_all = "camelCase")]
pub struct BucketTopicSpec {
    pub object_store_name: String,

    pub object_store_namespace: String,

    /// Opaque data attached to every notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opaque_data: Option<String>,

    /// Deliver notifications asynchronously with retries
    #[serde(default)]
    pub persistent: bool,

    pub endpoint: TopicEndpointSpec,
}

/// `CephBucketTopic` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketTopicStatus {
    #[serde(default)]
    pub phase: String,

    /// ARN returned by RGW when the topic was created
    #[serde(default, rename = "ARN", skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    /// Secrets whose data was last propagated to the topic
    #[serde(default)]
    pub secrets: Vec<SecretIdentity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

// ============================================================================
// CephNVMeOFGateway
// ============================================================================

/// Port overrides. Zero keeps the default.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NVMeOFPorts {
    #[serde(default)]
    pub io_port: i32,
    #[serde(default)]
    pub gateway_port: i32,
    #[serde(default)]
    pub monitor_port: i32,
    #[serde(default)]
    pub discovery_port: i32,
}

/// `CephNVMeOFGateway` runs a group of NVMe-oF gateways exporting RBD images.
///
/// # Example
///
/// ```yaml
/// apiVersion: ceph.rook.io/v1
/// kind: CephNVMeOFGateway
/// metadata:
///   name: gw
///   namespace: rook-ceph
/// spec:
///   instances: 2
///   pool: nvmeof
///   group: group-a
///   nvmeOFConfig:
///     gateway:
///       enable_auth: "True"
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephNVMeOFGateway",
    namespaced,
    shortname = "nvmeof",
    doc = "CephNVMeOFGateway runs a group of NVMe-oF gateway daemons, one Deployment, Service and ConfigMap per instance."
)]
#[kube(status = "NVMeOFGatewayStatus")]
#[serde(rename_all = "camelCase")]
pub struct CephNVMeOFGatewaySpec {
    /// Number of gateway instances
    #[serde(default)]
    pub instances: i32,

    /// RBD pool backing the gateway group
    #[serde(default)]
    pub pool: String,

    /// ANA group name
    #[serde(default)]
    pub group: String,

    /// Gateway image. Defaults to the operator's NVMe-oF image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<NVMeOFPorts>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<ProbeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// Existing ConfigMap holding `nvmeof.conf` under key `config`.
    ///
    /// When set, no ConfigMap is generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_ref: Option<String>,

    /// Overrides merged over the generated `nvmeof.conf`, keyed by section then key.
    #[serde(default, rename = "nvmeOFConfig", skip_serializing_if = "Option::is_none")]
    pub nvmeof_config: Option<BTreeMap<String, BTreeMap<String, String>>>,

    /// Run in the host network. Defaults to the cluster network setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_network: Option<bool>,
}

impl CephNVMeOFGatewaySpec {
    /// Resolves host networking against the cluster default.
    #[must_use]
    pub fn is_host_network(&self, cluster: &CephClusterSpec) -> bool {
        self.host_network.unwrap_or_else(|| cluster.network.is_host())
    }
}

/// `CephNVMeOFGateway` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NVMeOFGatewayStatus {
    #[serde(default)]
    pub phase: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub cephx: LocalCephxStatus,
}

// ============================================================================
// CephRBDMirror
// ============================================================================

/// Bootstrap peers to import.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MirroringPeerSpec {
    /// Secrets holding `token`, `pool` and optionally `direction`
    #[serde(default)]
    pub secret_names: Vec<String>,
}

/// `CephRBDMirror` runs RBD mirror daemons.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephRBDMirror",
    namespaced,
    doc = "CephRBDMirror runs count RBD mirror daemons and imports bootstrap peers."
)]
#[kube(status = "RBDMirrorStatus")]
#[serde(rename_all = "camelCase")]
pub struct RBDMirroringSpec {
    /// Number of mirror daemons
    #[serde(default)]
    pub count: i32,

    #[serde(default)]
    pub peers: MirroringPeerSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// `CephRBDMirror` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RBDMirrorStatus {
    #[serde(default)]
    pub phase: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub cephx: LocalCephxStatus,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
