// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Ceph operator core.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Kind name for `CephCluster` resource
pub const KIND_CEPH_CLUSTER: &str = "CephCluster";

/// Kind name for `CephObjectStoreUser` resource
pub const KIND_OBJECT_STORE_USER: &str = "CephObjectStoreUser";

/// Kind name for `CephBucketTopic` resource
pub const KIND_BUCKET_TOPIC: &str = "CephBucketTopic";

/// Kind name for `CephNVMeOFGateway` resource
pub const KIND_NVMEOF_GATEWAY: &str = "CephNVMeOFGateway";

/// Kind name for `CephRBDMirror` resource
pub const KIND_RBD_MIRROR: &str = "CephRBDMirror";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "rook-ceph-operator";

/// Reporting controller name used on emitted events
pub const EVENT_REPORTER: &str = "rook-ceph-operator";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `CephObjectStoreUser` resources
pub const FINALIZER_OBJECT_STORE_USER: &str = "cephobjectstoreuser.ceph.rook.io";

/// Finalizer for `CephBucketTopic` resources
pub const FINALIZER_BUCKET_TOPIC: &str = "cephbuckettopic.ceph.rook.io";

/// Finalizer for `CephNVMeOFGateway` resources
pub const FINALIZER_NVMEOF_GATEWAY: &str = "cephnvmeofgateway.ceph.rook.io";

/// Finalizer for `CephRBDMirror` resources
pub const FINALIZER_RBD_MIRROR: &str = "cephrbdmirror.ceph.rook.io";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue delay while the referenced `CephCluster` is absent or not `Ready`
pub const CLUSTER_NOT_READY_REQUEUE_SECS: u64 = 10;

/// Requeue delay while the operator has not loaded cluster connection info yet
pub const OPERATOR_NOT_INITIALIZED_REQUEUE_SECS: u64 = 10;

/// Requeue delay while the running Ceph version differs from the desired one
pub const UPGRADE_IN_PROGRESS_REQUEUE_SECS: u64 = 10;

/// Periodic re-sync interval for resources that reconciled successfully
pub const READY_REQUEUE_SECS: u64 = 300;

/// Requeue interval for resources that are still converging
pub const NOT_READY_REQUEUE_SECS: u64 = 30;

/// Initial requeue delay after a failed reconcile
pub const ERROR_REQUEUE_INITIAL_SECS: u64 = 5;

/// Upper bound for the per-object error requeue delay
pub const ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Number of consecutive remote failures after which the phase becomes `ReconcileFailed`
pub const REMOTE_FAILURES_BEFORE_FAILED_PHASE: u32 = 3;

/// Maximum optimistic-concurrency retries for a status update
pub const STATUS_UPDATE_MAX_RETRIES: u32 = 5;

// ============================================================================
// Storage-Cluster Command Constants
// ============================================================================

/// Default timeout for a single storage-cluster command
pub const DEFAULT_CEPH_COMMAND_TIMEOUT_SECS: u64 = 15;

/// Default retry count for polling operations
pub const DEFAULT_RETRY_COUNT: u32 = 30;

/// Default retry interval for polling operations
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

/// errno reported by the storage cluster when an entity already exists
pub const ERRNO_EEXIST: i32 = 17;

/// errno reported by the storage cluster when an entity does not exist
pub const ERRNO_ENOENT: i32 = 2;

/// Ceph CLI binary
pub const CEPH_BINARY: &str = "ceph";

/// RGW admin CLI binary
pub const RADOSGW_ADMIN_BINARY: &str = "radosgw-admin";

/// RBD CLI binary
pub const RBD_BINARY: &str = "rbd";

// ============================================================================
// Cluster Config Constants
// ============================================================================

/// Secret holding `mon_host` / `mon_initial_members` for daemon pods
pub const CLUSTER_CONFIG_SECRET: &str = "rook-ceph-config";

/// Key of the comma-joined mon address list in the cluster config Secret
pub const MON_HOST_KEY: &str = "mon_host";

/// Key of the comma-joined mon names in the cluster config Secret
pub const MON_INITIAL_MEMBERS_KEY: &str = "mon_initial_members";

/// ConfigMap that records the mon endpoints (`a=10.0.0.1:6789,...`)
pub const MON_ENDPOINTS_CONFIGMAP: &str = "rook-ceph-mon-endpoints";

/// Key in the mon endpoints ConfigMap holding the endpoint list
pub const MON_ENDPOINTS_KEY: &str = "data";

/// Secret holding the cluster fsid and admin secret
pub const MON_SECRET: &str = "rook-ceph-mon";

/// Key of the fsid in the mon Secret
pub const MON_SECRET_FSID_KEY: &str = "fsid";

/// Key of the admin key in the mon Secret
pub const MON_SECRET_ADMIN_KEY: &str = "ceph-secret";

/// msgr2 port every mon listens on
pub const MSGR2_PORT: u16 = 3300;

/// Legacy msgr1 port
pub const MSGR1_PORT: u16 = 6789;

/// Env var carrying the mon host list into daemon containers
pub const ENV_MON_HOST: &str = "ROOK_CEPH_MON_HOST";

/// Env var carrying the mon initial members into daemon containers
pub const ENV_MON_INITIAL_MEMBERS: &str = "ROOK_CEPH_MON_INITIAL_MEMBERS";

/// Directory holding ceph.conf and keyrings inside containers
pub const CEPH_CONFIG_DIR: &str = "/etc/ceph";

/// Keyring path used by daemons after the init container copied it
pub const DAEMON_KEYRING_PATH: &str = "/etc/ceph/keyring";

/// Directory the admin keyring Secret is mounted at
pub const ADMIN_KEYRING_DIR: &str = "/etc/ceph/admin-keyring-store";

/// Admin keyring path inside containers that mount the admin keyring Secret
pub const ADMIN_KEYRING_PATH: &str = "/etc/ceph/admin-keyring-store/keyring";

/// Directory a daemon keyring Secret is mounted at
pub const DAEMON_KEYRING_DIR: &str = "/etc/ceph/keyring-store";

/// Log directory inside every daemon container
pub const CONTAINER_LOG_DIR: &str = "/var/log/ceph";

/// Crash directory inside every daemon container
pub const CONTAINER_CRASH_DIR: &str = "/var/lib/ceph/crash";

/// Secret type used for operator-generated Secrets
pub const ROOK_SECRET_TYPE: &str = "kubernetes.io/rook";

// ============================================================================
// NVMe-oF Gateway Constants
// ============================================================================

/// Application name for NVMe-oF gateway resources
pub const NVMEOF_APP_NAME: &str = "rook-ceph-nvmeof";

/// Daemon type reported in labels for NVMe-oF gateways
pub const NVMEOF_DAEMON_TYPE: &str = "nvmeof";

/// Resource kind recorded in the recommended labels of gateway pods
pub const NVMEOF_RESOURCE_KIND: &str = "cephnvmeofgateways.ceph.rook.io";

/// Default NVMe-oF gateway image
pub const DEFAULT_NVMEOF_IMAGE: &str = "quay.io/ceph/nvmeof:1.5";

/// Service account used by gateway pods
pub const NVMEOF_SERVICE_ACCOUNT: &str = "rook-ceph-nvmeof";

/// ConfigMap key holding the rendered gateway INI file
pub const NVMEOF_CONFIG_KEY: &str = "config";

/// File name of the gateway config inside the container
pub const NVMEOF_CONFIG_FILE: &str = "nvmeof.conf";

/// Sentinel replaced by the pod IP at container start
pub const POD_IP_SENTINEL: &str = "@@POD_IP@@";

/// Default NVMe/TCP I/O port
pub const NVMEOF_IO_PORT: i32 = 4420;

/// Default gateway gRPC port
pub const NVMEOF_GATEWAY_PORT: i32 = 5500;

/// Default monitor client port
pub const NVMEOF_MONITOR_PORT: i32 = 5499;

/// Default discovery controller port
pub const NVMEOF_DISCOVERY_PORT: i32 = 8009;

/// Init container that renders ceph.conf and the gateway config
pub const NVMEOF_INIT_CONTAINER: &str = "generate-ceph-conf";

/// Main gateway container
pub const NVMEOF_CONTAINER: &str = "nvmeof-gateway";

/// Secret holding the admin keyring mounted by the init container
pub const ADMIN_KEYRING_SECRET: &str = "rook-ceph-admin-keyring";

/// Key of the keyring file inside keyring Secrets
pub const KEYRING_SECRET_KEY: &str = "keyring";

/// Initial delay for the default TCP liveness probe
pub const LIVENESS_INITIAL_DELAY_SECS: i32 = 10;

// ============================================================================
// RBD Mirror Constants
// ============================================================================

/// Application name for RBD mirror resources
pub const RBD_MIRROR_APP_NAME: &str = "rook-ceph-rbd-mirror";

/// Daemon type reported in labels for RBD mirror daemons
pub const RBD_MIRROR_DAEMON_TYPE: &str = "rbdmirror";

/// Default mirroring direction for imported bootstrap peers
pub const DEFAULT_PEER_DIRECTION: &str = "rx-tx";

/// Plural resource name used in RBD mirror component labels
pub const RBD_MIRROR_RESOURCE_KIND: &str = "cephrbdmirrors.ceph.rook.io";

/// Container running the RBD mirror daemon
pub const RBD_MIRROR_CONTAINER: &str = "rbd-mirror";

/// Service account of RBD mirror pods
pub const RBD_MIRROR_SERVICE_ACCOUNT: &str = "rook-ceph-rbd-mirror";

// ============================================================================
// Object Store Constants
// ============================================================================

/// Application name used in object store user Secret labels
pub const RGW_APP_NAME: &str = "rook-ceph-rgw";

/// RGW user whose key signs topic API calls
pub const RGW_ADMIN_OPS_USER: &str = "rgw-admin-ops-user";

/// Display name of [`RGW_ADMIN_OPS_USER`]
pub const RGW_ADMIN_OPS_DISPLAY_NAME: &str = "RGW Admin Ops User";

/// Caps granted to [`RGW_ADMIN_OPS_USER`]
pub const RGW_ADMIN_OPS_CAPS: &str = "buckets=*;users=*;usage=read;metadata=read;zone=read";

/// Timeout of an HTTP call to an object store endpoint
pub const RGW_HTTP_TIMEOUT_SECS: u64 = 15;

/// Prefix of the canonical object store user Secret
pub const OBJECT_USER_SECRET_PREFIX: &str = "rook-ceph-object-user";

/// Canonical Secret key holding the S3 access key
pub const SECRET_ACCESS_KEY: &str = "AccessKey";

/// Canonical Secret key holding the S3 secret key
pub const SECRET_SECRET_KEY: &str = "SecretKey";

/// Canonical Secret key holding the object store endpoint
pub const SECRET_ENDPOINT_KEY: &str = "Endpoint";

// ============================================================================
// OSD Partition Constants
// ============================================================================

/// Default WAL partition size
pub const WAL_DEFAULT_SIZE_MB: i64 = 576;

/// Default DB partition size
pub const DB_DEFAULT_SIZE_MB: i64 = 20480;

/// Size marker meaning "use remaining space"
pub const USE_REMAINING_SPACE: i64 = -1;

/// 512-byte sectors per megabyte
pub const SECTORS_PER_MB: i64 = 2048;

/// Key of the partition scheme inside the per-node ConfigMap
pub const PARTITION_SCHEME_KEY: &str = "partition-scheme";

// ============================================================================
// Metrics / HTTP Constants
// ============================================================================

/// Default bind address for the metrics and health endpoints
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Default directory of the per-cluster connection files
pub const DEFAULT_CONFIG_DIR: &str = "/var/lib/rook";

/// Number of Tokio worker threads for the operator runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
