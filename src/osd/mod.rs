// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OSD device layout persistence.
//!
//! Each node records how its OSD devices are partitioned in a [`partition::PerfScheme`],
//! stored as JSON under the `partition-scheme` key of the node's
//! `rook-ceph-osd-<node>-config` ConfigMap (or a directory on disk, see [`store`]).

pub mod partition;
pub mod store;

pub use partition::{
    BluestoreConfig, MetadataDeviceInfo, PartitionError, PartitionType, PerfScheme,
    PerfSchemeEntry, StoreType,
};
pub use store::{ConfigMapKvStore, FileKvStore, KvStore};
