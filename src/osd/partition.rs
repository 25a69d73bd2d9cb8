// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Partition layouts for OSD devices and the `sgdisk` arguments that create them.
//!
//! Sizes and offsets are in MB; a size of [`USE_REMAINING_SPACE`] gives the partition the
//! rest of the device. Offsets start at 1 MB to leave room for the partition table.

use super::store::KvStore;
use crate::constants::{
    DB_DEFAULT_SIZE_MB, PARTITION_SCHEME_KEY, SECTORS_PER_MB, USE_REMAINING_SPACE,
    WAL_DEFAULT_SIZE_MB,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const FIRST_OFFSET_MB: i64 = 1;

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("partition scheme is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("partition scheme store {store:?} failed: {source}")]
    Store {
        store: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no partition scheme entry for osd {0}")]
    EntryNotFound(i32),

    #[error("osd {id} has no {kind} partition")]
    MissingPartition { id: i32, kind: PartitionType },
}

/// OSD backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    #[default]
    Bluestore,
    Filestore,
}

/// Role of a partition. Persisted as its number, also when used as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PartitionType {
    Wal = 0,
    Database = 1,
    Block = 2,
    FilestoreData = 3,
}

impl Serialize for PartitionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for PartitionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Wal),
            1 => Ok(Self::Database),
            2 => Ok(Self::Block),
            3 => Ok(Self::FilestoreData),
            other => Err(de::Error::custom(format!("unknown partition type {other}"))),
        }
    }
}

/// Reads `null` as the default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PartitionType {
    /// GPT partition name for osd `id`.
    #[must_use]
    pub fn label(self, id: i32) -> String {
        let suffix = match self {
            Self::Wal => "WAL",
            Self::Database => "DB",
            Self::Block => "BLOCK",
            Self::FilestoreData => "FS-DATA",
        };
        format!("ROOK-OSD{id}-{suffix}")
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wal => "wal",
            Self::Database => "db",
            Self::Block => "block",
            Self::FilestoreData => "data",
        })
    }
}

/// WAL and DB sizes; zero or negative values fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BluestoreConfig {
    pub wal_size_mb: i64,
    pub database_size_mb: i64,
}

impl BluestoreConfig {
    fn wal_size(self) -> i64 {
        if self.wal_size_mb > 0 {
            self.wal_size_mb
        } else {
            WAL_DEFAULT_SIZE_MB
        }
    }

    fn db_size(self) -> i64 {
        if self.database_size_mb > 0 {
            self.database_size_mb
        } else {
            DB_DEFAULT_SIZE_MB
        }
    }
}

/// Where one OSD partition lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionDetails {
    pub device: String,
    pub disk_uuid: String,
    pub partition_uuid: String,
    #[serde(rename = "sizeMB")]
    pub size_mb: i64,
    #[serde(rename = "offsetMB")]
    pub offset_mb: i64,
}

/// One OSD and its partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfSchemeEntry {
    pub id: i32,
    pub osd_uuid: Uuid,
    #[serde(default)]
    pub store_type: StoreType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partitions: BTreeMap<PartitionType, PartitionDetails>,
    /// The OSD filesystem was created on these partitions
    #[serde(default)]
    pub fs_created: bool,
}

/// A partition on the shared metadata device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDevicePartition {
    pub id: i32,
    pub osd_uuid: Uuid,
    #[serde(rename = "type")]
    pub kind: PartitionType,
    pub partition_uuid: String,
    #[serde(rename = "sizeMB")]
    pub size_mb: i64,
    #[serde(rename = "offsetMB")]
    pub offset_mb: i64,
}

/// A device holding the WAL and DB partitions of several OSDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDeviceInfo {
    pub device: String,
    #[serde(default)]
    pub disk_uuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partitions: Vec<MetadataDevicePartition>,
}

/// Partition layout of every OSD on a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfScheme {
    #[serde(default)]
    pub metadata: Option<MetadataDeviceInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<PerfSchemeEntry>,
}

fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn partition_args(number: usize, guid: &str, offset_mb: i64, size_mb: i64, label: &str) -> Vec<String> {
    let new_part = if size_mb == USE_REMAINING_SPACE {
        format!("--largest-new={number}")
    } else {
        format!(
            "--new={number}:{}:+{}",
            offset_mb * SECTORS_PER_MB,
            size_mb * SECTORS_PER_MB
        )
    };
    vec![
        new_part,
        format!("--change-name={number}:{label}"),
        format!("--partition-guid={number}:{guid}"),
    ]
}

impl PerfSchemeEntry {
    /// An entry with no partitions yet.
    #[must_use]
    pub fn new(id: i32, osd_uuid: Uuid, store_type: StoreType) -> Self {
        Self {
            id,
            osd_uuid,
            store_type,
            partitions: BTreeMap::new(),
            fs_created: false,
        }
    }

    /// Lays out WAL, DB and Block sequentially on `device`.
    #[must_use]
    pub fn collocated_bluestore(id: i32, osd_uuid: Uuid, device: &str, config: BluestoreConfig) -> Self {
        let mut entry = Self::new(id, osd_uuid, StoreType::Bluestore);
        let disk_uuid = new_uuid();
        let mut offset = FIRST_OFFSET_MB;
        for (kind, size) in [
            (PartitionType::Wal, config.wal_size()),
            (PartitionType::Database, config.db_size()),
            (PartitionType::Block, USE_REMAINING_SPACE),
        ] {
            entry.partitions.insert(
                kind,
                PartitionDetails {
                    device: device.to_string(),
                    disk_uuid: disk_uuid.clone(),
                    partition_uuid: new_uuid(),
                    size_mb: size,
                    offset_mb: offset,
                },
            );
            offset += size;
        }
        entry
    }

    /// One data partition filling `device`.
    #[must_use]
    pub fn collocated_filestore(id: i32, osd_uuid: Uuid, device: &str) -> Self {
        let mut entry = Self::new(id, osd_uuid, StoreType::Filestore);
        entry.partitions.insert(
            PartitionType::FilestoreData,
            PartitionDetails {
                device: device.to_string(),
                disk_uuid: new_uuid(),
                partition_uuid: new_uuid(),
                size_mb: USE_REMAINING_SPACE,
                offset_mb: FIRST_OFFSET_MB,
            },
        );
        entry
    }

    /// Block fills `device`; WAL and DB are appended to the shared metadata device.
    ///
    /// The metadata device gets a disk UUID when its first partition is laid out.
    #[must_use]
    pub fn distributed_bluestore(
        id: i32,
        osd_uuid: Uuid,
        device: &str,
        metadata: &mut MetadataDeviceInfo,
        config: BluestoreConfig,
    ) -> Self {
        let mut entry = Self::new(id, osd_uuid, StoreType::Bluestore);
        entry.partitions.insert(
            PartitionType::Block,
            PartitionDetails {
                device: device.to_string(),
                disk_uuid: new_uuid(),
                partition_uuid: new_uuid(),
                size_mb: USE_REMAINING_SPACE,
                offset_mb: FIRST_OFFSET_MB,
            },
        );

        let mut offset = match metadata.partitions.last() {
            Some(last) => last.offset_mb + last.size_mb,
            None => {
                metadata.disk_uuid = new_uuid();
                FIRST_OFFSET_MB
            }
        };
        for (kind, size) in [
            (PartitionType::Wal, config.wal_size()),
            (PartitionType::Database, config.db_size()),
        ] {
            let partition_uuid = new_uuid();
            entry.partitions.insert(
                kind,
                PartitionDetails {
                    device: metadata.device.clone(),
                    disk_uuid: metadata.disk_uuid.clone(),
                    partition_uuid: partition_uuid.clone(),
                    size_mb: size,
                    offset_mb: offset,
                },
            );
            metadata.partitions.push(MetadataDevicePartition {
                id,
                osd_uuid,
                kind,
                partition_uuid,
                size_mb: size,
                offset_mb: offset,
            });
            offset += size;
        }
        entry
    }

    /// `true` if every partition is on one disk.
    #[must_use]
    pub fn is_collocated(&self) -> bool {
        let mut disks = self.partitions.values().map(|p| &p.disk_uuid);
        match disks.next() {
            Some(first) => disks.all(|d| d == first),
            None => true,
        }
    }

    fn data_partition(&self) -> Result<(PartitionType, &PartitionDetails), PartitionError> {
        let kind = match self.store_type {
            StoreType::Bluestore => PartitionType::Block,
            StoreType::Filestore => PartitionType::FilestoreData,
        };
        self.partitions
            .get(&kind)
            .map(|d| (kind, d))
            .ok_or(PartitionError::MissingPartition { id: self.id, kind })
    }

    /// `sgdisk` arguments that partition this OSD's data device.
    ///
    /// Partitions on other devices (a shared metadata device) are created by
    /// [`MetadataDeviceInfo::partition_args`].
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::MissingPartition`] if the data partition is absent.
    pub fn partition_args(&self) -> Result<Vec<String>, PartitionError> {
        let (_, data) = self.data_partition()?;
        let mut args = Vec::new();
        let on_data_disk = self
            .partitions
            .iter()
            .filter(|(_, d)| d.disk_uuid == data.disk_uuid);
        for (number, (kind, details)) in on_data_disk.enumerate() {
            args.extend(partition_args(
                number + 1,
                &details.partition_uuid,
                details.offset_mb,
                details.size_mb,
                &kind.label(self.id),
            ));
        }
        args.push(format!("--disk-guid={}", data.disk_uuid));
        args.push(format!("/dev/{}", data.device));
        Ok(args)
    }
}

impl MetadataDeviceInfo {
    #[must_use]
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            disk_uuid: String::new(),
            partitions: Vec::new(),
        }
    }

    /// `sgdisk` arguments that partition the metadata device.
    #[must_use]
    pub fn partition_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .partitions
            .iter()
            .enumerate()
            .flat_map(|(i, p)| {
                partition_args(i + 1, &p.partition_uuid, p.offset_mb, p.size_mb, &p.kind.label(p.id))
            })
            .collect();
        args.push(format!("--disk-guid={}", self.disk_uuid));
        args.push(format!("/dev/{}", self.device));
        args
    }
}

/// Name of the per-node record holding the scheme.
#[must_use]
pub fn node_store_name(node: &str) -> String {
    format!("rook-ceph-osd-{node}-config")
}

impl PerfScheme {
    /// Loads the scheme of `store_name`. A missing record yields an empty scheme.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::Store`] if the record cannot be read and
    /// [`PartitionError::Malformed`] if it is not a scheme.
    pub async fn load(store: &dyn KvStore, store_name: &str) -> Result<Self, PartitionError> {
        let raw = store
            .get(store_name, PARTITION_SCHEME_KEY)
            .await
            .map_err(|source| PartitionError::Store {
                store: store_name.to_string(),
                source,
            })?;
        match raw {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => {
                debug!(store = %store_name, "no partition scheme recorded yet");
                Ok(Self::default())
            }
        }
    }

    /// Writes the scheme to `store_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::Store`] if the record cannot be written.
    pub async fn save(&self, store: &dyn KvStore, store_name: &str) -> Result<(), PartitionError> {
        let raw = serde_json::to_string(self)?;
        store
            .set(store_name, PARTITION_SCHEME_KEY, &raw)
            .await
            .map_err(|source| PartitionError::Store {
                store: store_name.to_string(),
                source,
            })
    }

    /// Replaces the entry with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::EntryNotFound`] if no entry has that id.
    pub fn update_entry(&mut self, entry: PerfSchemeEntry) -> Result<(), PartitionError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or(PartitionError::EntryNotFound(entry.id))?;
        *slot = entry;
        Ok(())
    }

    /// Removes the entry with id `id`. Returns whether one was removed.
    pub fn delete_entry(&mut self, id: i32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn entry(&self, id: i32) -> Option<&PerfSchemeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod partition_tests;
