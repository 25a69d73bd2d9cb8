// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::osd::partition::*;
    use crate::osd::store::FileKvStore;
    use serde_json::json;
    use uuid::Uuid;

    fn osd_uuid() -> Uuid {
        Uuid::parse_str("3b0a2fe4-4c2b-4b2a-9b3c-6b1a3a1c9f00").unwrap()
    }

    #[test]
    fn test_collocated_bluestore_layout() {
        let entry = PerfSchemeEntry::collocated_bluestore(0, osd_uuid(), "sda", BluestoreConfig::default());

        let wal = &entry.partitions[&PartitionType::Wal];
        let db = &entry.partitions[&PartitionType::Database];
        let block = &entry.partitions[&PartitionType::Block];
        assert_eq!((wal.offset_mb, wal.size_mb), (1, 576));
        assert_eq!((db.offset_mb, db.size_mb), (577, 20480));
        assert_eq!((block.offset_mb, block.size_mb), (21057, -1));
        assert!(entry.is_collocated());
    }

    #[test]
    fn test_collocated_bluestore_args() {
        let config = BluestoreConfig {
            wal_size_mb: 1,
            database_size_mb: 2,
        };
        let entry = PerfSchemeEntry::collocated_bluestore(3, osd_uuid(), "sdb", config);
        let wal = entry.partitions[&PartitionType::Wal].partition_uuid.clone();
        let block = &entry.partitions[&PartitionType::Block];

        let args = entry.partition_args().unwrap();
        assert_eq!(args.len(), 11);
        assert_eq!(args[0], "--new=1:2048:+2048");
        assert_eq!(args[1], "--change-name=1:ROOK-OSD3-WAL");
        assert_eq!(args[2], format!("--partition-guid=1:{wal}"));
        assert_eq!(args[3], "--new=2:4096:+4096");
        assert_eq!(args[4], "--change-name=2:ROOK-OSD3-DB");
        assert_eq!(args[6], "--largest-new=3");
        assert_eq!(args[7], "--change-name=3:ROOK-OSD3-BLOCK");
        assert_eq!(args[9], format!("--disk-guid={}", block.disk_uuid));
        assert_eq!(args[10], "/dev/sdb");
    }

    #[test]
    fn test_collocated_filestore_single_partition() {
        let entry = PerfSchemeEntry::collocated_filestore(1, osd_uuid(), "sdc");
        assert_eq!(entry.store_type, StoreType::Filestore);
        assert_eq!(entry.partitions.len(), 1);

        let args = entry.partition_args().unwrap();
        assert_eq!(args[0], "--largest-new=1");
        assert_eq!(args[1], "--change-name=1:ROOK-OSD1-FS-DATA");
        assert_eq!(args.last().unwrap(), "/dev/sdc");
    }

    #[test]
    fn test_distributed_layout_appends_to_metadata_device() {
        let mut metadata = MetadataDeviceInfo::new("nvme0n1");
        let first =
            PerfSchemeEntry::distributed_bluestore(0, osd_uuid(), "sda", &mut metadata, BluestoreConfig::default());
        let disk_uuid = metadata.disk_uuid.clone();
        assert!(!disk_uuid.is_empty());
        let second =
            PerfSchemeEntry::distributed_bluestore(1, Uuid::new_v4(), "sdb", &mut metadata, BluestoreConfig::default());

        assert_eq!(metadata.disk_uuid, disk_uuid);
        assert_eq!(metadata.partitions.len(), 4);
        let offsets: Vec<i64> = metadata.partitions.iter().map(|p| p.offset_mb).collect();
        assert_eq!(offsets, vec![1, 577, 21057, 21633]);
        assert_eq!(second.partitions[&PartitionType::Wal].offset_mb, 21057);
        assert!(!first.is_collocated());

        let block = &first.partitions[&PartitionType::Block];
        assert_eq!((block.offset_mb, block.size_mb), (1, -1));
        assert_eq!(block.device, "sda");
    }

    #[test]
    fn test_distributed_entry_args_cover_only_data_device() {
        let mut metadata = MetadataDeviceInfo::new("nvme0n1");
        let entry =
            PerfSchemeEntry::distributed_bluestore(2, osd_uuid(), "sdd", &mut metadata, BluestoreConfig::default());

        let args = entry.partition_args().unwrap();
        assert_eq!(args.len(), 5);
        assert_eq!(args[0], "--largest-new=1");
        assert_eq!(args[1], "--change-name=1:ROOK-OSD2-BLOCK");
        assert_eq!(args[4], "/dev/sdd");

        let meta_args = metadata.partition_args();
        assert_eq!(meta_args[0], "--new=1:2048:+1179648");
        assert_eq!(meta_args[1], "--change-name=1:ROOK-OSD2-WAL");
        assert_eq!(meta_args[4], "--change-name=2:ROOK-OSD2-DB");
        assert_eq!(meta_args[6], format!("--disk-guid={}", metadata.disk_uuid));
        assert_eq!(meta_args[7], "/dev/nvme0n1");
    }

    #[test]
    fn test_missing_data_partition_is_an_error() {
        let entry = PerfSchemeEntry::new(4, osd_uuid(), StoreType::Bluestore);
        assert!(matches!(
            entry.partition_args(),
            Err(PartitionError::MissingPartition {
                id: 4,
                kind: PartitionType::Block
            })
        ));
    }

    #[test]
    fn test_update_and_delete_entry() {
        let mut scheme = PerfScheme::default();
        scheme
            .entries
            .push(PerfSchemeEntry::collocated_filestore(1, osd_uuid(), "sda"));

        let replacement = PerfSchemeEntry::collocated_bluestore(1, osd_uuid(), "sdb", BluestoreConfig::default());
        scheme.update_entry(replacement).unwrap();
        assert_eq!(scheme.entry(1).unwrap().store_type, StoreType::Bluestore);

        let missing = PerfSchemeEntry::new(9, osd_uuid(), StoreType::Bluestore);
        assert!(matches!(
            scheme.update_entry(missing),
            Err(PartitionError::EntryNotFound(9))
        ));

        assert!(scheme.delete_entry(1));
        assert!(!scheme.delete_entry(1));
        assert!(scheme.entries.is_empty());
    }

    #[test]
    fn test_json_field_names() {
        let mut metadata = MetadataDeviceInfo::new("nvme0n1");
        let entry =
            PerfSchemeEntry::distributed_bluestore(0, osd_uuid(), "sda", &mut metadata, BluestoreConfig::default());
        let scheme = PerfScheme {
            metadata: Some(metadata),
            entries: vec![entry],
        };

        let value = serde_json::to_value(&scheme).unwrap();
        let entry = &value["entries"][0];
        assert_eq!(entry["osdUuid"], osd_uuid().to_string());
        assert_eq!(entry["storeType"], "bluestore");
        assert_eq!(entry["partitions"]["2"]["sizeMB"], -1);
        assert!(entry["partitions"]["0"]["diskUuid"].is_string());
        assert_eq!(entry["fsCreated"], false);
        assert_eq!(value["metadata"]["partitions"][1]["type"], 1);
        assert_eq!(value["metadata"]["partitions"][1]["offsetMB"], 577);
    }

    #[test]
    fn test_persisted_scheme_round_trips() {
        let stored = json!({
            "metadata": {
                "device": "nvme0n1",
                "diskUuid": "8a2c6bd6-4bcb-4a3b-a3d5-1f4c1e7a9d10",
                "partitions": [
                    {"id": 0, "osdUuid": "2f5d7c1e-8a39-4f4e-9b51-0c6a8e2d4b7f", "type": 0,
                     "partitionUuid": "wal-0", "sizeMB": 576, "offsetMB": 1},
                    {"id": 0, "osdUuid": "2f5d7c1e-8a39-4f4e-9b51-0c6a8e2d4b7f", "type": 1,
                     "partitionUuid": "db-0", "sizeMB": 20480, "offsetMB": 577}
                ]
            },
            "entries": [{
                "id": 0,
                "osdUuid": "2f5d7c1e-8a39-4f4e-9b51-0c6a8e2d4b7f",
                "partitions": {
                    "0": {"device": "nvme0n1", "diskUuid": "8a2c6bd6-4bcb-4a3b-a3d5-1f4c1e7a9d10",
                          "partitionUuid": "wal-0", "sizeMB": 576, "offsetMB": 1},
                    "1": {"device": "nvme0n1", "diskUuid": "8a2c6bd6-4bcb-4a3b-a3d5-1f4c1e7a9d10",
                          "partitionUuid": "db-0", "sizeMB": 20480, "offsetMB": 577},
                    "2": {"device": "sda", "diskUuid": "b7e0c2a4-51f3-4d8e-8c6b-2a9f0d3e1c55",
                          "partitionUuid": "block-0", "sizeMB": -1, "offsetMB": 1}
                },
                "storeType": "bluestore",
                "fsCreated": true
            }]
        });

        let scheme: PerfScheme = serde_json::from_value(stored.clone()).unwrap();
        let entry = &scheme.entries[0];
        assert!(entry.fs_created);
        assert_eq!(entry.partitions[&PartitionType::Block].device, "sda");
        let metadata = scheme.metadata.as_ref().unwrap();
        assert_eq!(metadata.partitions[1].kind, PartitionType::Database);

        assert_eq!(serde_json::to_value(&scheme).unwrap(), stored);
    }

    #[test]
    fn test_null_lists_read_as_empty() {
        let scheme: PerfScheme =
            serde_json::from_value(json!({"metadata": null, "entries": null})).unwrap();
        assert_eq!(scheme, PerfScheme::default());

        let err = serde_json::from_value::<MetadataDevicePartition>(json!({
            "id": 0, "osdUuid": "2f5d7c1e-8a39-4f4e-9b51-0c6a8e2d4b7f", "type": 7,
            "partitionUuid": "x", "sizeMB": 1, "offsetMB": 1
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown partition type 7"));
    }

    #[tokio::test]
    async fn test_load_missing_scheme_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        let scheme = PerfScheme::load(&store, &node_store_name("node-a")).await.unwrap();
        assert_eq!(scheme, PerfScheme::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        let name = node_store_name("node-a");
        assert_eq!(name, "rook-ceph-osd-node-a-config");

        let mut scheme = PerfScheme::default();
        scheme
            .entries
            .push(PerfSchemeEntry::collocated_bluestore(0, osd_uuid(), "sda", BluestoreConfig::default()));
        scheme.save(&store, &name).await.unwrap();

        let loaded = PerfScheme::load(&store, &name).await.unwrap();
        assert_eq!(loaded, scheme);
    }

    #[tokio::test]
    async fn test_load_malformed_scheme_fails() {
        use crate::osd::store::KvStore;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path());
        store.set("node-a", "partition-scheme", "not json").await.unwrap();

        assert!(matches!(
            PerfScheme::load(&store, "node-a").await,
            Err(PartitionError::Malformed(_))
        ));
    }
}
