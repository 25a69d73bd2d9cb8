// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::config::mon_store::*;
    use crate::testing::FakeExecutor;
    use std::sync::Arc;

    fn store(fake: &Arc<FakeExecutor>) -> MonStore {
        MonStore::new(fake.clone(), "rook-ceph")
    }

    #[test]
    fn test_keys_are_normalized() {
        assert_eq!(normalize_key("osd pool default size"), "osd_pool_default_size");
        assert_eq!(normalize_key("mon-allow-pool-delete"), "mon_allow_pool_delete");
        assert_eq!(flag_key("mon_host"), "mon-host");
        assert_eq!(flag_key("log to stderr"), "log-to-stderr");
        assert_eq!(ConfigOption::new("global", "a b-c", "1").option, "a_b_c");
    }

    #[tokio::test]
    async fn test_set_writes_normalized_option() {
        let fake = Arc::new(FakeExecutor::new());
        store(&fake).set("global", "osd pool default size", "3").await.unwrap();
        assert_eq!(fake.calls(), vec!["ceph config set global osd_pool_default_size 3"]);
    }

    #[tokio::test]
    async fn test_set_if_changed_skips_equal_value() {
        let fake = Arc::new(FakeExecutor::new());
        fake.respond("ceph config get global public_network", "10.0.0.0/24\n");
        let changed = store(&fake)
            .set_if_changed("global", "public_network", "10.0.0.0/24")
            .await
            .unwrap();
        assert!(!changed);
        assert!(fake.calls_matching("ceph config set").is_empty());
    }

    #[tokio::test]
    async fn test_set_if_changed_writes_new_value() {
        let fake = Arc::new(FakeExecutor::new());
        fake.respond("ceph config get", "10.0.0.0/24");
        let changed = store(&fake)
            .set_if_changed("global", "public network", "192.168.0.0/16")
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(
            fake.calls_matching("ceph config set"),
            vec!["ceph config set global public_network 192.168.0.0/16"]
        );
    }

    #[tokio::test]
    async fn test_delete_removes_option() {
        let fake = Arc::new(FakeExecutor::new());
        store(&fake).delete("mon", "mon-warn-on-pool-no-redundancy").await.unwrap();
        assert_eq!(fake.calls(), vec!["ceph config rm mon mon_warn_on_pool_no_redundancy"]);
    }

    #[tokio::test]
    async fn test_set_all_attempts_every_option() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("ceph config set global bad_one", 22);
        let options = vec![
            ConfigOption::new("global", "first", "1"),
            ConfigOption::new("global", "bad one", "2"),
            ConfigOption::new("mon", "third", "3"),
        ];
        let err = store(&fake).set_all(&options).await.unwrap_err();

        assert_eq!(fake.calls().len(), 3);
        assert_eq!(err.total, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0.option, "bad_one");
        assert!(err.to_string().starts_with("failed to set 1 of 3 config options"));
    }
}
