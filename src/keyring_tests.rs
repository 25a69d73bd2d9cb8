// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::keyring::*;
    use crate::testing::{FakeExecutor, MemoryKeyringStore};

    #[tokio::test]
    async fn test_get_or_create_key_passes_caps() {
        let fake = FakeExecutor::new();
        fake.respond("ceph auth get-or-create-key", r#"{"key":"AQAkey=="}"#);

        let key = get_or_create_key(&fake, "rook-ceph", &rbd_mirror_user("a"), &RBD_MIRROR_ACCESS)
            .await
            .unwrap();

        assert_eq!(key, "AQAkey==");
        assert_eq!(
            fake.calls(),
            vec![
                "ceph auth get-or-create-key client.rbd-mirror.a mon profile rbd-mirror osd profile rbd --format json"
            ]
        );
    }

    #[tokio::test]
    async fn test_rotate_key_reads_list_output() {
        let fake = FakeExecutor::new();
        fake.respond(
            "ceph auth rotate",
            r#"[{"entity":"client.rbd-mirror.a","key":"AQAnew==","caps":{"mon":"profile rbd-mirror"}}]"#,
        );
        let key = rotate_key(&fake, "rook-ceph", "client.rbd-mirror.a").await.unwrap();
        assert_eq!(key, "AQAnew==");
    }

    #[tokio::test]
    async fn test_rotate_key_reads_single_output() {
        let fake = FakeExecutor::new();
        fake.respond("ceph auth rotate", r#"{"entity":"client.x","key":"AQAone=="}"#);
        assert_eq!(
            rotate_key(&fake, "ns", "client.x").await.unwrap(),
            "AQAone=="
        );
    }

    #[tokio::test]
    async fn test_rotate_key_without_key_fails() {
        let fake = FakeExecutor::new();
        fake.respond("ceph auth rotate", "[]");
        assert!(rotate_key(&fake, "ns", "client.x").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_key_ignores_missing_entity() {
        let fake = FakeExecutor::new();
        fake.fail("ceph auth del", 2);
        delete_key(&fake, "ns", "client.rbd-mirror.b").await.unwrap();

        let fake = FakeExecutor::new();
        fake.fail("ceph auth del", 13);
        assert!(delete_key(&fake, "ns", "client.rbd-mirror.b").await.is_err());
    }

    #[test]
    fn test_rbd_mirror_keyring_template() {
        assert_eq!(
            rbd_mirror_keyring("b", "SECRET"),
            "\n[client.rbd-mirror.b]\n\tkey = SECRET\n\tcaps mon = \"profile rbd-mirror\"\n\tcaps osd = \"profile rbd\"\n"
        );
    }

    #[test]
    fn test_admin_keyring_grants_everything() {
        let keyring = admin_keyring("ADMIN");
        assert!(keyring.starts_with("[client.admin]\n\tkey = ADMIN\n"));
        for daemon in ["mds", "mon", "osd", "mgr"] {
            assert!(keyring.contains(&format!("caps {daemon} = \"allow *\"")));
        }
    }

    #[test]
    fn test_keyring_secret_shape() {
        let secret = keyring_secret("rook-ceph", "rook-ceph-rbd-mirror-a-keyring", "[x]", None);
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/rook"));
        let data = secret.data.unwrap();
        assert_eq!(data["keyring"].0, b"[x]".to_vec());
        assert!(secret.metadata.owner_references.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_put_and_remove() {
        let store = MemoryKeyringStore::default();
        store.put("ns", "k", "data", None).await.unwrap();
        assert_eq!(store.secrets.lock().unwrap()["ns/k"], "data");
        store.remove("ns", "k").await.unwrap();
        store.remove("ns", "k").await.unwrap();
        assert!(store.secrets.lock().unwrap().is_empty());
    }
}
