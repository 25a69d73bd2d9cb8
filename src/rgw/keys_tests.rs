// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::rgw::keys::*;
    use crate::rgw::{RgwAdmin, S3Key, StoreRef, UserParams};
    use crate::testing::MemoryRgw;

    fn key(n: u32) -> S3Key {
        S3Key::new(&format!("AK{n}"), &format!("SK{n}"))
    }

    fn store() -> StoreRef {
        StoreRef::new("rook-ceph", "my-store")
    }

    async fn seeded(rgw: &MemoryRgw, uid: &str) {
        rgw.create_user(
            &store(),
            &UserParams {
                uid: uid.into(),
                display_name: uid.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn test_dedupe_keys() {
        assert_eq!(dedupe_keys(vec![key(1), key(1), key(2)]).unwrap(), vec![key(1), key(2)]);
        let clash = vec![key(1), S3Key::new("AK1", "other")];
        assert!(dedupe_keys(clash).is_err());
    }

    #[test]
    fn test_plan_explicit() {
        let plan = plan_explicit(&[key(1), key(2)], &[key(2), key(3)]);
        assert_eq!(plan.add, vec![key(3)]);
        assert_eq!(plan.remove, vec!["AK1".to_string()]);

        assert!(plan_explicit(&[key(1)], &[key(1)]).is_empty());
    }

    #[test]
    fn test_plan_explicit_rotated_secret_is_overwritten_not_removed() {
        let rotated = S3Key::new("AK1", "NEW");
        let plan = plan_explicit(&[key(1)], &[rotated.clone()]);
        assert_eq!(plan.add, vec![rotated]);
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn test_plan_managed() {
        let plan = plan_managed(&[key(1), key(2), key(3)]);
        assert_eq!(plan.keep, Some(key(1)));
        assert_eq!(plan.remove, vec!["AK2".to_string(), "AK3".to_string()]);
        assert!(!plan.generate);

        let plan = plan_managed(&[]);
        assert!(plan.keep.is_none() && plan.generate);
    }

    #[tokio::test]
    async fn test_explicit_then_managed_transitions() {
        let rgw = MemoryRgw::default();
        seeded(&rgw, "u").await;

        let user = rgw.user("u").unwrap();
        sync_explicit(&rgw, &store(), &user, &[key(1), key(2), key(3)])
            .await
            .unwrap();
        assert_eq!(rgw.key_pairs("u").len(), 3);
        assert!(!rgw.key_pairs("u").iter().any(|(ak, _)| ak.starts_with("GEN")));

        let user = rgw.user("u").unwrap();
        sync_explicit(&rgw, &store(), &user, &[key(4), key(5)]).await.unwrap();
        assert_eq!(
            rgw.key_pairs("u"),
            vec![
                ("AK4".to_string(), "SK4".to_string()),
                ("AK5".to_string(), "SK5".to_string())
            ]
        );

        let user = rgw.user("u").unwrap();
        let managed = sync_managed(&rgw, &store(), &user).await.unwrap();
        let pairs = rgw.key_pairs("u");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, managed.access_key);
        assert!(managed.access_key == "AK4" || managed.access_key == "AK5");
    }

    #[tokio::test]
    async fn test_managed_generates_when_no_key_left() {
        let rgw = MemoryRgw::default();
        seeded(&rgw, "u").await;
        let user = rgw.user("u").unwrap();
        sync_explicit(&rgw, &store(), &user, &[]).await.unwrap();
        assert!(rgw.key_pairs("u").is_empty());

        let user = rgw.user("u").unwrap();
        let managed = sync_managed(&rgw, &store(), &user).await.unwrap();
        assert!(managed.access_key.starts_with("GEN"));
        assert_eq!(rgw.key_pairs("u").len(), 1);
    }
}
