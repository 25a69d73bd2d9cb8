// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for reconciler helper functions.

#[cfg(test)]
mod tests {
    use super::super::{is_owned_by, owner_reference, should_reconcile};
    use crate::crd::{CephRBDMirror, RBDMirroringSpec};
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn mirror(uid: Option<&str>) -> CephRBDMirror {
        let mut mirror = CephRBDMirror::new("mirror", RBDMirroringSpec::default());
        mirror.metadata.namespace = Some("rook-ceph".to_string());
        mirror.metadata.uid = uid.map(str::to_string);
        mirror
    }

    #[test]
    fn test_should_reconcile_when_generations_equal() {
        assert!(!should_reconcile(Some(5), Some(5)));
    }

    #[test]
    fn test_should_reconcile_when_generations_differ() {
        assert!(should_reconcile(Some(7), Some(5)));
    }

    #[test]
    fn test_should_reconcile_first_reconciliation() {
        assert!(should_reconcile(Some(1), None));
    }

    #[test]
    fn test_should_reconcile_no_generation_tracking() {
        assert!(!should_reconcile(None, Some(5)));
        assert!(!should_reconcile(None, None));
    }

    #[test]
    fn test_owner_reference_is_controller() {
        let owner = owner_reference(&mirror(Some("uid-1"))).unwrap();
        assert_eq!(owner.kind, "CephRBDMirror");
        assert_eq!(owner.api_version, "ceph.rook.io/v1");
        assert_eq!(owner.name, "mirror");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        assert!(owner_reference(&mirror(None)).is_none());
    }

    #[test]
    fn test_is_owned_by() {
        let owner = owner_reference(&mirror(Some("uid-1"))).unwrap();
        let owned = Secret {
            metadata: ObjectMeta {
                owner_references: Some(vec![owner]),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(is_owned_by(&owned, "uid-1"));
        assert!(!is_owned_by(&owned, "uid-2"));
        assert!(!is_owned_by(&Secret::default(), "uid-1"));
    }
}
