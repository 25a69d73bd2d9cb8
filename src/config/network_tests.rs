// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::config::network::*;
    use crate::config::MonStore;
    use crate::crd::NetworkSpec;
    use crate::testing::FakeExecutor;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn multus(selectors: &[(&str, &str)]) -> NetworkSpec {
        NetworkSpec {
            provider: "multus".to_string(),
            host_network: false,
            selectors: selectors
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_network_ref_parse() {
        assert_eq!(
            NetworkRef::parse("public-net", "rook-ceph").unwrap(),
            NetworkRef {
                namespace: "rook-ceph".into(),
                name: "public-net".into()
            }
        );
        assert_eq!(NetworkRef::parse("net/pub", "rook-ceph").unwrap().namespace, "net");
        assert!(NetworkRef::parse("a/b/c", "rook-ceph").is_err());
        assert!(NetworkRef::parse("ns/", "rook-ceph").is_err());
    }

    #[test]
    fn test_public_only_uses_public_for_both() {
        let cidrs = network_cidrs("10.0.0.0/24", None).unwrap();
        assert_eq!(cidrs.public, "10.0.0.0/24");
        assert_eq!(cidrs.cluster, "10.0.0.0/24");
    }

    #[test]
    fn test_separate_cluster_network() {
        let cidrs = network_cidrs("10.0.0.0/24", Some("10.1.0.0/24")).unwrap();
        assert_eq!(cidrs.cluster, "10.1.0.0/24");
        assert!(network_cidrs("10.0.0.0/24", Some(" ")).is_err());
        assert!(network_cidrs("", None).is_err());
    }

    #[test]
    fn test_subnet_from_config() {
        let cfg = r#"{"cniVersion":"0.3.1","type":"macvlan","master":"eth1","ipam":{"type":"host-local","subnet":"192.168.20.0/24"}}"#;
        assert_eq!(subnet_from_config(cfg).unwrap(), "192.168.20.0/24");

        let whereabouts = r#"{"ipam":{"type":"whereabouts","range":"192.168.30.0/24"}}"#;
        assert_eq!(subnet_from_config(whereabouts).unwrap(), "192.168.30.0/24");

        let empty = r#"{"ipam":{"type":"dhcp"}}"#;
        assert!(subnet_from_config(empty).is_err());
        assert!(subnet_from_config("not json").is_err());
    }

    #[test]
    fn test_multus_annotation() {
        let spec = multus(&[("public", "pub"), ("cluster", "other/clus")]);
        let value = multus_annotation(&spec, "rook-ceph", false).unwrap().unwrap();
        assert_eq!(
            value,
            r#"[{"name":"pub","namespace":"rook-ceph","interface":"public"}]"#
        );

        let both = multus_annotation(&spec, "rook-ceph", true).unwrap().unwrap();
        assert!(both.contains(r#"{"name":"clus","namespace":"other","interface":"cluster"}"#));
    }

    #[test]
    fn test_no_annotation_without_multus() {
        assert!(multus_annotation(&NetworkSpec::default(), "rook-ceph", true)
            .unwrap()
            .is_none());
        let mut meta = ObjectMeta::default();
        apply_multus(&NetworkSpec::default(), "rook-ceph", true, &mut meta).unwrap();
        assert!(meta.annotations.is_none());

        apply_multus(&multus(&[("public", "pub")]), "rook-ceph", false, &mut meta).unwrap();
        assert!(meta
            .annotations
            .unwrap()
            .contains_key("k8s.v1.cni.cncf.io/networks"));
    }

    #[tokio::test]
    async fn test_apply_network_cidrs_writes_changes_only() {
        let fake = Arc::new(FakeExecutor::new());
        fake.respond("ceph config get global public_network", "10.0.0.0/24")
            .respond("ceph config get global cluster_network", "");
        let store = MonStore::new(fake.clone(), "rook-ceph");
        let cidrs = network_cidrs("10.0.0.0/24", Some("10.1.0.0/24")).unwrap();
        apply_network_cidrs(&store, &cidrs).await.unwrap();

        assert_eq!(
            fake.calls_matching("ceph config set"),
            vec!["ceph config set global cluster_network 10.1.0.0/24"]
        );
    }
}
