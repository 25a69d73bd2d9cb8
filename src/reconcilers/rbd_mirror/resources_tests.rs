// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{
        CephCluster, CephClusterSpec, CephRBDMirror, CephVersionSpec, NetworkSpec,
        RBDMirroringSpec,
    };
    use crate::labels::{CONFIG_HASH_ANNOTATION, K8S_PART_OF};
    use crate::reconcilers::rbd_mirror::resources::*;
    use std::collections::BTreeMap;

    const FSID: &str = "b3c1f0de-5f4b-4a0c-9f2e-1a2b3c4d5e6f";

    fn mirror(spec: RBDMirroringSpec) -> CephRBDMirror {
        let mut m = CephRBDMirror::new("my-mirror", spec);
        m.metadata.namespace = Some("rook-ceph".into());
        m.metadata.uid = Some("mirror-uid".into());
        m
    }

    fn cluster(data_dir: &str, network: NetworkSpec) -> CephCluster {
        let mut c = CephCluster::new(
            "rook-ceph",
            CephClusterSpec {
                ceph_version: CephVersionSpec {
                    image: "quay.io/ceph/ceph:v20.2.0".into(),
                    image_pull_policy: None,
                },
                data_dir_host_path: data_dir.into(),
                network,
                ..Default::default()
            },
        );
        c.metadata.namespace = Some("rook-ceph".into());
        c
    }

    #[test]
    fn test_names() {
        assert_eq!(deployment_name("a"), "rook-ceph-rbd-mirror-a");
        assert_eq!(keyring_secret_name("b"), "rook-ceph-rbd-mirror-b-keyring");
    }

    #[test]
    fn test_keyring_hash_tracks_content() {
        assert_eq!(keyring_hash("k1"), keyring_hash("k1"));
        assert_ne!(keyring_hash("k1"), keyring_hash("k2"));
        assert_eq!(keyring_hash("k1").len(), 64);
    }

    #[test]
    fn test_deployment_shape() {
        let m = mirror(RBDMirroringSpec {
            count: 1,
            priority_class_name: Some("system-cluster-critical".into()),
            labels: Some(BTreeMap::from([("team".to_string(), "storage".to_string())])),
            ..Default::default()
        });
        let c = cluster("/var/lib/rook", NetworkSpec::default());
        let daemon = MirrorDaemon {
            mirror: &m,
            cluster: &c,
            fsid: FSID,
            daemon_id: "a",
        };
        let d = build_deployment(&daemon, "abc").unwrap();

        assert_eq!(d.metadata.name.as_deref(), Some("rook-ceph-rbd-mirror-a"));
        assert_eq!(d.metadata.owner_references.unwrap()[0].uid, "mirror-uid");
        let labels = d.metadata.labels.unwrap();
        assert_eq!(labels[K8S_PART_OF], "my-mirror");
        assert_eq!(labels["rbdmirror"], "a");
        assert_eq!(labels["team"], "storage");

        let spec = d.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        let template = spec.template;
        let annotations = template.metadata.unwrap().annotations.unwrap();
        assert_eq!(annotations[CONFIG_HASH_ANNOTATION], "abc");

        let pod = template.spec.unwrap();
        assert_eq!(
            pod.priority_class_name.as_deref(),
            Some("system-cluster-critical")
        );
        assert!(pod.host_network.is_none());

        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("quay.io/ceph/ceph:v20.2.0"));
        let args = container.args.clone().unwrap();
        assert!(args.contains(&format!("--fsid={FSID}")));
        assert!(args.contains(&"--id=rbd-mirror.a".to_string()));
        assert!(args.contains(&"--keyring=/etc/ceph/keyring-store/keyring".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--foreground"));

        let volumes = pod.volumes.unwrap();
        let keyring = volumes
            .iter()
            .find(|v| v.secret.is_some())
            .and_then(|v| v.secret.clone())
            .unwrap();
        assert_eq!(
            keyring.secret_name.as_deref(),
            Some("rook-ceph-rbd-mirror-a-keyring")
        );
        // log and crash directories under the data dir host path
        assert!(volumes.iter().any(|v| v
            .host_path
            .as_ref()
            .is_some_and(|h| h.path == "/var/lib/rook/rook-ceph/log")));
    }

    #[test]
    fn test_deployment_host_network() {
        let m = mirror(RBDMirroringSpec {
            count: 1,
            ..Default::default()
        });
        let c = cluster(
            "",
            NetworkSpec {
                host_network: true,
                ..Default::default()
            },
        );
        let daemon = MirrorDaemon {
            mirror: &m,
            cluster: &c,
            fsid: FSID,
            daemon_id: "b",
        };
        let pod = build_deployment(&daemon, "")
            .unwrap()
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        assert_eq!(pod.host_network, Some(true));
        assert_eq!(pod.dns_policy.as_deref(), Some("ClusterFirstWithHostNet"));
        // no data dir host path: only the keyring volume
        assert_eq!(pod.volumes.unwrap().len(), 1);
    }
}
