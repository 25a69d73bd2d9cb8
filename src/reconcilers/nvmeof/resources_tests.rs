// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `nvmeof/resources.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        CephCluster, CephClusterSpec, CephNVMeOFGateway, CephNVMeOFGatewaySpec, CephVersionSpec,
        NVMeOFPorts, NetworkSpec, ProbeSpec,
    };
    use crate::reconcilers::nvmeof::resources::*;
    use k8s_openapi::api::core::v1::{Container, Probe};
    use std::collections::BTreeMap;

    const FSID: &str = "b3c1f0de-5f4b-4a0c-9f2e-1a2b3c4d5e6f";

    fn gateway(spec: CephNVMeOFGatewaySpec) -> CephNVMeOFGateway {
        let mut gw = CephNVMeOFGateway::new("gw", spec);
        gw.metadata.namespace = Some("rook-ceph".to_string());
        gw.metadata.uid = Some("gw-uid".to_string());
        gw
    }

    fn basic_spec() -> CephNVMeOFGatewaySpec {
        CephNVMeOFGatewaySpec {
            instances: 1,
            pool: "nvmeof".to_string(),
            group: "group-a".to_string(),
            ..Default::default()
        }
    }

    fn cluster(network: NetworkSpec) -> CephCluster {
        let mut cluster = CephCluster::new(
            "rook-ceph",
            CephClusterSpec {
                ceph_version: CephVersionSpec {
                    image: "quay.io/ceph/ceph:v20.2.0".to_string(),
                    image_pull_policy: Some("IfNotPresent".to_string()),
                },
                network,
                ..Default::default()
            },
        );
        cluster.metadata.namespace = Some("rook-ceph".to_string());
        cluster
    }

    fn instance<'a>(gw: &'a CephNVMeOFGateway, cluster: &'a CephCluster) -> GatewayInstance<'a> {
        GatewayInstance {
            gateway: gw,
            cluster,
            fsid: FSID,
            daemon_id: "a",
            default_image: "quay.io/ceph/nvmeof:1.5",
        }
    }

    fn containers(deployment: &k8s_openapi::api::apps::v1::Deployment) -> (Container, Container) {
        let pod = deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap();
        (
            pod.init_containers.as_ref().unwrap()[0].clone(),
            pod.containers[0].clone(),
        )
    }

    #[test]
    fn test_resolve_ports_zero_keeps_default() {
        assert_eq!(
            resolve_ports(None),
            GatewayPorts {
                io: 4420,
                gateway: 5500,
                monitor: 5499,
                discovery: 8009
            }
        );
        let ports = resolve_ports(Some(&NVMeOFPorts {
            io_port: 4421,
            ..Default::default()
        }));
        assert_eq!(ports.io, 4421);
        assert_eq!(ports.gateway, 5500);
    }

    #[test]
    fn test_names() {
        assert_eq!(instance_name("gw", "b"), "rook-ceph-nvmeof-gw-b");
        assert_eq!(config_map_name("gw", "b"), "rook-ceph-nvmeof-gw-b-config");
    }

    #[test]
    fn test_build_configmap() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec::default());
        let cm = build_configmap(&instance(&gw, &cluster));

        assert_eq!(cm.metadata.name.as_deref(), Some("rook-ceph-nvmeof-gw-a-config"));
        let owner = &cm.metadata.owner_references.as_ref().unwrap()[0];
        assert_eq!(owner.kind, "CephNVMeOFGateway");
        assert_eq!(owner.uid, "gw-uid");

        let config = &cm.data.as_ref().unwrap()["config"];
        assert!(config.contains("name = rook-ceph-nvmeof-gw-a\n"));
        assert!(config.contains("pool = nvmeof\n"));
        assert!(config.contains("addr = @@POD_IP@@\n"));
        assert_eq!(configmap_hash(Some(&cm)).len(), 64);
        assert_eq!(configmap_hash(None), "");
    }

    #[test]
    fn test_configmap_is_deterministic() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec::default());
        let first = build_configmap(&instance(&gw, &cluster));
        let second = build_configmap(&instance(&gw, &cluster));
        assert_eq!(first, second);
        assert_eq!(configmap_hash(Some(&first)), configmap_hash(Some(&second)));
    }

    #[test]
    fn test_build_deployment_pod_contract() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec::default());
        let deployment = build_deployment(&instance(&gw, &cluster), "abc").unwrap();

        assert_eq!(deployment.metadata.name.as_deref(), Some("rook-ceph-nvmeof-gw-a"));
        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(1));
        let labels = spec.selector.match_labels.as_ref().unwrap();
        assert_eq!(labels["app"], "rook-ceph-nvmeof");
        assert_eq!(labels["nvmeof"], "a");
        assert_eq!(labels["app.kubernetes.io/part-of"], "gw");

        let template_meta = spec.template.metadata.as_ref().unwrap();
        assert_eq!(template_meta.annotations.as_ref().unwrap()["config-hash"], "abc");

        let pod = spec.template.spec.as_ref().unwrap();
        assert_eq!(pod.hostname.as_deref(), Some("rook-ceph-nvmeof-gw-a"));
        assert_eq!(pod.service_account_name.as_deref(), Some("rook-ceph-nvmeof"));
        assert_eq!(pod.restart_policy.as_deref(), Some("Always"));
        assert_eq!(pod.host_network, None);

        let volumes = pod.volumes.as_ref().unwrap();
        let admin = volumes.iter().find(|v| v.name == "ceph-admin-keyring").unwrap();
        let secret = admin.secret.as_ref().unwrap();
        assert_eq!(secret.secret_name.as_deref(), Some("rook-ceph-admin-keyring"));
        assert_eq!(secret.default_mode, Some(0o444));
        let config = volumes.iter().find(|v| v.name == "gateway-config").unwrap();
        let config = config.config_map.as_ref().unwrap();
        assert_eq!(config.name, "rook-ceph-nvmeof-gw-a-config");
        assert_eq!(config.items.as_ref().unwrap()[0].path, "nvmeof.conf");
    }

    #[test]
    fn test_init_container() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec::default());
        let deployment = build_deployment(&instance(&gw, &cluster), "").unwrap();
        let (init, _) = containers(&deployment);

        assert_eq!(init.name, "generate-ceph-conf");
        assert_eq!(init.image.as_deref(), Some("quay.io/ceph/ceph:v20.2.0"));
        assert_eq!(init.command.as_ref().unwrap()[..2], ["/bin/bash", "-c"]);
        let args = init.args.as_ref().unwrap();
        assert!(args.contains(&"--keyring=/etc/ceph/keyring".to_string()));
        assert!(args.contains(&format!("--fsid={FSID}")));

        let env: Vec<&str> = init
            .env
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        for name in ["GATEWAY_NAME", "POOL_NAME", "ANA_GROUP", "POD_IP", "ROOK_CEPH_MON_HOST"] {
            assert!(env.contains(&name), "missing {name}");
        }

        let caps = init
            .security_context
            .as_ref()
            .unwrap()
            .capabilities
            .as_ref()
            .unwrap();
        assert_eq!(caps.add.as_deref(), Some(&["SYS_ADMIN".to_string()][..]));
        assert_eq!(caps.drop.as_deref(), Some(&["NET_RAW".to_string()][..]));

        let mounts = init.volume_mounts.as_ref().unwrap();
        let config = mounts.iter().find(|m| m.name == "gateway-config").unwrap();
        assert_eq!(config.mount_path, "/config");
        assert_eq!(config.read_only, Some(true));
    }

    #[test]
    fn test_gateway_container() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec::default());
        let deployment = build_deployment(&instance(&gw, &cluster), "").unwrap();
        let (_, main) = containers(&deployment);

        assert_eq!(main.name, "nvmeof-gateway");
        assert_eq!(main.image.as_deref(), Some("quay.io/ceph/nvmeof:1.5"));
        assert_eq!(
            main.args.as_deref(),
            Some(&["-c".to_string(), "/etc/ceph/nvmeof.conf".to_string()][..])
        );
        let ports: Vec<i32> = main
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.container_port)
            .collect();
        assert_eq!(ports, [4420, 5500, 5499, 8009]);

        let ceph_args = main
            .env
            .as_ref()
            .unwrap()
            .iter()
            .find(|e| e.name == "CEPH_ARGS")
            .and_then(|e| e.value.clone())
            .unwrap();
        assert!(ceph_args.contains("--keyring=/etc/ceph/keyring"));
        assert!(ceph_args.contains("--mon-host=$(ROOK_CEPH_MON_HOST)"));

        let probe = main.liveness_probe.unwrap();
        assert_eq!(
            probe.tcp_socket.unwrap().port,
            k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(4420)
        );
    }

    #[test]
    fn test_custom_image_and_user_metadata() {
        let gw = gateway(CephNVMeOFGatewaySpec {
            image: Some("registry.local/nvmeof:dev".to_string()),
            labels: Some(BTreeMap::from([("team".to_string(), "storage".to_string())])),
            annotations: Some(BTreeMap::from([("note".to_string(), "x".to_string())])),
            ..basic_spec()
        });
        let cluster = cluster(NetworkSpec::default());
        let deployment = build_deployment(&instance(&gw, &cluster), "").unwrap();
        let (_, main) = containers(&deployment);
        assert_eq!(main.image.as_deref(), Some("registry.local/nvmeof:dev"));

        assert_eq!(deployment.metadata.labels.as_ref().unwrap()["team"], "storage");
        let template = deployment.spec.unwrap().template.metadata.unwrap();
        assert_eq!(template.annotations.as_ref().unwrap()["note"], "x");
        assert_eq!(template.labels.as_ref().unwrap()["team"], "storage");
    }

    #[test]
    fn test_host_network() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec {
            provider: "host".to_string(),
            ..Default::default()
        });
        let inst = instance(&gw, &cluster);

        let pod = build_deployment(&inst, "").unwrap().spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.host_network, Some(true));
        assert_eq!(pod.dns_policy.as_deref(), Some("ClusterFirstWithHostNet"));

        let service = build_service(&inst);
        assert_eq!(service.spec.unwrap().cluster_ip.as_deref(), Some("None"));
    }

    #[test]
    fn test_multus_annotation_on_pod_network() {
        let gw = gateway(basic_spec());
        let cluster = cluster(NetworkSpec {
            provider: "multus".to_string(),
            selectors: BTreeMap::from([("public".to_string(), "public-net".to_string())]),
            ..Default::default()
        });
        let template = build_deployment(&instance(&gw, &cluster), "")
            .unwrap()
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap();
        let networks = &template.annotations.unwrap()["k8s.v1.cni.cncf.io/networks"];
        assert!(networks.contains("public-net"));
    }

    #[test]
    fn test_referenced_config_map_is_mounted() {
        let gw = gateway(CephNVMeOFGatewaySpec {
            config_map_ref: Some("my-config".to_string()),
            ..basic_spec()
        });
        let cluster = cluster(NetworkSpec::default());
        assert_eq!(instance(&gw, &cluster).mounted_config_map(), "my-config");
    }

    #[test]
    fn test_invalid_hostname_is_left_unset() {
        let mut gw = gateway(basic_spec());
        gw.metadata.name = Some("gw.with.dots".to_string());
        let cluster = cluster(NetworkSpec::default());
        let pod = build_deployment(&instance(&gw, &cluster), "")
            .unwrap()
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        assert_eq!(pod.hostname, None);
    }

    #[test]
    fn test_build_service_ports() {
        let gw = gateway(CephNVMeOFGatewaySpec {
            ports: Some(NVMeOFPorts {
                discovery_port: 8010,
                ..Default::default()
            }),
            ..basic_spec()
        });
        let cluster = cluster(NetworkSpec::default());
        let service = build_service(&instance(&gw, &cluster));
        let spec = service.spec.unwrap();
        assert_eq!(spec.cluster_ip, None);
        assert_eq!(spec.selector.unwrap()["ceph_daemon_id"], "a");
        let ports: Vec<(String, i32)> = spec
            .ports
            .unwrap()
            .into_iter()
            .map(|p| (p.name.unwrap(), p.port))
            .collect();
        assert_eq!(
            ports,
            [
                ("io".to_string(), 4420),
                ("gateway".to_string(), 5500),
                ("monitor".to_string(), 5499),
                ("discovery".to_string(), 8010),
            ]
        );
    }

    #[test]
    fn test_liveness_probe_overrides_scalars_only() {
        let user = ProbeSpec {
            disabled: false,
            probe: Some(Probe {
                initial_delay_seconds: Some(30),
                failure_threshold: Some(6),
                exec: Some(k8s_openapi::api::core::v1::ExecAction {
                    command: Some(vec!["false".to_string()]),
                }),
                ..Default::default()
            }),
        };
        let probe = liveness_probe(Some(&user), 4420).unwrap();
        assert_eq!(probe.initial_delay_seconds, Some(30));
        assert_eq!(probe.failure_threshold, Some(6));
        assert!(probe.exec.is_none());
        assert!(probe.tcp_socket.is_some());

        let default = liveness_probe(None, 4420).unwrap();
        assert_eq!(default.initial_delay_seconds, Some(10));
    }

    #[test]
    fn test_liveness_probe_disabled() {
        let spec = ProbeSpec {
            disabled: true,
            probe: None,
        };
        assert!(liveness_probe(Some(&spec), 4420).is_none());
    }
}
