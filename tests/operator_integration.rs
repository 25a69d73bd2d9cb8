// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests against a live cluster with the CRDs installed and the operator
//! running. No `CephCluster` is created, so these cover the paths that do not need a
//! storage cluster: finalizers, validation failures and deletion without a cluster.
//!
//! Run with: cargo test --test operator_integration -- --ignored

#![allow(clippy::manual_let_else)]

mod common;

use common::{
    create_test_namespace, delete_test_namespace, get_kube_client_or_skip, wait_for,
    wait_for_deletion,
};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use rook_ceph_operator::constants::{FINALIZER_OBJECT_STORE_USER, FINALIZER_RBD_MIRROR};
use rook_ceph_operator::crd::{
    CephObjectStoreUser, CephRBDMirror, ObjectStoreUserSpec, RBDMirroringSpec,
};
use rook_ceph_operator::status_reasons::PHASE_RECONCILE_FAILED;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::test]
#[ignore] // Run with: cargo test --test operator_integration -- --ignored
async fn test_kubernetes_connectivity() {
    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let namespaces: Api<Namespace> = Api::all(client);
    let ns_list = namespaces
        .list(&ListParams::default().limit(5))
        .await
        .unwrap_or_else(|e| panic!("Failed to list namespaces: {e}"));
    assert!(!ns_list.items.is_empty(), "Expected at least one namespace");
}

#[tokio::test]
#[ignore]
async fn test_crds_installed() {
    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    for name in [
        "cephnvmeofgateways.ceph.rook.io",
        "cephrbdmirrors.ceph.rook.io",
        "cephobjectstoreusers.ceph.rook.io",
        "cephbuckettopics.ceph.rook.io",
    ] {
        assert!(
            crds.get_opt(name).await.unwrap().is_some(),
            "CRD {name} is not installed"
        );
        println!("✓ CRD {name} installed");
    }
}

#[tokio::test]
#[ignore]
async fn test_rbd_mirror_without_cluster_is_finalized_and_deletable() {
    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let namespace = "rook-ceph-it-mirror";
    create_test_namespace(&client, namespace).await.unwrap();

    let api: Api<CephRBDMirror> = Api::namespaced(client.clone(), namespace);
    let mirror = CephRBDMirror::new(
        "mirror",
        RBDMirroringSpec {
            count: 1,
            ..Default::default()
        },
    );
    api.create(&PostParams::default(), &mirror).await.unwrap();

    let observed = wait_for(&api, "mirror", TIMEOUT, |m| {
        m.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|f| f == FINALIZER_RBD_MIRROR))
    })
    .await
    .expect("mirror disappeared");
    assert!(
        observed
            .metadata
            .finalizers
            .unwrap_or_default()
            .contains(&FINALIZER_RBD_MIRROR.to_string()),
        "finalizer was never added"
    );

    // no CephCluster: the deletion path releases the finalizer without teardown
    api.delete("mirror", &DeleteParams::default()).await.unwrap();
    assert!(wait_for_deletion(&api, "mirror", TIMEOUT).await);

    delete_test_namespace(&client, namespace).await;
}

#[tokio::test]
#[ignore]
async fn test_object_user_without_store_fails_validation() {
    let client = match get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    let namespace = "rook-ceph-it-user";
    create_test_namespace(&client, namespace).await.unwrap();

    let api: Api<CephObjectStoreUser> = Api::namespaced(client.clone(), namespace);
    let user = CephObjectStoreUser::new("no-store", ObjectStoreUserSpec::default());
    api.create(&PostParams::default(), &user).await.unwrap();

    let observed = wait_for(&api, "no-store", TIMEOUT, |u| {
        u.status
            .as_ref()
            .is_some_and(|s| s.phase == PHASE_RECONCILE_FAILED)
    })
    .await
    .expect("user disappeared");
    assert_eq!(
        observed.status.map(|s| s.phase).as_deref(),
        Some(PHASE_RECONCILE_FAILED)
    );
    assert!(observed
        .metadata
        .finalizers
        .unwrap_or_default()
        .contains(&FINALIZER_OBJECT_STORE_USER.to_string()));

    api.delete("no-store", &DeleteParams::default()).await.unwrap();
    assert!(wait_for_deletion(&api, "no-store", TIMEOUT).await);

    delete_test_namespace(&client, namespace).await;
}
