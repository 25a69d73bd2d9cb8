// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Writes the CRDs reconciled by this operator from the types in src/crd.rs to
//! deploy/crds/. `CephCluster` and `CephObjectStore` are only read here; their CRDs ship
//! with the cluster operator.
//!
//! Usage:
//!   cargo run --bin crdgen [output-dir]

use kube::CustomResourceExt;
use rook_ceph_operator::crd::{CephBucketTopic, CephNVMeOFGateway, CephObjectStoreUser, CephRBDMirror};
use std::fs;
use std::path::{Path, PathBuf};

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy/crds"), PathBuf::from);

    fs::create_dir_all(&output_dir)?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<CephNVMeOFGateway>("cephnvmeofgateways.crd.yaml", &output_dir)?;
    generate_crd::<CephRBDMirror>("cephrbdmirrors.crd.yaml", &output_dir)?;
    generate_crd::<CephObjectStoreUser>("cephobjectstoreusers.crd.yaml", &output_dir)?;
    generate_crd::<CephBucketTopic>("cephbuckettopics.crd.yaml", &output_dir)?;

    println!("✓ Successfully generated CRD YAML files in {}", output_dir.display());
    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let yaml = serde_yaml::to_string(&T::crd())?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");
    Ok(())
}
