// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # rook-ceph-operator
//!
//! Kubernetes operator core for the auxiliary daemons of a Ceph storage cluster managed
//! through Rook custom resources.
//!
//! ## Overview
//!
//! - NVMe-oF gateways (`CephNVMeOFGateway`): per-instance ConfigMap, Deployment and Service
//! - RBD mirror daemons (`CephRBDMirror`): daemon keyrings, Deployments and bootstrap peers
//! - object store users (`CephObjectStoreUser`) and bucket notification topics
//!   (`CephBucketTopic`) backed by the object gateway admin API
//! - cephx key rotation for daemons that own a key
//! - the mon config store defaults and the cluster config Secret of every cluster
//! - the persisted OSD partition scheme
//!
//! ## Modules
//!
//! - [`crd`] - custom resource types
//! - [`controller`] - the generic controller runner every kind plugs into
//! - [`reconcilers`] - convergence logic per kind
//! - [`cephx`], [`keyring`] - key rotation policy and cephx entities
//! - [`exec`], [`rgw`] - storage cluster command execution and the object gateway admin API
//! - [`config`] - mon config store, default options, daemon flags and networks
//! - [`osd`] - OSD partition layouts and their persistence
//! - [`version`], [`naming`] - Ceph versions and daemon instance names
//!
//! ## Example
//!
//! ```rust
//! use rook_ceph_operator::naming::{index_to_name, name_to_index};
//!
//! assert_eq!(index_to_name(27), "ab");
//! assert_eq!(name_to_index("ab").unwrap(), 27);
//! ```

pub mod cephx;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod exec;
pub mod keyring;
pub mod labels;
pub mod metrics;
pub mod naming;
pub mod operator_config;
pub mod osd;
pub mod reconcilers;
pub mod rgw;
pub mod server;
pub mod status_reasons;
pub mod version;

#[cfg(test)]
pub mod testing;
