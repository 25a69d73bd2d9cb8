// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ceph configuration substrate.
//!
//! - [`mon_store`]: the monitors' centralized configuration database
//! - [`defaults`]: the option set pushed on cluster bootstrap
//! - [`flags`]: command-line flags and environment shared by daemon containers
//! - [`cluster_secret`]: the `rook-ceph-config` Secret carrying `mon_host`
//! - [`network`]: public/cluster network selection
//! - [`datapath`]: where a daemon keeps data, logs and crash dumps

pub mod cluster_secret;
pub mod datapath;
pub mod defaults;
pub mod flags;
pub mod mon_store;
pub mod network;

pub use mon_store::{ConfigOption, MonStore};
