// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration of the operator binary.

use crate::constants::{
    DEFAULT_CEPH_COMMAND_TIMEOUT_SECS, DEFAULT_CONFIG_DIR, DEFAULT_METRICS_ADDR,
    DEFAULT_NVMEOF_IMAGE,
};
use crate::context::OperatorSettings;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rook-ceph-operator",
    version,
    about = "Kubernetes operator for Ceph auxiliary daemons"
)]
pub struct OperatorConfig {
    /// Address of the metrics and health endpoints
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Timeout of a single ceph, rbd or radosgw-admin command, in seconds
    #[arg(
        long,
        env = "ROOK_CEPH_COMMANDS_TIMEOUT_SECONDS",
        default_value_t = DEFAULT_CEPH_COMMAND_TIMEOUT_SECS
    )]
    pub ceph_command_timeout_secs: u64,

    /// Namespace to watch; empty watches all namespaces
    #[arg(long, env = "ROOK_WATCH_NAMESPACE", default_value = "")]
    pub watch_namespace: String,

    /// Image of the operator itself
    #[arg(long, env = "ROOK_OPERATOR_IMAGE", default_value = "")]
    pub operator_image: String,

    /// Gateway image for NVMe-oF gateways that set none
    #[arg(long, env = "ROOK_NVMEOF_DEFAULT_IMAGE", default_value = DEFAULT_NVMEOF_IMAGE)]
    pub nvmeof_default_image: String,

    /// Directory for per-cluster connection files
    #[arg(long, env = "ROOK_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,
}

impl OperatorConfig {
    /// Settings shared with the controllers.
    #[must_use]
    pub fn settings(&self) -> OperatorSettings {
        let watch_namespace = self.watch_namespace.trim();
        OperatorSettings {
            operator_image: self.operator_image.clone(),
            nvmeof_default_image: self.nvmeof_default_image.clone(),
            watch_namespace: (!watch_namespace.is_empty()).then(|| watch_namespace.to_string()),
            ceph_command_timeout: Duration::from_secs(self.ceph_command_timeout_secs),
            config_dir: self.config_dir.clone(),
        }
    }
}

#[cfg(test)]
#[path = "operator_config_tests.rs"]
mod operator_config_tests;
