// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Where a daemon keeps its data, logs and crash dumps.

use crate::constants::{CONTAINER_CRASH_DIR, CONTAINER_LOG_DIR};
use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, HostPathVolumeSource, Volume, VolumeMount};

const DATA_VOLUME: &str = "ceph-daemon-data";
const LOG_VOLUME: &str = "rook-ceph-log";
const CRASH_VOLUME: &str = "rook-ceph-crash";

/// Backing of a daemon's data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStorage {
    /// Persisted under this host path
    Host(String),
    /// Scratch space that lives as long as the pod
    EmptyDir,
    /// The daemon keeps no data
    None,
}

/// Data, log and crash locations of one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPathMap {
    pub data: DataStorage,
    /// Data directory inside the container; empty when [`DataStorage::None`]
    pub container_data_dir: String,
    /// Host directory holding `log/` and `crash/`; `None` when the cluster has no
    /// `dataDirHostPath`
    pub host_log_and_crash_dir: Option<String>,
}

/// `/var/lib/ceph/<type>/ceph-<id>`
#[must_use]
pub fn daemon_data_dir(daemon_type: &str, daemon_id: &str) -> String {
    format!("/var/lib/ceph/{daemon_type}/ceph-{daemon_id}")
}

fn host_log_dir(data_dir_host_path: &str, namespace: &str) -> Option<String> {
    (!data_dir_host_path.is_empty())
        .then(|| format!("{}/{namespace}", data_dir_host_path.trim_end_matches('/')))
}

impl DataPathMap {
    /// A daemon whose data survives pod restarts under
    /// `<dataDirHostPath>/<relative_host_dir>`.
    #[must_use]
    pub fn stateful(
        data_dir_host_path: &str,
        relative_host_dir: &str,
        daemon_type: &str,
        daemon_id: &str,
        namespace: &str,
    ) -> Self {
        let data = if data_dir_host_path.is_empty() {
            DataStorage::EmptyDir
        } else {
            DataStorage::Host(format!(
                "{}/{relative_host_dir}",
                data_dir_host_path.trim_end_matches('/')
            ))
        };
        Self {
            data,
            container_data_dir: daemon_data_dir(daemon_type, daemon_id),
            host_log_and_crash_dir: host_log_dir(data_dir_host_path, namespace),
        }
    }

    /// A daemon with a data directory that need not survive the pod.
    #[must_use]
    pub fn stateless(
        daemon_type: &str,
        daemon_id: &str,
        namespace: &str,
        data_dir_host_path: &str,
    ) -> Self {
        Self {
            data: DataStorage::EmptyDir,
            container_data_dir: daemon_data_dir(daemon_type, daemon_id),
            host_log_and_crash_dir: host_log_dir(data_dir_host_path, namespace),
        }
    }

    /// A daemon without a data directory.
    #[must_use]
    pub fn dataless(namespace: &str, data_dir_host_path: &str) -> Self {
        Self {
            data: DataStorage::None,
            container_data_dir: String::new(),
            host_log_and_crash_dir: host_log_dir(data_dir_host_path, namespace),
        }
    }

    /// Pod volumes for this map.
    #[must_use]
    pub fn volumes(&self) -> Vec<Volume> {
        let mut volumes = Vec::new();
        match &self.data {
            DataStorage::Host(path) => volumes.push(host_path_volume(DATA_VOLUME, path)),
            DataStorage::EmptyDir => volumes.push(Volume {
                name: DATA_VOLUME.to_string(),
                empty_dir: Some(EmptyDirVolumeSource::default()),
                ..Default::default()
            }),
            DataStorage::None => {}
        }
        if let Some(dir) = &self.host_log_and_crash_dir {
            volumes.push(host_path_volume(LOG_VOLUME, &format!("{dir}/log")));
            volumes.push(host_path_volume(CRASH_VOLUME, &format!("{dir}/crash")));
        }
        volumes
    }

    /// Container mounts matching [`DataPathMap::volumes`].
    #[must_use]
    pub fn volume_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = Vec::new();
        if self.data != DataStorage::None {
            mounts.push(mount(DATA_VOLUME, &self.container_data_dir));
        }
        if self.host_log_and_crash_dir.is_some() {
            mounts.push(mount(LOG_VOLUME, CONTAINER_LOG_DIR));
            mounts.push(mount(CRASH_VOLUME, CONTAINER_CRASH_DIR));
        }
        mounts
    }
}

fn host_path_volume(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: None,
        }),
        ..Default::default()
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "datapath_tests.rs"]
mod datapath_tests;
