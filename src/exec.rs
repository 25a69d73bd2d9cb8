// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Storage cluster command execution.
//!
//! All interaction with the Ceph cluster goes through named CLI verbs (`ceph`, `rbd`,
//! `radosgw-admin`). [`CephExecutor`] is the seam: production code uses [`CliExecutor`],
//! which spawns the binaries with `tokio::process` under a timeout, and tests substitute
//! an in-memory fake.
//!
//! Ceph tools exit with the errno of the failed operation, so [`CommandError::errno`]
//! lets callers treat `EEXIST` / `ENOENT` as idempotent outcomes.

use crate::constants::{ERRNO_EEXIST, ERRNO_ENOENT};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors raised while running a storage cluster command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The binary could not be started
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The command did not finish in time
    #[error("command {command:?} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// The command exited with a non-zero status
    #[error("command {command:?} failed with exit code {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command output was not the expected JSON
    #[error("failed to parse output of {command:?}: {source}")]
    Json {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// An object store HTTP API call failed
    #[error("{action} against {endpoint} failed: {message}")]
    Http {
        action: String,
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
}

impl CommandError {
    /// Exit code of a failed command, which Ceph tools set to the operation's errno.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            _ => None,
        }
    }

    /// The target already exists.
    #[must_use]
    pub fn is_exists(&self) -> bool {
        self.errno() == Some(ERRNO_EEXIST)
    }

    /// The target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.errno() == Some(ERRNO_ENOENT)
    }
}

/// Runs a storage cluster CLI verb and returns its stdout.
#[async_trait]
pub trait CephExecutor: Send + Sync {
    /// Runs `binary` with `args` against the cluster in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] if the command cannot be started, times out, or exits
    /// with a non-zero status.
    async fn run(&self, namespace: &str, binary: &str, args: &[String])
        -> Result<String, CommandError>;
}

/// Runs a command and parses its JSON output, tolerating unknown fields.
///
/// # Errors
///
/// Returns the command's error, or [`CommandError::Json`] if stdout is not valid JSON for `T`.
pub async fn run_json<T: DeserializeOwned>(
    executor: &dyn CephExecutor,
    namespace: &str,
    binary: &str,
    args: &[String],
) -> Result<T, CommandError> {
    let stdout = executor.run(namespace, binary, args).await?;
    serde_json::from_str(&stdout).map_err(|source| CommandError::Json {
        command: describe(binary, args),
        source,
    })
}

/// Converts string slices into owned command arguments.
#[must_use]
pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

fn describe(binary: &str, args: &[String]) -> String {
    let mut parts = vec![binary.to_string()];
    parts.extend(args.iter().map(|a| redact_arg(a)));
    parts.join(" ")
}

/// Hides secret values in logged arguments.
fn redact_arg(arg: &str) -> String {
    for flag in ["--secret=", "--secret-key=", "--key=", "--access-key="] {
        if arg.starts_with(flag) {
            return format!("{flag}***");
        }
    }
    match arg.split_once('=') {
        Some((name, value)) if value.contains("://") => {
            format!("{name}={}", crate::rgw::topic::redact_endpoint(value))
        }
        _ => arg.to_string(),
    }
}

/// [`CephExecutor`] that spawns the Ceph CLI tools.
///
/// Each cluster namespace has a config file and admin keyring under
/// `<config_dir>/<namespace>/`, written by the cluster config reconciler.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    config_dir: PathBuf,
    timeout: Duration,
}

impl CliExecutor {
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            config_dir: config_dir.into(),
            timeout,
        }
    }

    /// Directory holding the connection files of `namespace`.
    #[must_use]
    pub fn cluster_dir(&self, namespace: &str) -> PathBuf {
        self.config_dir.join(namespace)
    }

    /// Path of the generated config file for `namespace`.
    #[must_use]
    pub fn config_path(&self, namespace: &str) -> PathBuf {
        self.cluster_dir(namespace).join(format!("{namespace}.config"))
    }

    /// Path of the admin keyring for `namespace`.
    #[must_use]
    pub fn keyring_path(&self, namespace: &str) -> PathBuf {
        self.cluster_dir(namespace).join("client.admin.keyring")
    }

    /// Connection flags appended to every command.
    #[must_use]
    pub fn connection_args(&self, namespace: &str) -> Vec<String> {
        vec![
            format!("--cluster={namespace}"),
            format!("--conf={}", self.config_path(namespace).display()),
            "--name=client.admin".to_string(),
            format!("--keyring={}", self.keyring_path(namespace).display()),
            format!("--connect-timeout={}", self.timeout.as_secs()),
        ]
    }
}

#[async_trait]
impl CephExecutor for CliExecutor {
    async fn run(
        &self,
        namespace: &str,
        binary: &str,
        args: &[String],
    ) -> Result<String, CommandError> {
        let started = std::time::Instant::now();
        let result = self.execute(namespace, binary, args).await;
        crate::metrics::record_ceph_command(binary, result.is_ok(), started.elapsed());
        result
    }
}

impl CliExecutor {
    async fn execute(
        &self,
        namespace: &str,
        binary: &str,
        args: &[String],
    ) -> Result<String, CommandError> {
        let command = describe(binary, args);
        debug!(command = %command, namespace = %namespace, "running ceph command");

        let child = Command::new(binary)
            .args(args)
            .args(self.connection_args(namespace))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                binary: binary.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CommandError::Spawn {
                binary: binary.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(CommandError::Timeout {
                    command,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(CommandError::Failed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod exec_tests;
