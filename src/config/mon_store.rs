// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the mon config store through `ceph config`.
//!
//! Option names are normalized to underscores before they are written, so
//! `osd pool default size`, `osd-pool-default-size` and `osd_pool_default_size` all name
//! the same option.

use crate::constants::CEPH_BINARY;
use crate::exec::{CephExecutor, CommandError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One `(who, option, value)` entry of the mon config store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    /// Target section: `global`, `mon`, `osd.3`, `client.rbd-mirror.a`, ...
    pub who: String,
    /// Normalized option name
    pub option: String,
    pub value: String,
}

impl ConfigOption {
    #[must_use]
    pub fn new(who: &str, option: &str, value: &str) -> Self {
        Self {
            who: who.to_string(),
            option: normalize_key(option),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}={}", self.who, self.option, self.value)
    }
}

/// Normalizes an option name: spaces and dashes become underscores.
#[must_use]
pub fn normalize_key(option: &str) -> String {
    option.trim().replace([' ', '-'], "_")
}

/// Command-line flag form of an option name (`mon_host` -> `mon-host`).
#[must_use]
pub fn flag_key(option: &str) -> String {
    normalize_key(option).replace('_', "-")
}

/// Failures of a [`MonStore::set_all`] run.
#[derive(Debug, Error)]
#[error("failed to set {} of {total} config options: {}", .failures.len(), describe(.failures))]
pub struct SetAllError {
    pub total: usize,
    pub failures: Vec<(ConfigOption, CommandError)>,
}

fn describe(failures: &[(ConfigOption, CommandError)]) -> String {
    failures
        .iter()
        .map(|(opt, err)| format!("{}/{}: {err}", opt.who, opt.option))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The mon config store of one cluster.
#[derive(Clone)]
pub struct MonStore {
    executor: Arc<dyn CephExecutor>,
    namespace: String,
}

impl MonStore {
    #[must_use]
    pub fn new(executor: Arc<dyn CephExecutor>, namespace: &str) -> Self {
        Self {
            executor,
            namespace: namespace.to_string(),
        }
    }

    async fn config(&self, args: Vec<String>) -> Result<String, CommandError> {
        let mut full = vec!["config".to_string()];
        full.extend(args);
        self.executor.run(&self.namespace, CEPH_BINARY, &full).await
    }

    /// Sets one option.
    ///
    /// # Errors
    ///
    /// Returns the command failure.
    pub async fn set(&self, who: &str, option: &str, value: &str) -> Result<(), CommandError> {
        let option = normalize_key(option);
        self.config(vec![
            "set".into(),
            who.into(),
            option.clone(),
            value.into(),
        ])
        .await?;
        debug!(namespace = %self.namespace, who = %who, option = %option, "set config option");
        Ok(())
    }

    /// Returns the effective value of one option.
    ///
    /// # Errors
    ///
    /// Returns the command failure.
    pub async fn get(&self, who: &str, option: &str) -> Result<String, CommandError> {
        let out = self
            .config(vec!["get".into(), who.into(), normalize_key(option)])
            .await?;
        Ok(out.trim().to_string())
    }

    /// Sets an option only if its current value differs. Returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns the failure of the read or of the write.
    pub async fn set_if_changed(
        &self,
        who: &str,
        option: &str,
        value: &str,
    ) -> Result<bool, CommandError> {
        let current = self.get(who, option).await?;
        if current == value {
            return Ok(false);
        }
        self.set(who, option, value).await?;
        info!(
            namespace = %self.namespace,
            who = %who,
            option = %normalize_key(option),
            "changed config option"
        );
        Ok(true)
    }

    /// Removes an option from the store.
    ///
    /// # Errors
    ///
    /// Returns the command failure.
    pub async fn delete(&self, who: &str, option: &str) -> Result<(), CommandError> {
        self.config(vec!["rm".into(), who.into(), normalize_key(option)])
            .await?;
        Ok(())
    }

    /// Sets every option, continuing past failures.
    ///
    /// # Errors
    ///
    /// Returns a [`SetAllError`] listing each option that could not be set.
    pub async fn set_all(&self, options: &[ConfigOption]) -> Result<(), SetAllError> {
        let mut failures = Vec::new();
        for opt in options {
            if let Err(e) = self.set(&opt.who, &opt.option, &opt.value).await {
                warn!(namespace = %self.namespace, option = %opt.option, error = %e, "failed to set config option");
                failures.push((opt.clone(), e));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SetAllError {
                total: options.len(),
                failures,
            })
        }
    }
}

#[cfg(test)]
#[path = "mon_store_tests.rs"]
mod mon_store_tests;
