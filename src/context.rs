// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client and the operator settings
//! - the storage cluster collaborators ([`CephExecutor`], [`RgwAdmin`], [`KeyringStore`])
//! - the Event publisher
//! - the Secret reverse indexes used by the Secret watches
//! - per-key failure counters used for backoff and phase escalation
//!
//! The collaborators are trait objects so reconcilers can be exercised with in-memory
//! fakes.

use crate::constants::{
    DEFAULT_CEPH_COMMAND_TIMEOUT_SECS, DEFAULT_CONFIG_DIR, DEFAULT_NVMEOF_IMAGE, EVENT_REPORTER,
    FIELD_MANAGER,
};
use crate::exec::{CephExecutor, CliExecutor};
use crate::keyring::{KeyringStore, SecretKeyringStore};
use crate::reconcilers::secret_index::SecretIndex;
use crate::rgw::{CliRgwAdmin, RgwAdmin};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Operator-wide settings, resolved from the command line and environment in `main`.
#[derive(Clone, Debug)]
pub struct OperatorSettings {
    /// Image of the operator itself
    pub operator_image: String,
    /// Gateway image used when a `CephNVMeOFGateway` sets none
    pub nvmeof_default_image: String,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Timeout of a single storage cluster command
    pub ceph_command_timeout: Duration,
    /// Directory holding per-cluster connection files
    pub config_dir: PathBuf,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            operator_image: String::new(),
            nvmeof_default_image: DEFAULT_NVMEOF_IMAGE.to_string(),
            watch_namespace: None,
            ceph_command_timeout: Duration::from_secs(DEFAULT_CEPH_COMMAND_TIMEOUT_SECS),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

/// Event severity, mapped onto the Kubernetes Event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Publishes user-visible Events on reconciled resources.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an Event regarding `object`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Event cannot be written.
    async fn publish(
        &self,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        action: &str,
        note: &str,
    ) -> anyhow::Result<()>;
}

/// [`EventPublisher`] writing `events.k8s.io` Events through a [`Recorder`].
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: EVENT_REPORTER.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        object: &ObjectReference,
        severity: EventSeverity,
        reason: &str,
        action: &str,
        note: &str,
    ) -> anyhow::Result<()> {
        let type_ = match severity {
            EventSeverity::Normal => EventType::Normal,
            EventSeverity::Warning => EventType::Warning,
        };
        self.recorder
            .publish(
                &Event {
                    type_,
                    reason: reason.to_string(),
                    note: Some(note.to_string()),
                    action: action.to_string(),
                    secondary: None,
                },
                object,
            )
            .await?;
        Ok(())
    }
}

/// Consecutive failed reconciles per `kind/namespace/name` key.
#[derive(Clone, Default)]
pub struct FailureTracker {
    counts: Arc<Mutex<HashMap<String, u32>>>,
}

impl FailureTracker {
    /// Counts one more failure for `key` and returns the new count.
    pub fn record(&self, key: &str) -> u32 {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = counts.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Forgets the failures of `key` after a successful reconcile.
    pub fn reset(&self, key: &str) {
        self.counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }

    /// Current failure count of `key`.
    #[must_use]
    pub fn count(&self, key: &str) -> u32 {
        self.counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    pub settings: OperatorSettings,

    /// Runs `ceph`, `rbd` and `radosgw-admin` commands
    pub executor: Arc<dyn CephExecutor>,

    /// Object gateway admin operations
    pub rgw: Arc<dyn RgwAdmin>,

    /// Daemon keyring Secrets
    pub keyrings: Arc<dyn KeyringStore>,

    pub events: Arc<dyn EventPublisher>,

    /// Secrets referenced by `CephObjectStoreUser` keys
    pub user_secrets: SecretIndex,

    /// Secrets referenced by `CephBucketTopic` endpoints
    pub topic_secrets: SecretIndex,

    pub failures: FailureTracker,
}

impl Context {
    /// Builds the production context: CLI-backed storage cluster access and
    /// Kubernetes-backed keyrings and Events.
    #[must_use]
    pub fn new(client: Client, settings: OperatorSettings) -> Self {
        let executor: Arc<dyn CephExecutor> = Arc::new(CliExecutor::new(
            settings.config_dir.clone(),
            settings.ceph_command_timeout,
        ));
        Self {
            rgw: Arc::new(CliRgwAdmin::new(executor.clone())),
            keyrings: Arc::new(SecretKeyringStore::new(client.clone(), FIELD_MANAGER)),
            events: Arc::new(KubeEventPublisher::new(client.clone())),
            executor,
            client,
            settings,
            user_secrets: SecretIndex::new(),
            topic_secrets: SecretIndex::new(),
            failures: FailureTracker::default(),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
