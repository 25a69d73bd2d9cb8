// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bootstrap peers of RBD mirroring.
//!
//! A peer Secret carries the base64 `token` printed by
//! `rbd mirror pool peer bootstrap create` on the remote cluster, the `pool` it mirrors
//! and optionally the `direction`. The token is handed to `rbd` through a file that only
//! exists for the duration of the import.

use crate::constants::{DEFAULT_PEER_DIRECTION, RBD_BINARY};
use crate::errors::ReconcileError;
use crate::exec::CephExecutor;
use crate::reconcilers::secret_refs::secret_value;
use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use serde::Deserialize;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{info, warn};

/// Peer Secret key holding the bootstrap token
pub const TOKEN_KEY: &str = "token";

/// Peer Secret key holding the pool name
pub const POOL_KEY: &str = "pool";

/// Peer Secret key holding the optional mirroring direction
pub const DIRECTION_KEY: &str = "direction";

const TOKEN_FILE_MODE: u32 = 0o400;

/// Decoded bootstrap token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerToken {
    pub fsid: String,
    pub client_id: String,
    pub key: String,
    pub mon_host: String,
}

/// A validated peer Secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    pub secret_name: String,
    pub pool: String,
    pub direction: String,
    /// Token as stored, still base64 encoded
    pub token: String,
}

impl std::fmt::Debug for BootstrapPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapPeer")
            .field("secret_name", &self.secret_name)
            .field("pool", &self.pool)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

/// Decodes a base64 bootstrap token.
///
/// # Errors
///
/// Returns an error if the token is not base64 or does not hold the peer JSON.
pub fn decode_token(token: &str) -> Result<PeerToken> {
    let raw = BASE64
        .decode(token.trim())
        .context("bootstrap peer token is not valid base64")?;
    serde_json::from_slice(&raw).context("bootstrap peer token does not hold peer JSON")
}

/// Reads and validates a peer Secret.
///
/// # Errors
///
/// Returns [`ReconcileError::Validation`] when `token` or `pool` is missing or empty, or
/// when the token does not decode.
pub fn peer_from_secret(secret: &Secret) -> Result<BootstrapPeer, ReconcileError> {
    let name = secret.name_any();
    let required = |key: &str| {
        secret_value(secret, key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ReconcileError::validation(format!(
                    "bootstrap peer secret {name:?} has no {key:?} value"
                ))
            })
    };
    let token = required(TOKEN_KEY)?;
    let pool = required(POOL_KEY)?;
    decode_token(&token).map_err(|e| {
        ReconcileError::validation(format!("bootstrap peer secret {name:?}: {e:#}"))
    })?;

    Ok(BootstrapPeer {
        secret_name: name,
        pool,
        direction: secret_value(secret, DIRECTION_KEY)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_PEER_DIRECTION.to_string()),
        token,
    })
}

/// Arguments of the `rbd` import for `peer` with the token at `token_path`.
#[must_use]
pub fn import_args(peer: &BootstrapPeer, token_path: &Path) -> Vec<String> {
    vec![
        "mirror".to_string(),
        "pool".to_string(),
        "peer".to_string(),
        "bootstrap".to_string(),
        "import".to_string(),
        peer.pool.clone(),
        token_path.display().to_string(),
        "--direction".to_string(),
        peer.direction.clone(),
    ]
}

/// Imports `peer` into the cluster in `namespace`.
///
/// The token is written to a read-only file under `token_dir`, which is removed once the
/// import finished, successful or not.
///
/// # Errors
///
/// Returns an error if the token file cannot be written or the import fails.
pub async fn import_peer(
    executor: &dyn CephExecutor,
    namespace: &str,
    token_dir: &Path,
    peer: &BootstrapPeer,
) -> Result<(), ReconcileError> {
    tokio::fs::create_dir_all(token_dir)
        .await
        .with_context(|| format!("failed to create {}", token_dir.display()))?;
    let token_path = token_dir.join(format!("rbd-mirror-token-{}", peer.pool));
    tokio::fs::write(&token_path, peer.token.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", token_path.display()))?;
    tokio::fs::set_permissions(&token_path, std::fs::Permissions::from_mode(TOKEN_FILE_MODE))
        .await
        .with_context(|| format!("failed to restrict {}", token_path.display()))?;

    let result = executor
        .run(namespace, RBD_BINARY, &import_args(peer, &token_path))
        .await;

    if let Err(e) = tokio::fs::remove_file(&token_path).await {
        warn!(path = %token_path.display(), error = %e, "failed to remove bootstrap token file");
    }

    result?;
    info!(namespace = %namespace, pool = %peer.pool, secret = %peer.secret_name, "imported rbd mirror bootstrap peer");
    Ok(())
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod peers_tests;
