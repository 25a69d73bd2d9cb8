// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Types exchanged with the RGW admin interface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies the object store an admin call targets.
///
/// `namespace` is the storage cluster namespace the CLI connects to; `name` is the
/// object store, used as realm, zone group and zone. `endpoint` is the store's S3 URL,
/// needed only by calls that go over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRef {
    pub namespace: String,
    pub name: String,
    pub endpoint: Option<String>,
}

impl StoreRef {
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            endpoint: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// An S3 access key pair.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct S3Key {
    pub access_key: String,
    pub secret_key: String,
}

impl S3Key {
    #[must_use]
    pub fn new(access_key: &str, secret_key: &str) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

// Keeps secret keys out of logs.
impl fmt::Debug for S3Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Key")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// One admin capability (`users=read`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserCap {
    #[serde(rename = "type")]
    pub cap_type: String,
    pub perm: String,
}

/// User quota as reported by `user info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaInfo {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_size: i64,
    #[serde(default)]
    pub max_objects: i64,
}

/// RGW user as reported by `user info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgwUser {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub keys: Vec<S3Key>,
    #[serde(default)]
    pub caps: Vec<UserCap>,
    #[serde(default)]
    pub op_mask: String,
    #[serde(default)]
    pub max_buckets: i64,
    #[serde(default)]
    pub user_quota: QuotaInfo,
}

/// Desired attributes of an RGW user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserParams {
    pub uid: String,
    pub display_name: String,
    /// Normalized op mask (`read, write`); `None` leaves the current mask
    pub op_mask: Option<String>,
    pub max_buckets: Option<i64>,
}

/// Desired user quota.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaParams {
    pub max_size: Option<i64>,
    pub max_objects: Option<i64>,
}

/// RGW topic as reported by `topic get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgwTopic {
    pub name: String,
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub dest: TopicDestination,
    #[serde(default)]
    pub opaque_data: String,
}

/// Push destination of a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDestination {
    #[serde(default)]
    pub push_endpoint: String,
    /// Every attribute the topic was created with, form encoded
    #[serde(default)]
    pub push_endpoint_args: String,
    #[serde(default)]
    pub persistent: bool,
}

/// Desired topic: name plus the attributes sent on create/modify.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TopicParams {
    pub name: String,
    /// Includes `push-endpoint`, which may carry credentials
    pub attributes: BTreeMap<String, String>,
}

impl fmt::Debug for TopicParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes = self.attributes.clone();
        if let Some(endpoint) = attributes.get_mut(super::topic::PUSH_ENDPOINT) {
            *endpoint = super::topic::redact_endpoint(endpoint);
        }
        f.debug_struct("TopicParams")
            .field("name", &self.name)
            .field("attributes", &attributes)
            .finish()
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
