// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RGW administration.
//!
//! Object store users, their keys, caps and quotas, and bucket notification topics are
//! managed through the [`RgwAdmin`] trait. [`CliRgwAdmin`] implements it with
//! `radosgw-admin`, scoping every call to the object store's realm, zone group and zone.
//! Topic creation is the exception: it goes through the store's SNS API ([`sns`]),
//! signed with the key of the admin ops user.
//!
//! `EEXIST` on create and `ENOENT` on delete are idempotent outcomes and never surface
//! as errors.

pub mod keys;
pub mod sns;
pub mod topic;
pub mod types;
pub mod user;

pub use types::{
    QuotaInfo, QuotaParams, RgwTopic, RgwUser, S3Key, StoreRef, TopicParams, UserCap, UserParams,
};

use crate::constants::{
    RADOSGW_ADMIN_BINARY, RGW_ADMIN_OPS_CAPS, RGW_ADMIN_OPS_DISPLAY_NAME, RGW_ADMIN_OPS_USER,
};
use crate::exec::{CephExecutor, CommandError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// Admin operations on an object store.
#[async_trait]
pub trait RgwAdmin: Send + Sync {
    /// Returns the user, or `None` if it does not exist.
    async fn get_user(&self, store: &StoreRef, uid: &str)
        -> Result<Option<RgwUser>, CommandError>;

    /// Creates the user with one generated key. An existing user is returned as-is.
    async fn create_user(
        &self,
        store: &StoreRef,
        params: &UserParams,
    ) -> Result<RgwUser, CommandError>;

    /// Updates display name, op mask and bucket limit.
    async fn modify_user(
        &self,
        store: &StoreRef,
        params: &UserParams,
    ) -> Result<RgwUser, CommandError>;

    /// Removes the user. A missing user is success.
    async fn delete_user(&self, store: &StoreRef, uid: &str) -> Result<(), CommandError>;

    async fn add_caps(
        &self,
        store: &StoreRef,
        uid: &str,
        caps: &[UserCap],
    ) -> Result<(), CommandError>;

    async fn remove_caps(
        &self,
        store: &StoreRef,
        uid: &str,
        caps: &[UserCap],
    ) -> Result<(), CommandError>;

    /// Adds `key`, or a generated key when `None`. An existing access key gets the new secret.
    async fn create_key(
        &self,
        store: &StoreRef,
        uid: &str,
        key: Option<&S3Key>,
    ) -> Result<RgwUser, CommandError>;

    /// Removes an access key. A missing key is success.
    async fn remove_key(
        &self,
        store: &StoreRef,
        uid: &str,
        access_key: &str,
    ) -> Result<(), CommandError>;

    /// Sets and enables the user quota.
    async fn set_quota(
        &self,
        store: &StoreRef,
        uid: &str,
        quota: &QuotaParams,
    ) -> Result<(), CommandError>;

    /// Returns the topic, or `None` if it does not exist.
    async fn get_topic(&self, store: &StoreRef, name: &str)
        -> Result<Option<RgwTopic>, CommandError>;

    /// Creates or updates a topic and returns its ARN.
    async fn put_topic(
        &self,
        store: &StoreRef,
        params: &TopicParams,
    ) -> Result<String, CommandError> {
        let endpoint = store.endpoint.as_deref().ok_or_else(|| CommandError::Http {
            action: "CreateTopic".to_string(),
            endpoint: String::new(),
            status: None,
            message: format!("object store {store} has no endpoint"),
        })?;
        let key = self.admin_ops_key(store).await?;
        let arn = self.sns.create_topic(endpoint, &key, params).await?;
        info!(store = %store, topic = %params.name, arn = %arn, "topic provisioned");
        Ok(arn)
    }

    async fn delete_topic(&self, store: &StoreRef, name: &str) -> Result<(), CommandError>;
}

/// [`RgwAdmin`] backed by `radosgw-admin`.
#[derive(Clone)]
pub struct CliRgwAdmin {
    executor: Arc<dyn CephExecutor>,
    sns: sns::SnsClient,
}

impl CliRgwAdmin {
    #[must_use]
    pub fn new(executor: Arc<dyn CephExecutor>) -> Self {
        Self {
            executor,
            sns: sns::SnsClient::new(),
        }
    }

    /// Key of the admin ops user, created with its caps on first use.
    async fn admin_ops_key(&self, store: &StoreRef) -> Result<S3Key, CommandError> {
        let mut args = user_args(
            "create",
            &UserParams {
                uid: RGW_ADMIN_OPS_USER.to_string(),
                display_name: RGW_ADMIN_OPS_DISPLAY_NAME.to_string(),
                ..Default::default()
            },
        );
        args.push(format!("--caps={RGW_ADMIN_OPS_CAPS}"));
        let user: RgwUser = match self.run_json(store, args).await {
            Ok(user) => user,
            Err(e) if e.is_exists() => self.get_user(store, RGW_ADMIN_OPS_USER).await?.ok_or(e)?,
            Err(e) => return Err(e),
        };
        user.keys.into_iter().next().ok_or_else(|| CommandError::Failed {
            command: format!("{RADOSGW_ADMIN_BINARY} user info"),
            code: None,
            stderr: format!("{RGW_ADMIN_OPS_USER} has no S3 key"),
        })
    }

    async fn run(&self, store: &StoreRef, mut args: Vec<String>) -> Result<String, CommandError> {
        args.extend(store_args(store));
        self.executor
            .run(&store.namespace, RADOSGW_ADMIN_BINARY, &args)
            .await
    }

    async fn run_json<T: DeserializeOwned>(
        &self,
        store: &StoreRef,
        args: Vec<String>,
    ) -> Result<T, CommandError> {
        let command = format!("{RADOSGW_ADMIN_BINARY} {}", args.first().cloned().unwrap_or_default());
        let stdout = self.run(store, args).await?;
        serde_json::from_str(&stdout).map_err(|source| CommandError::Json { command, source })
    }
}

/// Realm, zone group and zone of a single-site object store.
fn store_args(store: &StoreRef) -> Vec<String> {
    vec![
        format!("--rgw-realm={}", store.name),
        format!("--rgw-zonegroup={}", store.name),
        format!("--rgw-zone={}", store.name),
    ]
}

fn user_args(verb: &str, params: &UserParams) -> Vec<String> {
    let mut args = vec![
        "user".to_string(),
        verb.to_string(),
        format!("--uid={}", params.uid),
        format!("--display-name={}", params.display_name),
    ];
    if let Some(mask) = &params.op_mask {
        args.push(format!("--op-mask={mask}"));
    }
    if let Some(max) = params.max_buckets {
        args.push(format!("--max-buckets={max}"));
    }
    args
}

fn is_missing(err: &CommandError) -> bool {
    match err {
        CommandError::Failed { stderr, .. } => {
            err.is_not_found() || stderr.contains("no user info saved")
        }
        _ => false,
    }
}

#[async_trait]
impl RgwAdmin for CliRgwAdmin {
    async fn get_user(
        &self,
        store: &StoreRef,
        uid: &str,
    ) -> Result<Option<RgwUser>, CommandError> {
        let args = vec!["user".into(), "info".into(), format!("--uid={uid}")];
        match self.run_json(store, args).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_user(
        &self,
        store: &StoreRef,
        params: &UserParams,
    ) -> Result<RgwUser, CommandError> {
        match self.run_json(store, user_args("create", params)).await {
            Ok(user) => {
                info!(store = %store, uid = %params.uid, "created rgw user");
                Ok(user)
            }
            Err(e) if e.is_exists() => {
                debug!(store = %store, uid = %params.uid, "rgw user already exists");
                self.get_user(store, &params.uid)
                    .await?
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn modify_user(
        &self,
        store: &StoreRef,
        params: &UserParams,
    ) -> Result<RgwUser, CommandError> {
        self.run_json(store, user_args("modify", params)).await
    }

    async fn delete_user(&self, store: &StoreRef, uid: &str) -> Result<(), CommandError> {
        let args = vec!["user".into(), "rm".into(), format!("--uid={uid}")];
        match self.run(store, args).await {
            Ok(_) => {
                info!(store = %store, uid = %uid, "deleted rgw user");
                Ok(())
            }
            Err(e) if is_missing(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn add_caps(
        &self,
        store: &StoreRef,
        uid: &str,
        caps: &[UserCap],
    ) -> Result<(), CommandError> {
        if caps.is_empty() {
            return Ok(());
        }
        let args = vec![
            "caps".into(),
            "add".into(),
            format!("--uid={uid}"),
            format!("--caps={}", user::caps_arg(caps)),
        ];
        self.run(store, args).await.map(|_| ())
    }

    async fn remove_caps(
        &self,
        store: &StoreRef,
        uid: &str,
        caps: &[UserCap],
    ) -> Result<(), CommandError> {
        if caps.is_empty() {
            return Ok(());
        }
        let args = vec![
            "caps".into(),
            "rm".into(),
            format!("--uid={uid}"),
            format!("--caps={}", user::caps_arg(caps)),
        ];
        self.run(store, args).await.map(|_| ())
    }

    async fn create_key(
        &self,
        store: &StoreRef,
        uid: &str,
        key: Option<&S3Key>,
    ) -> Result<RgwUser, CommandError> {
        let mut args = vec![
            "key".into(),
            "create".into(),
            format!("--uid={uid}"),
            "--key-type=s3".into(),
        ];
        match key {
            Some(key) => {
                args.push(format!("--access-key={}", key.access_key));
                args.push(format!("--secret-key={}", key.secret_key));
            }
            None => {
                args.push("--gen-access-key".into());
                args.push("--gen-secret".into());
            }
        }
        self.run_json(store, args).await
    }

    async fn remove_key(
        &self,
        store: &StoreRef,
        uid: &str,
        access_key: &str,
    ) -> Result<(), CommandError> {
        let args = vec![
            "key".into(),
            "rm".into(),
            format!("--uid={uid}"),
            "--key-type=s3".into(),
            format!("--access-key={access_key}"),
        ];
        match self.run(store, args).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn set_quota(
        &self,
        store: &StoreRef,
        uid: &str,
        quota: &QuotaParams,
    ) -> Result<(), CommandError> {
        let mut args = vec![
            "quota".into(),
            "set".into(),
            "--quota-scope=user".into(),
            format!("--uid={uid}"),
        ];
        if let Some(size) = quota.max_size {
            args.push(format!("--max-size={size}"));
        }
        if let Some(objects) = quota.max_objects {
            args.push(format!("--max-objects={objects}"));
        }
        self.run(store, args).await?;

        let enable = vec![
            "quota".into(),
            "enable".into(),
            "--quota-scope=user".into(),
            format!("--uid={uid}"),
        ];
        self.run(store, enable).await.map(|_| ())
    }

    async fn get_topic(
        &self,
        store: &StoreRef,
        name: &str,
    ) -> Result<Option<RgwTopic>, CommandError> {
        let args = vec!["topic".into(), "get".into(), format!("--topic={name}")];
        match self.run_json(store, args).await {
            Ok(topic) => Ok(Some(topic)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_topic(
        &self,
        store: &StoreRef,
        params: &TopicParams,
    ) -> Result<String, CommandError> {
        let mut args = vec![
            "topic".into(),
            "create".into(),
            format!("--topic={}", params.name),
        ];
        for (key, value) in &params.attributes {
            args.push("--attribute".into());
            args.push(format!("{key}={value}"));
        }
        self.run(store, args).await?;

        match self.get_topic(store, &params.name).await? {
            Some(topic) if !topic.arn.is_empty() => {
                info!(store = %store, topic = %params.name, arn = %topic.arn, "topic provisioned");
                Ok(topic.arn)
            }
            _ => Err(CommandError::Failed {
                command: format!("{RADOSGW_ADMIN_BINARY} topic create"),
                code: None,
                stderr: format!("topic {:?} has no ARN after create", params.name),
            }),
        }
    }

    async fn delete_topic(&self, store: &StoreRef, name: &str) -> Result<(), CommandError> {
        let args = vec!["topic".into(), "rm".into(), format!("--topic={name}")];
        match self.run(store, args).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(store = %store, topic = %name, "topic already removed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod mod_tests;
