// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory collaborators shared by unit tests.

use crate::exec::{CephExecutor, CommandError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Scripted [`CephExecutor`] that records every command line.
///
/// Responses are matched by prefix against `"<binary> <args...>"`, first rule wins.
/// Commands matching no rule succeed with empty output.
#[derive(Default)]
pub struct FakeExecutor {
    rules: Mutex<Vec<(String, Result<String, i32>)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands starting with `prefix` with `stdout`.
    pub fn respond(&self, prefix: &str, stdout: &str) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.to_string(), Ok(stdout.to_string())));
        self
    }

    /// Fails commands starting with `prefix` with exit code `code`.
    pub fn fail(&self, prefix: &str, code: i32) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.to_string(), Err(code)));
        self
    }

    /// Command lines run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl CephExecutor for FakeExecutor {
    async fn run(
        &self,
        _namespace: &str,
        binary: &str,
        args: &[String],
    ) -> Result<String, CommandError> {
        let line = std::iter::once(binary.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());

        let rules = self.rules.lock().unwrap();
        match rules.iter().find(|(prefix, _)| line.starts_with(prefix.as_str())) {
            Some((_, Ok(stdout))) => Ok(stdout.clone()),
            Some((_, Err(code))) => Err(CommandError::Failed {
                command: line,
                code: Some(*code),
                stderr: format!("exit {code}"),
            }),
            None => Ok(String::new()),
        }
    }
}

/// [`KeyringStore`](crate::keyring::KeyringStore) kept in memory, keyed by `namespace/name`.
#[derive(Default)]
pub struct MemoryKeyringStore {
    pub secrets: Mutex<std::collections::BTreeMap<String, String>>,
}

#[async_trait]
impl crate::keyring::KeyringStore for MemoryKeyringStore {
    async fn put(
        &self,
        namespace: &str,
        name: &str,
        keyring: &str,
        _owner: Option<k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference>,
    ) -> anyhow::Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(format!("{namespace}/{name}"), keyring.to_string());
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .remove(&format!("{namespace}/{name}"));
        Ok(())
    }
}

/// In-memory object store implementing [`RgwAdmin`](crate::rgw::RgwAdmin).
///
/// Generated keys are `GEN<n>` / `GENSECRET<n>`; topic ARNs are
/// `arn:aws:sns:<store>::<name>`.
#[derive(Default)]
pub struct MemoryRgw {
    pub users: Mutex<std::collections::BTreeMap<String, crate::rgw::RgwUser>>,
    pub topics: Mutex<std::collections::BTreeMap<String, crate::rgw::TopicParams>>,
    generated: Mutex<u32>,
}

impl MemoryRgw {
    pub fn user(&self, uid: &str) -> Option<crate::rgw::RgwUser> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    pub fn key_pairs(&self, uid: &str) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .user(uid)
            .map(|u| u.keys)
            .unwrap_or_default()
            .into_iter()
            .map(|k| (k.access_key, k.secret_key))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn topic_endpoint(&self, name: &str) -> Option<String> {
        self.topics
            .lock()
            .unwrap()
            .get(name)
            .and_then(|t| t.attributes.get(crate::rgw::topic::PUSH_ENDPOINT).cloned())
    }

    fn generate(&self) -> crate::rgw::S3Key {
        let mut n = self.generated.lock().unwrap();
        *n += 1;
        crate::rgw::S3Key::new(&format!("GEN{n}"), &format!("GENSECRET{n}"))
    }

    fn missing(what: &str) -> CommandError {
        CommandError::Failed {
            command: what.to_string(),
            code: Some(crate::constants::ERRNO_ENOENT),
            stderr: "not found".to_string(),
        }
    }
}

#[async_trait]
impl crate::rgw::RgwAdmin for MemoryRgw {
    async fn get_user(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
    ) -> Result<Option<crate::rgw::RgwUser>, CommandError> {
        Ok(self.user(uid))
    }

    async fn create_user(
        &self,
        _store: &crate::rgw::StoreRef,
        params: &crate::rgw::UserParams,
    ) -> Result<crate::rgw::RgwUser, CommandError> {
        if let Some(existing) = self.user(&params.uid) {
            return Ok(existing);
        }
        let user = crate::rgw::RgwUser {
            user_id: params.uid.clone(),
            display_name: params.display_name.clone(),
            keys: vec![self.generate()],
            op_mask: params
                .op_mask
                .clone()
                .unwrap_or_else(|| "read, write, delete".to_string()),
            max_buckets: params.max_buckets.unwrap_or(1000),
            ..Default::default()
        };
        self.users
            .lock()
            .unwrap()
            .insert(params.uid.clone(), user.clone());
        Ok(user)
    }

    async fn modify_user(
        &self,
        _store: &crate::rgw::StoreRef,
        params: &crate::rgw::UserParams,
    ) -> Result<crate::rgw::RgwUser, CommandError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&params.uid)
            .ok_or_else(|| Self::missing("user modify"))?;
        user.display_name = params.display_name.clone();
        if let Some(mask) = &params.op_mask {
            user.op_mask = mask.clone();
        }
        if let Some(max) = params.max_buckets {
            user.max_buckets = max;
        }
        Ok(user.clone())
    }

    async fn delete_user(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
    ) -> Result<(), CommandError> {
        self.users.lock().unwrap().remove(uid);
        Ok(())
    }

    async fn add_caps(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
        caps: &[crate::rgw::UserCap],
    ) -> Result<(), CommandError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(uid).ok_or_else(|| Self::missing("caps add"))?;
        user.caps.extend(caps.iter().cloned());
        Ok(())
    }

    async fn remove_caps(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
        caps: &[crate::rgw::UserCap],
    ) -> Result<(), CommandError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(uid).ok_or_else(|| Self::missing("caps rm"))?;
        user.caps.retain(|c| !caps.contains(c));
        Ok(())
    }

    async fn create_key(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
        key: Option<&crate::rgw::S3Key>,
    ) -> Result<crate::rgw::RgwUser, CommandError> {
        let key = key.cloned().unwrap_or_else(|| self.generate());
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(uid).ok_or_else(|| Self::missing("key create"))?;
        user.keys.retain(|k| k.access_key != key.access_key);
        user.keys.push(key);
        Ok(user.clone())
    }

    async fn remove_key(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
        access_key: &str,
    ) -> Result<(), CommandError> {
        if let Some(user) = self.users.lock().unwrap().get_mut(uid) {
            user.keys.retain(|k| k.access_key != access_key);
        }
        Ok(())
    }

    async fn set_quota(
        &self,
        _store: &crate::rgw::StoreRef,
        uid: &str,
        quota: &crate::rgw::QuotaParams,
    ) -> Result<(), CommandError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(uid).ok_or_else(|| Self::missing("quota set"))?;
        user.user_quota = crate::rgw::QuotaInfo {
            enabled: true,
            max_size: quota.max_size.unwrap_or(-1),
            max_objects: quota.max_objects.unwrap_or(-1),
        };
        Ok(())
    }

    async fn get_topic(
        &self,
        store: &crate::rgw::StoreRef,
        name: &str,
    ) -> Result<Option<crate::rgw::RgwTopic>, CommandError> {
        Ok(self.topics.lock().unwrap().get(name).map(|t| crate::rgw::RgwTopic {
            name: t.name.clone(),
            arn: format!("arn:aws:sns:{}::{}", store.name, t.name),
            dest: crate::rgw::types::TopicDestination {
                push_endpoint: t
                    .attributes
                    .get(crate::rgw::topic::PUSH_ENDPOINT)
                    .cloned()
                    .unwrap_or_default(),
                push_endpoint_args: url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&t.attributes)
                    .finish(),
                persistent: t.attributes.get("persistent").is_some_and(|p| p == "true"),
            },
            opaque_data: t.attributes.get("OpaqueData").cloned().unwrap_or_default(),
        }))
    }

    async fn put_topic(
        &self,
        store: &crate::rgw::StoreRef,
        params: &crate::rgw::TopicParams,
    ) -> Result<String, CommandError> {
        self.topics
            .lock()
            .unwrap()
            .insert(params.name.clone(), params.clone());
        Ok(format!("arn:aws:sns:{}::{}", store.name, params.name))
    }

    async fn delete_topic(
        &self,
        _store: &crate::rgw::StoreRef,
        name: &str,
    ) -> Result<(), CommandError> {
        self.topics.lock().unwrap().remove(name);
        Ok(())
    }
}
