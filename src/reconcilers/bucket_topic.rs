// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CephBucketTopic` reconciliation.
//!
//! The RGW topic is named after the resource. Its push endpoint is the configured URI with
//! credentials from the referenced Secrets embedded as userinfo, so a credential change
//! shows up as a push endpoint mismatch and triggers a topic update.

use crate::constants::{
    FINALIZER_BUCKET_TOPIC, KIND_BUCKET_TOPIC, NOT_READY_REQUEUE_SECS, READY_REQUEUE_SECS,
};
use crate::context::{Context, EventSeverity};
use crate::controller::{controller_for, publish_event, run, watched_api, Reconciled};
use crate::crd::{BucketTopicSpec, CephBucketTopic, CephObjectStore, SecretIdentity, SecretKeyRef};
use crate::errors::ReconcileError;
use crate::exec::CommandError;
use crate::reconcilers::cluster::{find_cluster, find_object_store, ready_cluster};
use crate::reconcilers::secret_refs::{resolve_secret_key, unique_identities};
use crate::reconcilers::status::update_status;
use crate::rgw::topic::{
    endpoint, live_attributes, push_endpoint_url, redact_endpoint, topic_attributes, TopicArn,
};
use crate::rgw::{RgwAdmin, RgwTopic, StoreRef, TopicParams};
use crate::status_reasons::{ACTION_RECONCILE, PHASE_READY, REASON_CREATED};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Credential references of the endpoint, present only when both are set.
#[must_use]
pub fn credential_refs(spec: &BucketTopicSpec) -> Option<(&SecretKeyRef, &SecretKeyRef)> {
    let endpoint = endpoint(&spec.endpoint).ok()?;
    endpoint.user_ref.zip(endpoint.password_ref)
}

/// Every `(namespace, secret)` a topic reads: its credential references plus the Secrets
/// recorded in status.
#[must_use]
pub fn referenced_secrets(topic: &CephBucketTopic) -> Vec<(String, String)> {
    let namespace = topic.namespace().unwrap_or_default();
    let mut refs: Vec<(String, String)> = credential_refs(&topic.spec)
        .into_iter()
        .flat_map(|(user, password)| [user.name.clone(), password.name.clone()])
        .map(|name| (namespace.clone(), name))
        .collect();
    if let Some(status) = &topic.status {
        refs.extend(
            status
                .secrets
                .iter()
                .map(|s| (s.namespace.clone(), s.name.clone())),
        );
    }
    refs
}

/// Returns `true` if any desired attribute is missing from the live topic or differs.
#[must_use]
pub fn needs_update(live: Option<&RgwTopic>, desired: &TopicParams) -> bool {
    let Some(live) = live else {
        return true;
    };
    let live = live_attributes(live);
    desired
        .attributes
        .iter()
        .any(|(key, value)| live.get(key) != Some(value))
}

/// Creates or updates the topic if it drifted and returns its ARN plus whether it was
/// written.
///
/// # Errors
///
/// Returns the first failing admin call.
pub async fn converge_topic(
    admin: &dyn RgwAdmin,
    store: &StoreRef,
    desired: &TopicParams,
) -> Result<(String, bool), CommandError> {
    let live = admin.get_topic(store, &desired.name).await?;
    if !needs_update(live.as_ref(), desired) {
        debug!(store = %store, topic = %desired.name, "topic up to date");
        let arn = live.map(|t| t.arn).unwrap_or_default();
        return Ok((arn, false));
    }
    let arn = admin.put_topic(store, desired).await?;
    Ok((arn, true))
}

async fn desired_topic(
    ctx: &Context,
    topic: &CephBucketTopic,
) -> Result<(TopicParams, Vec<SecretIdentity>), ReconcileError> {
    let namespace = topic.namespace().unwrap_or_default();
    let spec = &topic.spec;
    let endpoint = endpoint(&spec.endpoint).map_err(ReconcileError::validation)?;

    let mut identities = Vec::new();
    let credentials = match credential_refs(spec) {
        Some((user_ref, password_ref)) => {
            let user = resolve_secret_key(&ctx.client, &namespace, user_ref).await?;
            let password = resolve_secret_key(&ctx.client, &namespace, password_ref).await?;
            identities.push(user.identity);
            identities.push(password.identity);
            Some((user.value, password.value))
        }
        None => None,
    };

    let push_endpoint = push_endpoint_url(
        endpoint.uri,
        credentials.as_ref().map(|(u, p)| (u.as_str(), p.as_str())),
    )
    .map_err(|e| ReconcileError::validation(e.to_string()))?;
    let attributes = topic_attributes(
        spec.opaque_data.as_deref(),
        spec.persistent,
        &spec.endpoint,
        &push_endpoint,
    );
    Ok((
        TopicParams {
            name: topic.name_any(),
            attributes,
        },
        unique_identities(identities),
    ))
}

/// S3 endpoint the store publishes in its status, if it has one yet.
#[must_use]
pub fn object_store_endpoint(store: &CephObjectStore) -> Option<&str> {
    store
        .status
        .as_ref()
        .and_then(|s| s.info.get("endpoint"))
        .map(String::as_str)
        .filter(|e| !e.is_empty())
}

fn store_ref(spec: &BucketTopicSpec) -> StoreRef {
    StoreRef::new(&spec.object_store_namespace, &spec.object_store_name)
}

async fn reconcile_topic(
    topic: &CephBucketTopic,
    ctx: &Context,
) -> Result<Action, ReconcileError> {
    let namespace = topic.namespace().unwrap_or_default();
    let name = topic.name_any();
    ctx.topic_secrets
        .update(&namespace, &name, referenced_secrets(topic));

    if topic.spec.object_store_name.is_empty() || topic.spec.object_store_namespace.is_empty() {
        return Err(ReconcileError::validation(
            "object store name and namespace are required",
        ));
    }
    ready_cluster(ctx, &topic.spec.object_store_namespace).await?;
    let object_store = find_object_store(
        &ctx.client,
        &topic.spec.object_store_namespace,
        &topic.spec.object_store_name,
    )
    .await?;
    let Some(endpoint) = object_store_endpoint(&object_store) else {
        return Err(ReconcileError::precondition(
            format!(
                "CephObjectStore {}/{} has no endpoint yet",
                topic.spec.object_store_namespace, topic.spec.object_store_name
            ),
            NOT_READY_REQUEUE_SECS,
        ));
    };

    let (desired, identities) = desired_topic(ctx, topic).await?;
    let store = store_ref(&topic.spec).with_endpoint(endpoint);
    let (arn, written) = converge_topic(ctx.rgw.as_ref(), &store, &desired).await?;
    TopicArn::parse(&arn)?;

    ctx.topic_secrets.update(
        &namespace,
        &name,
        referenced_secrets(topic)
            .into_iter()
            .chain(identities.iter().map(|i| (i.namespace.clone(), i.name.clone()))),
    );

    let generation = topic.metadata.generation;
    update_status::<CephBucketTopic, _>(&ctx.client, &namespace, &name, |s| {
        s.phase = PHASE_READY.to_string();
        s.arn = Some(arn.clone());
        s.secrets = identities.clone();
        s.observed_generation = generation;
    })
    .await?;

    if written {
        let endpoint = desired
            .attributes
            .get(crate::rgw::topic::PUSH_ENDPOINT)
            .map(|e| redact_endpoint(e))
            .unwrap_or_default();
        info!(store = %store, topic = %name, endpoint = %endpoint, arn = %arn, "topic written");
        publish_event(
            ctx,
            topic,
            EventSeverity::Normal,
            REASON_CREATED,
            ACTION_RECONCILE,
            &format!("topic {arn} pushes to {endpoint}"),
        )
        .await;
    }
    Ok(Action::requeue(Duration::from_secs(READY_REQUEUE_SECS)))
}

async fn cleanup_topic(topic: &CephBucketTopic, ctx: &Context) -> Result<(), ReconcileError> {
    let namespace = topic.namespace().unwrap_or_default();
    let name = topic.name_any();
    ctx.topic_secrets.remove(&namespace, &name);

    if topic.status.as_ref().and_then(|s| s.arn.as_ref()).is_none() {
        debug!(namespace = %namespace, name = %name, "topic never created, nothing to remove");
        return Ok(());
    }
    if find_cluster(&ctx.client, &topic.spec.object_store_namespace)
        .await?
        .is_none()
    {
        warn!(namespace = %namespace, name = %name, "no object store cluster, skipping topic removal");
        return Ok(());
    }
    let store = store_ref(&topic.spec);
    ctx.rgw.delete_topic(&store, &name).await?;
    info!(store = %store, topic = %name, "deleted topic");
    Ok(())
}

impl Reconciled for CephBucketTopic {
    const KIND: &'static str = KIND_BUCKET_TOPIC;
    const FINALIZER: &'static str = FINALIZER_BUCKET_TOPIC;

    async fn apply(resource: Arc<Self>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
        reconcile_topic(&resource, &ctx).await
    }

    async fn cleanup(resource: Arc<Self>, ctx: Arc<Context>) -> Result<(), ReconcileError> {
        cleanup_topic(&resource, &ctx).await
    }
}

/// Runs the topic controller. Changes to referenced Secrets enqueue the topics using them.
pub async fn run_controller(ctx: Arc<Context>) {
    let index = ctx.topic_secrets.clone();
    let controller = controller_for::<CephBucketTopic>(&ctx).watches(
        watched_api::<Secret>(&ctx),
        WatcherConfig::default(),
        move |secret: Secret| {
            index.object_refs::<CephBucketTopic>(
                &secret.namespace().unwrap_or_default(),
                &secret.name_any(),
            )
        },
    );
    run(controller, ctx).await;
}

#[cfg(test)]
#[path = "bucket_topic_tests.rs"]
mod bucket_topic_tests;
