// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic controller runner.
//!
//! Every reconciled kind implements [`Reconciled`] and is driven by the same loop:
//!
//! 1. a resource with a deletion timestamp runs [`Reconciled::cleanup`], then its
//!    finalizer is removed
//! 2. a resource seen for the first time gets its finalizer and the reconcile ends; the
//!    metadata write triggers the next one
//! 3. anything else runs [`Reconciled::apply`], after recording the `Reconciling` phase
//!    when the generation has not been observed yet
//!
//! Failures are classified by [`ReconcileError`]: the runner records the failed phase,
//! publishes a Warning Event and picks the requeue delay. Panics inside a reconcile are
//! caught and reported as [`ReconcileError::Panic`].
//!
//! `kube::runtime::Controller` already serializes reconciles per object key, so a
//! reconciler never races itself for the same resource.

use crate::constants::REMOTE_FAILURES_BEFORE_FAILED_PHASE;
use crate::context::{Context, EventSeverity};
use crate::errors::{ReconcileError, Requeue};
use crate::metrics;
use crate::reconcilers::finalizers::{
    ensure_finalizer, has_finalizer, is_being_deleted, remove_finalizer,
};
use crate::reconcilers::retry::error_requeue_delay;
use crate::reconcilers::should_reconcile;
use crate::reconcilers::status::{set_phase, HasStatus};
use crate::status_reasons::{
    ACTION_DELETE, ACTION_RECONCILE, PHASE_RECONCILING, REASON_DELETED, REASON_RECONCILE_FAILED,
};
use futures::{FutureExt, StreamExt};
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A custom resource kind driven by [`run`].
pub trait Reconciled: HasStatus {
    /// Kind name used in logs, metrics and failure keys
    const KIND: &'static str;

    /// Finalizer guarding the deletion path
    const FINALIZER: &'static str;

    /// Converges owned objects and storage cluster state towards the spec.
    fn apply(
        resource: Arc<Self>,
        ctx: Arc<Context>,
    ) -> impl Future<Output = Result<Action, ReconcileError>> + Send;

    /// Deletion path, run before the finalizer is removed.
    fn cleanup(
        resource: Arc<Self>,
        ctx: Arc<Context>,
    ) -> impl Future<Output = Result<(), ReconcileError>> + Send;
}

/// Key of a resource in the failure tracker: `kind/namespace/name`.
#[must_use]
pub fn failure_key<T: Reconciled>(resource: &T) -> String {
    format!(
        "{}/{}/{}",
        T::KIND,
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    )
}

/// Maps a requeue decision to a controller action.
#[must_use]
pub fn requeue_action(requeue: Requeue, consecutive_failures: u32) -> Action {
    match requeue {
        Requeue::Never => Action::await_change(),
        Requeue::After(delay) => Action::requeue(delay),
        Requeue::Backoff => Action::requeue(error_requeue_delay(consecutive_failures)),
    }
}

/// Extracts the message of a caught panic.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Api for a namespaced kind, scoped to the watched namespace if one is configured.
#[must_use]
pub fn watched_api<K>(ctx: &Context) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match &ctx.settings.watch_namespace {
        Some(namespace) => Api::namespaced(ctx.client.clone(), namespace),
        None => Api::all(ctx.client.clone()),
    }
}

/// Controller for `T` before owned and related watches are added.
#[must_use]
pub fn controller_for<T>(ctx: &Context) -> Controller<T>
where
    T: Reconciled + DeserializeOwned,
{
    Controller::new(watched_api::<T>(ctx), WatcherConfig::default())
}

/// Publishes an Event on `resource`. Failures are logged, never propagated.
pub async fn publish_event<T: Resource<DynamicType = ()>>(
    ctx: &Context,
    resource: &T,
    severity: EventSeverity,
    reason: &str,
    action: &str,
    note: &str,
) {
    let object = resource.object_ref(&());
    if let Err(e) = ctx
        .events
        .publish(&object, severity, reason, action, note)
        .await
    {
        warn!(
            name = ?object.name,
            namespace = ?object.namespace,
            reason = %reason,
            error = %e,
            "failed to publish event"
        );
    }
}

/// Runs `controller` until its stream ends.
pub async fn run<T>(controller: Controller<T>, ctx: Arc<Context>)
where
    T: Reconciled + DeserializeOwned,
{
    info!(kind = %T::KIND, "starting controller");
    controller
        .run(reconcile::<T>, error_policy::<T>, ctx)
        .for_each(|result| {
            match result {
                Ok((object, _)) => debug!(kind = %T::KIND, object = %object, "reconciled"),
                Err(e) => debug!(kind = %T::KIND, error = %e, "reconcile loop error"),
            }
            futures::future::ready(())
        })
        .await;
    info!(kind = %T::KIND, "controller stopped");
}

async fn reconcile<T: Reconciled>(
    resource: Arc<T>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let key = failure_key(resource.as_ref());

    let result = AssertUnwindSafe(dispatch(resource.clone(), ctx.clone()))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(ReconcileError::Panic(panic_message(payload.as_ref()))));

    match result {
        Ok(action) => {
            ctx.failures.reset(&key);
            metrics::record_reconciliation_success(T::KIND, start.elapsed());
            Ok(action)
        }
        Err(err) => {
            report_failure(resource.as_ref(), &ctx, &key, &err).await;
            metrics::record_reconciliation_error(T::KIND, err.reason(), start.elapsed());
            Err(err)
        }
    }
}

async fn dispatch<T: Reconciled>(
    resource: Arc<T>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    if resource.namespace().is_none() {
        return Err(ReconcileError::validation(format!(
            "{} {} has no namespace",
            T::KIND,
            resource.name_any()
        )));
    }

    if is_being_deleted(resource.as_ref()) {
        if !has_finalizer(resource.as_ref(), T::FINALIZER) {
            return Ok(Action::await_change());
        }
        T::cleanup(resource.clone(), ctx.clone()).await?;
        remove_finalizer(&ctx.client, resource.as_ref(), T::FINALIZER).await?;
        publish_event(
            &ctx,
            resource.as_ref(),
            EventSeverity::Normal,
            REASON_DELETED,
            ACTION_DELETE,
            "successfully removed finalizer",
        )
        .await;
        return Ok(Action::await_change());
    }

    if ensure_finalizer(&ctx.client, resource.as_ref(), T::FINALIZER).await? {
        return Ok(Action::await_change());
    }

    mark_reconciling(resource.as_ref(), &ctx).await?;
    T::apply(resource, ctx).await
}

/// Records `Reconciling` while the current generation has not been reconciled yet.
async fn mark_reconciling<T: Reconciled>(resource: &T, ctx: &Context) -> Result<(), ReconcileError> {
    let mut status = resource.status().cloned().unwrap_or_default();
    let observed = *T::observed_generation(&mut status);
    if !should_reconcile(resource.meta().generation, observed)
        || T::phase(&mut status).as_str() == PHASE_RECONCILING
    {
        return Ok(());
    }
    set_phase::<T>(
        &ctx.client,
        &resource.namespace().unwrap_or_default(),
        &resource.name_any(),
        PHASE_RECONCILING,
        None,
    )
    .await
}

async fn report_failure<T: Reconciled>(
    resource: &T,
    ctx: &Context,
    key: &str,
    err: &ReconcileError,
) {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let failures = if err.requeue() == Requeue::Backoff {
        ctx.failures.record(key)
    } else {
        ctx.failures.count(key)
    };

    match err {
        ReconcileError::PreconditionNotMet { .. } => {
            info!(kind = %T::KIND, namespace = %namespace, name = %name, "{err}");
        }
        ReconcileError::Panic(_) => {
            error!(kind = %T::KIND, namespace = %namespace, name = %name, error = %err, "reconcile panicked");
        }
        _ => {
            warn!(
                kind = %T::KIND,
                namespace = %namespace,
                name = %name,
                failures,
                error = %err,
                "reconcile failed"
            );
        }
    }

    if !is_being_deleted(resource) {
        if let Some(phase) = err.phase(failures, REMOTE_FAILURES_BEFORE_FAILED_PHASE) {
            let generation = resource.meta().generation;
            if let Err(e) = set_phase::<T>(&ctx.client, &namespace, &name, phase, generation).await
            {
                warn!(kind = %T::KIND, namespace = %namespace, name = %name, error = %e, "failed to record failed phase");
            }
        }
    }

    if err.publishes_event() {
        publish_event(
            ctx,
            resource,
            EventSeverity::Warning,
            REASON_RECONCILE_FAILED,
            ACTION_RECONCILE,
            &err.to_string(),
        )
        .await;
    }
}

#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<T: Reconciled>(resource: Arc<T>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let failures = ctx.failures.count(&failure_key(resource.as_ref()));
    metrics::record_reconciliation_requeue(T::KIND, err.reason());
    requeue_action(err.requeue(), failures)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
