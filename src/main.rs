// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use kube::Client;
use rook_ceph_operator::constants::TOKIO_WORKER_THREADS;
use rook_ceph_operator::context::Context;
use rook_ceph_operator::operator_config::OperatorConfig;
use rook_ceph_operator::reconcilers::{
    bucket_topic, cluster_config, nvmeof, object_user, rbd_mirror,
};
use rook_ceph_operator::server::{self, Readiness};
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("rook-ceph-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_logging() {
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json selects JSON output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn shutdown_signal() -> Result<()> {
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "starting rook-ceph operator");

    let settings = config.settings();
    debug!(?settings, "operator settings resolved");

    let client = Client::try_default().await?;
    let ctx = Arc::new(Context::new(client, settings));

    let readiness = Readiness::default();
    let http = tokio::spawn(server::serve(config.metrics_addr, readiness.clone()));

    info!("starting all controllers");
    readiness.set_ready();

    // Controllers never return on their own; one stopping takes the process down
    tokio::select! {
        () = cluster_config::run_controller(ctx.clone()) => {
            error!("CRITICAL: cluster config controller exited unexpectedly");
            anyhow::bail!("cluster config controller exited unexpectedly")
        }
        () = nvmeof::run_controller(ctx.clone()) => {
            error!("CRITICAL: CephNVMeOFGateway controller exited unexpectedly");
            anyhow::bail!("CephNVMeOFGateway controller exited unexpectedly")
        }
        () = rbd_mirror::run_controller(ctx.clone()) => {
            error!("CRITICAL: CephRBDMirror controller exited unexpectedly");
            anyhow::bail!("CephRBDMirror controller exited unexpectedly")
        }
        () = object_user::run_controller(ctx.clone()) => {
            error!("CRITICAL: CephObjectStoreUser controller exited unexpectedly");
            anyhow::bail!("CephObjectStoreUser controller exited unexpectedly")
        }
        () = bucket_topic::run_controller(ctx.clone()) => {
            error!("CRITICAL: CephBucketTopic controller exited unexpectedly");
            anyhow::bail!("CephBucketTopic controller exited unexpectedly")
        }
        result = http => {
            error!("CRITICAL: http server exited unexpectedly");
            result??;
            anyhow::bail!("http server exited unexpectedly")
        }
        result = shutdown_signal() => {
            result?;
            info!("shutdown signal received, stopping");
            Ok(())
        }
    }
}
