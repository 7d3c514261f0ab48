//! Mapbridge Runner
//!
//! A bridge between a file mailbox and a remote job-execution service.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Repositories: remote jobs and files over HTTP, the inbox/outbox files
//! - Services: Business logic (marshaling, job sessions, worker pool)
//! - Scheduler: Mailbox polling and batch lifecycle
//!
//! The runner waits for batches of tasks in the inbox, runs each task as a
//! remote job created from a study template, and writes the processed batch
//! to the outbox.

mod config;
mod error;
mod repository;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{FileMailbox, HttpFileRepository, HttpJobRepository};
use crate::scheduler::TaskQueueBridge;
use crate::service::{JobSession, Marshaler, WorkerPool};
use mapbridge_client::ServiceClient;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapbridge_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Runner failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    info!("Starting Mapbridge Runner");
    info!(
        "User: {}, PID: {}",
        std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        std::process::id()
    );

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: template_id={}, api_url={}",
        config.template_id, config.api_url
    );
    info!(
        "Workers: {}, poll interval: {:?}, job poll interval: {:?}, job timeout: {:?}",
        config.workers, config.poll_interval, config.job_poll_interval, config.job_timeout
    );

    // Initialize service client
    let mut client = ServiceClient::new(config.api_url.clone());
    if let (Some(key), Some(secret)) = (&config.api_key, &config.api_secret) {
        client = client.with_credentials(key.clone(), secret.clone());
    } else {
        warn!("No API credentials configured, requests are sent unauthenticated");
    }
    let client = Arc::new(client);

    info!("Service client initialized");

    // Initialize repositories
    let jobs = Arc::new(HttpJobRepository::new(Arc::clone(&client), config.template_id));
    let files = Arc::new(HttpFileRepository::new(Arc::clone(&client)));
    let mailbox = Arc::new(FileMailbox::new(&config.input_dir, &config.output_dir));
    info!(
        "Inbox: {}, outbox: {}",
        mailbox.inbox_path().display(),
        mailbox.outbox_path().display()
    );
    mailbox
        .clear_outbox()
        .await
        .context("Failed to remove stale outbox")?;

    // Shut down on ctrl-c
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt");
            shutdown.cancel();
        }
    });

    // Initialize services
    let session = JobSession::new(
        jobs,
        Marshaler::new(files),
        config.job_poll_interval,
        cancel.clone(),
    )
    .with_timeout(config.job_timeout);
    let pool = WorkerPool::new(Arc::new(session));

    info!("Services initialized");

    let mut bridge = TaskQueueBridge::new(
        mailbox,
        pool,
        config.workers,
        config.poll_interval,
        cancel,
    );
    bridge.run().await.context("Bridge error")?;

    info!("Runner shut down in state {:?}", bridge.state());
    Ok(())
}
