// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use secure_deployment_operator::config::Config;
use secure_deployment_operator::kubernetes::wait_for_secure_deployment_crd;
use secure_deployment_operator::reconcilers::SecureDeploymentController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting SecureDeployment operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: auth_requeue={:?}, auth_timeout={:?}, error_requeue={:?}..{:?}, watch_namespace={}",
        config.auth_requeue,
        config.auth_timeout,
        config.error_requeue,
        config.error_requeue_max,
        config.watch_namespace.as_deref().unwrap_or("<all>")
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for SecureDeployment CRD to become available...");
    wait_for_secure_deployment_crd(&client).await?;

    SecureDeploymentController::new(client, config).run().await?;

    warn!("SecureDeployment controller stopped");
    Ok(())
}
