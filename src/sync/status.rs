// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mirrors the owned Deployment's status onto the SecureDeployment.

use crate::error::Result;
use crate::kubernetes::Store;
use crate::types::{SecureDeployment, SecureDeploymentStatus};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use kube::ResourceExt;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub enum Published {
    /// The status subresource was written; holds the stored object
    Written(SecureDeployment),
    /// The stored status already matched
    Unchanged,
}

/// Persist `status` on the SecureDeployment's status subresource.
///
/// The write carries the object's resourceVersion, so a concurrent change
/// surfaces as a conflict error and is retried by a later reconciliation.
#[instrument(skip(store, secure_deployment, status), fields(secure_deployment = %secure_deployment.name_any()))]
pub async fn publish_status<S: Store>(
    store: &S,
    mut secure_deployment: SecureDeployment,
    status: DeploymentStatus,
) -> Result<Published> {
    if secure_deployment.deployment_status() == Some(&status) {
        debug!("Status already up to date");
        return Ok(Published::Unchanged);
    }

    secure_deployment.status = Some(SecureDeploymentStatus {
        deployment_status: Some(status),
    });
    let stored = store.replace_secure_deployment_status(&secure_deployment).await?;
    debug!("Status published at resourceVersion {:?}", stored.resource_version());
    Ok(Published::Written(stored))
}
