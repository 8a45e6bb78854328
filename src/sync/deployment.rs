// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-update of the Deployment owned by a SecureDeployment.

use crate::constants::annotations;
use crate::error::Result;
use crate::kubernetes::{Fetched, Store};
use crate::types::SecureDeployment;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use kube::{api::ObjectMeta, Resource, ResourceExt};
use tracing::{debug, info, instrument, warn};

/// Whether the owner reference could be attached to the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerLink {
    Linked,
    /// The owner has no uid or name yet; the Deployment is written unowned
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
    Unchanged,
}

/// Result of a successful synchronization
#[derive(Debug, Clone)]
pub struct Synchronized {
    pub deployment: Deployment,
    pub action: SyncAction,
    pub owner_link: OwnerLink,
}

impl Synchronized {
    /// Observed status of the Deployment as returned by the store
    pub fn status(&self) -> DeploymentStatus {
        self.deployment.status.clone().unwrap_or_default()
    }
}

/// Build the desired Deployment for a SecureDeployment, without ownership
pub fn build_deployment(secure_deployment: &SecureDeployment) -> Deployment {
    let annotations = secure_deployment.metadata.annotations.as_ref().map(|a| {
        a.iter()
            .filter(|(k, _)| k.as_str() != annotations::LAST_APPLIED)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    });

    Deployment {
        metadata: ObjectMeta {
            name: secure_deployment.metadata.name.clone(),
            namespace: secure_deployment.metadata.namespace.clone(),
            labels: secure_deployment.metadata.labels.clone(),
            annotations,
            ..Default::default()
        },
        spec: Some(secure_deployment.spec.deployment.clone()),
        status: None,
    }
}

/// Point the Deployment at its SecureDeployment as controller owner
pub fn link_owner(deployment: &mut Deployment, owner: &SecureDeployment) -> OwnerLink {
    match owner.controller_owner_ref(&()) {
        Some(oref) => {
            deployment.metadata.owner_references = Some(vec![oref]);
            OwnerLink::Linked
        }
        None => {
            warn!(
                "SecureDeployment {} has no uid, writing Deployment without owner reference",
                owner.name_any()
            );
            OwnerLink::Skipped
        }
    }
}

/// Make the Deployment for `secure_deployment` match its embedded spec.
///
/// An existing Deployment is updated with an apply of the owned fields that
/// carries its `resourceVersion`. Labels, annotations and owner references
/// written by others survive, as do server-defaulted spec fields. The apply
/// is a no-op when nothing owned changed, which shows up as an unchanged
/// `resourceVersion`.
#[instrument(skip(store, secure_deployment), fields(secure_deployment = %secure_deployment.name_any()))]
pub async fn synchronize<S: Store>(store: &S, secure_deployment: &SecureDeployment) -> Result<Synchronized> {
    let identity = secure_deployment.identity()?;
    let mut candidate = build_deployment(secure_deployment);
    let owner_link = link_owner(&mut candidate, secure_deployment);

    match store.get_deployment(&identity).await? {
        Fetched::NotFound => {
            info!("Creating Deployment {}", identity);
            let deployment = store.create_deployment(&candidate).await?;
            Ok(Synchronized {
                deployment,
                action: SyncAction::Created,
                owner_link,
            })
        }
        Fetched::Found(existing) => {
            candidate.metadata.resource_version = existing.resource_version();
            let deployment = store.apply_deployment(&candidate).await?;
            let action = if deployment.resource_version() == existing.resource_version() {
                debug!("Deployment {} is up to date", identity);
                SyncAction::Unchanged
            } else {
                info!("Updated Deployment {}", identity);
                SyncAction::Updated
            };
            Ok(Synchronized {
                deployment,
                action,
                owner_link,
            })
        }
    }
}
