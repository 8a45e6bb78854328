// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! SecureDeployment reconciler - gates Deployment rollouts on an external authority.

use crate::authorization::{Authorizer, HttpAuthorizer};
use crate::config::Config;
use crate::constants::reasons;
use crate::error::{Result, SecureDeploymentError};
use crate::reconcilers::ErrorBackoff;
use crate::kubernetes::{Fetched, KubeNotifier, KubeStore, Notice, Notifier, Store};
use crate::sync::{publish_status, synchronize, Published};
use crate::types::{Identity, SecureDeployment};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// What the dispatcher should do after a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Converged; wait for the next watch event
    Done,
    /// The SecureDeployment no longer exists
    Stop,
    /// Authorization was denied; check again after the delay
    RequeueAfter(Duration),
}

impl Directive {
    pub fn into_action(self) -> Action {
        match self {
            Directive::Done | Directive::Stop => Action::await_change(),
            Directive::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}

/// Sequences read, authorization, synchronization and status publishing.
pub struct Reconciler<S, A, N> {
    store: S,
    authorizer: A,
    notifier: N,
    auth_requeue: Duration,
}

impl<S, A, N> Reconciler<S, A, N>
where
    S: Store,
    A: Authorizer,
    N: Notifier,
{
    pub fn new(store: S, authorizer: A, notifier: N, auth_requeue: Duration) -> Self {
        Self {
            store,
            authorizer,
            notifier,
            auth_requeue,
        }
    }

    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn reconcile(&self, identity: &Identity) -> Result<Directive> {
        let secure_deployment = match self.store.get_secure_deployment(identity).await? {
            Fetched::Found(sd) => sd,
            Fetched::NotFound => {
                debug!("SecureDeployment is gone, nothing to do");
                return Ok(Directive::Stop);
            }
        };

        if !self.authorizer.is_authorized(&secure_deployment).await {
            debug!("Not authorized, requeueing in {:?}", self.auth_requeue);
            return Ok(Directive::RequeueAfter(self.auth_requeue));
        }

        let synced = match synchronize(&self.store, &secure_deployment).await {
            Ok(synced) => synced,
            Err(e) => {
                error!("Failed to synchronize Deployment: {}", e);
                self.notifier.notify(
                    &secure_deployment,
                    Notice::warning(
                        reasons::SYNC_FAILED,
                        format!("Failed to synchronize deployment {}: {}", identity, e),
                    ),
                );
                return Err(e);
            }
        };

        info!("Deployment {} synchronized ({:?})", identity, synced.action);
        self.notifier.notify(
            &secure_deployment,
            Notice::normal(reasons::SYNCHRONIZED, format!("deployment={}", identity.name)),
        );

        match publish_status(&self.store, secure_deployment, synced.status()).await? {
            Published::Written(_) => debug!("Status published"),
            Published::Unchanged => debug!("Status unchanged"),
        }

        Ok(Directive::Done)
    }
}

type KubeReconciler = Reconciler<KubeStore, HttpAuthorizer, KubeNotifier>;

struct Context {
    reconciler: KubeReconciler,
    backoff: ErrorBackoff,
}

/// Runs the watch loop for SecureDeployments and the Deployments they own
pub struct SecureDeploymentController {
    client: Client,
    config: Config,
}

impl SecureDeploymentController {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let (secure_deployments, deployments): (Api<SecureDeployment>, Api<Deployment>) =
            match &self.config.watch_namespace {
                Some(ns) => (
                    Api::namespaced(self.client.clone(), ns),
                    Api::namespaced(self.client.clone(), ns),
                ),
                None => (Api::all(self.client.clone()), Api::all(self.client.clone())),
            };

        let reconciler = Reconciler::new(
            KubeStore::new(self.client.clone()),
            HttpAuthorizer::new(self.config.auth_timeout)?,
            KubeNotifier::new(self.client.clone(), self.config.pod_name.clone()),
            self.config.auth_requeue,
        );
        let context = Arc::new(Context {
            reconciler,
            backoff: ErrorBackoff::new(self.config.error_requeue, self.config.error_requeue_max),
        });

        Controller::new(secure_deployments, WatcherConfig::default())
            .owns(deployments, WatcherConfig::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled SecureDeployment: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(secure_deployment: Arc<SecureDeployment>, ctx: Arc<Context>) -> Result<Action> {
    let identity = secure_deployment.identity()?;
    let directive = ctx.reconciler.reconcile(&identity).await?;
    ctx.backoff.reset(&identity);
    Ok(directive.into_action())
}

fn error_policy(
    secure_deployment: Arc<SecureDeployment>,
    error: &SecureDeploymentError,
    ctx: Arc<Context>,
) -> Action {
    let identity = secure_deployment
        .identity()
        .unwrap_or_else(|_| Identity::new("", secure_deployment.name_any()));
    let delay = ctx.backoff.next_delay(&identity);
    error!("Reconciliation of {} failed, retrying in {:?}: {}", identity, delay, error);
    Action::requeue(delay)
}
