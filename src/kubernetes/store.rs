// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object store access for SecureDeployments and their Deployments

use crate::constants::OPERATOR_NAME;
use crate::error::Result;
use crate::types::{Identity, SecureDeployment};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use std::future::Future;
use tracing::{debug, instrument};

/// Outcome of a successful fetch; transport and server errors are carried by `Err`
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<K> {
    Found(K),
    NotFound,
}

impl<K> Fetched<K> {
    pub fn into_option(self) -> Option<K> {
        match self {
            Fetched::Found(obj) => Some(obj),
            Fetched::NotFound => None,
        }
    }
}

/// The subset of the Kubernetes API the reconciler depends on.
///
/// Writes carry the object's `resourceVersion`, so a stale write fails with a
/// conflict instead of overwriting a newer one. Deployment updates are
/// server-side applies: only the fields in the applied object are owned by
/// this operator, everything else on the stored object is left alone, and an
/// apply that changes nothing keeps the stored `resourceVersion`.
pub trait Store: Send + Sync {
    fn get_secure_deployment(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Fetched<SecureDeployment>>> + Send;

    fn replace_secure_deployment_status(
        &self,
        secure_deployment: &SecureDeployment,
    ) -> impl Future<Output = Result<SecureDeployment>> + Send;

    fn get_deployment(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Fetched<Deployment>>> + Send;

    fn create_deployment(
        &self,
        deployment: &Deployment,
    ) -> impl Future<Output = Result<Deployment>> + Send;

    fn apply_deployment(
        &self,
        deployment: &Deployment,
    ) -> impl Future<Output = Result<Deployment>> + Send;
}

/// Store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secure_deployments(&self, namespace: &str) -> Api<SecureDeployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Split a get result into found, not found, and every other failure
async fn fetch<K>(api: &Api<K>, name: &str) -> Result<Fetched<K>>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.get(name).await {
        Ok(obj) => Ok(Fetched::Found(obj)),
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("{} not found", name);
            Ok(Fetched::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

impl Store for KubeStore {
    #[instrument(skip(self), fields(identity = %identity))]
    async fn get_secure_deployment(&self, identity: &Identity) -> Result<Fetched<SecureDeployment>> {
        fetch(&self.secure_deployments(&identity.namespace), &identity.name).await
    }

    #[instrument(skip(self, secure_deployment), fields(secure_deployment = %secure_deployment.name_any()))]
    async fn replace_secure_deployment_status(
        &self,
        secure_deployment: &SecureDeployment,
    ) -> Result<SecureDeployment> {
        let identity = secure_deployment.identity()?;
        let data = serde_json::to_vec(secure_deployment)?;
        let updated = self
            .secure_deployments(&identity.namespace)
            .replace_status(&identity.name, &PostParams::default(), data)
            .await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(identity = %identity))]
    async fn get_deployment(&self, identity: &Identity) -> Result<Fetched<Deployment>> {
        fetch(&self.deployments(&identity.namespace), &identity.name).await
    }

    #[instrument(skip(self, deployment), fields(deployment = %deployment.name_any()))]
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let identity = Identity::of(deployment)?;
        let created = self
            .deployments(&identity.namespace)
            .create(
                &PostParams {
                    field_manager: Some(OPERATOR_NAME.to_string()),
                    ..Default::default()
                },
                deployment,
            )
            .await?;
        Ok(created)
    }

    #[instrument(skip(self, deployment), fields(deployment = %deployment.name_any()))]
    async fn apply_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let identity = Identity::of(deployment)?;
        let pp = PatchParams::apply(OPERATOR_NAME).force();
        let applied = self
            .deployments(&identity.namespace)
            .patch(&identity.name, &pp, &Patch::Apply(deployment))
            .await?;
        Ok(applied)
    }
}
