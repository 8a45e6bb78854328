// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{Result, SecureDeploymentError};
use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus};
use kube::{CustomResource, Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "prime.github.com", version = "v1", kind = "SecureDeployment")]
#[kube(namespaced)]
#[kube(status = "SecureDeploymentStatus")]
#[kube(derive = "PartialEq")]
#[kube(shortname = "sdeploy")]
#[kube(printcolumn = r#"{"name":"AuthURL","type":"string","jsonPath":".spec.authorizationUrl"}"#)]
#[kube(printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".spec.spec.replicas"}"#)]
#[kube(printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.deploymentStatus.readyReplicas"}"#)]
#[serde(rename_all = "camelCase")]
pub struct SecureDeploymentSpec {
    /// Endpoint that must answer 200 before the deployment is rolled out
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authorization_url: String,
    /// The wrapped deployment; kept under `spec` for manifest compatibility
    #[serde(rename = "spec", default)]
    pub deployment: DeploymentSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecureDeploymentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<DeploymentStatus>,
}

impl SecureDeployment {
    /// The namespace-qualified name of this object
    pub fn identity(&self) -> Result<Identity> {
        Identity::of(self)
    }

    /// The mirrored deployment status, if one was published
    pub fn deployment_status(&self) -> Option<&DeploymentStatus> {
        self.status.as_ref().and_then(|s| s.deployment_status.as_ref())
    }
}

/// Namespace-qualified name shared by a SecureDeployment and its Deployment
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub namespace: String,
    pub name: String,
}

impl Identity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derive the identity from any namespaced object's metadata
    pub fn of<K: Resource>(obj: &K) -> Result<Self> {
        let namespace = obj
            .namespace()
            .ok_or(SecureDeploymentError::MissingObjectKey(".metadata.namespace"))?;
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or(SecureDeploymentError::MissingObjectKey(".metadata.name"))?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
