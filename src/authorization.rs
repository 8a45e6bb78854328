// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Authorization gate consulted before every rollout.
//!
//! The endpoint is taken from the SecureDeployment spec, which is user
//! controlled. Only the scheme is restricted; there is no host allow-list.

use crate::types::SecureDeployment;
use kube::ResourceExt;
use reqwest::{redirect, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Decides whether a SecureDeployment may be rolled out right now
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, secure_deployment: &SecureDeployment) -> impl Future<Output = bool> + Send;
}

/// Why a check did not produce a status code
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid authorization URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Only an exact 200 grants access; redirects and every error status deny
pub fn is_granted(status: StatusCode) -> bool {
    status == StatusCode::OK
}

/// Parse the endpoint, accepting only absolute http(s) URLs
pub fn parse_endpoint(raw: &str) -> Result<Url, CheckError> {
    let invalid = |reason: String| CheckError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// Authorizer performing one GET per check against `spec.authorizationUrl`
#[derive(Clone)]
pub struct HttpAuthorizer {
    client: reqwest::Client,
}

impl HttpAuthorizer {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Issue the request and report the status code, without interpreting it
    pub async fn check(&self, raw_url: &str) -> Result<StatusCode, CheckError> {
        let url = parse_endpoint(raw_url)?;
        let response = self.client.get(url).send().await?;
        Ok(response.status())
    }
}

impl Authorizer for HttpAuthorizer {
    async fn is_authorized(&self, secure_deployment: &SecureDeployment) -> bool {
        let name = secure_deployment.name_any();
        let url = &secure_deployment.spec.authorization_url;

        match self.check(url).await {
            Ok(status) if is_granted(status) => {
                debug!("SecureDeployment {} authorized by {}", name, url);
                true
            }
            Ok(status) => {
                debug!("SecureDeployment {} not authorized: {} answered {}", name, url, status);
                false
            }
            Err(e) => {
                warn!("SecureDeployment {} authorization undeterminable: {}", name, e);
                false
            }
        }
    }
}
