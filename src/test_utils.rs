// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and reconciler collaborators.

use crate::authorization::Authorizer;
use crate::error::{Result, SecureDeploymentError};
use crate::kubernetes::{Fetched, Notice, Notifier, Store};
use crate::types::{Identity, SecureDeployment, SecureDeploymentSpec};
use http::{Request, Response};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus, DeploymentStrategy};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::error::ErrorResponse;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock Deployment JSON response
pub fn deployment_json(namespace: &str, name: &str, replicas: i32) -> String {
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "deploy-uid",
            "resourceVersion": "7"
        },
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "template": {"metadata": {"labels": {"app": name}}}
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// A SecureDeployment as the API server would return it
pub fn make_secure_deployment(namespace: &str, name: &str, url: &str, replicas: i32) -> SecureDeployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);

    SecureDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{}", name)),
            resource_version: Some("1".to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: SecureDeploymentSpec {
            authorization_url: url.to_string(),
            deployment: DeploymentSpec {
                replicas: Some(replicas),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "app".to_string(),
                            image: Some("nginx:1.27".to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            },
        },
        status: None,
    }
}

fn api_error(code: u16, reason: &str, message: String) -> SecureDeploymentError {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
    .into()
}

type Key = (String, String);

fn key_of(identity: &Identity) -> Key {
    (identity.namespace.clone(), identity.name.clone())
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct Objects {
    secure_deployments: BTreeMap<Key, SecureDeployment>,
    deployments: BTreeMap<Key, Deployment>,
    version: u64,
    deployment_writes: usize,
    status_writes: usize,
    secure_deployment_reads: usize,
    fail_secure_deployment_get: bool,
    fail_deployment_get: bool,
    fail_deployment_writes: bool,
    fail_status_writes: bool,
}

impl Objects {
    fn next_version(&mut self) -> String {
        self.version += 1;
        format!("{}", 100 + self.version)
    }
}

/// In-memory object store with optimistic concurrency on resourceVersion
#[derive(Clone, Default)]
pub struct FakeStore {
    objects: Arc<Mutex<Objects>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Objects> {
        self.objects.lock().unwrap()
    }

    pub fn insert_secure_deployment(&self, secure_deployment: SecureDeployment) {
        let identity = secure_deployment.identity().unwrap();
        self.lock()
            .secure_deployments
            .insert(key_of(&identity), secure_deployment);
    }

    pub fn remove_secure_deployment(&self, namespace: &str, name: &str) {
        self.lock().secure_deployments.remove(&key(namespace, name));
    }

    pub fn secure_deployment(&self, namespace: &str, name: &str) -> Option<SecureDeployment> {
        self.lock().secure_deployments.get(&key(namespace, name)).cloned()
    }

    /// Simulate a concurrent writer changing the stored SecureDeployment
    pub fn bump_secure_deployment(&self, namespace: &str, name: &str) {
        let mut objects = self.lock();
        let version = objects.next_version();
        if let Some(sd) = objects.secure_deployments.get_mut(&key(namespace, name)) {
            sd.metadata.resource_version = Some(version);
        }
    }

    /// Replace the stored spec the way a user edit would
    pub fn edit_secure_deployment<F: FnOnce(&mut SecureDeployment)>(&self, namespace: &str, name: &str, edit: F) {
        let mut objects = self.lock();
        let version = objects.next_version();
        if let Some(sd) = objects.secure_deployments.get_mut(&key(namespace, name)) {
            edit(sd);
            sd.metadata.resource_version = Some(version);
        }
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.lock().deployments.get(&key(namespace, name)).cloned()
    }

    /// Simulate the deployment controller reporting status
    pub fn set_deployment_status(&self, namespace: &str, name: &str, status: DeploymentStatus) {
        let mut objects = self.lock();
        let version = objects.next_version();
        if let Some(deployment) = objects.deployments.get_mut(&key(namespace, name)) {
            deployment.status = Some(status);
            deployment.metadata.resource_version = Some(version);
        }
    }

    /// Simulate an arbitrary external write to the stored deployment
    pub fn edit_deployment<F: FnOnce(&mut Deployment)>(&self, namespace: &str, name: &str, edit: F) {
        let mut objects = self.lock();
        let version = objects.next_version();
        if let Some(deployment) = objects.deployments.get_mut(&key(namespace, name)) {
            edit(deployment);
            deployment.metadata.resource_version = Some(version);
        }
    }

    /// Simulate another writer, like the deployment controller, annotating the deployment
    pub fn annotate_deployment(&self, namespace: &str, name: &str, annotation: &str, value: &str) {
        self.edit_deployment(namespace, name, |deployment| {
            deployment
                .annotations_mut()
                .insert(annotation.to_string(), value.to_string());
        });
    }

    pub fn deployment_count(&self) -> usize {
        self.lock().deployments.len()
    }

    pub fn deployment_writes(&self) -> usize {
        self.lock().deployment_writes
    }

    pub fn status_writes(&self) -> usize {
        self.lock().status_writes
    }

    pub fn secure_deployment_reads(&self) -> usize {
        self.lock().secure_deployment_reads
    }

    pub fn fail_secure_deployment_get(&self) {
        self.lock().fail_secure_deployment_get = true;
    }

    pub fn fail_deployment_get(&self) {
        self.lock().fail_deployment_get = true;
    }

    pub fn fail_deployment_writes(&self) {
        self.lock().fail_deployment_writes = true;
    }

    pub fn fail_status_writes(&self) {
        self.lock().fail_status_writes = true;
    }
}

impl Store for FakeStore {
    async fn get_secure_deployment(&self, identity: &Identity) -> Result<Fetched<SecureDeployment>> {
        let mut objects = self.lock();
        objects.secure_deployment_reads += 1;
        if objects.fail_secure_deployment_get {
            return Err(api_error(500, "InternalError", "injected read failure".to_string()));
        }
        Ok(match objects.secure_deployments.get(&key_of(identity)) {
            Some(sd) => Fetched::Found(sd.clone()),
            None => Fetched::NotFound,
        })
    }

    async fn replace_secure_deployment_status(
        &self,
        secure_deployment: &SecureDeployment,
    ) -> Result<SecureDeployment> {
        let identity = secure_deployment.identity()?;
        let mut objects = self.lock();
        if objects.fail_status_writes {
            return Err(api_error(500, "InternalError", "injected status failure".to_string()));
        }
        let version = objects.next_version();
        let Some(stored) = objects.secure_deployments.get_mut(&key_of(&identity)) else {
            return Err(api_error(404, "NotFound", format!("{} not found", identity)));
        };
        if stored.metadata.resource_version != secure_deployment.metadata.resource_version {
            return Err(api_error(409, "Conflict", format!("{} has been modified", identity)));
        }
        stored.status = secure_deployment.status.clone();
        stored.metadata.resource_version = Some(version);
        let stored = stored.clone();
        objects.status_writes += 1;
        Ok(stored)
    }

    async fn get_deployment(&self, identity: &Identity) -> Result<Fetched<Deployment>> {
        let objects = self.lock();
        if objects.fail_deployment_get {
            return Err(api_error(500, "InternalError", "injected read failure".to_string()));
        }
        Ok(match objects.deployments.get(&key_of(identity)) {
            Some(deployment) => Fetched::Found(deployment.clone()),
            None => Fetched::NotFound,
        })
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let identity = Identity::of(deployment)?;
        let mut objects = self.lock();
        if objects.fail_deployment_writes {
            return Err(api_error(500, "InternalError", "injected write failure".to_string()));
        }
        if objects.deployments.contains_key(&key_of(&identity)) {
            return Err(api_error(409, "AlreadyExists", format!("{} already exists", identity)));
        }
        let version = objects.next_version();
        let mut created = deployment.clone();
        created.metadata.uid = Some(format!("deploy-uid-{}", identity.name));
        created.metadata.resource_version = Some(version);
        created.status = None;
        created.spec = created.spec.map(with_server_defaults);
        objects.deployments.insert(key_of(&identity), created.clone());
        objects.deployment_writes += 1;
        Ok(created)
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let identity = Identity::of(deployment)?;
        let mut objects = self.lock();
        if objects.fail_deployment_writes {
            return Err(api_error(500, "InternalError", "injected write failure".to_string()));
        }
        let Some(existing) = objects.deployments.get(&key_of(&identity)).cloned() else {
            return Err(api_error(404, "NotFound", format!("{} not found", identity)));
        };
        if deployment.resource_version().is_some() && existing.resource_version() != deployment.resource_version() {
            return Err(api_error(409, "Conflict", format!("{} has been modified", identity)));
        }
        let mut merged = existing.clone();
        merge_map(&mut merged.metadata.labels, &deployment.metadata.labels);
        merge_map(&mut merged.metadata.annotations, &deployment.metadata.annotations);
        for oref in deployment.metadata.owner_references.iter().flatten() {
            let orefs = merged.metadata.owner_references.get_or_insert_with(Vec::new);
            orefs.retain(|o| o.uid != oref.uid);
            orefs.push(oref.clone());
        }
        merged.spec = deployment.spec.clone().map(with_server_defaults);
        if merged == existing {
            return Ok(existing);
        }
        merged.metadata.resource_version = Some(objects.next_version());
        objects.deployments.insert(key_of(&identity), merged.clone());
        objects.deployment_writes += 1;
        Ok(merged)
    }
}

/// Apply keeps keys set by other writers and overwrites the applied ones
fn merge_map(stored: &mut Option<BTreeMap<String, String>>, applied: &Option<BTreeMap<String, String>>) {
    if let Some(applied) = applied {
        let stored = stored.get_or_insert_with(BTreeMap::new);
        for (k, v) in applied {
            stored.insert(k.clone(), v.clone());
        }
    }
}

/// Fill in the fields the API server defaults on every deployment write
fn with_server_defaults(mut spec: DeploymentSpec) -> DeploymentSpec {
    spec.revision_history_limit.get_or_insert(10);
    spec.progress_deadline_seconds.get_or_insert(600);
    spec.strategy.get_or_insert_with(|| DeploymentStrategy {
        type_: Some("RollingUpdate".to_string()),
        ..Default::default()
    });
    spec
}

/// Authorizer with a switchable verdict that counts its calls
#[derive(Clone, Default)]
pub struct FakeAuthorizer {
    granted: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FakeAuthorizer {
    pub fn new(granted: bool) -> Self {
        let authorizer = Self::default();
        authorizer.set_granted(granted);
        authorizer
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authorizer for FakeAuthorizer {
    async fn is_authorized(&self, _secure_deployment: &SecureDeployment) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.granted.load(Ordering::SeqCst)
    }
}

/// Notifier that keeps every notice in memory
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<(String, Notice)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices as (subject name, notice), oldest first
    pub fn notices(&self) -> Vec<(String, Notice)> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &SecureDeployment, notice: Notice) {
        self.notices.lock().unwrap().push((subject.name_any(), notice));
    }
}
