// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, object store access, and events.

pub mod crd;
pub mod events;
pub mod store;

pub use crd::wait_for_secure_deployment_crd;
pub use events::{KubeNotifier, Notice, Notifier, Severity};
pub use store::{Fetched, KubeStore, Store};
