// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment synchronization and status publishing.

pub mod deployment;
pub mod status;

pub use deployment::{build_deployment, synchronize, OwnerLink, SyncAction, Synchronized};
pub use status::{publish_status, Published};
