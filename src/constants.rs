// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as event reporter
pub const OPERATOR_NAME: &str = "secure-deployment-operator";

/// Annotations that are never copied onto the managed Deployment
pub mod annotations {
    pub const LAST_APPLIED: &str = "kubectl.kubernetes.io/last-applied-configuration";
}

/// Event reasons published on the SecureDeployment
pub mod reasons {
    pub const SYNCHRONIZED: &str = "Synchronized";
    pub const SYNC_FAILED: &str = "SyncFailed";
}

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "prime.github.com";
    pub const KIND: &str = "SecureDeployment";
    pub const VERSION: &str = "v1";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
