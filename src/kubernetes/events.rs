// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operator-visible audit trail published as Kubernetes events

use crate::constants::OPERATOR_NAME;
use crate::types::SecureDeployment;
use kube::{
    runtime::events::{Event, EventType, Recorder, Reporter},
    Client, Resource, ResourceExt,
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// A single notification about a SecureDeployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub reason: String,
    pub message: String,
}

impl Notice {
    pub fn normal(reason: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Normal,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(reason: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

/// Event sink. Delivery is fire-and-forget and must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, subject: &SecureDeployment, notice: Notice);
}

/// Notifier that publishes `events.k8s.io/v1` events through a [`Recorder`]
#[derive(Clone)]
pub struct KubeNotifier {
    recorder: Recorder,
}

impl KubeNotifier {
    /// `instance` identifies this operator replica in the event source, usually the pod name
    pub fn new(client: Client, instance: Option<String>) -> Self {
        Self {
            recorder: Recorder::new(client, reporter(instance)),
        }
    }
}

fn reporter(instance: Option<String>) -> Reporter {
    Reporter {
        controller: OPERATOR_NAME.to_string(),
        instance,
    }
}

impl Notifier for KubeNotifier {
    fn notify(&self, subject: &SecureDeployment, notice: Notice) {
        let reference = subject.object_ref(&());
        let name = subject.name_any();
        let event = Event {
            type_: match notice.severity {
                Severity::Normal => EventType::Normal,
                Severity::Warning => EventType::Warning,
            },
            reason: notice.reason,
            note: Some(notice.message),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        let recorder = self.recorder.clone();

        tokio::spawn(async move {
            match recorder.publish(&event, &reference).await {
                Ok(()) => debug!("Published {} event for {}", event.reason, name),
                Err(e) => warn!("Failed to publish {} event for {}: {}", event.reason, name, e),
            }
        });
    }
}
