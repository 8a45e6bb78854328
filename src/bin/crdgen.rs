// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Prints the SecureDeployment CustomResourceDefinition as YAML

use kube::CustomResourceExt;
use secure_deployment_operator::types::SecureDeployment;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&SecureDeployment::crd())?);
    Ok(())
}
