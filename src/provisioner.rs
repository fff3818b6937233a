/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Provisioner boundary.
//!
//! The lifecycle driver never talks to cluster infrastructure directly; it
//! goes through this trait. The driver calls it with no database locks held
//! and wraps every call in a timeout, so implementations are free to be slow
//! (helm installs routinely are) without stalling the ledger.

use async_trait::async_trait;
use thiserror::Error;

/// Deployment parameters handed to the provisioner alongside the namespace.
#[derive(Debug, Clone)]
pub struct DeployParams {
    /// Access password baked into the deployed cluster's auth config
    pub password: String,
}

/// Readiness of a provisioned deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// All workloads are up and the init job has completed.
    Ready,
    /// Still converging. Not an error; the next sweep re-checks.
    NotReady,
}

/// Faults raised by provisioner calls.
#[derive(Error, Debug)]
pub enum ProvisionerError {
    #[error("Provisioner call failed: {0}")]
    Failed(String),

    #[error("Provisioner call timed out")]
    Timeout,
}

/// Creates, inspects, and tears down per-namespace demo deployments.
///
/// All three operations must be idempotent: the driver retries them on
/// subsequent sweeps after transient failures, so `create` on an existing
/// namespace and `remove` on an absent one must both succeed.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Creates the deployment for `namespace`.
    async fn create(&self, namespace: &str, params: &DeployParams) -> Result<(), ProvisionerError>;

    /// Reports whether the deployment in `namespace` is serving.
    async fn health_check(&self, namespace: &str) -> Result<Health, ProvisionerError>;

    /// Tears down the deployment in `namespace`.
    async fn remove(&self, namespace: &str) -> Result<(), ProvisionerError>;
}
