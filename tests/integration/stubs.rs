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

//! Scriptable stand-ins for the provisioner and mailer boundaries.
//!
//! Every call is recorded so tests can assert exactly how often the driver
//! reached out, which is how idempotency and retry behavior are verified.

use std::sync::Mutex;

use async_trait::async_trait;

use demoslot::mailer::{Mailer, MailerError, MailSpec};
use demoslot::provisioner::{DeployParams, Health, Provisioner, ProvisionerError};

#[derive(Debug, Default)]
pub struct ProvisionerState {
    pub create_calls: Vec<String>,
    pub health_calls: Vec<String>,
    pub remove_calls: Vec<String>,
    /// Every `create` fails while set.
    pub fail_create: bool,
    /// Health checks report `Ready` while set, `NotReady` otherwise.
    pub ready: bool,
    /// The next N `remove` calls fail, then succeed.
    pub fail_remove_remaining: usize,
    /// Every `remove` sleeps this long before returning, so tests can hold
    /// two sweeps in flight at once.
    pub remove_delay_ms: u64,
}

#[derive(Debug, Default)]
pub struct StubProvisioner {
    pub state: Mutex<ProvisionerState>,
}

impl StubProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls.len()
    }

    pub fn health_calls(&self) -> usize {
        self.state.lock().unwrap().health_calls.len()
    }

    pub fn remove_calls(&self) -> usize {
        self.state.lock().unwrap().remove_calls.len()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().unwrap().ready = ready;
    }

    pub fn fail_next_removes(&self, n: usize) {
        self.state.lock().unwrap().fail_remove_remaining = n;
    }

    pub fn set_remove_delay_ms(&self, ms: u64) {
        self.state.lock().unwrap().remove_delay_ms = ms;
    }
}

#[async_trait]
impl Provisioner for StubProvisioner {
    async fn create(
        &self,
        namespace: &str,
        _params: &DeployParams,
    ) -> Result<(), ProvisionerError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls.push(namespace.to_string());
        if state.fail_create {
            Err(ProvisionerError::Failed("helm install failed".to_string()))
        } else {
            Ok(())
        }
    }

    async fn health_check(&self, namespace: &str) -> Result<Health, ProvisionerError> {
        let mut state = self.state.lock().unwrap();
        state.health_calls.push(namespace.to_string());
        if state.ready {
            Ok(Health::Ready)
        } else {
            Ok(Health::NotReady)
        }
    }

    async fn remove(&self, namespace: &str) -> Result<(), ProvisionerError> {
        let (failed, delay_ms) = {
            let mut state = self.state.lock().unwrap();
            state.remove_calls.push(namespace.to_string());
            let failed = if state.fail_remove_remaining > 0 {
                state.fail_remove_remaining -= 1;
                true
            } else {
                false
            };
            (failed, state.remove_delay_ms)
        };
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        if failed {
            Err(ProvisionerError::Failed("namespace busy".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
pub struct MailerState {
    /// `(recipient, fqdn)` per delivered mail.
    pub sent: Vec<(String, String)>,
    pub fail: bool,
}

#[derive(Debug, Default)]
pub struct StubMailer {
    pub state: Mutex<MailerState>,
}

impl StubMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(
        &self,
        spec: &MailSpec,
        _data: &serde_json::Value,
    ) -> Result<(), MailerError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(MailerError::Failed("smtp unavailable".to_string()));
        }
        state.sent.push((spec.recipient.clone(), spec.fqdn.clone()));
        Ok(())
    }
}
