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

//! Configuration for the lifecycle driver.
//!
//! All tunables are carried in an explicit struct handed to the
//! [`crate::driver::LifecycleDriver`] constructor; nothing is read from
//! process-global state. Database coordinates travel separately, as arguments
//! to [`crate::database::Database::new`].

use std::time::Duration;

/// Configuration for the lifecycle driver's sweep phases.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base DNS domain under which per-namespace services are exposed,
    /// e.g. `demo.example.com` yields `https://notebook-{ns}.demo.example.com`.
    pub base_domain: String,
    /// Half-width of the window around a slot's start time inside which
    /// `create_pending` will provision it.
    pub prep_minutes: i64,
    /// Grace period after a slot's end time before teardown is attempted.
    pub slack_minutes: i64,
    /// How far ahead of `now` the ledger generator keeps slots available.
    pub reserve_days: i64,
    /// Spacing between consecutive generated slot start times.
    pub slot_interval_minutes: i64,
    /// Duration of each generated slot.
    pub slot_size_minutes: i64,
    /// Upper bound on any single provisioner call; elapsing counts as an error.
    pub provisioner_timeout: Duration,
}

impl DriverConfig {
    /// A configuration with production defaults under the given base domain.
    pub fn with_base_domain(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into(),
            ..Self::default()
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_domain: "demo.example.com".to_string(),
            prep_minutes: 15,
            slack_minutes: 1,
            reserve_days: 7,
            slot_interval_minutes: 30,
            slot_size_minutes: 120,
            provisioner_timeout: Duration::from_secs(120),
        }
    }
}
