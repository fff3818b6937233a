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

//! Lifecycle driver
//!
//! Moves booked slots through the deployment pipeline in periodic sweeps.
//! Each sweep runs four run-to-completion phases in order:
//!
//! 1. `create_pending` — provision deployments for bookings whose start time
//!    is near; `Empty -> Published` on success, `Empty -> Excepted` on error.
//! 2. `check_published` — poll readiness; `Published -> Running` plus a
//!    reminder notification once healthy.
//! 3. `remove_expired` — tear down deployments whose slot ended before the
//!    slack cutoff; `-> Removed` on success, retried next sweep on error.
//! 4. `extend_ledger` — top up the pre-generated slot sequence.
//!
//! Provisioner calls are made with no database locks held; results are
//! persisted through the DAL's guarded transition writes, so a crashed or
//! concurrent sweep re-converges instead of double-applying. Per-row faults
//! are captured in the returned outcome vectors and logged; only
//! database-level faults abort a phase.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::dal::DAL;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::LedgerError;
use crate::models::mail::{reminder_payload, MailReason, NewMail};
use crate::models::slot::{LifecycleState, Locale, NewSlot, Slot};
use crate::provisioner::{DeployParams, Health, Provisioner, ProvisionerError};

/// Per-slot outcome of the `create_pending` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Published,
    /// Provisioning failed; carries the error text. Terminal until an
    /// operator intervenes.
    Excepted(String),
}

/// Per-slot outcome of the `check_published` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Running,
    /// Deployment still converging; re-checked next sweep.
    NotReady,
    /// Health check itself failed; state unchanged, re-checked next sweep.
    CheckFailed(String),
}

/// Per-slot outcome of the `remove_expired` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Teardown failed; the slot stays expired and is retried next sweep.
    RemoveFailed(String),
}

/// Aggregate result of one full sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub created: Vec<(i32, CreateOutcome)>,
    pub checked: Vec<(i32, CheckOutcome)>,
    pub removed: Vec<(i32, RemoveOutcome)>,
    /// Number of slots appended by the ledger generator.
    pub extended: usize,
}

/// Drives booked slots through their deployment lifecycle.
pub struct LifecycleDriver {
    dal: DAL,
    provisioner: Arc<dyn Provisioner>,
    config: DriverConfig,
}

impl LifecycleDriver {
    /// Creates a new driver over the given ledger, provisioner, and config.
    pub fn new(dal: DAL, provisioner: Arc<dyn Provisioner>, config: DriverConfig) -> Self {
        Self {
            dal,
            provisioner,
            config,
        }
    }

    /// Runs all four phases once, in order, anchored at `now`.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, LedgerError> {
        let created = self.create_pending(now).await?;
        let checked = self.check_published(now).await?;
        let removed = self.remove_expired(now).await?;
        let extended = self.extend_ledger(now).await?;

        info!(
            "Sweep complete: {} created, {} checked, {} removed, {} slots appended",
            created.len(),
            checked.len(),
            removed.len(),
            extended
        );

        Ok(SweepReport {
            created,
            checked,
            removed,
            extended,
        })
    }

    /// Provisions deployments for booked slots starting within the prep
    /// window around `now`.
    pub async fn create_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(i32, CreateOutcome)>, LedgerError> {
        let prep = Duration::minutes(self.config.prep_minutes);
        let due = self.dal.slot().due_for_create(now - prep, now + prep).await?;
        info!("Pending slots to provision: {}", due.len());

        let mut outcomes = Vec::with_capacity(due.len());
        for slot in due {
            let params = DeployParams {
                password: slot.password.clone(),
            };
            let result = tokio::time::timeout(
                self.config.provisioner_timeout,
                self.provisioner.create(&slot.namespace, &params),
            )
            .await;

            let outcome = match result {
                Ok(Ok(())) => CreateOutcome::Published,
                Ok(Err(e)) => {
                    warn!("Provisioning slot {} failed: {}", slot.id, e);
                    CreateOutcome::Excepted(e.to_string())
                }
                Err(_) => {
                    warn!("Provisioning slot {} timed out", slot.id);
                    CreateOutcome::Excepted(ProvisionerError::Timeout.to_string())
                }
            };

            let to_state = match outcome {
                CreateOutcome::Published => LifecycleState::Published,
                CreateOutcome::Excepted(_) => LifecycleState::Excepted,
            };
            if self.dal.slot().finish_create(slot.id, to_state).await? {
                outcomes.push((slot.id, outcome));
            } else {
                debug!("Slot {} left Empty concurrently, outcome discarded", slot.id);
            }
        }
        Ok(outcomes)
    }

    /// Polls readiness of published deployments; healthy ones transition to
    /// `Running` and get their reminder notification enqueued.
    pub async fn check_published(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(i32, CheckOutcome)>, LedgerError> {
        let published = self.dal.slot().published().await?;
        info!("Published slots to check: {}", published.len());

        let mut outcomes = Vec::with_capacity(published.len());
        for slot in published {
            let result = tokio::time::timeout(
                self.config.provisioner_timeout,
                self.provisioner.health_check(&slot.namespace),
            )
            .await;

            let outcome = match result {
                Ok(Ok(Health::Ready)) => {
                    let reminder = self.reminder_for(&slot, now);
                    if self.dal.slot().mark_running(slot.id, reminder).await? {
                        CheckOutcome::Running
                    } else {
                        debug!("Slot {} already left Published, skipping", slot.id);
                        continue;
                    }
                }
                Ok(Ok(Health::NotReady)) => {
                    debug!("Slot {} deployment not ready yet", slot.id);
                    CheckOutcome::NotReady
                }
                Ok(Err(e)) => {
                    warn!("Health check for slot {} failed: {}", slot.id, e);
                    CheckOutcome::CheckFailed(e.to_string())
                }
                Err(_) => {
                    warn!("Health check for slot {} timed out", slot.id);
                    CheckOutcome::CheckFailed(ProvisionerError::Timeout.to_string())
                }
            };
            outcomes.push((slot.id, outcome));
        }
        Ok(outcomes)
    }

    fn reminder_for(&self, slot: &Slot, now: DateTime<Utc>) -> NewMail {
        let locale = slot.locale.unwrap_or_else(|| {
            warn!("Slot {} has no locale, defaulting to EN", slot.id);
            Locale::En
        });
        NewMail {
            time_to_send: UniversalTimestamp(now),
            email: slot.email.clone(),
            reason: MailReason::Reminder,
            locale,
            data: reminder_payload(
                &self.config.base_domain,
                &slot.namespace,
                &slot.password,
                locale,
                slot.start_time,
            ),
        }
    }

    /// Tears down deployments of slots that ended before the slack cutoff.
    pub async fn remove_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(i32, RemoveOutcome)>, LedgerError> {
        let cutoff = now - Duration::minutes(self.config.slack_minutes);
        let expired = self.dal.slot().expired(cutoff).await?;
        info!("Expired slots to tear down: {}", expired.len());

        let mut outcomes = Vec::with_capacity(expired.len());
        for slot in expired {
            let result = tokio::time::timeout(
                self.config.provisioner_timeout,
                self.provisioner.remove(&slot.namespace),
            )
            .await;

            let outcome = match result {
                Ok(Ok(())) => {
                    if self.dal.slot().mark_removed(slot.id).await? {
                        RemoveOutcome::Removed
                    } else {
                        debug!("Slot {} already left the pipeline, skipping", slot.id);
                        continue;
                    }
                }
                Ok(Err(e)) => {
                    warn!("Teardown of slot {} failed, will retry: {}", slot.id, e);
                    RemoveOutcome::RemoveFailed(e.to_string())
                }
                Err(_) => {
                    warn!("Teardown of slot {} timed out, will retry", slot.id);
                    RemoveOutcome::RemoveFailed(ProvisionerError::Timeout.to_string())
                }
            };
            outcomes.push((slot.id, outcome));
        }
        Ok(outcomes)
    }

    /// Tops up the pre-generated slot sequence so it covers the reserve
    /// window. Returns the number of slots appended.
    ///
    /// Generation continues from the latest existing start time; an empty
    /// ledger is seeded from `now`.
    pub async fn extend_ledger(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        let interval = Duration::minutes(self.config.slot_interval_minutes);
        let size = Duration::minutes(self.config.slot_size_minutes);
        let reserve_until = now + Duration::days(self.config.reserve_days);

        let mut next_start = match self.dal.slot().latest_start_time().await? {
            Some(latest) => latest.into_inner() + interval,
            None => now,
        };

        let mut batch = Vec::new();
        while next_start < reserve_until {
            batch.push(NewSlot {
                start_time: UniversalTimestamp(next_start),
                end_time: UniversalTimestamp(next_start + size),
                enabled: true,
            });
            next_start += interval;
        }

        if batch.is_empty() {
            debug!("Ledger already covers the reserve window");
            return Ok(0);
        }

        let created = self.dal.slot().create_slots(batch).await?;
        info!("Appended {} slots to the ledger", created.len());
        Ok(created.len())
    }
}
