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

//! Mail transport boundary and queue draining.
//!
//! Delivery is decoupled from enqueueing: booking and the lifecycle driver
//! only append rows to the `mails` table, and [`drain_once`] later hands due
//! rows to a [`Mailer`] implementation. A row is marked sent only after the
//! transport reports success, so a crashed drain re-delivers rather than
//! drops (at-least-once).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::dal::DAL;
use crate::error::LedgerError;
use crate::models::{Mail, MailKey, MailReason};
use crate::models::slot::Locale;
use crate::database::universal_types::UniversalTimestamp;

/// Everything a transport needs to render and deliver one notification.
#[derive(Debug, Clone)]
pub struct MailSpec {
    pub recipient: String,
    pub send_time: UniversalTimestamp,
    /// Hostname of the recipient's notebook endpoint
    pub fqdn: String,
    pub login: String,
    pub password: String,
    pub reason: MailReason,
    pub locale: Locale,
}

impl MailSpec {
    /// Assembles a spec from a queue row and the deployment base domain.
    ///
    /// Credential fields missing from the payload come through empty; the
    /// template renderer treats that the same as an unbooked placeholder.
    pub fn from_mail(mail: &Mail, base_domain: &str) -> Self {
        let namespace = mail.data["namespace"].as_str().unwrap_or_default();
        let password = mail.data["password"].as_str().unwrap_or_default();
        Self {
            recipient: mail.email.clone(),
            send_time: mail.time_to_send,
            fqdn: format!("notebook-{}.{}", namespace, base_domain),
            login: "admin".to_string(),
            password: password.to_string(),
            reason: mail.reason,
            locale: mail.locale,
        }
    }
}

/// Faults raised by the mail transport.
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Mail delivery failed: {0}")]
    Failed(String),

    #[error("Mail delivery timed out")]
    Timeout,
}

/// Delivers one rendered notification.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Renders and sends the notification; `data` carries the template fields.
    async fn send(&self, spec: &MailSpec, data: &serde_json::Value) -> Result<(), MailerError>;
}

/// Per-row outcome of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Sent,
    Failed(String),
}

/// Delivers every due unsent row once, marking successes as sent.
///
/// Failed rows keep `sent = false` and are retried by the next drain. Rows
/// are processed independently; one failing transport call never blocks the
/// rest of the batch.
pub async fn drain_once(
    dal: &DAL,
    mailer: &dyn Mailer,
    base_domain: &str,
    send_timeout: Duration,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<(MailKey, DrainOutcome)>, LedgerError> {
    let due = dal.mail().due_unsent(now).await?;
    info!("Draining {} due notification(s)", due.len());

    let mut outcomes = Vec::with_capacity(due.len());
    for mail in due {
        let key = mail.key();
        let spec = MailSpec::from_mail(&mail, base_domain);
        let result = tokio::time::timeout(send_timeout, mailer.send(&spec, &mail.data)).await;
        let outcome = match result {
            Ok(Ok(())) => {
                dal.mail().mark_sent(&key).await?;
                DrainOutcome::Sent
            }
            Ok(Err(e)) => {
                warn!(
                    "Delivery to {} ({}) failed, will retry: {}",
                    key.email, key.reason, e
                );
                DrainOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Delivery to {} ({}) timed out, will retry",
                    key.email, key.reason
                );
                DrainOutcome::Failed(MailerError::Timeout.to_string())
            }
        };
        outcomes.push((key, outcome));
    }

    Ok(outcomes)
}
