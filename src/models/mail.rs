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

//! Mail Model
//!
//! Outbound notification rows, keyed by `(time_to_send, email, reason,
//! locale)`. Rows are appended by the reservation API (greeting) and the
//! lifecycle driver (reminder), marked sent by the draining mailer, and never
//! deleted: the table doubles as an audit trail of everything ever scheduled.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::database::universal_types::UniversalTimestamp;
use crate::models::slot::Locale;

/// Why a notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailReason {
    /// Booking confirmation with access details, sent immediately on booking
    Greeting,
    /// Cluster-is-ready notification, sent when the deployment becomes healthy
    Reminder,
}

impl MailReason {
    /// Database representation of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            MailReason::Greeting => "Greeting",
            MailReason::Reminder => "Reminder",
        }
    }

    /// Parses the database representation, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Greeting" => Some(MailReason::Greeting),
            "Reminder" => Some(MailReason::Reminder),
            _ => None,
        }
    }

    /// Subject line for this reason in the given locale.
    pub fn subject(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (MailReason::Greeting, Locale::Ru) => "Ваш доступ к онлайн-демонстрации",
            (MailReason::Greeting, Locale::En) => "Your access to a demo cluster",
            (MailReason::Reminder, Locale::Ru) => "Ваш демо-кластер развернут и ждёт вас",
            (MailReason::Reminder, Locale::En) => "Your demo cluster has deployed",
        }
    }

    /// Template file rendered by the mail transport for this reason.
    pub fn template_file(&self) -> &'static str {
        match self {
            MailReason::Greeting => "greeting.jinja2",
            MailReason::Reminder => "reminder.jinja2",
        }
    }
}

impl std::fmt::Display for MailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite primary key of a notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailKey {
    pub time_to_send: UniversalTimestamp,
    pub email: String,
    pub reason: MailReason,
    pub locale: Locale,
}

/// Represents a notification queue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    /// Earliest instant the mail may be delivered
    pub time_to_send: UniversalTimestamp,
    /// Recipient address
    pub email: String,
    /// Why the mail is being sent
    pub reason: MailReason,
    /// Rendering locale
    pub locale: Locale,
    /// Opaque key-value payload consumed by the template renderer
    pub data: serde_json::Value,
    /// Set once the mailer has delivered the row
    pub sent: bool,
}

impl Mail {
    /// The composite primary key of this row.
    pub fn key(&self) -> MailKey {
        MailKey {
            time_to_send: self.time_to_send,
            email: self.email.clone(),
            reason: self.reason,
            locale: self.locale,
        }
    }
}

/// A new notification row to be appended to the queue.
#[derive(Debug, Clone)]
pub struct NewMail {
    pub time_to_send: UniversalTimestamp,
    pub email: String,
    pub reason: MailReason,
    pub locale: Locale,
    pub data: serde_json::Value,
}

/// Builds the greeting payload sent right after a successful booking.
///
/// Pure so the booking transaction can call it while holding the row lock.
pub fn greeting_payload(
    base_domain: &str,
    namespace: &str,
    password: &str,
    locale: Locale,
    start_time: UniversalTimestamp,
) -> serde_json::Value {
    let when = locale.localize(start_time.into_inner());
    json!({
        "url": format!("https://notebook-{}.{}", namespace, base_domain),
        "user": "admin",
        "password": password,
        "namespace": namespace,
        "date": when.date,
        "time": when.time,
        "zone": when.zone,
    })
}

/// Builds the reminder payload sent once the deployment reports healthy.
pub fn reminder_payload(
    base_domain: &str,
    namespace: &str,
    password: &str,
    locale: Locale,
    start_time: UniversalTimestamp,
) -> serde_json::Value {
    let when = locale.localize(start_time.into_inner());
    json!({
        "notebook_url": format!("https://notebook-{}.{}", namespace, base_domain),
        "cluster_url": format!("https://cluster-{}.{}/demo", namespace, base_domain),
        "dashboard_url": format!("https://dashboard-{}.{}/demo", namespace, base_domain),
        "launch_url": format!(
            "https://notebook-{}.{}/lab/tree/Welcome.ipynb?token={}",
            namespace, base_domain, password
        ),
        "user": "admin",
        "password": password,
        "namespace": namespace,
        "date": when.date,
        "time": when.time,
        "zone": when.zone,
    })
}
