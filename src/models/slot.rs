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

//! Slot Model
//!
//! A slot is a bookable half-open time interval tied to one demo cluster
//! deployment. Slots are pre-generated far in advance as a contiguous,
//! non-overlapping sequence; the ledger assumes that invariant rather than
//! re-verifying it on read.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::database::universal_types::UniversalTimestamp;

/// Deployment lifecycle of a booked slot.
///
/// The state is unset (`None` on [`Slot::lifecycle_state`]) until a booking
/// puts the slot into the pipeline. Observed over time, the state sequence is
/// a prefix of `Empty -> {Published -> Running | Excepted} -> Removed`;
/// `Removed` is terminal and the sweep never revisits such a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Booked, deployment not yet attempted
    Empty,
    /// Deployment created, waiting for readiness
    Published,
    /// Deployment creation failed; requires operator intervention
    Excepted,
    /// Deployment healthy and reachable
    Running,
    /// Deployment torn down
    Removed,
}

impl LifecycleState {
    /// Database representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Empty => "Empty",
            LifecycleState::Published => "Published",
            LifecycleState::Excepted => "Excepted",
            LifecycleState::Running => "Running",
            LifecycleState::Removed => "Removed",
        }
    }

    /// Parses the database representation, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Empty" => Some(LifecycleState::Empty),
            "Published" => Some(LifecycleState::Published),
            "Excepted" => Some(LifecycleState::Excepted),
            "Running" => Some(LifecycleState::Running),
            "Removed" => Some(LifecycleState::Removed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification locale chosen by the visitor at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    Ru,
    En,
}

/// A timestamp rendered for human consumption in a locale's conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedTime {
    pub date: String,
    pub time: String,
    pub zone: String,
}

impl Locale {
    /// Database representation of the locale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ru => "RU",
            Locale::En => "EN",
        }
    }

    /// Parses the database representation, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RU" => Some(Locale::Ru),
            "EN" => Some(Locale::En),
            _ => None,
        }
    }

    /// Parses the lowercase tag used by the booking frontend (`ru` / `en`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ru" => Some(Locale::Ru),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// Renders a UTC instant in this locale's conventions.
    ///
    /// Russian recipients get Moscow time (UTC+3) and `dd.mm.YYYY` dates;
    /// English recipients get UTC and ISO dates.
    pub fn localize(&self, t: DateTime<Utc>) -> LocalizedTime {
        match self {
            Locale::Ru => {
                let offset = FixedOffset::east_opt(3 * 3600).expect("valid UTC+3 offset");
                let local = t.with_timezone(&offset);
                LocalizedTime {
                    date: local.format("%d.%m.%Y").to_string(),
                    time: local.format("%H:%M").to_string(),
                    zone: "UTC+03:00".to_string(),
                }
            }
            Locale::En => LocalizedTime {
                date: t.format("%Y-%m-%d").to_string(),
                time: t.format("%H:%M").to_string(),
                zone: "UTC".to_string(),
            },
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a reservation ledger row.
///
/// A slot is "available" iff `enabled` is true and `email` is empty; booking
/// flips `enabled` off, fills the metadata and credential fields, and enters
/// the slot into the lifecycle pipeline by setting `lifecycle_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Ledger-assigned identifier, immutable once assigned
    pub id: i32,
    /// Inclusive start of the reserved interval
    pub start_time: UniversalTimestamp,
    /// Exclusive end of the reserved interval
    pub end_time: UniversalTimestamp,
    /// Whether the slot is open for booking
    pub enabled: bool,
    /// Booker's email address; empty when unbooked
    pub email: String,
    /// Booker's organization; free-form, may be empty
    pub organization: String,
    /// Generated deployment namespace; empty until booked
    pub namespace: String,
    /// Generated access password; empty until booked
    pub password: String,
    /// Deployment lifecycle state; `None` until booked
    pub lifecycle_state: Option<LifecycleState>,
    /// Notification locale; `None` until booked
    pub locale: Option<Locale>,
}

impl Slot {
    /// Whether the slot can currently be offered for booking.
    pub fn is_available(&self) -> bool {
        self.enabled && self.email.is_empty()
    }
}

/// A new slot to be inserted by the ledger generator or an operator.
#[derive(Debug, Clone)]
pub struct NewSlot {
    pub start_time: UniversalTimestamp,
    pub end_time: UniversalTimestamp,
    pub enabled: bool,
}
