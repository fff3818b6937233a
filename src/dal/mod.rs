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

//! Data Access Layer with runtime backend selection
//!
//! - `unified`: entry point; dispatches each operation to the backend the
//!   pool was built for
//! - `postgres_dal`: Diesel models using native PostgreSQL types
//! - `sqlite_dal`: Diesel models using SQLite's TEXT/INTEGER affinity
//!
//! Backend model structs never escape this layer; every operation returns
//! domain types from [`crate::models`].

pub mod unified;

pub mod postgres_dal;
pub mod sqlite_dal;

pub use unified::slot::{AdminOutcome, BookOutcome, Booking, SlotDAL};
pub use unified::mail::MailDAL;
pub use unified::DAL;

use crate::error::LedgerError;
use crate::models::mail::MailReason;
use crate::models::slot::{LifecycleState, Locale};

pub(crate) fn parse_lifecycle_column(
    value: Option<String>,
) -> Result<Option<LifecycleState>, LedgerError> {
    match value {
        Some(s) => Ok(Some(LifecycleState::parse(&s).ok_or(
            LedgerError::InvalidEnumValue {
                table: "slots",
                column: "lifecycle_state",
                value: s,
            },
        )?)),
        None => Ok(None),
    }
}

pub(crate) fn parse_locale_column(value: Option<String>) -> Result<Option<Locale>, LedgerError> {
    match value {
        Some(s) => Ok(Some(Locale::parse(&s).ok_or(
            LedgerError::InvalidEnumValue {
                table: "slots",
                column: "locale",
                value: s,
            },
        )?)),
        None => Ok(None),
    }
}

pub(crate) fn parse_mail_reason(value: String) -> Result<MailReason, LedgerError> {
    MailReason::parse(&value).ok_or(LedgerError::InvalidEnumValue {
        table: "mails",
        column: "reason",
        value,
    })
}

pub(crate) fn parse_mail_locale(value: String) -> Result<Locale, LedgerError> {
    Locale::parse(&value).ok_or(LedgerError::InvalidEnumValue {
        table: "mails",
        column: "locale",
        value,
    })
}
