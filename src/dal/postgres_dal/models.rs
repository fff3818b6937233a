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

//! PostgreSQL-specific database models
//!
//! Diesel model definitions using native PostgreSQL types (TIMESTAMP,
//! BOOLEAN). Used internally by the PostgreSQL arms of the unified DAL and
//! converted to/from domain types at the DAL boundary.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::dal::{parse_lifecycle_column, parse_locale_column, parse_mail_locale, parse_mail_reason};
use crate::database::schema::postgres::{mails, slots};
use crate::database::universal_types::UniversalTimestamp;
use crate::error::LedgerError;
use crate::models::mail::{Mail, NewMail};
use crate::models::slot::{NewSlot, Slot};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgSlot {
    pub id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub enabled: bool,
    pub email: String,
    pub organization: String,
    pub namespace: String,
    pub password: String,
    pub lifecycle_state: Option<String>,
    pub locale: Option<String>,
}

impl TryFrom<PgSlot> for Slot {
    type Error = LedgerError;

    fn try_from(row: PgSlot) -> Result<Self, Self::Error> {
        Ok(Slot {
            id: row.id,
            start_time: UniversalTimestamp::from_naive(row.start_time),
            end_time: UniversalTimestamp::from_naive(row.end_time),
            enabled: row.enabled,
            email: row.email,
            organization: row.organization,
            namespace: row.namespace,
            password: row.password,
            lifecycle_state: parse_lifecycle_column(row.lifecycle_state)?,
            locale: parse_locale_column(row.locale)?,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = slots)]
pub struct NewPgSlot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub enabled: bool,
}

impl From<&NewSlot> for NewPgSlot {
    fn from(new_slot: &NewSlot) -> Self {
        Self {
            start_time: new_slot.start_time.to_naive(),
            end_time: new_slot.end_time.to_naive(),
            enabled: new_slot.enabled,
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = mails)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgMail {
    pub time_to_send: NaiveDateTime,
    pub email: String,
    pub reason: String,
    pub locale: String,
    pub data: String,
    pub sent: bool,
}

impl TryFrom<PgMail> for Mail {
    type Error = LedgerError;

    fn try_from(row: PgMail) -> Result<Self, Self::Error> {
        Ok(Mail {
            time_to_send: UniversalTimestamp::from_naive(row.time_to_send),
            email: row.email,
            reason: parse_mail_reason(row.reason)?,
            locale: parse_mail_locale(row.locale)?,
            data: serde_json::from_str(&row.data)?,
            sent: row.sent,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mails)]
pub struct NewPgMail {
    pub time_to_send: NaiveDateTime,
    pub email: String,
    pub reason: String,
    pub locale: String,
    pub data: String,
}

impl From<&NewMail> for NewPgMail {
    fn from(new_mail: &NewMail) -> Self {
        Self {
            time_to_send: new_mail.time_to_send.to_naive(),
            email: new_mail.email.clone(),
            reason: new_mail.reason.as_str().to_string(),
            locale: new_mail.locale.as_str().to_string(),
            data: new_mail.data.to_string(),
        }
    }
}
