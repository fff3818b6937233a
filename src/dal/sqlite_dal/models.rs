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

//! SQLite-specific database models
//!
//! Diesel model definitions using SQLite's storage affinities: timestamps as
//! RFC3339 TEXT (lexicographic order matches chronological order for UTC
//! timestamps) and booleans as INTEGER 0/1. Converted to/from domain types at
//! the DAL boundary.

use diesel::prelude::*;

use crate::dal::{parse_lifecycle_column, parse_locale_column, parse_mail_locale, parse_mail_reason};
use crate::database::schema::sqlite::{mails, slots};
use crate::database::universal_types::UniversalTimestamp;
use crate::error::LedgerError;
use crate::models::mail::{Mail, NewMail};
use crate::models::slot::{NewSlot, Slot};

pub(crate) fn parse_timestamp(value: String) -> Result<UniversalTimestamp, LedgerError> {
    UniversalTimestamp::from_rfc3339(&value).map_err(|source| LedgerError::InvalidTimestamp {
        value,
        source,
    })
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = slots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteSlot {
    pub id: i32,
    pub start_time: String,
    pub end_time: String,
    pub enabled: i32,
    pub email: String,
    pub organization: String,
    pub namespace: String,
    pub password: String,
    pub lifecycle_state: Option<String>,
    pub locale: Option<String>,
}

impl TryFrom<SqliteSlot> for Slot {
    type Error = LedgerError;

    fn try_from(row: SqliteSlot) -> Result<Self, Self::Error> {
        Ok(Slot {
            id: row.id,
            start_time: parse_timestamp(row.start_time)?,
            end_time: parse_timestamp(row.end_time)?,
            enabled: row.enabled != 0,
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
pub struct NewSqliteSlot {
    pub start_time: String,
    pub end_time: String,
    pub enabled: i32,
}

impl From<&NewSlot> for NewSqliteSlot {
    fn from(new_slot: &NewSlot) -> Self {
        Self {
            start_time: new_slot.start_time.to_rfc3339(),
            end_time: new_slot.end_time.to_rfc3339(),
            enabled: if new_slot.enabled { 1 } else { 0 },
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = mails)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteMail {
    pub time_to_send: String,
    pub email: String,
    pub reason: String,
    pub locale: String,
    pub data: String,
    pub sent: i32,
}

impl TryFrom<SqliteMail> for Mail {
    type Error = LedgerError;

    fn try_from(row: SqliteMail) -> Result<Self, Self::Error> {
        Ok(Mail {
            time_to_send: parse_timestamp(row.time_to_send)?,
            email: row.email,
            reason: parse_mail_reason(row.reason)?,
            locale: parse_mail_locale(row.locale)?,
            data: serde_json::from_str(&row.data)?,
            sent: row.sent != 0,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mails)]
pub struct NewSqliteMail {
    pub time_to_send: String,
    pub email: String,
    pub reason: String,
    pub locale: String,
    pub data: String,
}

impl From<&NewMail> for NewSqliteMail {
    fn from(new_mail: &NewMail) -> Self {
        Self {
            time_to_send: new_mail.time_to_send.to_rfc3339(),
            email: new_mail.email.clone(),
            reason: new_mail.reason.as_str().to_string(),
            locale: new_mail.locale.as_str().to_string(),
            data: new_mail.data.to_string(),
        }
    }
}
