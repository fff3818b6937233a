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

//! Unified Mail DAL with runtime backend selection
//!
//! Notification-queue operations. The queue is append-only: rows are keyed
//! by `(time_to_send, email, reason, locale)`, duplicate appends are dropped
//! via `ON CONFLICT DO NOTHING`, and delivery flips `sent` rather than
//! deleting, so the table doubles as an audit trail.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::DAL;
use crate::database::universal_types::UniversalTimestamp;
use crate::database::BackendType;
use crate::error::LedgerError;
use crate::models::mail::{Mail, MailKey, NewMail};

/// Data access layer for notification queue operations with runtime backend
/// selection.
#[derive(Clone)]
pub struct MailDAL<'a> {
    dal: &'a DAL,
}

impl<'a> MailDAL<'a> {
    /// Creates a new MailDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Appends a notification, returning whether a row was actually added.
    ///
    /// A duplicate composite key is silently dropped and reported as `false`.
    pub async fn enqueue(&self, new_mail: NewMail) -> Result<bool, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.enqueue_postgres(new_mail).await,
            BackendType::Sqlite => self.enqueue_sqlite(new_mail).await,
        }
    }

    async fn enqueue_postgres(&self, new_mail: NewMail) -> Result<bool, LedgerError> {
        use crate::dal::postgres_dal::models::NewPgMail;
        use crate::database::schema::postgres::mails;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let pg_mail = NewPgMail::from(&new_mail);
        let inserted = conn
            .interact(move |conn| {
                diesel::insert_into(mails::table)
                    .values(&pg_mail)
                    .on_conflict_do_nothing()
                    .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(inserted == 1)
    }

    async fn enqueue_sqlite(&self, new_mail: NewMail) -> Result<bool, LedgerError> {
        use crate::dal::sqlite_dal::models::NewSqliteMail;
        use crate::database::schema::sqlite::mails;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let sqlite_mail = NewSqliteMail::from(&new_mail);
        let inserted = conn
            .interact(move |conn| {
                diesel::insert_into(mails::table)
                    .values(&sqlite_mail)
                    .on_conflict_do_nothing()
                    .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(inserted == 1)
    }

    /// Unsent rows due at or before `now`, ascending by send time.
    pub async fn due_unsent(&self, now: DateTime<Utc>) -> Result<Vec<Mail>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.due_unsent_postgres(now).await,
            BackendType::Sqlite => self.due_unsent_sqlite(now).await,
        }
    }

    async fn due_unsent_postgres(&self, now: DateTime<Utc>) -> Result<Vec<Mail>, LedgerError> {
        use crate::dal::postgres_dal::models::PgMail;
        use crate::database::schema::postgres::mails;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgMail> = conn
            .interact(move |conn| {
                mails::table
                    .filter(mails::sent.eq(false))
                    .filter(mails::time_to_send.le(now.naive_utc()))
                    .order(mails::time_to_send.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Mail::try_from).collect()
    }

    async fn due_unsent_sqlite(&self, now: DateTime<Utc>) -> Result<Vec<Mail>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteMail;
        use crate::database::schema::sqlite::mails;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let now = UniversalTimestamp(now).to_rfc3339();
        let rows: Vec<SqliteMail> = conn
            .interact(move |conn| {
                mails::table
                    .filter(mails::sent.eq(0))
                    .filter(mails::time_to_send.le(now))
                    .order(mails::time_to_send.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Mail::try_from).collect()
    }

    /// Marks one row delivered. Returns `false` when no such row exists.
    pub async fn mark_sent(&self, key: &MailKey) -> Result<bool, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.mark_sent_postgres(key).await,
            BackendType::Sqlite => self.mark_sent_sqlite(key).await,
        }
    }

    async fn mark_sent_postgres(&self, key: &MailKey) -> Result<bool, LedgerError> {
        use crate::database::schema::postgres::mails;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let time_to_send = key.time_to_send.to_naive();
        let email = key.email.clone();
        let reason = key.reason.as_str();
        let locale = key.locale.as_str();
        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    mails::table
                        .filter(mails::time_to_send.eq(time_to_send))
                        .filter(mails::email.eq(email))
                        .filter(mails::reason.eq(reason))
                        .filter(mails::locale.eq(locale)),
                )
                .set(mails::sent.eq(true))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    async fn mark_sent_sqlite(&self, key: &MailKey) -> Result<bool, LedgerError> {
        use crate::database::schema::sqlite::mails;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let time_to_send = key.time_to_send.to_rfc3339();
        let email = key.email.clone();
        let reason = key.reason.as_str();
        let locale = key.locale.as_str();
        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    mails::table
                        .filter(mails::time_to_send.eq(time_to_send))
                        .filter(mails::email.eq(email))
                        .filter(mails::reason.eq(reason))
                        .filter(mails::locale.eq(locale)),
                )
                .set(mails::sent.eq(1))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    /// Every queue row addressed to `email`, ascending by send time. Audit
    /// helper for operators.
    pub async fn list_for_recipient(&self, email: &str) -> Result<Vec<Mail>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.list_for_recipient_postgres(email.to_string()).await,
            BackendType::Sqlite => self.list_for_recipient_sqlite(email.to_string()).await,
        }
    }

    async fn list_for_recipient_postgres(&self, email: String) -> Result<Vec<Mail>, LedgerError> {
        use crate::dal::postgres_dal::models::PgMail;
        use crate::database::schema::postgres::mails;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgMail> = conn
            .interact(move |conn| {
                mails::table
                    .filter(mails::email.eq(email))
                    .order(mails::time_to_send.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Mail::try_from).collect()
    }

    async fn list_for_recipient_sqlite(&self, email: String) -> Result<Vec<Mail>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteMail;
        use crate::database::schema::sqlite::mails;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<SqliteMail> = conn
            .interact(move |conn| {
                mails::table
                    .filter(mails::email.eq(email))
                    .order(mails::time_to_send.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Mail::try_from).collect()
    }
}
