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

//! Unified Slot DAL with runtime backend selection
//!
//! Reservation-ledger operations for both PostgreSQL and SQLite backends.
//! Booking exclusivity comes from `SELECT ... FOR UPDATE` on PostgreSQL and
//! from the single-connection pool on SQLite; either way a booking is one
//! transaction that checks availability, claims the row, and enqueues the
//! greeting notification atomically.
//!
//! Lifecycle transitions (`finish_create`, `mark_running`, `mark_removed`)
//! are guarded UPDATEs filtered on the expected current state: a transition
//! already applied by a previous sweep reports `false` instead of clobbering
//! newer state.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::DAL;
use crate::access::AccessCredentials;
use crate::database::universal_types::UniversalTimestamp;
use crate::database::BackendType;
use crate::error::LedgerError;
use crate::horizon::BookingHorizon;
use crate::models::mail::{greeting_payload, MailReason, NewMail};
use crate::models::slot::{LifecycleState, Locale, NewSlot, Slot};

/// Visitor-supplied booking data plus the credentials minted for it.
#[derive(Debug, Clone)]
pub struct Booking {
    pub email: String,
    pub organization: String,
    pub locale: Locale,
    pub credentials: AccessCredentials,
}

/// Result of a booking attempt. Losing a race or missing the horizon is an
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum BookOutcome {
    /// The slot was claimed; carries the updated row.
    Booked(Slot),
    /// The slot exists inside the horizon but is not available.
    Conflict,
    /// No such slot inside the booking horizon.
    NotFound,
}

/// Per-id result of an administrative batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    Applied,
    NotFound,
    /// The row exists but its state forbids the operation.
    Refused(String),
}

/// Administrative mutations applied per id under a row lock.
#[derive(Debug, Clone, Copy)]
enum AdminOp {
    Open,
    Close,
    Clear,
    Remove,
}

/// Validates an admin operation against the current row, returning the
/// refusal reason if it must not proceed.
fn admin_check(slot: &Slot, op: AdminOp) -> Result<(), String> {
    match op {
        AdminOp::Open if !slot.email.is_empty() => Err("slot is booked".to_string()),
        AdminOp::Close if !slot.enabled => Err("slot is already closed".to_string()),
        AdminOp::Clear
            if matches!(
                slot.lifecycle_state,
                Some(LifecycleState::Published) | Some(LifecycleState::Running)
            ) =>
        {
            Err("deployment is live, remove it first".to_string())
        }
        _ => Ok(()),
    }
}

/// Data access layer for reservation ledger operations with runtime backend
/// selection.
#[derive(Clone)]
pub struct SlotDAL<'a> {
    dal: &'a DAL,
}

impl<'a> SlotDAL<'a> {
    /// Creates a new SlotDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Lists bookable slots whose start time falls in `[from, to)`, ascending.
    pub async fn list_available(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.list_available_postgres(from, to).await,
            BackendType::Sqlite => self.list_available_sqlite(from, to).await,
        }
    }

    async fn list_available_postgres(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::enabled.eq(true))
                    .filter(slots::email.eq(""))
                    .filter(slots::start_time.ge(from.naive_utc()))
                    .filter(slots::start_time.lt(to.naive_utc()))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn list_available_sqlite(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let from = UniversalTimestamp(from).to_rfc3339();
        let to = UniversalTimestamp(to).to_rfc3339();
        let rows: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::enabled.eq(1))
                    .filter(slots::email.eq(""))
                    .filter(slots::start_time.ge(from))
                    .filter(slots::start_time.lt(to))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    /// Retrieves a slot by id.
    pub async fn get(&self, id: i32) -> Result<Option<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.get_postgres(id).await,
            BackendType::Sqlite => self.get_sqlite(id).await,
        }
    }

    async fn get_postgres(&self, id: i32) -> Result<Option<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let row: Option<PgSlot> = conn
            .interact(move |conn| slots::table.find(id).first(conn).optional())
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        row.map(Slot::try_from).transpose()
    }

    async fn get_sqlite(&self, id: i32) -> Result<Option<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let row: Option<SqliteSlot> = conn
            .interact(move |conn| slots::table.find(id).first(conn).optional())
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        row.map(Slot::try_from).transpose()
    }

    /// Administrative listing with optional absolute bounds on start time:
    /// rows with `start_time <= until` and `start_time > since`.
    pub async fn list_window(
        &self,
        until: Option<DateTime<Utc>>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.list_window_postgres(until, since).await,
            BackendType::Sqlite => self.list_window_sqlite(until, since).await,
        }
    }

    async fn list_window_postgres(
        &self,
        until: Option<DateTime<Utc>>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let until = until.map(|t| t.naive_utc());
        let since = since.map(|t| t.naive_utc());
        let rows: Vec<PgSlot> = conn
            .interact(move |conn| {
                let mut query = slots::table.into_boxed();
                if let Some(until) = until {
                    query = query.filter(slots::start_time.le(until));
                }
                if let Some(since) = since {
                    query = query.filter(slots::start_time.gt(since));
                }
                query.order(slots::start_time.asc()).load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn list_window_sqlite(
        &self,
        until: Option<DateTime<Utc>>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let until = until.map(|t| UniversalTimestamp(t).to_rfc3339());
        let since = since.map(|t| UniversalTimestamp(t).to_rfc3339());
        let rows: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                let mut query = slots::table.into_boxed();
                if let Some(until) = until {
                    query = query.filter(slots::start_time.le(until));
                }
                if let Some(since) = since {
                    query = query.filter(slots::start_time.gt(since));
                }
                query.order(slots::start_time.asc()).load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    /// Attempts to claim a slot for a visitor.
    ///
    /// One transaction: lock the row (it must start inside `horizon`), check
    /// availability, write the booking fields and `lifecycle_state = Empty`,
    /// and enqueue the greeting mail with `time_to_send = now`. No external
    /// calls happen under the lock.
    pub async fn book(
        &self,
        id: i32,
        horizon: BookingHorizon,
        booking: Booking,
        now: DateTime<Utc>,
        base_domain: &str,
    ) -> Result<BookOutcome, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => {
                self.book_postgres(id, horizon, booking, now, base_domain.to_string())
                    .await
            }
            BackendType::Sqlite => {
                self.book_sqlite(id, horizon, booking, now, base_domain.to_string())
                    .await
            }
        }
    }

    async fn book_postgres(
        &self,
        id: i32,
        horizon: BookingHorizon,
        booking: Booking,
        now: DateTime<Utc>,
        base_domain: String,
    ) -> Result<BookOutcome, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::{mails, slots};

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        conn.interact(move |conn| {
            conn.transaction::<_, LedgerError, _>(|conn| {
                let row: Option<PgSlot> = slots::table
                    .find(id)
                    .filter(slots::start_time.ge(horizon.from.naive_utc()))
                    .filter(slots::start_time.lt(horizon.to.naive_utc()))
                    .for_update()
                    .first(conn)
                    .optional()?;

                let Some(row) = row else {
                    return Ok(BookOutcome::NotFound);
                };
                let slot = Slot::try_from(row)?;
                if !slot.is_available() {
                    return Ok(BookOutcome::Conflict);
                }

                diesel::update(slots::table.find(id))
                    .set((
                        slots::enabled.eq(false),
                        slots::email.eq(&booking.email),
                        slots::organization.eq(&booking.organization),
                        slots::namespace.eq(&booking.credentials.namespace),
                        slots::password.eq(&booking.credentials.password),
                        slots::lifecycle_state.eq(LifecycleState::Empty.as_str()),
                        slots::locale.eq(booking.locale.as_str()),
                    ))
                    .execute(conn)?;

                let payload = greeting_payload(
                    &base_domain,
                    &booking.credentials.namespace,
                    &booking.credentials.password,
                    booking.locale,
                    slot.start_time,
                );
                diesel::insert_into(mails::table)
                    .values((
                        mails::time_to_send.eq(now.naive_utc()),
                        mails::email.eq(&booking.email),
                        mails::reason.eq(MailReason::Greeting.as_str()),
                        mails::locale.eq(booking.locale.as_str()),
                        mails::data.eq(payload.to_string()),
                        mails::sent.eq(false),
                    ))
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                let updated: PgSlot = slots::table.find(id).first(conn)?;
                Ok(BookOutcome::Booked(Slot::try_from(updated)?))
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    async fn book_sqlite(
        &self,
        id: i32,
        horizon: BookingHorizon,
        booking: Booking,
        now: DateTime<Utc>,
        base_domain: String,
    ) -> Result<BookOutcome, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::{mails, slots};

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let from = UniversalTimestamp(horizon.from).to_rfc3339();
        let to = UniversalTimestamp(horizon.to).to_rfc3339();
        let send_time = UniversalTimestamp(now).to_rfc3339();
        conn.interact(move |conn| {
            // Pool size 1 already serializes writers; the transaction makes
            // the claim and the greeting atomic.
            conn.transaction::<_, LedgerError, _>(|conn| {
                let row: Option<SqliteSlot> = slots::table
                    .find(id)
                    .filter(slots::start_time.ge(from))
                    .filter(slots::start_time.lt(to))
                    .first(conn)
                    .optional()?;

                let Some(row) = row else {
                    return Ok(BookOutcome::NotFound);
                };
                let slot = Slot::try_from(row)?;
                if !slot.is_available() {
                    return Ok(BookOutcome::Conflict);
                }

                diesel::update(slots::table.find(id))
                    .set((
                        slots::enabled.eq(0),
                        slots::email.eq(&booking.email),
                        slots::organization.eq(&booking.organization),
                        slots::namespace.eq(&booking.credentials.namespace),
                        slots::password.eq(&booking.credentials.password),
                        slots::lifecycle_state.eq(LifecycleState::Empty.as_str()),
                        slots::locale.eq(booking.locale.as_str()),
                    ))
                    .execute(conn)?;

                let payload = greeting_payload(
                    &base_domain,
                    &booking.credentials.namespace,
                    &booking.credentials.password,
                    booking.locale,
                    slot.start_time,
                );
                diesel::insert_into(mails::table)
                    .values((
                        mails::time_to_send.eq(&send_time),
                        mails::email.eq(&booking.email),
                        mails::reason.eq(MailReason::Greeting.as_str()),
                        mails::locale.eq(booking.locale.as_str()),
                        mails::data.eq(payload.to_string()),
                        mails::sent.eq(0),
                    ))
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                let updated: SqliteSlot = slots::table.find(id).first(conn)?;
                Ok(BookOutcome::Booked(Slot::try_from(updated)?))
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    /// Bulk inserts explicit slot intervals, returning the created rows.
    pub async fn create_slots(&self, specs: Vec<NewSlot>) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.create_slots_postgres(specs).await,
            BackendType::Sqlite => self.create_slots_sqlite(specs).await,
        }
    }

    async fn create_slots_postgres(&self, specs: Vec<NewSlot>) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::{NewPgSlot, PgSlot};
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<NewPgSlot> = specs.iter().map(NewPgSlot::from).collect();
        let inserted: Vec<PgSlot> = conn
            .interact(move |conn| {
                diesel::insert_into(slots::table)
                    .values(&rows)
                    .get_results(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        inserted.into_iter().map(Slot::try_from).collect()
    }

    async fn create_slots_sqlite(&self, specs: Vec<NewSlot>) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::{NewSqliteSlot, SqliteSlot};
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<NewSqliteSlot> = specs.iter().map(NewSqliteSlot::from).collect();
        let count = rows.len() as i64;
        let inserted: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::insert_into(slots::table).values(&rows).execute(conn)?;
                    let mut created: Vec<SqliteSlot> = slots::table
                        .order(slots::id.desc())
                        .limit(count)
                        .load(conn)?;
                    created.reverse();
                    Ok(created)
                })
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        inserted.into_iter().map(Slot::try_from).collect()
    }

    /// Re-opens closed, unbooked slots. Refuses booked rows.
    pub async fn open_slots(&self, ids: &[i32]) -> Result<Vec<(i32, AdminOutcome)>, LedgerError> {
        self.apply_all(ids, AdminOp::Open).await
    }

    /// Withdraws slots from booking. Refuses rows that are already closed.
    pub async fn close_slots(&self, ids: &[i32]) -> Result<Vec<(i32, AdminOutcome)>, LedgerError> {
        self.apply_all(ids, AdminOp::Close).await
    }

    /// Resets booking fields, leaving the slot closed. Refuses rows whose
    /// deployment is still live.
    pub async fn clear_slots(&self, ids: &[i32]) -> Result<Vec<(i32, AdminOutcome)>, LedgerError> {
        self.apply_all(ids, AdminOp::Clear).await
    }

    /// Deletes rows outright. Administrative purge, no state checks.
    pub async fn remove_slots(&self, ids: &[i32]) -> Result<Vec<(i32, AdminOutcome)>, LedgerError> {
        self.apply_all(ids, AdminOp::Remove).await
    }

    /// Applies one admin operation per id, each in its own transaction so a
    /// bad id cannot roll back the rest of the batch.
    async fn apply_all(
        &self,
        ids: &[i32],
        op: AdminOp,
    ) -> Result<Vec<(i32, AdminOutcome)>, LedgerError> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            let outcome = match self.dal.backend() {
                BackendType::Postgres => self.apply_one_postgres(id, op).await?,
                BackendType::Sqlite => self.apply_one_sqlite(id, op).await?,
            };
            outcomes.push((id, outcome));
        }
        Ok(outcomes)
    }

    async fn apply_one_postgres(&self, id: i32, op: AdminOp) -> Result<AdminOutcome, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        conn.interact(move |conn| {
            conn.transaction::<_, LedgerError, _>(|conn| {
                let row: Option<PgSlot> =
                    slots::table.find(id).for_update().first(conn).optional()?;
                let Some(row) = row else {
                    return Ok(AdminOutcome::NotFound);
                };
                let slot = Slot::try_from(row)?;
                if let Err(reason) = admin_check(&slot, op) {
                    return Ok(AdminOutcome::Refused(reason));
                }

                match op {
                    AdminOp::Open => {
                        diesel::update(slots::table.find(id))
                            .set(slots::enabled.eq(true))
                            .execute(conn)?;
                    }
                    AdminOp::Close => {
                        diesel::update(slots::table.find(id))
                            .set(slots::enabled.eq(false))
                            .execute(conn)?;
                    }
                    AdminOp::Clear => {
                        diesel::update(slots::table.find(id))
                            .set((
                                slots::enabled.eq(false),
                                slots::email.eq(""),
                                slots::organization.eq(""),
                                slots::namespace.eq(""),
                                slots::password.eq(""),
                                slots::lifecycle_state.eq(None::<String>),
                                slots::locale.eq(None::<String>),
                            ))
                            .execute(conn)?;
                    }
                    AdminOp::Remove => {
                        diesel::delete(slots::table.find(id)).execute(conn)?;
                    }
                }
                Ok(AdminOutcome::Applied)
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    async fn apply_one_sqlite(&self, id: i32, op: AdminOp) -> Result<AdminOutcome, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        conn.interact(move |conn| {
            conn.transaction::<_, LedgerError, _>(|conn| {
                let row: Option<SqliteSlot> = slots::table.find(id).first(conn).optional()?;
                let Some(row) = row else {
                    return Ok(AdminOutcome::NotFound);
                };
                let slot = Slot::try_from(row)?;
                if let Err(reason) = admin_check(&slot, op) {
                    return Ok(AdminOutcome::Refused(reason));
                }

                match op {
                    AdminOp::Open => {
                        diesel::update(slots::table.find(id))
                            .set(slots::enabled.eq(1))
                            .execute(conn)?;
                    }
                    AdminOp::Close => {
                        diesel::update(slots::table.find(id))
                            .set(slots::enabled.eq(0))
                            .execute(conn)?;
                    }
                    AdminOp::Clear => {
                        diesel::update(slots::table.find(id))
                            .set((
                                slots::enabled.eq(0),
                                slots::email.eq(""),
                                slots::organization.eq(""),
                                slots::namespace.eq(""),
                                slots::password.eq(""),
                                slots::lifecycle_state.eq(None::<String>),
                                slots::locale.eq(None::<String>),
                            ))
                            .execute(conn)?;
                    }
                    AdminOp::Remove => {
                        diesel::delete(slots::table.find(id)).execute(conn)?;
                    }
                }
                Ok(AdminOutcome::Applied)
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    /// Booked slots awaiting deployment whose start time falls within
    /// `[from, to]`.
    pub async fn due_for_create(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.due_for_create_postgres(from, to).await,
            BackendType::Sqlite => self.due_for_create_sqlite(from, to).await,
        }
    }

    async fn due_for_create_postgres(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::email.ne(""))
                    .filter(slots::lifecycle_state.eq(LifecycleState::Empty.as_str()))
                    .filter(slots::start_time.ge(from.naive_utc()))
                    .filter(slots::start_time.le(to.naive_utc()))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn due_for_create_sqlite(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let from = UniversalTimestamp(from).to_rfc3339();
        let to = UniversalTimestamp(to).to_rfc3339();
        let rows: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::email.ne(""))
                    .filter(slots::lifecycle_state.eq(LifecycleState::Empty.as_str()))
                    .filter(slots::start_time.ge(from))
                    .filter(slots::start_time.le(to))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    /// Slots whose deployment was created and is awaiting readiness.
    pub async fn published(&self) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.published_postgres().await,
            BackendType::Sqlite => self.published_sqlite().await,
        }
    }

    async fn published_postgres(&self) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::lifecycle_state.eq(LifecycleState::Published.as_str()))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn published_sqlite(&self) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::lifecycle_state.eq(LifecycleState::Published.as_str()))
                    .order(slots::start_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    /// Slots in the pipeline (state set, not yet `Removed`) whose interval
    /// ended before `cutoff`.
    pub async fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<Slot>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.expired_postgres(cutoff).await,
            BackendType::Sqlite => self.expired_sqlite(cutoff).await,
        }
    }

    async fn expired_postgres(&self, cutoff: DateTime<Utc>) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::postgres_dal::models::PgSlot;
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::lifecycle_state.is_not_null())
                    .filter(slots::lifecycle_state.ne(LifecycleState::Removed.as_str()))
                    .filter(slots::end_time.lt(cutoff.naive_utc()))
                    .order(slots::end_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    async fn expired_sqlite(&self, cutoff: DateTime<Utc>) -> Result<Vec<Slot>, LedgerError> {
        use crate::dal::sqlite_dal::models::SqliteSlot;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let cutoff = UniversalTimestamp(cutoff).to_rfc3339();
        let rows: Vec<SqliteSlot> = conn
            .interact(move |conn| {
                slots::table
                    .filter(slots::lifecycle_state.is_not_null())
                    .filter(slots::lifecycle_state.ne(LifecycleState::Removed.as_str()))
                    .filter(slots::end_time.lt(cutoff))
                    .order(slots::end_time.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Slot::try_from).collect()
    }

    /// Records the provisioning outcome: `Empty -> Published | Excepted`.
    ///
    /// Returns `false` when the row was no longer in `Empty` (a concurrent
    /// sweep got there first); the row is left untouched in that case.
    pub async fn finish_create(
        &self,
        id: i32,
        to_state: LifecycleState,
    ) -> Result<bool, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.finish_create_postgres(id, to_state).await,
            BackendType::Sqlite => self.finish_create_sqlite(id, to_state).await,
        }
    }

    async fn finish_create_postgres(
        &self,
        id: i32,
        to_state: LifecycleState,
    ) -> Result<bool, LedgerError> {
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.eq(LifecycleState::Empty.as_str())),
                )
                .set(slots::lifecycle_state.eq(to_state.as_str()))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    async fn finish_create_sqlite(
        &self,
        id: i32,
        to_state: LifecycleState,
    ) -> Result<bool, LedgerError> {
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.eq(LifecycleState::Empty.as_str())),
                )
                .set(slots::lifecycle_state.eq(to_state.as_str()))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    /// Marks a published deployment running and enqueues its reminder mail in
    /// the same transaction.
    ///
    /// Returns `false` (and enqueues nothing) when the row was not in
    /// `Published`.
    pub async fn mark_running(&self, id: i32, reminder: NewMail) -> Result<bool, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.mark_running_postgres(id, reminder).await,
            BackendType::Sqlite => self.mark_running_sqlite(id, reminder).await,
        }
    }

    async fn mark_running_postgres(
        &self,
        id: i32,
        reminder: NewMail,
    ) -> Result<bool, LedgerError> {
        use crate::dal::postgres_dal::models::NewPgMail;
        use crate::database::schema::postgres::{mails, slots};

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let pg_mail = NewPgMail::from(&reminder);
        conn.interact(move |conn| {
            conn.transaction::<_, LedgerError, _>(|conn| {
                let updated = diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.eq(LifecycleState::Published.as_str())),
                )
                .set(slots::lifecycle_state.eq(LifecycleState::Running.as_str()))
                .execute(conn)?;

                if updated == 0 {
                    return Ok(false);
                }
                diesel::insert_into(mails::table)
                    .values(&pg_mail)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    async fn mark_running_sqlite(&self, id: i32, reminder: NewMail) -> Result<bool, LedgerError> {
        use crate::dal::sqlite_dal::models::NewSqliteMail;
        use crate::database::schema::sqlite::{mails, slots};

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let sqlite_mail = NewSqliteMail::from(&reminder);
        conn.interact(move |conn| {
            conn.transaction::<_, LedgerError, _>(|conn| {
                let updated = diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.eq(LifecycleState::Published.as_str())),
                )
                .set(slots::lifecycle_state.eq(LifecycleState::Running.as_str()))
                .execute(conn)?;

                if updated == 0 {
                    return Ok(false);
                }
                diesel::insert_into(mails::table)
                    .values(&sqlite_mail)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
        .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?
    }

    /// Marks a torn-down deployment `Removed` (terminal).
    ///
    /// Returns `false` when the row was already `Removed` or never entered
    /// the pipeline.
    pub async fn mark_removed(&self, id: i32) -> Result<bool, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.mark_removed_postgres(id).await,
            BackendType::Sqlite => self.mark_removed_sqlite(id).await,
        }
    }

    async fn mark_removed_postgres(&self, id: i32) -> Result<bool, LedgerError> {
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.is_not_null())
                        .filter(slots::lifecycle_state.ne(LifecycleState::Removed.as_str())),
                )
                .set(slots::lifecycle_state.eq(LifecycleState::Removed.as_str()))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    async fn mark_removed_sqlite(&self, id: i32) -> Result<bool, LedgerError> {
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    slots::table
                        .find(id)
                        .filter(slots::lifecycle_state.is_not_null())
                        .filter(slots::lifecycle_state.ne(LifecycleState::Removed.as_str())),
                )
                .set(slots::lifecycle_state.eq(LifecycleState::Removed.as_str()))
                .execute(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(updated == 1)
    }

    /// The latest start time in the ledger, `None` when it is empty.
    pub async fn latest_start_time(&self) -> Result<Option<UniversalTimestamp>, LedgerError> {
        match self.dal.backend() {
            BackendType::Postgres => self.latest_start_time_postgres().await,
            BackendType::Sqlite => self.latest_start_time_sqlite().await,
        }
    }

    async fn latest_start_time_postgres(&self) -> Result<Option<UniversalTimestamp>, LedgerError> {
        use crate::database::schema::postgres::slots;

        let conn = self
            .dal
            .database()
            .get_postgres_connection()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let latest: Option<chrono::NaiveDateTime> = conn
            .interact(move |conn| {
                slots::table
                    .select(diesel::dsl::max(slots::start_time))
                    .first(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        Ok(latest.map(UniversalTimestamp::from_naive))
    }

    async fn latest_start_time_sqlite(&self) -> Result<Option<UniversalTimestamp>, LedgerError> {
        use crate::dal::sqlite_dal::models::parse_timestamp;
        use crate::database::schema::sqlite::slots;

        let conn = self
            .dal
            .pool()
            .expect_sqlite()
            .get()
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))?;

        let latest: Option<String> = conn
            .interact(move |conn| {
                slots::table
                    .select(diesel::dsl::max(slots::start_time))
                    .first(conn)
            })
            .await
            .map_err(|e| LedgerError::ConnectionPool(e.to_string()))??;

        latest.map(parse_timestamp).transpose()
    }
}
