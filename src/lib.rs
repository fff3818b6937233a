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

//! # Demoslot
//!
//! A slot-reservation system for self-service demo clusters. Visitors pick a
//! pre-generated time slot, the ledger claims it exactly once, and a periodic
//! sweep drives the backing deployment through its lifecycle: provision
//! before the demo starts, notify when it is reachable, tear down after it
//! ends.
//!
//! ## Architecture
//!
//! - [`database`] — connection pooling with runtime backend selection
//!   (PostgreSQL or SQLite) and embedded migrations
//! - [`dal`] — ledger and notification-queue operations; all exclusivity and
//!   state-transition guarantees live here
//! - [`api`] — the visitor-facing reservation surface
//! - [`driver`] — the sweep loop body moving bookings through
//!   `Empty -> Published -> Running -> Removed`
//! - [`provisioner`] / [`mailer`] — capability traits for the cluster
//!   infrastructure and the mail transport
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use demoslot::{Database, DAL, DriverConfig, LifecycleDriver, ReservationApi};
//!
//! let database = Database::new("postgres://localhost/demoslot", "demoslot", 10);
//! database.run_migrations().await?;
//! let dal = DAL::new(database);
//!
//! let api = ReservationApi::new(dal.clone(), "demo.example.com");
//! let driver = LifecycleDriver::new(
//!     dal,
//!     Arc::new(my_provisioner),
//!     DriverConfig::with_base_domain("demo.example.com"),
//! );
//!
//! // from the scheduler loop:
//! let report = driver.run_sweep(chrono::Utc::now()).await?;
//! ```

pub mod access;
pub mod api;
pub mod config;
pub mod dal;
pub mod database;
pub mod driver;
pub mod error;
pub mod horizon;
pub mod mailer;
pub mod models;
pub mod provisioner;

pub use access::AccessCredentials;
pub use api::{ApiCode, RegisterRequest, ReservationApi, SlotListing};
pub use config::DriverConfig;
pub use dal::{AdminOutcome, BookOutcome, Booking, DAL};
pub use database::{Database, UniversalTimestamp};
pub use driver::{CheckOutcome, CreateOutcome, LifecycleDriver, RemoveOutcome, SweepReport};
pub use error::LedgerError;
pub use horizon::BookingHorizon;
pub use mailer::{drain_once, DrainOutcome, Mailer, MailerError, MailSpec};
pub use models::{LifecycleState, Locale, Mail, MailKey, MailReason, NewMail, NewSlot, Slot};
pub use provisioner::{DeployParams, Health, Provisioner, ProvisionerError};

/// Initializes structured logging from the `RUST_LOG` environment filter.
///
/// Call once at process start; repeated calls are ignored.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
