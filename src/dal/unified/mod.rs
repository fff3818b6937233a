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

//! Unified Data Access Layer with runtime backend selection
//!
//! Each DAL operation dispatches to the appropriate backend-specific
//! implementation based on the connection type the pool was created with.
//!
//! # Example
//!
//! ```rust,ignore
//! use demoslot::dal::DAL;
//! use demoslot::database::Database;
//!
//! let db = Database::new("postgres://localhost/demoslot", "demoslot", 10);
//! let dal = DAL::new(db);
//!
//! let available = dal.slot().list_available(from, to).await?;
//! ```

use crate::database::{AnyPool, BackendType, Database};

pub mod mail;
pub mod slot;

pub use mail::MailDAL;
pub use slot::SlotDAL;

/// The unified Data Access Layer struct.
///
/// Provides access to ledger and notification-queue operations through a
/// single interface that works with both PostgreSQL and SQLite backends.
///
/// # Thread Safety
///
/// `DAL` is `Clone` and can be safely shared between threads. Each clone
/// references the same underlying connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new unified DAL instance.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns the backend type for this DAL instance.
    pub fn backend(&self) -> BackendType {
        self.database.backend()
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.database.pool()
    }

    /// Returns a slot DAL for reservation ledger operations.
    pub fn slot(&self) -> SlotDAL {
        SlotDAL::new(self)
    }

    /// Returns a mail DAL for notification queue operations.
    pub fn mail(&self) -> MailDAL {
        MailDAL::new(self)
    }
}
