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

//! Error types for ledger and queue operations.
//!
//! `LedgerError` is the only error type that crosses the DAL boundary.
//! Booking races and horizon misses are modeled as data
//! ([`crate::dal::BookOutcome`]), not errors: losing a race is an expected
//! outcome, a broken pool connection is not.

use thiserror::Error;

/// Faults raised by ledger and notification-queue operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to obtain a connection from the pool, or the pool worker died.
    #[error("Database connection pool error: {0}")]
    ConnectionPool(String),

    /// An underlying Diesel operation failed.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// A stored enum column holds a value no domain variant maps to.
    #[error("Invalid {column} value '{value}' in {table} row")]
    InvalidEnumValue {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    /// A stored SQLite timestamp is not valid RFC3339.
    #[error("Invalid stored timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A stored mail payload is not valid JSON.
    #[error("Invalid mail payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
