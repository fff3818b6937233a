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

//! Reservation API
//!
//! The visitor-facing surface: list bookable slots and register for one.
//! Transport-agnostic; an HTTP layer maps [`ApiCode`] onto status codes
//! one-to-one. Request faults are codes, not errors — [`LedgerError`] is
//! reserved for infrastructure failures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::access::AccessCredentials;
use crate::dal::{BookOutcome, Booking, DAL};
use crate::error::LedgerError;
use crate::horizon::BookingHorizon;
use crate::models::slot::Locale;

/// Outcome codes for reservation requests, mirroring HTTP semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCode {
    Ok,
    BadRequest,
    NotFound,
    Conflict,
}

impl ApiCode {
    /// The HTTP status code this outcome maps to.
    pub fn as_u16(&self) -> u16 {
        match self {
            ApiCode::Ok => 200,
            ApiCode::BadRequest => 400,
            ApiCode::NotFound => 404,
            ApiCode::Conflict => 409,
        }
    }
}

/// A reservation request as submitted by the booking frontend.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub slot_id: i32,
    pub email: String,
    /// Lowercase frontend locale tag (`ru` / `en`)
    pub locale: String,
    pub organization: String,
}

/// One bookable slot as exposed to visitors. Credential and booker fields
/// never leave the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotListing {
    pub id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Visitor-facing reservation operations.
#[derive(Clone)]
pub struct ReservationApi {
    dal: DAL,
    base_domain: String,
}

impl ReservationApi {
    /// Creates the API over the given ledger and deployment base domain.
    pub fn new(dal: DAL, base_domain: impl Into<String>) -> Self {
        Self {
            dal,
            base_domain: base_domain.into(),
        }
    }

    /// Lists slots currently open for booking, ascending by start time.
    pub async fn list_slots(&self, now: DateTime<Utc>) -> Result<Vec<SlotListing>, LedgerError> {
        let horizon = BookingHorizon::at(now);
        let slots = self
            .dal
            .slot()
            .list_available(horizon.from, horizon.to)
            .await?;
        Ok(slots
            .into_iter()
            .map(|s| SlotListing {
                id: s.id,
                start_time: s.start_time.into_inner(),
                end_time: s.end_time.into_inner(),
            })
            .collect())
    }

    /// Attempts to reserve a slot for a visitor.
    ///
    /// Validation failures return `BadRequest` without touching the ledger;
    /// `NotFound` covers both missing ids and slots outside the booking
    /// horizon, so probing cannot distinguish the two.
    pub async fn register(
        &self,
        request: &RegisterRequest,
        now: DateTime<Utc>,
    ) -> Result<ApiCode, LedgerError> {
        let Some(locale) = Locale::from_tag(&request.locale) else {
            return Ok(ApiCode::BadRequest);
        };
        if request.email.is_empty() || !request.email.contains('@') {
            return Ok(ApiCode::BadRequest);
        }

        let booking = Booking {
            email: request.email.clone(),
            organization: request.organization.clone(),
            locale,
            credentials: AccessCredentials::generate(),
        };
        let horizon = BookingHorizon::at(now);
        match self
            .dal
            .slot()
            .book(request.slot_id, horizon, booking, now, &self.base_domain)
            .await?
        {
            BookOutcome::Booked(slot) => {
                info!(
                    "Slot {} booked for {} (namespace {})",
                    slot.id, slot.email, slot.namespace
                );
                Ok(ApiCode::Ok)
            }
            BookOutcome::Conflict => Ok(ApiCode::Conflict),
            BookOutcome::NotFound => Ok(ApiCode::NotFound),
        }
    }
}
