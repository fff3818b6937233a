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

//! Booking horizon computation.
//!
//! The horizon bounds which slots visitors may see and book: far enough out
//! that provisioning has time to finish before the demo starts, and near
//! enough that the pre-generated ledger is guaranteed to cover it.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// Minimum lead time between booking and the slot's start.
pub const BOOKING_LEAD_MINUTES: i64 = 15;

/// Width of the bookable window, truncated to the final day's midnight.
pub const BOOKING_WINDOW_DAYS: i64 = 4;

/// The half-open interval `[from, to)` of bookable slot start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingHorizon {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl BookingHorizon {
    /// Computes the horizon anchored at the given instant.
    ///
    /// The lower bound is `now` plus the booking lead; the upper bound is
    /// four days past the lower bound, truncated down to UTC midnight so the
    /// last bookable day is never offered partially.
    pub fn at(now: DateTime<Utc>) -> Self {
        let from = now + Duration::minutes(BOOKING_LEAD_MINUTES);
        let to_date = (from + Duration::days(BOOKING_WINDOW_DAYS)).date_naive();
        let to = Utc.from_utc_datetime(&to_date.and_time(NaiveTime::MIN));
        Self { from, to }
    }

    /// Whether a slot starting at `t` falls inside the horizon.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from <= t && t < self.to
    }
}
