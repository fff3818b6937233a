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

//! Integration tests for the booking transaction: exclusivity, horizon
//! enforcement, and the atomically enqueued greeting notification.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serial_test::serial;

use demoslot::access::AccessCredentials;
use demoslot::dal::{BookOutcome, Booking, DAL};
use demoslot::database::universal_types::UniversalTimestamp;
use demoslot::horizon::BookingHorizon;
use demoslot::models::mail::MailReason;
use demoslot::models::slot::{LifecycleState, Locale, NewSlot, Slot};

use crate::fixtures::get_or_init_fixture;

async fn clean_dal() -> DAL {
    let fixture = get_or_init_fixture().await;
    let mut fixture = fixture.lock().unwrap_or_else(|e| e.into_inner());
    fixture.initialize().await;
    fixture.reset_database().await;
    fixture.get_dal()
}

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

async fn seed_slot(dal: &DAL, start: DateTime<Utc>, enabled: bool) -> Slot {
    dal.slot()
        .create_slots(vec![NewSlot {
            start_time: UniversalTimestamp(start),
            end_time: UniversalTimestamp(start + Duration::hours(2)),
            enabled,
        }])
        .await
        .expect("Failed to seed slot")
        .remove(0)
}

fn booking_for(email: &str, locale: Locale) -> Booking {
    Booking {
        email: email.to_string(),
        organization: "ACME".to_string(),
        locale,
        credentials: AccessCredentials::generate(),
    }
}

#[tokio::test]
#[serial]
async fn test_book_claims_slot_and_enqueues_greeting() {
    let dal = clean_dal().await;
    let now = test_now();
    let slot = seed_slot(&dal, now + Duration::hours(2), true).await;

    let outcome = dal
        .slot()
        .book(
            slot.id,
            BookingHorizon::at(now),
            booking_for("visitor@example.com", Locale::Ru),
            now,
            "demo.example.com",
        )
        .await
        .expect("Booking failed");

    let BookOutcome::Booked(booked) = outcome else {
        panic!("Expected Booked, got {:?}", outcome);
    };
    assert!(!booked.enabled);
    assert_eq!(booked.email, "visitor@example.com");
    assert_eq!(booked.organization, "ACME");
    assert_eq!(booked.namespace.len(), 8);
    assert_eq!(booked.password.len(), 32);
    assert_eq!(booked.lifecycle_state, Some(LifecycleState::Empty));
    assert_eq!(booked.locale, Some(Locale::Ru));

    let due = dal.mail().due_unsent(now).await.expect("Queue query failed");
    assert_eq!(due.len(), 1);
    let greeting = &due[0];
    assert_eq!(greeting.email, "visitor@example.com");
    assert_eq!(greeting.reason, MailReason::Greeting);
    assert_eq!(greeting.locale, Locale::Ru);
    assert_eq!(greeting.data["namespace"], booked.namespace.as_str());
    assert_eq!(
        greeting.data["url"],
        format!("https://notebook-{}.demo.example.com", booked.namespace)
    );
}

#[tokio::test]
#[serial]
async fn test_second_booking_conflicts() {
    let dal = clean_dal().await;
    let now = test_now();
    let slot = seed_slot(&dal, now + Duration::hours(2), true).await;
    let horizon = BookingHorizon::at(now);

    let first = dal
        .slot()
        .book(
            slot.id,
            horizon,
            booking_for("first@example.com", Locale::En),
            now,
            "demo.example.com",
        )
        .await
        .unwrap();
    assert!(matches!(first, BookOutcome::Booked(_)));

    let second = dal
        .slot()
        .book(
            slot.id,
            horizon,
            booking_for("second@example.com", Locale::En),
            now,
            "demo.example.com",
        )
        .await
        .unwrap();
    assert_eq!(second, BookOutcome::Conflict);

    // The loser left no trace: slot still belongs to the winner and only
    // the winner's greeting is queued.
    let current = dal.slot().get(slot.id).await.unwrap().unwrap();
    assert_eq!(current.email, "first@example.com");
    let due = dal.mail().due_unsent(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].email, "first@example.com");
}

#[tokio::test]
#[serial]
async fn test_simultaneous_bookings_exactly_one_wins() {
    let dal = clean_dal().await;
    let now = test_now();
    let slot = seed_slot(&dal, now + Duration::hours(2), true).await;
    let horizon = BookingHorizon::at(now);

    // Both requests race for the same row; the row lock (PostgreSQL) or the
    // serialized write path (SQLite) decides, and the loser must observe the
    // committed claim, not a stale read.
    let slot_dal_first = dal.slot();
    let slot_dal_second = dal.slot();
    let (first, second) = tokio::join!(
        slot_dal_first.book(
            slot.id,
            horizon,
            booking_for("first@example.com", Locale::En),
            now,
            "demo.example.com",
        ),
        slot_dal_second.book(
            slot.id,
            horizon,
            booking_for("second@example.com", Locale::En),
            now,
            "demo.example.com",
        ),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let booked: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, BookOutcome::Booked(_)))
        .collect();
    assert_eq!(booked.len(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, BookOutcome::Conflict))
            .count(),
        1
    );

    // The ledger holds exactly the winner's claim and greeting.
    let BookOutcome::Booked(winner) = booked[0] else {
        unreachable!();
    };
    let current = dal.slot().get(slot.id).await.unwrap().unwrap();
    assert_eq!(current.email, winner.email);
    let due = dal.mail().due_unsent(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].email, winner.email);
}

#[tokio::test]
#[serial]
async fn test_book_unknown_slot_is_not_found() {
    let dal = clean_dal().await;
    let now = test_now();

    let outcome = dal
        .slot()
        .book(
            4242,
            BookingHorizon::at(now),
            booking_for("visitor@example.com", Locale::En),
            now,
            "demo.example.com",
        )
        .await
        .unwrap();
    assert_eq!(outcome, BookOutcome::NotFound);
}

#[tokio::test]
#[serial]
async fn test_book_outside_horizon_is_not_found() {
    let dal = clean_dal().await;
    let now = test_now();
    // Starts in 5 minutes, inside the 15-minute lead window.
    let too_soon = seed_slot(&dal, now + Duration::minutes(5), true).await;
    // Starts well past the 4-day horizon.
    let too_late = seed_slot(&dal, now + Duration::days(10), true).await;
    let horizon = BookingHorizon::at(now);

    for slot in [&too_soon, &too_late] {
        let outcome = dal
            .slot()
            .book(
                slot.id,
                horizon,
                booking_for("visitor@example.com", Locale::En),
                now,
                "demo.example.com",
            )
            .await
            .unwrap();
        assert_eq!(outcome, BookOutcome::NotFound);
    }

    // Neither row was touched.
    assert!(dal.slot().get(too_soon.id).await.unwrap().unwrap().email.is_empty());
    assert!(dal.mail().due_unsent(now).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_book_disabled_slot_conflicts() {
    let dal = clean_dal().await;
    let now = test_now();
    let slot = seed_slot(&dal, now + Duration::hours(2), false).await;

    let outcome = dal
        .slot()
        .book(
            slot.id,
            BookingHorizon::at(now),
            booking_for("visitor@example.com", Locale::En),
            now,
            "demo.example.com",
        )
        .await
        .unwrap();
    assert_eq!(outcome, BookOutcome::Conflict);
}
