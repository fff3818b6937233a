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

//! Integration tests for the administrative ledger operations.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serial_test::serial;

use demoslot::access::AccessCredentials;
use demoslot::dal::{AdminOutcome, BookOutcome, Booking, DAL};
use demoslot::database::universal_types::UniversalTimestamp;
use demoslot::horizon::BookingHorizon;
use demoslot::models::slot::{LifecycleState, Locale, NewSlot};

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

async fn seed_slot(dal: &DAL, start: DateTime<Utc>, enabled: bool) -> i32 {
    dal.slot()
        .create_slots(vec![NewSlot {
            start_time: UniversalTimestamp(start),
            end_time: UniversalTimestamp(start + Duration::hours(2)),
            enabled,
        }])
        .await
        .expect("Failed to seed slot")
        .remove(0)
        .id
}

async fn book_slot(dal: &DAL, id: i32, now: DateTime<Utc>) {
    let outcome = dal
        .slot()
        .book(
            id,
            BookingHorizon::at(now),
            Booking {
                email: "visitor@example.com".to_string(),
                organization: "ACME".to_string(),
                locale: Locale::En,
                credentials: AccessCredentials::generate(),
            },
            now,
            "demo.example.com",
        )
        .await
        .unwrap();
    assert!(matches!(outcome, BookOutcome::Booked(_)));
}

#[tokio::test]
#[serial]
async fn test_close_and_reopen() {
    let dal = clean_dal().await;
    let now = test_now();
    let id = seed_slot(&dal, now + Duration::hours(2), true).await;

    let closed = dal.slot().close_slots(&[id]).await.unwrap();
    assert_eq!(closed, vec![(id, AdminOutcome::Applied)]);
    assert!(!dal.slot().get(id).await.unwrap().unwrap().enabled);

    // Closing again is refused, reopening works.
    let closed_again = dal.slot().close_slots(&[id]).await.unwrap();
    assert!(matches!(closed_again[0].1, AdminOutcome::Refused(_)));

    let opened = dal.slot().open_slots(&[id]).await.unwrap();
    assert_eq!(opened, vec![(id, AdminOutcome::Applied)]);
    assert!(dal.slot().get(id).await.unwrap().unwrap().enabled);
}

#[tokio::test]
#[serial]
async fn test_open_refuses_booked_slot() {
    let dal = clean_dal().await;
    let now = test_now();
    let id = seed_slot(&dal, now + Duration::hours(2), true).await;
    book_slot(&dal, id, now).await;

    let outcomes = dal.slot().open_slots(&[id]).await.unwrap();
    assert!(matches!(outcomes[0].1, AdminOutcome::Refused(_)));
    // Still booked.
    assert_eq!(
        dal.slot().get(id).await.unwrap().unwrap().email,
        "visitor@example.com"
    );
}

#[tokio::test]
#[serial]
async fn test_clear_resets_booking_fields() {
    let dal = clean_dal().await;
    let now = test_now();
    let id = seed_slot(&dal, now + Duration::hours(2), true).await;
    book_slot(&dal, id, now).await;

    let outcomes = dal.slot().clear_slots(&[id]).await.unwrap();
    assert_eq!(outcomes, vec![(id, AdminOutcome::Applied)]);

    let slot = dal.slot().get(id).await.unwrap().unwrap();
    assert!(slot.email.is_empty());
    assert!(slot.organization.is_empty());
    assert!(slot.namespace.is_empty());
    assert!(slot.password.is_empty());
    assert_eq!(slot.lifecycle_state, None);
    assert_eq!(slot.locale, None);
    assert!(!slot.enabled);
}

#[tokio::test]
#[serial]
async fn test_clear_refuses_live_deployment() {
    let dal = clean_dal().await;
    let now = test_now();
    let id = seed_slot(&dal, now + Duration::hours(2), true).await;
    book_slot(&dal, id, now).await;
    assert!(dal
        .slot()
        .finish_create(id, LifecycleState::Published)
        .await
        .unwrap());

    let outcomes = dal.slot().clear_slots(&[id]).await.unwrap();
    assert!(matches!(outcomes[0].1, AdminOutcome::Refused(_)));
    // Booking untouched.
    let slot = dal.slot().get(id).await.unwrap().unwrap();
    assert_eq!(slot.lifecycle_state, Some(LifecycleState::Published));
    assert_eq!(slot.email, "visitor@example.com");
}

#[tokio::test]
#[serial]
async fn test_remove_deletes_and_reports_missing() {
    let dal = clean_dal().await;
    let now = test_now();
    let id = seed_slot(&dal, now + Duration::hours(2), true).await;

    let outcomes = dal.slot().remove_slots(&[id, 999]).await.unwrap();
    assert_eq!(
        outcomes,
        vec![(id, AdminOutcome::Applied), (999, AdminOutcome::NotFound)]
    );
    assert!(dal.slot().get(id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_bad_id_does_not_poison_batch() {
    let dal = clean_dal().await;
    let now = test_now();
    let a = seed_slot(&dal, now + Duration::hours(2), true).await;
    let b = seed_slot(&dal, now + Duration::hours(3), true).await;

    let outcomes = dal.slot().close_slots(&[a, 999, b]).await.unwrap();
    assert_eq!(
        outcomes,
        vec![
            (a, AdminOutcome::Applied),
            (999, AdminOutcome::NotFound),
            (b, AdminOutcome::Applied),
        ]
    );
}

#[tokio::test]
#[serial]
async fn test_list_window_bounds() {
    let dal = clean_dal().await;
    let now = test_now();
    let early = seed_slot(&dal, now - Duration::hours(4), true).await;
    let mid = seed_slot(&dal, now + Duration::hours(1), true).await;
    let late = seed_slot(&dal, now + Duration::hours(6), true).await;

    let all = dal.slot().list_window(None, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let upcoming = dal
        .slot()
        .list_window(Some(now + Duration::hours(3)), Some(now))
        .await
        .unwrap();
    let ids: Vec<i32> = upcoming.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![mid]);
    assert!(!ids.contains(&early));
    assert!(!ids.contains(&late));
}
