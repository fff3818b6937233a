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

//! Integration tests for the notification queue: dedup on enqueue, due-row
//! selection, and at-least-once draining.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use serial_test::serial;

use demoslot::dal::DAL;
use demoslot::database::universal_types::UniversalTimestamp;
use demoslot::mailer::{drain_once, DrainOutcome};
use demoslot::models::mail::{MailReason, NewMail};
use demoslot::models::slot::Locale;

use crate::fixtures::get_or_init_fixture;
use crate::stubs::StubMailer;

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

fn mail_at(time: DateTime<Utc>, email: &str, reason: MailReason) -> NewMail {
    NewMail {
        time_to_send: UniversalTimestamp(time),
        email: email.to_string(),
        reason,
        locale: Locale::En,
        data: json!({"namespace": "ab12cd34", "password": "s3cret"}),
    }
}

#[tokio::test]
#[serial]
async fn test_enqueue_drops_duplicate_keys() {
    let dal = clean_dal().await;
    let now = test_now();
    let mail = mail_at(now, "visitor@example.com", MailReason::Greeting);

    assert!(dal.mail().enqueue(mail.clone()).await.unwrap());
    assert!(!dal.mail().enqueue(mail).await.unwrap());

    // A different reason under the same key prefix is a distinct row.
    assert!(dal
        .mail()
        .enqueue(mail_at(now, "visitor@example.com", MailReason::Reminder))
        .await
        .unwrap());

    let rows = dal
        .mail()
        .list_for_recipient("visitor@example.com")
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_due_unsent_respects_cutoff_and_order() {
    let dal = clean_dal().await;
    let now = test_now();

    dal.mail()
        .enqueue(mail_at(now + Duration::minutes(10), "later@example.com", MailReason::Greeting))
        .await
        .unwrap();
    dal.mail()
        .enqueue(mail_at(now - Duration::minutes(10), "first@example.com", MailReason::Greeting))
        .await
        .unwrap();
    dal.mail()
        .enqueue(mail_at(now - Duration::minutes(5), "second@example.com", MailReason::Greeting))
        .await
        .unwrap();

    let due = dal.mail().due_unsent(now).await.unwrap();
    let emails: Vec<&str> = due.iter().map(|m| m.email.as_str()).collect();
    assert_eq!(emails, vec!["first@example.com", "second@example.com"]);
}

#[tokio::test]
#[serial]
async fn test_mark_sent_removes_from_due() {
    let dal = clean_dal().await;
    let now = test_now();
    let mail = mail_at(now, "visitor@example.com", MailReason::Greeting);
    dal.mail().enqueue(mail).await.unwrap();

    let due = dal.mail().due_unsent(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert!(dal.mail().mark_sent(&due[0].key()).await.unwrap());

    assert!(dal.mail().due_unsent(now).await.unwrap().is_empty());
    // The row survives as an audit record.
    let rows = dal
        .mail()
        .list_for_recipient("visitor@example.com")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].sent);
}

#[tokio::test]
#[serial]
async fn test_drain_once_delivers_and_marks() {
    let dal = clean_dal().await;
    let now = test_now();
    dal.mail()
        .enqueue(mail_at(now, "visitor@example.com", MailReason::Greeting))
        .await
        .unwrap();

    let mailer = StubMailer::new();
    let outcomes = drain_once(
        &dal,
        &mailer,
        "demo.example.com",
        StdDuration::from_secs(5),
        now,
    )
    .await
    .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1, DrainOutcome::Sent);
    assert_eq!(mailer.sent_count(), 1);
    assert!(dal.mail().due_unsent(now).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_drain_failure_leaves_row_for_retry() {
    let dal = clean_dal().await;
    let now = test_now();
    dal.mail()
        .enqueue(mail_at(now, "visitor@example.com", MailReason::Greeting))
        .await
        .unwrap();

    let mailer = StubMailer::new();
    mailer.set_fail(true);
    let outcomes = drain_once(
        &dal,
        &mailer,
        "demo.example.com",
        StdDuration::from_secs(5),
        now,
    )
    .await
    .unwrap();
    assert!(matches!(outcomes[0].1, DrainOutcome::Failed(_)));
    assert_eq!(dal.mail().due_unsent(now).await.unwrap().len(), 1);

    // Next pass succeeds and drains it.
    mailer.set_fail(false);
    let outcomes = drain_once(
        &dal,
        &mailer,
        "demo.example.com",
        StdDuration::from_secs(5),
        now,
    )
    .await
    .unwrap();
    assert_eq!(outcomes[0].1, DrainOutcome::Sent);
    assert!(dal.mail().due_unsent(now).await.unwrap().is_empty());
}
