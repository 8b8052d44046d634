//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use rollcall_core::{AttendanceLedger, Embedding, IdentityStore, NewIdentity};

use crate::SqliteStore;

async fn store() -> SqliteStore {
    SqliteStore::open_in_memory(utc())
        .await
        .expect("in-memory store")
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn person(name: &str, email: &str, values: &[f32]) -> NewIdentity {
    NewIdentity {
        name: name.into(),
        email: email.into(),
        embedding: Embedding { values: values.to_vec() },
    }
}

#[tokio::test]
async fn test_upsert_and_find_roundtrip() {
    let s = store().await;

    let alice = s
        .upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.25]))
        .await
        .unwrap();

    let fetched = s.find_identity(alice.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, alice.id);
    assert_eq!(fetched.name, "Alice");
    assert_eq!(fetched.email, "a@x.com");
    assert_eq!(fetched.embedding.values, vec![1.0, 0.0, 0.25]);
    assert_eq!(fetched.registered_at, alice.registered_at);
}

#[tokio::test]
async fn test_find_missing_returns_none() {
    let s = store().await;
    let result = s.find_identity(Uuid::new_v4()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_upsert_same_email_updates_in_place() {
    let s = store().await;

    let alice = s
        .upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();
    s.upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let updated = s
        .upsert_identity(person("Alice B", "a@x.com", &[1.0, 0.0, 0.1]))
        .await
        .unwrap();

    assert_eq!(updated.id, alice.id);
    assert_eq!(updated.name, "Alice B");
    assert_eq!(updated.embedding.values, vec![1.0, 0.0, 0.1]);

    // Still two rows, and the re-registered identity kept its position.
    let all = s.list_identities().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, alice.id);
    assert_eq!(all[0].name, "Alice B");
    assert_eq!(all[1].name, "Bob");
}

#[tokio::test]
async fn test_upsert_distinct_emails_distinct_rows() {
    let s = store().await;

    let a = s
        .upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();
    let b = s
        .upsert_identity(person("Alice", "alice@other.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(s.list_identities().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_mark_creates_event() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let event = s.mark(&bob, ts("2024-01-01T09:00:00Z")).await.unwrap();

    assert_eq!(event.identity_id, bob.id);
    assert_eq!(event.display_name, "Bob");
    assert_eq!(event.marked_at, ts("2024-01-01T09:00:00Z"));
    assert_eq!(event.calendar_date, date("2024-01-01"));
}

#[tokio::test]
async fn test_mark_same_day_returns_existing() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let first = s.mark(&bob, ts("2024-01-01T09:00:00Z")).await.unwrap();
    let second = s.mark(&bob, ts("2024-01-01T17:00:00Z")).await.unwrap();

    // The morning event survives untouched.
    assert_eq!(second.id, first.id);
    assert_eq!(second.marked_at, ts("2024-01-01T09:00:00Z"));
    assert_eq!(s.all_events().await.unwrap().len(), 1);

    let status = s.status(bob.id, ts("2024-01-01T18:00:00Z")).await.unwrap();
    assert!(status.marked_today);
}

#[tokio::test]
async fn test_mark_distinct_days_distinct_events() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let day1 = s.mark(&bob, ts("2024-01-01T09:00:00Z")).await.unwrap();
    let day2 = s.mark(&bob, ts("2024-01-02T09:00:00Z")).await.unwrap();

    assert_ne!(day1.id, day2.id);
    assert_ne!(day1.calendar_date, day2.calendar_date);
    assert_eq!(s.all_events().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_unmarked_identity() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let status = s.status(bob.id, ts("2024-01-01T09:00:00Z")).await.unwrap();
    assert!(!status.marked_today);
    assert!(status.last_marked.is_none());
}

#[tokio::test]
async fn test_status_last_marked_is_most_recent() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    s.mark(&bob, ts("2024-01-01T09:00:00Z")).await.unwrap();
    s.mark(&bob, ts("2024-01-02T08:30:00Z")).await.unwrap();

    let on_day2 = s.status(bob.id, ts("2024-01-02T12:00:00Z")).await.unwrap();
    assert!(on_day2.marked_today);
    assert_eq!(on_day2.last_marked, Some(ts("2024-01-02T08:30:00Z")));

    // A later, unmarked day: not marked today, last mark unchanged.
    let on_day3 = s.status(bob.id, ts("2024-01-03T12:00:00Z")).await.unwrap();
    assert!(!on_day3.marked_today);
    assert_eq!(on_day3.last_marked, Some(ts("2024-01-02T08:30:00Z")));
}

#[tokio::test]
async fn test_all_events_newest_first() {
    let s = store().await;
    let carol = s
        .upsert_identity(person("Carol", "c@x.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();
    let alice = s
        .upsert_identity(person("Alice", "a@x.com", &[0.0, 0.0, 1.0]))
        .await
        .unwrap();

    // Insertion order deliberately disagrees with timestamp order.
    s.mark(&carol, ts("2024-01-01T10:00:00Z")).await.unwrap();
    s.mark(&bob, ts("2024-01-01T08:00:00Z")).await.unwrap();
    s.mark(&alice, ts("2024-01-01T14:00:00Z")).await.unwrap();

    let events = s.all_events().await.unwrap();
    let names: Vec<_> = events.iter().map(|e| e.display_name.as_str()).collect();
    assert_eq!(names, ["Alice", "Carol", "Bob"]);
    assert!(events[0].marked_at > events[1].marked_at);
    assert!(events[1].marked_at > events[2].marked_at);
}

#[tokio::test]
async fn test_day_boundary_uses_configured_offset() {
    let offset = FixedOffset::east_opt(3600).unwrap();
    let s = SqliteStore::open_in_memory(offset).await.unwrap();
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    // 23:30 UTC is already past midnight at +01:00.
    let late = s.mark(&bob, ts("2024-01-01T23:30:00Z")).await.unwrap();
    assert_eq!(late.calendar_date, date("2024-01-02"));

    // Next morning UTC falls on the same local date, so no new event.
    let morning = s.mark(&bob, ts("2024-01-02T10:00:00Z")).await.unwrap();
    assert_eq!(morning.id, late.id);
    assert_eq!(s.all_events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeat_mark_keeps_original_display_name() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    s.mark(&bob, ts("2024-01-01T09:00:00Z")).await.unwrap();

    let renamed = s
        .upsert_identity(person("Robert", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();
    let repeat = s.mark(&renamed, ts("2024-01-01T15:00:00Z")).await.unwrap();

    assert_eq!(repeat.display_name, "Bob");
}

#[tokio::test]
async fn test_same_day_marks_for_different_identities() {
    let s = store().await;
    let alice = s
        .upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    s.mark(&alice, ts("2024-01-01T09:00:00Z")).await.unwrap();
    s.mark(&bob, ts("2024-01-01T09:05:00Z")).await.unwrap();

    assert_eq!(s.all_events().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_clones_share_the_database() {
    let s = store().await;
    let writer = s.clone();

    writer
        .upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.0]))
        .await
        .unwrap();

    assert_eq!(s.list_identities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_same_day_marks_return_one_event() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let morning = ts("2024-01-01T09:00:00Z");
    let evening = ts("2024-01-01T17:00:00Z");
    let (first, second) = tokio::join!(s.mark(&bob, morning), s.mark(&bob, evening));
    let first = first.unwrap();
    let second = second.unwrap();

    // Whichever insert reaches the connection first wins; both callers
    // read back that one surviving row.
    assert_eq!(first.id, second.id);
    assert_eq!(first.marked_at, second.marked_at);
    assert!(first.marked_at == morning || first.marked_at == evening);
    assert_eq!(s.all_events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_marks_from_cloned_handles() {
    let s = store().await;
    let bob = s
        .upsert_identity(person("Bob", "b@x.com", &[0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let early = {
        let s = s.clone();
        let bob = bob.clone();
        tokio::spawn(async move { s.mark(&bob, ts("2024-01-01T09:00:00Z")).await })
    };
    let late = {
        let s = s.clone();
        let bob = bob.clone();
        tokio::spawn(async move { s.mark(&bob, ts("2024-01-01T17:00:00Z")).await })
    };

    let first = early.await.unwrap().unwrap();
    let second = late.await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(s.all_events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_same_email_registers_keep_one_row() {
    let s = store().await;

    let (a, b) = tokio::join!(
        s.upsert_identity(person("Alice", "a@x.com", &[1.0, 0.0, 0.0])),
        s.upsert_identity(person("Alice B", "a@x.com", &[1.0, 0.0, 0.1])),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    // The unique email turns the losing insert into an update, so both
    // calls resolve to the same identity.
    assert_eq!(a.id, b.id);

    let all = s.list_identities().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, a.id);
    assert_eq!(all[0].email, "a@x.com");
}
