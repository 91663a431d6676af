use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, TimeZone, Utc};
use journal_core::{
    JournalConfig, JournalError, ManualClock, PlainJournal, RecordFilter, SqliteDatabase,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn open(db: &SqliteDatabase) -> (PlainJournal<'_, SqliteDatabase>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let config = JournalConfig::new("events", ["login", "logout", "note"]);
    let journal =
        PlainJournal::open_with(db, &config, clock.clone()).expect("open should succeed");
    (journal, clock)
}

#[test]
fn test_history_window_is_half_open() {
    let db = SqliteDatabase::open_in_memory().expect("db should open");
    let (journal, clock) = open(&db);

    for narrative in ["one", "two", "three"] {
        journal
            .record("alice", "note", narrative)
            .expect("record should succeed");
        clock.advance(Duration::hours(1));
    }

    let filter = RecordFilter::new()
        .since(start() + Duration::hours(1))
        .until(start() + Duration::hours(2));
    let entries = journal.records("alice", &filter).expect("query should succeed");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].narrative, "two");
}

#[test]
fn test_default_end_is_now() {
    let db = SqliteDatabase::open_in_memory().expect("db should open");
    let (journal, clock) = open(&db);

    journal.record("alice", "login", "").expect("record should succeed");

    // Recorded exactly at "now", so outside [.., now).
    let result = journal.records("alice", &RecordFilter::new());
    assert!(matches!(result, Err(JournalError::NoRecordsSelected)));

    clock.advance(Duration::seconds(1));
    let entries = journal
        .records("alice", &RecordFilter::new())
        .expect("query should succeed");
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_type_filter_and_limit() {
    let db = SqliteDatabase::open_in_memory().expect("db should open");
    let (journal, clock) = open(&db);

    journal.record("alice", "login", "web").expect("record");
    journal.record("alice", "note", "hello").expect("record");
    journal.record("alice", "login", "mobile").expect("record");
    journal.record("bob", "login", "web").expect("record");
    clock.advance(Duration::minutes(1));

    let logins = journal
        .records("alice", &RecordFilter::new().record_type("login"))
        .expect("query should succeed");
    let narratives: Vec<_> = logins.iter().map(|e| e.narrative.as_str()).collect();
    assert_eq!(narratives, vec!["web", "mobile"]);

    let first = journal
        .records("alice", &RecordFilter::new().limit(1))
        .expect("query should succeed");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].narrative, "web");

    let result = journal.records("alice", &RecordFilter::new().record_type("logout"));
    assert!(matches!(result, Err(JournalError::NoRecordsSelected)));
}

#[test]
fn test_unknown_type_in_filter() {
    let db = SqliteDatabase::open_in_memory().expect("db should open");
    let (journal, _clock) = open(&db);

    let result = journal.records("alice", &RecordFilter::new().record_type("bogus"));
    assert!(matches!(result, Err(JournalError::InvalidRecordType(_))));
}

#[test]
fn test_reopen_keeps_rows() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("events.sqlite");

    {
        let db = SqliteDatabase::open(&path).expect("db should open");
        let (journal, _clock) = open(&db);
        journal.record("alice", "note", "kept").expect("record");
    }

    let db = SqliteDatabase::open(&path).expect("db should reopen");
    let (journal, clock) = open(&db);
    clock.advance(Duration::seconds(1));
    let entries = journal
        .records("alice", &RecordFilter::new())
        .expect("query should succeed");
    assert_eq!(entries[0].narrative, "kept");
    assert_eq!(entries[0].recorded_at, start());
}

#[test]
fn test_recorded_at_reads_back_as_written() {
    let db = SqliteDatabase::open_in_memory().expect("db should open");
    let (journal, clock) = open(&db);
    let instant = start() + Duration::nanoseconds(123_456_789);
    clock.set(instant);

    journal.record("alice", "note", "precise").expect("record");
    clock.advance(Duration::seconds(1));

    let entries = journal
        .records("alice", &RecordFilter::new())
        .expect("query should succeed");
    assert_eq!(entries[0].recorded_at, instant.trunc_subsecs(6));

    // The window start at the written instant must still include the row.
    let since = journal
        .records("alice", &RecordFilter::new().since(entries[0].recorded_at))
        .expect("query should succeed");
    assert_eq!(since.len(), 1);
}
