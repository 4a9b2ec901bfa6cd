use std::time::{Duration, SystemTime};

use assert_matches::assert_matches;
use chrono::{Duration as ChronoDuration, Local};

use keyrace::account::{Account, AccountContext, FileAccountStore};
use keyrace::history::{RaceDb, TimeRange};
use keyrace::race::{RaceRecord, RaceSink};
use keyrace::session::TypingSession;
use keyrace::Error;

fn account(name: &str) -> Account {
    Account {
        username: name.to_string(),
        email: Some(format!("{name}@example.com")),
    }
}

fn race(wpm: u32, days_ago: i64) -> RaceRecord {
    RaceRecord {
        timestamp: Local::now() - ChronoDuration::days(days_ago),
        wpm,
        accuracy: 100,
        duration_seconds: 12.5,
        quote_text: "a quote, with a comma".to_string(),
        mistaked_key_labels: vec!["A".to_string(), ",".to_string()],
    }
}

// Finishes `target` with one word per second.
fn finished_record(target: &str) -> RaceRecord {
    let start = SystemTime::now();
    let mut session = TypingSession::with_target(target);
    let words: Vec<&str> = target.split(' ').collect();
    let mut record = None;
    for (i, word) in words.iter().enumerate() {
        let at = start + Duration::from_secs(i as u64 + 1);
        let field = if i + 1 < words.len() {
            format!("{word} ")
        } else {
            word.to_string()
        };
        record = session.on_input_at(&field, at);
    }
    record.unwrap()
}

#[test]
fn on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("races.db");

    {
        let mut db = RaceDb::open(&path).unwrap();
        db.register_user(&account("ada"), "secret").unwrap();
        db.submit_race("ada", &finished_record("one two three")).unwrap();
    }

    let db = RaceDb::open(&path).unwrap();
    let history = db.race_history("ada", Some((1, 10))).unwrap();
    assert_eq!(history.total_count, 1);
    assert_eq!(history.items[0].record.quote_text, "one two three");
    assert_eq!(history.items[0].record.accuracy, 100);
}

#[test]
fn leaderboard_spans_users_and_pages() {
    let mut db = RaceDb::open_in_memory().unwrap();
    for name in ["ada", "bob", "cy"] {
        db.register_user(&account(name), "secret").unwrap();
    }
    db.submit_race("ada", &race(40, 0)).unwrap();
    db.submit_race("bob", &race(90, 1)).unwrap();
    db.submit_race("cy", &race(65, 2)).unwrap();
    db.submit_race("ada", &race(70, 3)).unwrap();

    let first = db.leaderboard(1, 3).unwrap();
    assert_eq!(first.total_count, 4);
    assert_eq!(first.total_pages(), 2);
    let ranked: Vec<(&str, u32)> = first
        .items
        .iter()
        .map(|e| (e.username.as_str(), e.wpm))
        .collect();
    assert_eq!(ranked, vec![("bob", 90), ("ada", 70), ("cy", 65)]);

    let second = db.leaderboard(2, 3).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].wpm, 40);
    assert!(!second.has_next());
}

#[test]
fn history_ranges_and_summary() {
    let mut db = RaceDb::open_in_memory().unwrap();
    db.register_user(&account("ada"), "secret").unwrap();
    for (wpm, days_ago) in [(50, 0), (60, 3), (70, 20), (80, 200)] {
        db.submit_race("ada", &race(wpm, days_ago)).unwrap();
    }

    let now = Local::now();
    let count = |range| db.races_in_range("ada", range, now).unwrap().len();
    assert_eq!(count(TimeRange::Day), 1);
    assert_eq!(count(TimeRange::SevenDays), 2);
    assert_eq!(count(TimeRange::Month), 3);
    assert_eq!(count(TimeRange::Year), 4);
    assert_eq!(count(TimeRange::All), 4);

    let summary = db.profile_summary("ada").unwrap();
    assert_eq!(summary.races, 4);
    assert_eq!(summary.best_wpm, 80);
    assert!((summary.mean_wpm - 65.0).abs() < 1e-9);
}

#[test]
fn csv_export_writes_every_race() {
    let mut db = RaceDb::open_in_memory().unwrap();
    db.register_user(&account("ada"), "secret").unwrap();
    db.submit_race("ada", &race(50, 0)).unwrap();
    db.submit_race("ada", &race(55, 1)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.csv");
    let rows = db
        .export_history_csv("ada", std::fs::File::create(&path).unwrap())
        .unwrap();
    assert_eq!(rows, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("id,timestamp,wpm"));
    assert_eq!(lines.count(), 2);
    assert!(text.contains("\"a quote, with a comma\""));
}

#[test]
fn account_context_persists_login() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("account.json");
    let db = RaceDb::open_in_memory().unwrap();

    let mut ctx = AccountContext::new(FileAccountStore::with_path(&store_path));
    assert_matches!(ctx.login(&db, "ghost", "pw"), Err(Error::UnknownUser(_)));
    ctx.register(&db, account("ada"), "pw").unwrap();
    assert_matches!(
        ctx.register(&db, account("ada"), "other"),
        Err(Error::UserExists(name)) if name == "ada"
    );
    assert_matches!(
        ctx.login(&db, "ada", "other"),
        Err(Error::InvalidCredentials(name)) if name == "ada"
    );
    assert_eq!(ctx.username(), Some("ada"));

    let mut reloaded = AccountContext::new(FileAccountStore::with_path(&store_path));
    assert_eq!(
        reloaded.load().unwrap().map(|a| a.username.clone()),
        Some("ada".to_string())
    );
    reloaded.clear().unwrap();
    assert!(!reloaded.is_authenticated());
    assert!(!store_path.exists());

    let mut fresh = AccountContext::new(FileAccountStore::with_path(&store_path));
    assert!(fresh.load().unwrap().is_none());
}
