use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::error::{Error, Result};
use crate::pagination::{self, Page};
use crate::race::{RaceRecord, RaceSink};
use crate::util::{mean, std_dev};

/// A race as stored for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRace {
    pub id: i64,
    pub username: String,
    pub record: RaceRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub username: String,
    pub wpm: u32,
    pub accuracy: u32,
    pub timestamp: DateTime<Local>,
}

/// Window of history shown on the profile graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    #[strum(to_string = "all time")]
    All,
    #[default]
    #[strum(to_string = "today")]
    Day,
    #[strum(to_string = "7 days")]
    SevenDays,
    #[strum(to_string = "30 days")]
    Month,
    #[strum(to_string = "year")]
    Year,
}

impl TimeRange {
    const ORDER: [TimeRange; 5] = [
        TimeRange::All,
        TimeRange::Day,
        TimeRange::SevenDays,
        TimeRange::Month,
        TimeRange::Year,
    ];

    /// Races strictly younger than this many whole days are kept.
    pub fn max_age_days(self) -> Option<i64> {
        match self {
            TimeRange::All => None,
            TimeRange::Day => Some(1),
            TimeRange::SevenDays => Some(7),
            TimeRange::Month => Some(30),
            TimeRange::Year => Some(365),
        }
    }

    pub fn contains(self, timestamp: DateTime<Local>, now: DateTime<Local>) -> bool {
        match self.max_age_days() {
            Some(days) => (now - timestamp).num_days() < days,
            None => true,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|r| *r == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|r| *r == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Aggregates shown on a user's profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileSummary {
    pub races: usize,
    pub best_wpm: u32,
    pub mean_wpm: f64,
    pub mean_accuracy: f64,
    pub wpm_std_dev: f64,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: i64,
    timestamp: String,
    wpm: u32,
    accuracy: u32,
    duration_seconds: f64,
    quote: &'a str,
    mistaked_keys: String,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        password_hash TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS races (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        timestamp TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        wpm INTEGER NOT NULL,
        accuracy INTEGER NOT NULL,
        duration_seconds REAL NOT NULL,
        quote TEXT NOT NULL,
        mistaked_keys TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_races_user ON races(user_id);
    CREATE INDEX IF NOT EXISTS idx_races_wpm ON races(wpm);
    CREATE INDEX IF NOT EXISTS idx_races_timestamp ON races(timestamp_ms);
"#;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

const RACE_COLUMNS: &str = "r.id, u.username, r.timestamp, r.wpm, r.accuracy, r.duration_seconds, r.quote, r.mistaked_keys";

/// SQLite store for users and their race history.
#[derive(Debug)]
pub struct RaceDb {
    conn: Connection,
}

impl RaceDb {
    /// Opens (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening race database");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        // databases created before passwords existed lack the column
        let has_hash: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('users') WHERE name = 'password_hash'",
            [],
            |row| row.get(0),
        )?;
        if !has_hash {
            conn.execute_batch(
                "ALTER TABLE users ADD COLUMN password_hash TEXT NOT NULL DEFAULT ''",
            )?;
        }
        Ok(Self { conn })
    }

    /// Stores a new user with a bcrypt hash of `password`.
    pub fn register_user(&self, account: &Account, password: &str) -> Result<i64> {
        if self.user_id(&account.username)?.is_some() {
            return Err(Error::UserExists(account.username.clone()));
        }
        let hash = bcrypt::hash(password, HASH_COST)?;
        self.conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![account.username, account.email, hash, Local::now().to_rfc3339()],
        )?;
        info!(username = %account.username, "registered user");
        Ok(self.conn.last_insert_rowid())
    }

    /// Looks up `username` and checks `password` against its stored hash.
    ///
    /// Users without a hash (from older databases) never verify.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Account> {
        let found = self
            .conn
            .query_row(
                "SELECT username, email, password_hash FROM users WHERE username = ?1",
                [username],
                |row| {
                    let account = Account {
                        username: row.get(0)?,
                        email: row.get(1)?,
                    };
                    Ok((account, row.get::<_, String>(2)?))
                },
            )
            .optional()?;
        let (account, hash) = found.ok_or_else(|| Error::UnknownUser(username.to_string()))?;
        if bcrypt::verify(password, &hash).unwrap_or(false) {
            Ok(account)
        } else {
            warn!(username, "rejected login");
            Err(Error::InvalidCredentials(username.to_string()))
        }
    }

    pub fn find_user(&self, username: &str) -> Result<Option<Account>> {
        let account = self
            .conn
            .query_row(
                "SELECT username, email FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(Account {
                        username: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    fn user_id(&self, username: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn require_user_id(&self, username: &str) -> Result<i64> {
        self.user_id(username)?
            .ok_or_else(|| Error::UnknownUser(username.to_string()))
    }

    /// A user's races, newest first. Without `paging` every race is returned on one page.
    pub fn race_history(
        &self,
        username: &str,
        paging: Option<(u32, u32)>,
    ) -> Result<Page<StoredRace>> {
        let user_id = self.require_user_id(username)?;
        let total_count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM races WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let (page, limit, offset) = match paging {
            Some((page, limit)) => {
                let (page, limit) = pagination::normalize(page, limit);
                (page, limit, pagination::offset(page, limit))
            }
            None => (1, total_count.max(1) as u32, 0),
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RACE_COLUMNS} FROM races r JOIN users u ON u.id = r.user_id
             WHERE r.user_id = ?1
             ORDER BY r.timestamp_ms DESC, r.id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let items = stmt
            .query_map(params![user_id, limit, offset], stored_race_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total_count,
            page,
            limit,
        })
    }

    /// Every user's races, fastest first.
    pub fn leaderboard(&self, page: u32, limit: u32) -> Result<Page<LeaderboardEntry>> {
        let (page, limit) = pagination::normalize(page, limit);
        let total_count: u64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM races", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT r.id, u.username, r.wpm, r.accuracy, r.timestamp
            FROM races r JOIN users u ON u.id = r.user_id
            ORDER BY r.wpm DESC, r.timestamp_ms ASC, r.id ASC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let items = stmt
            .query_map(
                params![limit, pagination::offset(page, limit)],
                |row| {
                    Ok(LeaderboardEntry {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        wpm: row.get(2)?,
                        accuracy: row.get(3)?,
                        timestamp: parse_timestamp(row, 4)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total_count,
            page,
            limit,
        })
    }

    pub fn latest_race(&self, username: &str) -> Result<Option<StoredRace>> {
        Ok(self
            .race_history(username, Some((1, 1)))?
            .items
            .into_iter()
            .next())
    }

    /// A user's races inside `range`, oldest first for charting.
    pub fn races_in_range(
        &self,
        username: &str,
        range: TimeRange,
        now: DateTime<Local>,
    ) -> Result<Vec<StoredRace>> {
        let mut races: Vec<StoredRace> = self
            .race_history(username, None)?
            .items
            .into_iter()
            .filter(|race| range.contains(race.record.timestamp, now))
            .collect();
        races.reverse();
        Ok(races)
    }

    pub fn profile_summary(&self, username: &str) -> Result<ProfileSummary> {
        let races = self.race_history(username, None)?.items;
        let wpms: Vec<f64> = races.iter().map(|r| f64::from(r.record.wpm)).collect();
        let accuracies: Vec<f64> = races
            .iter()
            .map(|r| f64::from(r.record.accuracy))
            .collect();

        Ok(ProfileSummary {
            races: races.len(),
            best_wpm: races.iter().map(|r| r.record.wpm).max().unwrap_or(0),
            mean_wpm: mean(&wpms).unwrap_or(0.0),
            mean_accuracy: mean(&accuracies).unwrap_or(0.0),
            wpm_std_dev: std_dev(&wpms).unwrap_or(0.0),
        })
    }

    /// Writes the user's full history as CSV, returning the number of rows.
    pub fn export_history_csv<W: Write>(&self, username: &str, writer: W) -> Result<usize> {
        let races = self.race_history(username, None)?.items;
        let mut csv_writer = csv::Writer::from_writer(writer);
        for race in &races {
            csv_writer.serialize(CsvRow {
                id: race.id,
                timestamp: race.record.timestamp.to_rfc3339(),
                wpm: race.record.wpm,
                accuracy: race.record.accuracy,
                duration_seconds: race.record.duration_seconds,
                quote: &race.record.quote_text,
                mistaked_keys: race.record.mistaked_key_labels.join(" "),
            })?;
        }
        csv_writer.flush()?;
        Ok(races.len())
    }
}

impl RaceSink for RaceDb {
    fn submit_race(&mut self, username: &str, record: &RaceRecord) -> Result<i64> {
        let user_id = self.require_user_id(username)?;
        self.conn.execute(
            r#"
            INSERT INTO races
            (user_id, timestamp, timestamp_ms, wpm, accuracy, duration_seconds, quote, mistaked_keys)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user_id,
                record.timestamp.to_rfc3339(),
                record.timestamp.timestamp_millis(),
                record.wpm,
                record.accuracy,
                record.duration_seconds,
                record.quote_text,
                serde_json::to_string(&record.mistaked_key_labels)?,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(username, id, wpm = record.wpm, accuracy = record.accuracy, "race saved");
        Ok(id)
    }
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn stored_race_from_row(row: &Row) -> rusqlite::Result<StoredRace> {
    let keys: String = row.get(7)?;
    let mistaked_key_labels = serde_json::from_str(&keys).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StoredRace {
        id: row.get(0)?,
        username: row.get(1)?,
        record: RaceRecord {
            timestamp: parse_timestamp(row, 2)?,
            wpm: row.get(3)?,
            accuracy: row.get(4)?,
            duration_seconds: row.get(5)?,
            quote_text: row.get(6)?,
            mistaked_key_labels,
        },
    })
}
