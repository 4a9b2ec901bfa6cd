use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The record emitted once when a session finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub timestamp: DateTime<Local>,
    pub wpm: u32,
    pub accuracy: u32,
    pub duration_seconds: f64,
    pub quote_text: String,
    pub mistaked_key_labels: Vec<String>,
}

/// Persistence collaborator for finished races.
pub trait RaceSink {
    /// Stores the race for `username`, returning the new race id.
    fn submit_race(&mut self, username: &str, record: &RaceRecord) -> Result<i64>;
}

/// Test sink that keeps races in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub races: Vec<(String, RaceRecord)>,
}

impl RaceSink for MemorySink {
    fn submit_race(&mut self, username: &str, record: &RaceRecord) -> Result<i64> {
        self.races.push((username.to_string(), record.clone()));
        Ok(self.races.len() as i64)
    }
}
