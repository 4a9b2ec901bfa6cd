use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use itertools::Itertools;

use crate::key_label::key_label;
use crate::race::RaceRecord;
use crate::scoring;

/// Lifecycle of a session, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loaded,
    Active,
    Finished,
}

/// How a single target character should be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Correct,
    Incorrect,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub classes: Vec<CharClass>,
    /// First untyped index, `None` once every target char has input.
    pub caret: Option<usize>,
}

/// Results fixed at the moment the combined input matched the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishedRace {
    pub finished_at: SystemTime,
    pub wpm: u32,
    pub accuracy: u32,
}

/// A live typing session against one target string.
///
/// Input arrives as the full value of the current word field. Words are only
/// committed to `confirmed_input` on an exact match followed by a space, and
/// mismatches are tallied per expected key and never forgotten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypingSession {
    target: Option<String>,
    target_chars: Vec<char>,
    target_words: Vec<String>,
    confirmed_input: String,
    confirmed_len: usize,
    committed_words: usize,
    pending_input: String,
    started_at: Option<SystemTime>,
    mistake_histogram: BTreeMap<char, u32>,
    finished: Option<FinishedRace>,
}

impl TypingSession {
    /// An idle session with no target.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(text: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.load_target(text);
        session
    }

    /// Replaces the target and clears all derived state.
    pub fn load_target(&mut self, text: impl Into<String>) {
        let text = text.into();
        *self = Self {
            target_chars: text.chars().collect(),
            target_words: text.split_whitespace().map(str::to_string).collect(),
            target: Some(text),
            ..Self::default()
        };
    }

    /// Back to `Loaded` with the same target. No-op when idle.
    pub fn reset(&mut self) {
        if let Some(target) = self.target.take() {
            self.load_target(target);
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.target, self.started_at, self.finished) {
            (None, _, _) => SessionState::Idle,
            (Some(_), _, Some(_)) => SessionState::Finished,
            (Some(_), None, None) => SessionState::Loaded,
            (Some(_), Some(_), None) => SessionState::Active,
        }
    }

    pub fn on_input(&mut self, raw: &str) -> Option<RaceRecord> {
        self.on_input_at(raw, SystemTime::now())
    }

    /// Feeds the current word field value observed at `now`.
    ///
    /// Returns the race record exactly once, on the transition to `Finished`.
    pub fn on_input_at(&mut self, raw: &str, now: SystemTime) -> Option<RaceRecord> {
        if self.target.is_none() || self.finished.is_some() {
            return None;
        }

        if self.started_at.is_none() && !raw.is_empty() {
            self.started_at = Some(now);
        }

        self.tally_mistakes(raw);

        let committed_word = self
            .target_words
            .get(self.committed_words)
            .filter(|word| raw.ends_with(' ') && raw.trim() == word.as_str())
            .cloned();

        match committed_word {
            Some(word) => {
                self.confirmed_input.push_str(&word);
                self.confirmed_input.push(' ');
                self.confirmed_len += word.chars().count() + 1;
                self.committed_words += 1;
                self.pending_input.clear();
            }
            None => {
                self.pending_input.clear();
                self.pending_input.push_str(raw);
            }
        }

        self.try_finish(now)
    }

    fn tally_mistakes(&mut self, raw: &str) {
        for (offset, typed) in raw.chars().enumerate() {
            let Some(&expected) = self.target_chars.get(self.confirmed_len + offset) else {
                break;
            };
            if typed != expected {
                *self
                    .mistake_histogram
                    .entry(histogram_key(expected))
                    .or_insert(0) += 1;
            }
        }
    }

    fn try_finish(&mut self, now: SystemTime) -> Option<RaceRecord> {
        let target = self.target.as_deref()?;
        let started_at = self.started_at?;
        let combined = self.combined_input();
        if combined.trim() != target.trim() {
            return None;
        }

        let elapsed = now.duration_since(started_at).unwrap_or_default();
        let finished = FinishedRace {
            finished_at: now,
            wpm: scoring::finished_wpm(scoring::word_count(target), elapsed),
            accuracy: scoring::accuracy(target, &combined),
        };

        let record = RaceRecord {
            timestamp: DateTime::<Local>::from(now),
            wpm: finished.wpm,
            accuracy: finished.accuracy,
            duration_seconds: elapsed.as_secs_f64(),
            quote_text: target.to_string(),
            mistaked_key_labels: self.mistaked_key_labels(),
        };
        self.finished = Some(finished);
        Some(record)
    }

    pub fn live_wpm(&self) -> u32 {
        self.live_wpm_at(SystemTime::now())
    }

    /// Characters-per-five estimate; frozen at the finish time once finished.
    pub fn live_wpm_at(&self, now: SystemTime) -> u32 {
        match self.elapsed_at(now) {
            Some(elapsed) => {
                let typed = self.confirmed_len + self.pending_input.chars().count();
                scoring::live_wpm(typed, elapsed)
            }
            None => 0,
        }
    }

    pub fn elapsed_at(&self, now: SystemTime) -> Option<Duration> {
        let end = self.finished.map_or(now, |f| f.finished_at);
        self.started_at
            .map(|started| end.duration_since(started).unwrap_or_default())
    }

    /// Per-character paint state for the current input.
    pub fn classify(&self) -> Classification {
        let typed: Vec<char> = self.combined_input().chars().collect();
        let mut errored = false;
        let classes = self
            .target_chars
            .iter()
            .enumerate()
            .map(|(idx, expected)| match typed.get(idx) {
                None => CharClass::Pending,
                Some(actual) if !errored && actual == expected => CharClass::Correct,
                Some(_) => {
                    errored = true;
                    CharClass::Incorrect
                }
            })
            .collect();

        let caret = (typed.len() < self.target_chars.len()).then_some(typed.len());
        Classification { classes, caret }
    }

    /// Distinct key labels of every mismatch, most frequent first.
    pub fn mistaked_key_labels(&self) -> Vec<String> {
        self.mistake_histogram
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)))
            .map(|(c, _)| key_label(*c))
            .unique()
            .collect()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn confirmed_input(&self) -> &str {
        &self.confirmed_input
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn combined_input(&self) -> String {
        format!("{}{}", self.confirmed_input, self.pending_input)
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn finished(&self) -> Option<&FinishedRace> {
        self.finished.as_ref()
    }

    pub fn mistake_histogram(&self) -> &BTreeMap<char, u32> {
        &self.mistake_histogram
    }

    pub fn committed_words(&self) -> usize {
        self.committed_words
    }

    /// The target word the pending input is being compared against.
    pub fn current_word(&self) -> Option<&str> {
        self.target_words.get(self.committed_words).map(String::as_str)
    }
}

// letters fold to upper case; everything else is kept as is
fn histogram_key(expected: char) -> char {
    if expected.is_alphabetic() {
        expected.to_uppercase().next().unwrap_or(expected)
    } else {
        expected
    }
}
