use std::time::SystemTime;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::config::{Config, ConfigStore};
use crate::error::{Error, Result};
use crate::history::{LeaderboardEntry, ProfileSummary, RaceDb, StoredRace, TimeRange};
use crate::pagination::{Page, DEFAULT_PAGE};
use crate::quote::QuoteSource;
use crate::race::{RaceRecord, RaceSink};
use crate::session::{SessionState, TypingSession};
use crate::time_series::WpmSampler;
use crate::training::TrainingGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
    History,
    Leaderboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Everything the history screen shows for the signed-in user.
#[derive(Debug, Clone)]
pub struct HistoryView {
    pub page: Page<StoredRace>,
    pub range: TimeRange,
    pub range_races: Vec<StoredRace>,
    pub summary: ProfileSummary,
}

pub struct App {
    pub session: TypingSession,
    pub sampler: WpmSampler,
    pub screen: Screen,
    pub status: Option<String>,
    pub last_record: Option<RaceRecord>,
    pub history: Option<HistoryView>,
    pub leaderboard: Option<Page<LeaderboardEntry>>,
    username: Option<String>,
    db: RaceDb,
    quotes: Box<dyn QuoteSource>,
    trainer: Box<dyn TrainingGenerator>,
    config: Config,
    config_store: Option<Box<dyn ConfigStore>>,
}

impl App {
    pub fn new(
        db: RaceDb,
        quotes: Box<dyn QuoteSource>,
        trainer: Box<dyn TrainingGenerator>,
        username: Option<String>,
        config: &Config,
    ) -> Self {
        Self {
            session: TypingSession::new(),
            sampler: WpmSampler::default(),
            screen: Screen::Typing,
            status: None,
            last_record: None,
            history: None,
            leaderboard: None,
            username,
            db,
            quotes,
            trainer,
            config: config.clone(),
            config_store: None,
        }
    }

    /// Writes preference changes (the history range) back through `store`.
    pub fn with_config_store(mut self, store: Box<dyn ConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn db(&self) -> &RaceDb {
        &self.db
    }

    fn begin(&mut self, target: String) {
        self.session.load_target(target);
        self.sampler.clear();
        self.screen = Screen::Typing;
    }

    /// Pulls a fresh target from the quote source. On failure the session
    /// goes idle and the error is shown.
    pub fn new_quote(&mut self) {
        match self.quotes.fetch_target() {
            Ok(target) => {
                self.status = None;
                self.begin(target);
            }
            Err(e) => {
                warn!(error = %e, "could not load a quote");
                self.session = TypingSession::new();
                self.sampler.clear();
                self.screen = Screen::Typing;
                self.status = Some(format!("could not load a quote: {e}"));
            }
        }
    }

    pub fn retry(&mut self) {
        if self.session.target().is_none() {
            self.new_quote();
            return;
        }
        self.session.reset();
        self.sampler.clear();
        self.screen = Screen::Typing;
        self.status = None;
    }

    /// Keys to drill: the last race of this run, else the user's latest stored race.
    pub fn missed_keys(&self) -> Result<Vec<String>> {
        if let Some(record) = &self.last_record {
            return Ok(record.mistaked_key_labels.clone());
        }
        let username = self.username.as_deref().ok_or(Error::NotLoggedIn)?;
        Ok(self
            .db
            .latest_race(username)?
            .map(|race| race.record.mistaked_key_labels)
            .unwrap_or_default())
    }

    /// Loads a practice target built from recently missed keys.
    pub fn start_training(&mut self) -> Result<()> {
        let missed = self.missed_keys()?;
        let target = self.trainer.generate(&missed)?;
        info!(keys = missed.len(), "starting training quote");
        self.begin(target);
        self.status = Some("training quote".to_string());
        Ok(())
    }

    fn finish(&mut self, record: RaceRecord) {
        self.status = Some(match self.username.clone() {
            Some(username) => match self.db.submit_race(&username, &record) {
                Ok(id) => format!("race #{id} saved"),
                Err(e) => {
                    warn!(error = %e, "could not save race");
                    format!("could not save race: {e}")
                }
            },
            None => "playing as guest, race not saved".to_string(),
        });
        self.last_record = Some(record);
        self.screen = Screen::Results;
    }

    fn edit_field(&mut self, field: String, now: SystemTime) {
        if let Some(record) = self.session.on_input_at(&field, now) {
            self.finish(record);
        }
    }

    pub fn open_history(&mut self) -> Result<()> {
        self.load_history(DEFAULT_PAGE, self.config.history_range)?;
        self.screen = Screen::History;
        Ok(())
    }

    fn load_history(&mut self, page: u32, range: TimeRange) -> Result<()> {
        let username = self.username.clone().ok_or(Error::NotLoggedIn)?;
        let view = HistoryView {
            page: self
                .db
                .race_history(&username, Some((page, self.config.page_size)))?,
            range,
            range_races: self.db.races_in_range(&username, range, Local::now())?,
            summary: self.db.profile_summary(&username)?,
        };
        self.history = Some(view);
        if range != self.config.history_range {
            self.config.history_range = range;
            self.persist_config();
        }
        Ok(())
    }

    fn persist_config(&self) {
        let Some(store) = &self.config_store else {
            return;
        };
        if let Err(e) = store.save(&self.config) {
            warn!(error = %e, "could not save config");
        }
    }

    pub fn open_leaderboard(&mut self) -> Result<()> {
        self.load_leaderboard(DEFAULT_PAGE)?;
        self.screen = Screen::Leaderboard;
        Ok(())
    }

    fn load_leaderboard(&mut self, page: u32) -> Result<()> {
        self.leaderboard = Some(self.db.leaderboard(page, self.config.page_size)?);
        Ok(())
    }

    fn back(&mut self) {
        self.screen = if self.last_record.is_some() && self.session.finished().is_some() {
            Screen::Results
        } else {
            Screen::Typing
        };
    }

    fn report(&mut self, outcome: Result<()>) {
        if let Err(e) = outcome {
            warn!(error = %e, "action failed");
            self.status = Some(e.to_string());
        }
    }

    pub fn on_tick(&mut self, now: SystemTime) {
        self.sampler.sample(&self.session, now);
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        self.on_key_at(key, SystemTime::now())
    }

    pub fn on_key_at(&mut self, key: KeyEvent, now: SystemTime) -> Control {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            return Control::Quit;
        }

        match self.screen {
            Screen::Typing => self.typing_key(key, ctrl, now),
            Screen::Results => match key.code {
                KeyCode::Char('r') => self.retry(),
                KeyCode::Char('n') => self.new_quote(),
                KeyCode::Char('t') => {
                    let outcome = self.start_training();
                    self.report(outcome);
                }
                KeyCode::Char('h') => {
                    let outcome = self.open_history();
                    self.report(outcome);
                }
                KeyCode::Char('l') => {
                    let outcome = self.open_leaderboard();
                    self.report(outcome);
                }
                _ => {}
            },
            Screen::History => {
                let Some((page, range, has_prev, has_next)) = self
                    .history
                    .as_ref()
                    .map(|v| (v.page.page, v.range, v.page.has_prev(), v.page.has_next()))
                else {
                    self.back();
                    return Control::Continue;
                };
                let outcome = match key.code {
                    KeyCode::Left if has_prev => self.load_history(page - 1, range),
                    KeyCode::Right if has_next => self.load_history(page + 1, range),
                    KeyCode::Char('[') => self.load_history(DEFAULT_PAGE, range.prev()),
                    KeyCode::Char(']') => self.load_history(DEFAULT_PAGE, range.next()),
                    KeyCode::Char('b') => {
                        self.back();
                        Ok(())
                    }
                    _ => Ok(()),
                };
                self.report(outcome);
            }
            Screen::Leaderboard => {
                let Some((page, has_prev, has_next)) = self
                    .leaderboard
                    .as_ref()
                    .map(|b| (b.page, b.has_prev(), b.has_next()))
                else {
                    self.back();
                    return Control::Continue;
                };
                let outcome = match key.code {
                    KeyCode::Left if has_prev => self.load_leaderboard(page - 1),
                    KeyCode::Right if has_next => self.load_leaderboard(page + 1),
                    KeyCode::Char('b') => {
                        self.back();
                        Ok(())
                    }
                    _ => Ok(()),
                };
                self.report(outcome);
            }
        }
        Control::Continue
    }

    fn typing_key(&mut self, key: KeyEvent, ctrl: bool, now: SystemTime) {
        match self.session.state() {
            // no quote loaded: any key asks for one
            SessionState::Idle => {
                if matches!(key.code, KeyCode::Char(_) | KeyCode::Enter) {
                    self.new_quote();
                }
            }
            SessionState::Finished => self.screen = Screen::Results,
            SessionState::Loaded | SessionState::Active => match key.code {
                KeyCode::Char('w') if ctrl => self.edit_field(String::new(), now),
                KeyCode::Char(c) if !ctrl => {
                    let mut field = self.session.pending_input().to_string();
                    field.push(c);
                    self.edit_field(field, now);
                }
                KeyCode::Backspace => {
                    let mut field = self.session.pending_input().to_string();
                    if field.pop().is_some() {
                        self.edit_field(field, now);
                    }
                }
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::config::FileConfigStore;
    use crate::quote::FixedQuote;
    use crate::training::ClusterGenerator;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(quote: &str, username: Option<&str>) -> App {
        let db = RaceDb::open_in_memory().unwrap();
        if let Some(name) = username {
            db.register_user(
                &Account {
                    username: name.to_string(),
                    email: None,
                },
                "secret",
            )
            .unwrap();
        }
        let mut app = App::new(
            db,
            Box::new(FixedQuote(quote.to_string())),
            Box::new(ClusterGenerator::default()),
            username.map(str::to_string),
            &Config::default(),
        );
        app.new_quote();
        app
    }

    fn type_text(app: &mut App, text: &str, now: SystemTime) {
        for c in text.chars() {
            app.on_key_at(key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn test_typing_a_quote_finishes_and_saves() {
        let mut app = app_with("go on", Some("ada"));
        type_text(&mut app, "go ", at(0));
        type_text(&mut app, "on", at(60));

        assert_eq!(app.screen, Screen::Results);
        let record = app.last_record.clone().unwrap();
        assert_eq!(record.wpm, 2);
        assert_eq!(record.accuracy, 100);
        assert_eq!(app.status.as_deref(), Some("race #1 saved"));
        assert_eq!(app.db().race_history("ada", None).unwrap().total_count, 1);
    }

    #[test]
    fn test_guest_races_are_not_saved() {
        let mut app = app_with("hi", None);
        type_text(&mut app, "hi", at(0));
        assert_eq!(app.screen, Screen::Results);
        assert_eq!(
            app.status.as_deref(),
            Some("playing as guest, race not saved")
        );
    }

    #[test]
    fn test_backspace_and_ctrl_w_edit_the_field() {
        let mut app = app_with("cat dog", None);
        type_text(&mut app, "cax", at(0));
        app.on_key_at(key(KeyCode::Backspace), at(1));
        assert_eq!(app.session.pending_input(), "ca");

        app.on_key_at(
            KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL),
            at(2),
        );
        assert_eq!(app.session.pending_input(), "");
        assert_eq!(app.session.mistake_histogram().get(&'T'), Some(&1));
    }

    #[test]
    fn test_escape_quits_from_any_screen() {
        let mut app = app_with("hi", None);
        assert_eq!(app.on_key_at(key(KeyCode::Esc), at(0)), Control::Quit);
        type_text(&mut app, "hi", at(0));
        assert_eq!(app.on_key_at(key(KeyCode::Esc), at(1)), Control::Quit);
    }

    #[test]
    fn test_retry_keeps_the_same_quote() {
        let mut app = app_with("hi", None);
        type_text(&mut app, "hi", at(0));
        app.on_key_at(key(KeyCode::Char('r')), at(1));
        assert_eq!(app.screen, Screen::Typing);
        assert_eq!(app.session.state(), SessionState::Loaded);
        assert_eq!(app.session.target(), Some("hi"));
    }

    #[test]
    fn test_failed_quote_leaves_session_idle() {
        let mut app = app_with("   ", None);
        assert_eq!(app.session.state(), SessionState::Idle);
        assert!(app.status.as_deref().unwrap().contains("empty quote"));
        type_text(&mut app, "x", at(0));
        assert_eq!(app.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_training_uses_last_race_mistakes() {
        let mut app = app_with("cat", None);
        type_text(&mut app, "cx", at(0));
        app.on_key_at(key(KeyCode::Backspace), at(1));
        type_text(&mut app, "at", at(2));
        assert_eq!(app.last_record.as_ref().unwrap().mistaked_key_labels, ["A"]);

        app.on_key_at(key(KeyCode::Char('t')), at(3));
        assert_eq!(app.screen, Screen::Typing);
        assert!(app.session.target().unwrap().contains('a'));
    }

    #[test]
    fn test_training_without_mistakes_reports_error() {
        let mut app = app_with("hi", None);
        type_text(&mut app, "hi", at(0));
        app.on_key_at(key(KeyCode::Char('t')), at(1));
        assert_eq!(app.screen, Screen::Results);
        assert_eq!(
            app.status.as_deref(),
            Some("there were no missed characters")
        );
    }

    #[test]
    fn test_history_requires_login() {
        let mut app = app_with("hi", None);
        type_text(&mut app, "hi", at(0));
        app.on_key_at(key(KeyCode::Char('h')), at(1));
        assert_eq!(app.screen, Screen::Results);
        assert_eq!(app.status.as_deref(), Some("not logged in"));
    }

    #[test]
    fn test_history_and_leaderboard_screens() {
        let mut app = app_with("hi", Some("ada"));
        type_text(&mut app, "hi", at(0));

        app.on_key_at(key(KeyCode::Char('h')), at(1));
        assert_eq!(app.screen, Screen::History);
        let view = app.history.as_ref().unwrap();
        assert_eq!(view.page.total_count, 1);
        assert_eq!(view.summary.races, 1);

        app.on_key_at(key(KeyCode::Char(']')), at(1));
        assert_eq!(app.history.as_ref().unwrap().range, TimeRange::SevenDays);

        app.on_key_at(key(KeyCode::Char('b')), at(1));
        assert_eq!(app.screen, Screen::Results);

        app.on_key_at(key(KeyCode::Char('l')), at(1));
        assert_eq!(app.screen, Screen::Leaderboard);
        let board = app.leaderboard.as_ref().unwrap();
        assert_eq!(board.items.len(), 1);
        assert_eq!(board.items[0].username, "ada");
    }

    #[test]
    fn test_tick_samples_while_typing() {
        let mut app = app_with("hello world", None);
        type_text(&mut app, "he", at(0));
        app.on_tick(at(2));
        assert_eq!(app.sampler.points().len(), 1);
    }

    #[test]
    fn test_history_range_change_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut app = app_with("hi", Some("ada"))
            .with_config_store(Box::new(FileConfigStore::with_path(&path)));
        type_text(&mut app, "hi", at(0));

        // opening on the configured range writes nothing
        app.on_key_at(key(KeyCode::Char('h')), at(1));
        assert!(!path.exists());

        app.on_key_at(key(KeyCode::Char(']')), at(1));
        app.on_key_at(key(KeyCode::Char(']')), at(1));
        let saved = FileConfigStore::with_path(&path).load();
        assert_eq!(saved.history_range, TimeRange::Month);
        assert_eq!(saved.page_size, Config::default().page_size);

        // a restarted app opens history on the saved range
        let mut reopened = app_with("hi", Some("ada"));
        reopened.config = saved;
        type_text(&mut reopened, "hi", at(0));
        reopened.on_key_at(key(KeyCode::Char('h')), at(1));
        assert_eq!(reopened.history.as_ref().unwrap().range, TimeRange::Month);
    }
}
