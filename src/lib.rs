// Library surface shared by the binary and the integration tests.
pub mod account;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod history;
pub mod key_label;
pub mod logging;
pub mod pagination;
pub mod quote;
pub mod race;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod time_series;
pub mod training;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
pub use race::{RaceRecord, RaceSink};
pub use session::{SessionState, TypingSession};
