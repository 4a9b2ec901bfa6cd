use std::time::Duration;

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::key_label::practice_char;
use crate::quote::normalize_quote;

/// Builds a practice target from the keys a user keeps missing.
pub trait TrainingGenerator {
    /// `missed` holds key labels as produced by [`crate::key_label::key_label`].
    fn generate(&mut self, missed: &[String]) -> Result<String>;
}

/// Practice characters for a set of key labels, deduplicated, order kept.
pub fn practice_chars(missed: &[String]) -> Vec<char> {
    missed
        .iter()
        .filter_map(|label| practice_char(label))
        .unique()
        .collect()
}

const FILLER: &[char] = &['e', 't', 'a', 'o', 'i', 'n', 's', 'r', 'h', 'l'];
const MIN_CLUSTER: usize = 4;
const MAX_CLUSTER: usize = 8;

/// Offline generator of short letter clusters, e.g. `teet reet eter`.
#[derive(Debug, Clone)]
pub struct ClusterGenerator {
    pub clusters: usize,
    /// Chance that a position uses a missed letter rather than filler.
    pub focus: f64,
}

impl Default for ClusterGenerator {
    fn default() -> Self {
        Self {
            clusters: 12,
            focus: 0.7,
        }
    }
}

impl ClusterGenerator {
    pub fn generate_with<R: Rng>(&self, missed: &[String], rng: &mut R) -> Result<String> {
        let letters: Vec<char> = practice_chars(missed)
            .into_iter()
            .filter(|c| c.is_alphabetic() && c.is_lowercase())
            .collect();
        if letters.is_empty() {
            return Err(Error::NoMissedCharacters);
        }

        // gen_bool panics outside [0, 1]
        let focus = if self.focus.is_nan() {
            0.0
        } else {
            self.focus.clamp(0.0, 1.0)
        };
        let clusters = (0..self.clusters.max(1))
            .map(|_| {
                let len = rng.gen_range(MIN_CLUSTER..=MAX_CLUSTER);
                let anchor = rng.gen_range(0..len);
                (0..len)
                    .map(|i| {
                        let pool = if i == anchor || rng.gen_bool(focus) {
                            letters.as_slice()
                        } else {
                            FILLER
                        };
                        *pool.choose(&mut *rng).unwrap_or(&letters[0])
                    })
                    .collect::<String>()
            })
            .join(" ");
        Ok(clusters)
    }
}

impl TrainingGenerator for ClusterGenerator {
    fn generate(&mut self, missed: &[String]) -> Result<String> {
        if missed.is_empty() {
            return Err(Error::NoMissedCharacters);
        }
        let quote = self.generate_with(missed, &mut rand::thread_rng())?;
        info!(keys = missed.len(), "generated offline training quote");
        Ok(quote)
    }
}

const SYSTEM_PROMPT: &str = "You write typing drills. Reply with practice strings only.";

fn user_prompt(chars: &[char]) -> String {
    let listed = chars.iter().map(|c| format!("'{c}'")).join(", ");
    format!(
        "Write {MIN_CLUSTER}-to-{MAX_CLUSTER} letter lowercase practice clusters that lean heavily on \
         these characters: {listed}. Make them easy to pronounce (like 'teet', 'reet', 'eater'), \
         repeat a few combinations for muscle memory, avoid capitals, digits and symbols, \
         and output about a dozen of them separated by single spaces with nothing else."
    )
}

/// Reads the first choice's message content from a chat-completion response.
pub fn parse_completion(response: &Value) -> Result<String> {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedResponse("no message in first choice".to_string()))?;
    let quote = normalize_quote(content.trim());
    if quote.is_empty() {
        return Err(Error::EmptyQuote);
    }
    Ok(quote)
}

/// Asks an OpenAI-compatible chat-completion endpoint for practice strings.
#[derive(Debug)]
pub struct CompletionGenerator {
    url: String,
    model: String,
    api_key_env: String,
    agent: ureq::Agent,
}

impl CompletionGenerator {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self {
            url: url.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
            agent,
        }
    }

    pub fn request_body(&self, chars: &[char]) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(chars) },
            ],
        })
    }
}

impl TrainingGenerator for CompletionGenerator {
    fn generate(&mut self, missed: &[String]) -> Result<String> {
        let chars = practice_chars(missed);
        if chars.is_empty() {
            return Err(Error::NoMissedCharacters);
        }
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::MissingApiKey(self.api_key_env.clone()))?;

        debug!(url = %self.url, model = %self.model, "requesting training quote");
        let body = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_string(&self.request_body(&chars).to_string())?
            .into_string()?;
        let quote = parse_completion(&serde_json::from_str(&body)?)?;
        info!(keys = chars.len(), "generated training quote from completion service");
        Ok(quote)
    }
}

/// The completion client when its API key is present and `offline` is off,
/// the cluster generator otherwise.
pub fn build_trainer(config: &Config, offline: bool) -> Box<dyn TrainingGenerator> {
    let has_key = std::env::var(&config.completion_api_key_env).is_ok_and(|k| !k.is_empty());
    if offline || !has_key {
        info!(offline, "using offline training generator");
        return Box::new(ClusterGenerator::default());
    }
    Box::new(CompletionGenerator::new(
        config.completion_url.clone(),
        config.completion_model.clone(),
        config.completion_api_key_env.clone(),
        Duration::from_secs(config.http_timeout_secs),
    ))
}
