use std::time::Duration;

use cgisf_lib::cgisf;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

static QUOTE_DIR: Dir = include_dir!("src/quotes");

/// Supplies target strings for new sessions.
pub trait QuoteSource {
    fn fetch_target(&mut self) -> Result<String>;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum QuoteSourceKind {
    Bundled,
    Sentences,
    Http,
}

/// Cleans up text from any source before it becomes a target.
///
/// Repairs the UTF-8-read-as-Latin-1 apostrophe (`â€™`) and typographic
/// quotes, and collapses whitespace runs to single spaces.
pub fn normalize_quote(text: &str) -> String {
    text.replace("â€™", "'")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: &str) -> Result<String> {
    let quote = normalize_quote(text);
    if quote.is_empty() {
        return Err(Error::EmptyQuote);
    }
    Ok(quote)
}

#[derive(Deserialize, Debug)]
struct QuoteFile {
    #[allow(dead_code)]
    name: String,
    quotes: Vec<String>,
}

/// Quotes compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledQuotes {
    quotes: Vec<String>,
    last: Option<usize>,
}

impl BundledQuotes {
    pub fn new() -> Result<Self> {
        let file = QUOTE_DIR
            .get_file("quotes.json")
            .and_then(|f| f.contents_utf8())
            .ok_or(Error::EmptyQuote)?;
        let parsed: QuoteFile = serde_json::from_str(file)?;
        Ok(Self::from_quotes(parsed.quotes))
    }

    pub fn from_quotes(quotes: Vec<String>) -> Self {
        Self { quotes, last: None }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl QuoteSource for BundledQuotes {
    fn fetch_target(&mut self) -> Result<String> {
        let rng = &mut rand::thread_rng();
        // avoid serving the same quote twice in a row
        let candidates: Vec<usize> = (0..self.quotes.len())
            .filter(|i| self.quotes.len() == 1 || Some(*i) != self.last)
            .collect();
        let idx = *candidates.choose(rng).ok_or(Error::EmptyQuote)?;
        self.last = Some(idx);
        non_empty(&self.quotes[idx])
    }
}

/// Randomly generated nonsense sentences.
#[derive(Debug, Clone)]
pub struct SentenceQuotes {
    pub sentences: usize,
}

impl Default for SentenceQuotes {
    fn default() -> Self {
        Self { sentences: 2 }
    }
}

impl QuoteSource for SentenceQuotes {
    fn fetch_target(&mut self) -> Result<String> {
        let rng = &mut rand::thread_rng();
        let text = (0..self.sentences.max(1))
            .map(|_| {
                cgisf(
                    rng.gen_range(1..3),
                    rng.gen_range(1..3),
                    rng.gen_range(1..5),
                    rng.gen_bool(0.5),
                    rng.gen_range(1..3),
                    rng.gen_bool(0.5),
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        non_empty(&text)
    }
}

/// A random-quote HTTP service answering with JSON.
///
/// Accepts `{"quote": "..."}` as well as `{"quote": {"body": "..."}}`.
#[derive(Debug)]
pub struct HttpQuoteSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpQuoteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl QuoteSource for HttpQuoteSource {
    fn fetch_target(&mut self) -> Result<String> {
        debug!(url = %self.url, "fetching quote");
        let body = self
            .agent
            .get(&self.url)
            .set("User-Agent", concat!("keyrace/", env!("CARGO_PKG_VERSION")))
            .call()?
            .into_string()?;
        let text = extract_quote(&serde_json::from_str(&body)?).ok_or_else(|| {
            warn!(url = %self.url, "quote service response had no quote");
            Error::MalformedResponse("missing quote field".to_string())
        })?;
        non_empty(&text)
    }
}

fn extract_quote(value: &Value) -> Option<String> {
    match value.get("quote")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("body")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Always returns the same text: custom prompts, retries and training quotes.
#[derive(Debug, Clone)]
pub struct FixedQuote(pub String);

impl QuoteSource for FixedQuote {
    fn fetch_target(&mut self) -> Result<String> {
        non_empty(&self.0)
    }
}

pub fn build_source(
    kind: QuoteSourceKind,
    url: &str,
    timeout: Duration,
) -> Result<Box<dyn QuoteSource>> {
    Ok(match kind {
        QuoteSourceKind::Bundled => Box::new(BundledQuotes::new()?),
        QuoteSourceKind::Sentences => Box::new(SentenceQuotes::default()),
        QuoteSourceKind::Http => Box::new(HttpQuoteSource::new(url, timeout)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_normalize_repairs_apostrophes() {
        assert_eq!(normalize_quote("don\u{00e2}\u{20ac}\u{2122}t"), "don't");
        assert_eq!(normalize_quote("it\u{2019}s"), "it's");
        assert_eq!(normalize_quote("\u{201C}hi\u{201D}"), "\"hi\"");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_quote("  one\ttwo \n three "), "one two three");
    }

    #[test]
    fn test_bundled_quotes_load() {
        let mut quotes = BundledQuotes::new().unwrap();
        assert!(quotes.len() > 10);
        let quote = quotes.fetch_target().unwrap();
        assert!(!quote.is_empty());
        assert_eq!(quote, normalize_quote(&quote));
    }

    #[test]
    fn test_bundled_quotes_do_not_repeat_back_to_back() {
        let mut quotes = BundledQuotes::from_quotes(vec!["one".into(), "two".into()]);
        let mut previous = quotes.fetch_target().unwrap();
        for _ in 0..20 {
            let next = quotes.fetch_target().unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_single_bundled_quote_repeats() {
        let mut quotes = BundledQuotes::from_quotes(vec!["only".into()]);
        assert_eq!(quotes.fetch_target().unwrap(), "only");
        assert_eq!(quotes.fetch_target().unwrap(), "only");
    }

    #[test]
    fn test_empty_bundle_fails() {
        let mut quotes = BundledQuotes::from_quotes(vec![]);
        assert!(quotes.is_empty());
        assert_matches!(quotes.fetch_target(), Err(Error::EmptyQuote));
    }

    #[test]
    fn test_sentences_generate_text() {
        let quote = SentenceQuotes::default().fetch_target().unwrap();
        assert!(quote.chars().any(|c| c.is_alphabetic()));
    }

    #[test]
    fn test_fixed_quote() {
        let mut fixed = FixedQuote("  teet reet ".into());
        assert_eq!(fixed.fetch_target().unwrap(), "teet reet");
        assert_matches!(FixedQuote("   ".into()).fetch_target(), Err(Error::EmptyQuote));
    }

    #[test]
    fn test_extract_quote_shapes() {
        assert_eq!(
            extract_quote(&json!({"quote": "plain"})),
            Some("plain".to_string())
        );
        assert_eq!(
            extract_quote(&json!({"quote": {"body": "nested", "author": "x"}})),
            Some("nested".to_string())
        );
        assert_eq!(extract_quote(&json!({"text": "nope"})), None);
        assert_eq!(extract_quote(&json!({"quote": 5})), None);
    }

    #[test]
    fn test_http_source_unreachable_is_error() {
        let mut source = HttpQuoteSource::new("http://127.0.0.1:9/quote", Duration::from_millis(200));
        assert_matches!(source.fetch_target(), Err(Error::Http(_)));
    }
}
