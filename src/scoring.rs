use std::time::Duration;

/// Standard characters-per-word approximation used by the live estimator.
pub const CHARS_PER_WORD: f64 = 5.0;

fn minutes(elapsed: Duration) -> f64 {
    elapsed.as_millis() as f64 / 60_000.0
}

/// Live speed: `(typed_chars / 5) / minutes`, rounded.
pub fn live_wpm(typed_chars: usize, elapsed: Duration) -> u32 {
    let mins = minutes(elapsed);
    if mins <= 0.0 {
        return 0;
    }
    ((typed_chars as f64 / CHARS_PER_WORD) / mins).round() as u32
}

/// Finished speed: whole target words per minute, rounded.
///
/// Deliberately a different estimator from [`live_wpm`].
pub fn finished_wpm(word_count: usize, elapsed: Duration) -> u32 {
    let mins = minutes(elapsed);
    if mins <= 0.0 {
        return 0;
    }
    (word_count as f64 / mins).round() as u32
}

/// Percentage of target positions the typed text reproduces exactly.
pub fn accuracy(target: &str, typed: &str) -> u32 {
    let len = target.chars().count();
    if len == 0 {
        return 0;
    }
    let correct = target
        .chars()
        .zip(typed.chars())
        .filter(|(expected, actual)| expected == actual)
        .count();
    (100.0 * correct as f64 / len as f64).round() as u32
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
