use std::collections::BTreeMap;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::key_label::{key_label, KEYBOARD_ROWS, SPACE_LABEL};

/// Mistake counts per key label. Shifted and unshifted characters share a key.
pub fn label_counts(histogram: &BTreeMap<char, u32>) -> BTreeMap<String, u32> {
    histogram
        .iter()
        .fold(BTreeMap::new(), |mut acc, (c, count)| {
            *acc.entry(key_label(*c)).or_insert(0) += count;
            acc
        })
}

pub fn heat_color(count: u32, max: u32) -> Color {
    if count == 0 || max == 0 {
        return Color::DarkGray;
    }
    let ratio = f64::from(count) / f64::from(max);
    if ratio > 0.66 {
        Color::Red
    } else if ratio > 0.33 {
        Color::LightRed
    } else {
        Color::Yellow
    }
}

/// The keyboard diagram, one line per row, missed keys tinted by frequency.
pub fn heat_map_lines(histogram: &BTreeMap<char, u32>) -> Vec<Line<'static>> {
    let counts = label_counts(histogram);
    let max = counts.values().copied().max().unwrap_or(0);

    KEYBOARD_ROWS
        .iter()
        .map(|row| {
            let spans = row
                .iter()
                .map(|label| {
                    let count = counts.get(*label).copied().unwrap_or(0);
                    let text = if *label == SPACE_LABEL {
                        format!("[{:^30}]", label)
                    } else {
                        format!("[{label}]")
                    };
                    let style = Style::default().fg(heat_color(count, max));
                    let style = if count > 0 {
                        style.add_modifier(Modifier::BOLD)
                    } else {
                        style
                    };
                    Span::styled(text, style)
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}
