use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Row},
};

use crate::history::{LeaderboardEntry, StoredRace};
use crate::pagination::{page_numbers, Page, PageLink};

const QUOTE_PREVIEW: usize = 40;

fn accuracy_color(accuracy: u32) -> Color {
    match accuracy {
        100 => Color::Green,
        90..=99 => Color::Yellow,
        _ => Color::Red,
    }
}

fn preview(quote: &str) -> String {
    if quote.chars().count() <= QUOTE_PREVIEW {
        return quote.to_string();
    }
    let cut: String = quote.chars().take(QUOTE_PREVIEW - 1).collect();
    format!("{cut}…")
}

pub fn history_header() -> Row<'static> {
    Row::new(vec!["When", "WPM", "Acc", "Secs", "Missed", "Quote"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

pub fn history_row(race: &StoredRace) -> Row<'static> {
    let record = &race.record;
    Row::new(vec![
        Cell::from(record.timestamp.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(record.wpm.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}%", record.accuracy))
            .style(Style::default().fg(accuracy_color(record.accuracy))),
        Cell::from(format!("{:.1}", record.duration_seconds)),
        Cell::from(record.mistaked_key_labels.join(" ")),
        Cell::from(preview(&record.quote_text)),
    ])
}

pub fn leaderboard_header() -> Row<'static> {
    Row::new(vec!["#", "User", "WPM", "Acc", "When"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// `rank` is the 1-based position across all pages.
pub fn leaderboard_row(rank: u64, entry: &LeaderboardEntry) -> Row<'static> {
    Row::new(vec![
        Cell::from(rank.to_string()),
        Cell::from(entry.username.clone()),
        Cell::from(entry.wpm.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}%", entry.accuracy))
            .style(Style::default().fg(accuracy_color(entry.accuracy))),
        Cell::from(entry.timestamp.format("%Y-%m-%d").to_string()),
    ])
}

/// `‹ 1 … 4 [5] 6 … 12 ›`, arrows dimmed when there is nowhere to go.
pub fn pager_line<T>(page: &Page<T>) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let arrow = |enabled: bool, glyph: &'static str| {
        Span::styled(glyph, if enabled { Style::default() } else { dim })
    };

    let mut spans = vec![arrow(page.has_prev(), "‹ ")];
    for link in page_numbers(page.page, page.total_pages()) {
        spans.push(match link {
            PageLink::Number(n) if n == page.page => Span::styled(
                format!("[{n}] "),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            PageLink::Number(n) => Span::raw(format!("{n} ")),
            PageLink::Gap => Span::styled("… ", dim),
        });
    }
    spans.push(arrow(page.has_next(), "›"));
    Line::from(spans)
}
