pub mod charting;
pub mod keyboard;
pub mod tables;

use std::time::SystemTime;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, HistoryView, Screen};
use crate::history::LeaderboardEntry;
use crate::pagination::{self, Page};
use crate::session::{CharClass, SessionState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
            Screen::History => render_history(self, area, buf),
            Screen::Leaderboard => render_leaderboard(self, area, buf),
        }
    }
}

fn status_line(app: &App) -> Line<'static> {
    let who = app
        .username()
        .map_or_else(|| "guest".to_string(), str::to_string);
    let mut spans = vec![Span::styled(who, Style::default().fg(Color::Cyan))];
    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.clone(), italic()));
    }
    Line::from(spans)
}

/// Spans for the target: green up to the first mismatch, red after it, dim
/// for untyped text, the caret underlined.
pub fn prompt_spans(app: &App) -> Vec<Span<'static>> {
    let Some(target) = app.session.target() else {
        return Vec::new();
    };
    let classification = app.session.classify();
    let typed: Vec<char> = app.session.combined_input().chars().collect();

    target
        .chars()
        .zip(classification.classes)
        .enumerate()
        .map(|(idx, (expected, class))| {
            let style = match class {
                CharClass::Correct => bold().fg(Color::Green),
                CharClass::Incorrect => bold().fg(Color::Red),
                CharClass::Pending => dim_bold(),
            };
            let style = if classification.caret == Some(idx) {
                style.add_modifier(Modifier::UNDERLINED)
            } else {
                style
            };
            let glyph = match (class, typed.get(idx)) {
                (CharClass::Incorrect, Some(' ')) => '·',
                (CharClass::Incorrect, Some(actual)) => *actual,
                _ => expected,
            };
            Span::styled(glyph.to_string(), style)
        })
        .collect()
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    if app.session.state() == SessionState::Idle {
        let lines = vec![
            Line::from(Span::styled(
                "no quote loaded - press any key to fetch one",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            )),
            status_line(app),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
        return;
    }

    let target = app.session.target().unwrap_or_default();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let fits_on_one_line = target.width() <= max_chars_per_line as usize;
    let prompt_lines = if fits_on_one_line {
        1
    } else {
        (target.width() as f64 / f64::from(max_chars_per_line)).ceil() as u16 + 1
    };
    let padding = area.height.saturating_sub(prompt_lines + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // live wpm
            Constraint::Length(1),
            Constraint::Length(prompt_lines),
            Constraint::Length(1),
            Constraint::Length(1), // word field
            Constraint::Min(0),
            Constraint::Length(1), // status
        ])
        .split(area);

    let wpm = match app.session.state() {
        SessionState::Active => format!("{} wpm", app.session.live_wpm_at(SystemTime::now())),
        _ => "start typing".to_string(),
    };
    Paragraph::new(Span::styled(wpm, dim_bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Line::from(prompt_spans(app)))
        // short prompts read better centered
        .alignment(if fits_on_one_line {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    let word_style = if app
        .session
        .current_word()
        .is_some_and(|word| word.starts_with(app.session.pending_input()))
    {
        bold()
    } else {
        bold().fg(Color::Red)
    };
    Paragraph::new(Line::from(vec![
        Span::styled("> ", dim_bold()),
        Span::styled(app.session.pending_input().to_string(), word_style),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);

    Paragraph::new(status_line(app)).render(chunks[7], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(6),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // missed keys
            Constraint::Length(6), // heat-map
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let record = app.last_record.as_ref();
    let (overall_duration, highest_wpm) = charting::compute_chart_params(
        app.sampler.points(),
        record.map(|r| r.duration_seconds),
    );
    let tuples: Vec<(f64, f64)> = app.sampler.points().iter().map(|p| (*p).into()).collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    if let Some(record) = record {
        Paragraph::new(Span::styled(
            format!(
                "{} wpm   {}% acc   {:.1} s",
                record.wpm, record.accuracy, record.duration_seconds
            ),
            bold(),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        let missed = if record.mistaked_key_labels.is_empty() {
            "no missed keys".to_string()
        } else {
            format!("missed: {}", record.mistaked_key_labels.join(" "))
        };
        Paragraph::new(Span::styled(
            missed,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    Paragraph::new(keyboard::heat_map_lines(app.session.mistake_histogram()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(status_line(app)).render(chunks[4], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (t)rain / (h)istory / (l)eaderboard / (esc)ape",
        italic(),
    ))
    .render(chunks[5], buf);
}

fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(view) = &app.history else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(1), // summary
            Constraint::Percentage(40),
            Constraint::Min(4),
            Constraint::Length(1), // pager
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let summary = &view.summary;
    Paragraph::new(Span::styled(
        format!(
            "{} races   best {} wpm   mean {:.1} wpm   {:.1}% acc   {:.2} sd",
            summary.races,
            summary.best_wpm,
            summary.mean_wpm,
            summary.mean_accuracy,
            summary.wpm_std_dev
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    render_history_chart(view, chunks[1], buf);

    let rows = view.page.items.iter().map(tables::history_row);
    Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(tables::history_header())
    .block(Block::default().borders(Borders::ALL).title("History"))
    .render(chunks[2], buf);

    Paragraph::new(tables::pager_line(&view.page))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    Paragraph::new(status_line(app)).render(chunks[4], buf);
    Paragraph::new(Span::styled(
        "(←/→) page / ([/]) range / (b)ack / (esc)ape",
        italic(),
    ))
    .render(chunks[5], buf);
}

fn render_history_chart(view: &HistoryView, area: Rect, buf: &mut Buffer) {
    let wpms: Vec<u32> = view.range_races.iter().map(|r| r.record.wpm).collect();
    let points = charting::history_points(&wpms);
    let highest = wpms.iter().copied().max().unwrap_or(0).max(1);
    let races = points.len().max(2) as f64;

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("wpm, {}", view.range)),
        )
        .x_axis(
            Axis::default()
                .title("race")
                .bounds([1.0, races])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(races), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, f64::from(highest)])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(highest.to_string(), bold()),
                ]),
        )
        .render(area, buf);
}

fn render_leaderboard(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(board) = &app.leaderboard else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Min(4),
            Constraint::Length(1), // pager
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    Table::new(
        leaderboard_rows(board),
        [
            Constraint::Length(5),
            Constraint::Min(12),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(11),
        ],
    )
    .header(tables::leaderboard_header())
    .block(Block::default().borders(Borders::ALL).title("Leaderboard"))
    .render(chunks[0], buf);

    Paragraph::new(tables::pager_line(board))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    Paragraph::new(status_line(app)).render(chunks[2], buf);
    Paragraph::new(Span::styled("(←/→) page / (b)ack / (esc)ape", italic()))
        .render(chunks[3], buf);
}

fn leaderboard_rows(board: &Page<LeaderboardEntry>) -> Vec<ratatui::widgets::Row<'static>> {
    let first_rank = pagination::offset(board.page, board.limit) + 1;
    board
        .items
        .iter()
        .enumerate()
        .map(|(idx, entry)| tables::leaderboard_row(first_rank + idx as u64, entry))
        .collect()
}
