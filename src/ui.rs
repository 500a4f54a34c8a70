use chrono::{DateTime, Utc};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use time_humanize::HumanTime;
use unicode_width::UnicodeWidthStr;

use crate::phrase::Phrase;
use crate::session::{EmptySummary, RevealState, SessionState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Everything the practice screen shows, detached from the session borrow
#[derive(Debug, Clone)]
pub struct PracticeView {
    pub state: SessionState,
    pub prompt_text: String,
    pub target_pronunciation: String,
    pub literal_gloss: Option<String>,
    pub masked_units: Vec<String>,
    pub now: DateTime<Utc>,
    pub reviewed: usize,
    pub notice: Option<String>,
}

impl PracticeView {
    pub fn new(
        state: SessionState,
        current: Option<&Phrase>,
        masked_units: Vec<String>,
        now: DateTime<Utc>,
        reviewed: usize,
    ) -> Self {
        Self {
            state,
            prompt_text: current.map(|p| p.prompt_text.clone()).unwrap_or_default(),
            target_pronunciation: current
                .map(|p| p.target_pronunciation.clone())
                .unwrap_or_default(),
            literal_gloss: current.and_then(|p| p.literal_gloss.clone()),
            masked_units,
            now,
            reviewed,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }
}

/// "in 3 hours" style text for the next due time
pub fn describe_next_due(next_due_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (next_due_at - now).num_seconds().max(0);
    HumanTime::from_seconds(secs).to_string()
}

/// Message for the screen shown once the queue is exhausted
pub fn empty_message(summary: &EmptySummary, now: DateTime<Utc>) -> (String, Option<String>) {
    if summary.collection_empty {
        return (
            "No cards yet".to_string(),
            Some("Add some phrases to get started!".to_string()),
        );
    }
    let detail = summary
        .next_due_at
        .map(|next| format!("Next review {}", describe_next_due(next, now)));
    ("All caught up!".to_string(), detail)
}

/// Joins reveal units, spacing them out only when the line still fits.
pub fn layout_units(units: &[String], max_width: usize) -> String {
    let spaced = units.join(" ");
    if spaced.width() <= max_width {
        spaced
    } else {
        units.concat()
    }
}

impl Widget for &PracticeView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let accent_style = Style::default().patch(bold_style).fg(Color::Cyan);
        let hint_style = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1),
                    Constraint::Min(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                ]
                .as_ref(),
            )
            .split(area);

        let status = match self.state.reveal_state {
            RevealState::Empty | RevealState::Loading => format!("{} reviewed", self.reviewed),
            _ => format!(
                "{} left · {} reviewed",
                self.state.remaining, self.reviewed
            ),
        };
        Paragraph::new(Span::styled(status, dim_style))
            .alignment(Alignment::Right)
            .render(chunks[0], buf);

        let mut lines: Vec<Line> = Vec::new();
        let hint: String;

        match self.state.reveal_state {
            RevealState::Loading => {
                lines.push(Line::from(Span::styled("Loading…", dim_style)));
                hint = String::new();
            }
            RevealState::ShowPrompt => {
                lines.push(Line::from(Span::styled("How do you say...", dim_style)));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    self.prompt_text.clone(),
                    bold_style,
                )));
                hint = "[enter] reveal   [q] quit".to_string();
            }
            RevealState::ShowPronunciation => {
                lines.push(Line::from(Span::styled(self.prompt_text.clone(), dim_style)));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    self.target_pronunciation.clone(),
                    accent_style,
                )));
                if let Some(gloss) = &self.literal_gloss {
                    lines.push(Line::from(Span::styled(gloss.clone(), italic_style)));
                }
                hint = "[enter] reveal text   [p] play   [q] quit".to_string();
            }
            RevealState::Revealing | RevealState::RatingReady => {
                let max_width = chunks[1].width as usize;
                lines.push(Line::from(Span::styled(self.prompt_text.clone(), dim_style)));
                lines.push(Line::from(Span::styled(
                    self.target_pronunciation.clone(),
                    accent_style,
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    layout_units(&self.masked_units, max_width),
                    bold_style,
                )));
                lines.push(Line::from(""));
                if self.state.reveal_state == RevealState::RatingReady {
                    lines.push(Line::from(Span::styled(
                        "How was your recall?",
                        dim_style,
                    )));
                    hint = "[h] hard   [e] easy   [p] play   [q] quit".to_string();
                } else {
                    hint = format!(
                        "[enter] next ({}/{})   [p] play   [q] quit",
                        self.state.revealed_unit_count, self.state.total_units
                    );
                }
            }
            RevealState::Empty => {
                let summary = self.state.empty.unwrap_or(EmptySummary {
                    next_due_at: None,
                    collection_empty: false,
                });
                let (title, detail) = empty_message(&summary, self.now);
                lines.push(Line::from(Span::styled(
                    title,
                    Style::default().patch(bold_style).fg(Color::Green),
                )));
                if let Some(detail) = detail {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(detail, dim_style)));
                }
                hint = "[q] quit".to_string();
            }
        }

        let content_height = lines.len() as u16;
        let body = chunks[1];
        let top_pad = body.height.saturating_sub(content_height) / 2;
        let body = Rect {
            y: body.y + top_pad,
            height: body.height - top_pad,
            ..body
        };
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(body, buf);

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.clone(), Style::default().fg(Color::Red)))
                .alignment(Alignment::Center)
                .render(chunks[2], buf);
        }

        Paragraph::new(Span::styled(hint, hint_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}
