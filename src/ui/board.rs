use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::error::MissingReadingState;
use crate::models::{LearningLevel, TermKind};
use crate::session::ReadingSession;
use crate::ui::layout::{Cell, PLACEHOLDER, TermLayout};

pub fn level_style(level: LearningLevel) -> Style {
    match level {
        LearningLevel::Unknown => Style::default().fg(Color::LightBlue),
        LearningLevel::Learning1 => Style::default().fg(Color::Red),
        LearningLevel::Learning2 => Style::default().fg(Color::LightRed),
        LearningLevel::Learning3 => Style::default().fg(Color::Yellow),
        LearningLevel::Learning4 => Style::default().fg(Color::LightYellow),
        LearningLevel::Learning5 => Style::default().fg(Color::LightGreen),
        LearningLevel::Ignored => Style::default().fg(Color::DarkGray),
        LearningLevel::WellKnown | LearningLevel::Skipped => Style::default(),
    }
}

/// Board widget for the laid-out terms of the reading window
pub struct Board<'a> {
    layout: &'a TermLayout,
    scroll: usize,
    bookmark: Option<usize>,
    selected: Option<usize>,
}

impl<'a> Board<'a> {
    pub fn new(layout: &'a TermLayout) -> Self {
        Self {
            layout,
            scroll: 0,
            bookmark: None,
            selected: None,
        }
    }

    pub fn with_scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_bookmark(mut self, bookmark: Option<usize>) -> Self {
        self.bookmark = bookmark;
        self
    }

    pub fn with_selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    /// Styled lines for the visible rows.
    ///
    /// Every visible term is read through the session, so drawing before the
    /// text is open fails instead of showing stale data.
    pub fn lines(
        &self,
        session: &ReadingSession,
    ) -> Result<Vec<Line<'static>>, MissingReadingState> {
        let height = self.layout.rows().len().saturating_sub(self.scroll);
        let mut lines = Vec::with_capacity(height);
        for row in self.layout.rows().iter().skip(self.scroll) {
            let mut spans = Vec::with_capacity(row.cells.len());
            for cell in &row.cells {
                match cell {
                    Cell::Gap(_) => spans.push(Span::styled(
                        PLACEHOLDER,
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
                    )),
                    Cell::Term { index, part, .. } => {
                        let Some(term) = session.term(*index)? else {
                            continue;
                        };
                        let mut style = level_style(term.learning_level);
                        if term.kind() != TermKind::Skipped {
                            if self.bookmark == Some(*index) {
                                style = style.add_modifier(Modifier::UNDERLINED);
                            }
                            if self.selected == Some(*index) {
                                style = style.add_modifier(Modifier::REVERSED);
                            }
                        }
                        let text = match part {
                            Some(part) => term.content.get(part.clone()).unwrap_or_default(),
                            None => term.content.as_str(),
                        };
                        spans.push(Span::styled(text.to_string(), style));
                    }
                }
            }
            lines.push(Line::from(spans));
            if lines.len() >= self.layout.viewport_height() {
                break;
            }
        }
        Ok(lines)
    }

    pub fn render(lines: Vec<Line<'static>>, frame: &mut Frame, area: Rect) {
        frame.render_widget(Paragraph::new(lines), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchTicket;
    use crate::models::{ReadingText, Term, TermRange};
    use crate::session::{Completion, Effect, SessionOptions};

    fn open_session() -> ReadingSession {
        let mut session = ReadingSession::new(1, SessionOptions::default());
        let effects = session.apply(Completion::TextLoaded(Ok(ReadingText {
            id: 1,
            term_count: 4,
            processed_term_count: 4,
            bookmark: Some(2),
            ..Default::default()
        })));
        let ticket: FetchTicket = effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::FetchTerms { ticket, .. } => Some(ticket),
                _ => None,
            })
            .unwrap();
        session.apply(Completion::TermsLoaded {
            ticket,
            result: Ok(TermRange {
                terms: vec![
                    Term::new(0, "Casa", LearningLevel::Learning1),
                    Term::new(1, " ", LearningLevel::Skipped),
                    Term::new(2, "blanca", LearningLevel::Unknown),
                ],
                begin: 0,
                end: 3,
            }),
        });
        session
    }

    #[test]
    fn test_board_styles_terms() {
        let session = open_session();
        let layout = TermLayout::build(session.store(), 0..4, 40, 5);
        let lines = Board::new(&layout)
            .with_bookmark(session.bookmark())
            .with_selected(Some(0))
            .lines(&session)
            .unwrap();

        assert_eq!(lines.len(), 1);
        let spans = &lines[0].spans;
        assert_eq!(spans[0].content, "Casa");
        assert!(spans[0].style.add_modifier.contains(Modifier::REVERSED));
        assert_eq!(spans[0].style.fg, Some(Color::Red));
        assert!(spans[2].style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(spans[3].content, PLACEHOLDER);
    }

    #[test]
    fn test_board_draws_punctuation_on_both_sides_of_a_break() {
        let mut session = open_session();
        session.apply(Completion::TermsLoaded {
            ticket: FetchTicket {
                edge: crate::fetcher::Edge::Bottom,
                serial: 99,
                range: 3..4,
            },
            result: Ok(TermRange {
                terms: vec![Term::new(3, "!\n»", LearningLevel::Skipped)],
                begin: 3,
                end: 4,
            }),
        });
        let layout = TermLayout::build(session.store(), 0..4, 40, 5);
        let lines = Board::new(&layout).lines(&session).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].to_string(), "Casa blanca!");
        assert_eq!(lines[1].to_string(), "»");
    }

    #[test]
    fn test_board_before_open_is_an_error() {
        let opened = open_session();
        let layout = TermLayout::build(opened.store(), 0..3, 40, 5);
        let unopened = ReadingSession::new(1, SessionOptions::default());
        assert_eq!(Board::new(&layout).lines(&unopened), Err(MissingReadingState));
    }
}
