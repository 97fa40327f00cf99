use crate::models::{Lookup, Term, TermKind};
use crate::ui::board::level_style;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub struct TermWindow;

impl TermWindow {
    pub fn content(term: &Term) -> Vec<Line<'static>> {
        let meaning = match &term.meaning {
            Lookup::NotFetched if term.kind() == TermKind::Interactive => "Loading...".to_string(),
            Lookup::NotFetched | Lookup::Empty => "No meaning recorded".to_string(),
            Lookup::Resolved(meaning) => meaning.clone(),
        };
        let count = match &term.count {
            Lookup::NotFetched => "...".to_string(),
            Lookup::Empty => "-".to_string(),
            Lookup::Resolved(count) => count.to_string(),
        };

        vec![
            Line::from(Span::styled(
                term.content.clone(),
                level_style(term.learning_level).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Level: {}", term.learning_level.label())),
            Line::from(format!("Occurrences in text: {count}")),
            Line::from(""),
            Line::from("Meaning:"),
            Line::from(meaning),
            Line::from(""),
            Line::from(Span::styled(
                "+/- change level, w well known, x ignore, Esc close",
                Style::default().add_modifier(Modifier::ITALIC),
            )),
        ]
    }

    pub fn render(frame: &mut Frame, area: Rect, term: &Term) {
        let popup_area = super::centered_popup_area(area, 60, 60);
        frame.render_widget(Clear, popup_area);

        let paragraph = Paragraph::new(Self::content(term))
            .block(Block::default().title("Term").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }
}
