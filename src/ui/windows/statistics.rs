use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::models::{LearningLevel, LevelCounts};
use crate::ui::board::level_style;

/// Footer line summarising how much of the text is already learned.
pub fn statistics_line(counts: Option<&LevelCounts>, term_count: usize) -> Line<'static> {
    let Some(counts) = counts else {
        return Line::from(Span::styled(
            "Statistics loading...",
            Style::default().add_modifier(Modifier::DIM),
        ));
    };

    let practice = counts.practice(term_count);
    let learned = counts.get(LearningLevel::WellKnown);
    let mut spans = vec![Span::raw(format!("Learned {learned} | Practice {practice} |"))];
    for level in LearningLevel::PRACTICE {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("{}:{}", short_label(level), counts.get(level)),
            level_style(level),
        ));
    }
    Line::from(spans)
}

fn short_label(level: LearningLevel) -> &'static str {
    match level {
        LearningLevel::Unknown => "U",
        LearningLevel::Learning1 => "L1",
        LearningLevel::Learning2 => "L2",
        LearningLevel::Learning3 => "L3",
        LearningLevel::Learning4 => "L4",
        LearningLevel::Learning5 => "L5",
        LearningLevel::WellKnown => "W",
        LearningLevel::Ignored => "I",
        LearningLevel::Skipped => "S",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_statistics_line() {
        let counts = LevelCounts(BTreeMap::from([
            (LearningLevel::Skipped, 40),
            (LearningLevel::WellKnown, 30),
            (LearningLevel::Unknown, 20),
            (LearningLevel::Learning3, 10),
        ]));
        let line = statistics_line(Some(&counts), 100).to_string();
        assert_eq!(
            line,
            "Learned 30 | Practice 30 | U:20 L1:0 L2:0 L3:10 L4:0 L5:0"
        );
        assert_eq!(statistics_line(None, 100).to_string(), "Statistics loading...");
    }
}
