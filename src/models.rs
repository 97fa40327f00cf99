use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LearningLevel {
    #[default]
    #[serde(rename = "UnKnow")]
    Unknown,
    Learning1,
    Learning2,
    Learning3,
    Learning4,
    Learning5,
    #[serde(rename = "WellKnow")]
    WellKnown,
    Ignored,
    Skipped,
}

impl LearningLevel {
    /// Levels shown in the per-level statistics bar.
    pub const PRACTICE: [LearningLevel; 6] = [
        LearningLevel::Unknown,
        LearningLevel::Learning1,
        LearningLevel::Learning2,
        LearningLevel::Learning3,
        LearningLevel::Learning4,
        LearningLevel::Learning5,
    ];

    /// The level one step closer to `WellKnown`. Ignored and Skipped don't move.
    pub fn next(self) -> Self {
        match self {
            LearningLevel::Unknown => LearningLevel::Learning1,
            LearningLevel::Learning1 => LearningLevel::Learning2,
            LearningLevel::Learning2 => LearningLevel::Learning3,
            LearningLevel::Learning3 => LearningLevel::Learning4,
            LearningLevel::Learning4 => LearningLevel::Learning5,
            LearningLevel::Learning5 | LearningLevel::WellKnown => LearningLevel::WellKnown,
            other => other,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            LearningLevel::WellKnown => LearningLevel::Learning5,
            LearningLevel::Learning5 => LearningLevel::Learning4,
            LearningLevel::Learning4 => LearningLevel::Learning3,
            LearningLevel::Learning3 => LearningLevel::Learning2,
            LearningLevel::Learning2 => LearningLevel::Learning1,
            LearningLevel::Learning1 | LearningLevel::Unknown => LearningLevel::Unknown,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LearningLevel::Unknown => "Unknown",
            LearningLevel::Learning1 => "Learning1",
            LearningLevel::Learning2 => "Learning2",
            LearningLevel::Learning3 => "Learning3",
            LearningLevel::Learning4 => "Learning4",
            LearningLevel::Learning5 => "Learning5",
            LearningLevel::WellKnown => "WellKnown",
            LearningLevel::Ignored => "Ignored",
            LearningLevel::Skipped => "Skipped",
        }
    }
}

/// How a term is drawn and whether it reacts to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// Punctuation and whitespace, printed verbatim.
    Skipped,
    /// Well known or ignored; selectable but never looked up.
    Settled,
    Interactive,
}

impl From<LearningLevel> for TermKind {
    fn from(level: LearningLevel) -> Self {
        match level {
            LearningLevel::Skipped => TermKind::Skipped,
            LearningLevel::WellKnown | LearningLevel::Ignored => TermKind::Settled,
            _ => TermKind::Interactive,
        }
    }
}

/// A lazily enriched field.
///
/// The server distinguishes "never asked" (field missing) from "asked, nothing
/// there" (`null`), and only the first one should trigger a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lookup<T> {
    #[default]
    NotFetched,
    Empty,
    Resolved(T),
}

impl<T> Lookup<T> {
    pub fn is_not_fetched(&self) -> bool {
        matches!(self, Lookup::NotFetched)
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Resolved(value),
            None => Lookup::Empty,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Lookup<T> {
    // Only reached when the field is present; `#[serde(default)]` covers absence.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T: Serialize> Serialize for Lookup<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Lookup::Resolved(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<u64>,
    pub content: String,
    #[serde(default)]
    pub learning_level: LearningLevel,
    #[serde(default, skip_serializing_if = "Lookup::is_not_fetched")]
    pub meaning: Lookup<String>,
    #[serde(default, skip_serializing_if = "Lookup::is_not_fetched")]
    pub count: Lookup<u32>,
}

impl Term {
    pub fn new(index: usize, content: impl Into<String>, learning_level: LearningLevel) -> Self {
        Self {
            index,
            id: None,
            content: content.into(),
            learning_level,
            meaning: Lookup::NotFetched,
            count: Lookup::NotFetched,
        }
    }

    pub fn kind(&self) -> TermKind {
        self.learning_level.into()
    }

    /// A meaning lookup is worth issuing only once, and only for terms still being learned.
    pub fn needs_meaning(&self) -> bool {
        self.id.is_some() && self.meaning.is_not_fetched() && self.kind() == TermKind::Interactive
    }

    pub fn needs_count(&self) -> bool {
        self.id.is_some() && self.count.is_not_fetched() && self.kind() != TermKind::Skipped
    }
}

/// Terms served for a half-open index range, with the bounds the server actually served.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TermRange {
    pub terms: Vec<Term>,
    pub begin: usize,
    pub end: usize,
}

/// In-place update for a term that is already loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum TermPatch {
    LearningLevel(LearningLevel),
    Meaning(Option<String>),
    CountInText(Option<u32>),
}

/// Term counts per learning level for a whole text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelCounts(pub BTreeMap<LearningLevel, usize>);

impl LevelCounts {
    pub fn get(&self, level: LearningLevel) -> usize {
        self.0.get(&level).copied().unwrap_or(0)
    }

    /// Terms that still need practice: everything but skipped, ignored and well known.
    pub fn practice(&self, term_count: usize) -> usize {
        term_count
            .saturating_sub(self.get(LearningLevel::Skipped))
            .saturating_sub(self.get(LearningLevel::Ignored))
            .saturating_sub(self.get(LearningLevel::WellKnown))
    }
}

/// Document-level state of the text being read. Terms and window bounds live
/// in the session's store and window controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingText {
    pub id: u64,
    pub title: String,
    pub language_code: String,
    pub term_count: usize,
    pub processed_term_count: usize,
    pub bookmark: Option<usize>,
    pub terms_count_by_learning_level: Option<LevelCounts>,
}
