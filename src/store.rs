use std::collections::BTreeMap;
use std::ops::Range;

use crate::models::{Term, TermPatch, TermRange};

/// Sparse, index-ordered collection of the terms loaded so far.
///
/// Entries are only ever inserted or patched in place; an index never moves
/// and is never removed.
#[derive(Debug, Clone, Default)]
pub struct TermStore {
    terms: BTreeMap<usize, Term>,
}

impl TermStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.terms.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.terms.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Loaded terms whose index falls in `range`, in index order.
    pub fn loaded_in(&self, range: Range<usize>) -> impl Iterator<Item = &Term> {
        self.terms.range(range).map(|(_, term)| term)
    }

    /// Sub-ranges of `range` that hold no loaded term.
    pub fn missing_in(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let mut gaps = Vec::new();
        let mut cursor = range.start;
        for &index in self.terms.range(range.clone()).map(|(index, _)| index) {
            if index > cursor {
                gaps.push(cursor..index);
            }
            cursor = index + 1;
        }
        if cursor < range.end {
            gaps.push(cursor..range.end);
        }
        gaps
    }

    /// Insert every served term whose index is not loaded yet.
    ///
    /// Terms outside the served bounds are ignored. Returns the indices that
    /// changed, which is all a renderer needs to redraw.
    pub fn merge(&mut self, range: TermRange) -> Vec<usize> {
        let served = range.begin..range.end;
        let mut changed = Vec::new();
        for term in range.terms {
            if !served.contains(&term.index) || self.terms.contains_key(&term.index) {
                continue;
            }
            changed.push(term.index);
            self.terms.insert(term.index, term);
        }
        changed.sort_unstable();
        changed
    }

    /// Update a loaded term in place. Returns false when the index is not loaded.
    pub fn merge_patch(&mut self, index: usize, patch: TermPatch) -> bool {
        let Some(term) = self.terms.get_mut(&index) else {
            return false;
        };
        match patch {
            TermPatch::LearningLevel(level) => term.learning_level = level,
            TermPatch::Meaning(meaning) => term.meaning = meaning.into(),
            TermPatch::CountInText(count) => term.count = count.into(),
        }
        true
    }

    /// Apply `patch` to every loaded occurrence of the same vocabulary entry.
    pub fn merge_patch_for_id(&mut self, id: u64, patch: &TermPatch) -> Vec<usize> {
        let indices: Vec<usize> = self
            .terms
            .values()
            .filter(|term| term.id == Some(id))
            .map(|term| term.index)
            .collect();
        for &index in &indices {
            self.merge_patch(index, patch.clone());
        }
        indices
    }
}
