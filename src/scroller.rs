use std::ops::Range;

use crate::logging;
use crate::store::TermStore;
use crate::window::WindowController;

/// Where the view should scroll, in term indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRequest {
    /// Put this term in the vertical middle of the viewport.
    Center(usize),
    /// Put this term back on the first visible row.
    Anchor(usize),
}

/// Row lookup provided by whatever lays the terms out.
pub trait AnchorLayout {
    /// Row of the first line containing `index`, if it is laid out.
    fn row_of(&self, index: usize) -> Option<usize>;
    fn viewport_rows(&self) -> usize;
}

/// Translate a request into a scroll offset. `None` means leave the offset alone.
pub fn resolve(request: ScrollRequest, layout: &impl AnchorLayout) -> Option<usize> {
    match request {
        ScrollRequest::Center(index) => layout
            .row_of(index)
            .map(|row| row.saturating_sub(layout.viewport_rows() / 2)),
        ScrollRequest::Anchor(index) => layout.row_of(index),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingAnchor {
    index: usize,
    prefix: Range<usize>,
    prefix_loaded: bool,
}

/// Keeps the reader's place: centres the bookmark after the first full load,
/// and holds the visible position still while terms are prepended above it.
#[derive(Debug, Default)]
pub struct BookmarkScroller {
    centered: bool,
    pending: Option<PendingAnchor>,
}

impl BookmarkScroller {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot: the first time both window ends are loaded, centre the bookmark.
    pub fn on_loaded(
        &mut self,
        window: &WindowController,
        store: &TermStore,
        bookmark: usize,
    ) -> Option<ScrollRequest> {
        if self.centered || !window.anchors_loaded(store) {
            return None;
        }
        self.centered = true;
        logging::debug(format!("centering bookmark {bookmark}"));
        Some(ScrollRequest::Center(bookmark))
    }

    /// The window grew upwards by `prefix`; remember the term currently on the top row.
    pub fn on_top_growth(&mut self, top_visible: Option<usize>, prefix: Range<usize>) {
        self.pending = top_visible.map(|index| PendingAnchor {
            index,
            prefix,
            prefix_loaded: false,
        });
    }

    /// Indices just merged into the store, whichever request delivered them.
    pub fn on_merged(&mut self, changed: &[usize]) {
        if let Some(pending) = self.pending.as_mut() {
            if changed.iter().any(|index| pending.prefix.contains(index)) {
                pending.prefix_loaded = true;
            }
        }
    }

    /// Correction to apply once the layout includes the new prefix.
    pub fn take_correction(&mut self) -> Option<ScrollRequest> {
        match &self.pending {
            Some(PendingAnchor { index, prefix_loaded: true, .. }) => {
                let index = *index;
                self.pending = None;
                Some(ScrollRequest::Anchor(index))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LearningLevel, Term, TermRange};
    use crate::window::WindowSizing;
    use std::collections::HashMap;

    struct Rows {
        rows: HashMap<usize, usize>,
        height: usize,
    }

    impl AnchorLayout for Rows {
        fn row_of(&self, index: usize) -> Option<usize> {
            self.rows.get(&index).copied()
        }

        fn viewport_rows(&self) -> usize {
            self.height
        }
    }

    fn load(store: &mut TermStore, range: Range<usize>) {
        store.merge(TermRange {
            terms: range
                .clone()
                .map(|i| Term::new(i, "w", LearningLevel::Unknown))
                .collect(),
            begin: range.start,
            end: range.end,
        });
    }

    #[test]
    fn test_centers_once_after_both_ends_load() {
        let mut window = WindowController::new(WindowSizing::NARROW, 3);
        let mut store = TermStore::new();
        let mut scroller = BookmarkScroller::new();
        window.initialize(500, 1000);

        assert_eq!(scroller.on_loaded(&window, &store, 500), None);
        load(&mut store, 300..600);
        assert_eq!(scroller.on_loaded(&window, &store, 500), None);
        load(&mut store, 600..900);
        assert_eq!(scroller.on_loaded(&window, &store, 500), Some(ScrollRequest::Center(500)));
        assert_eq!(scroller.on_loaded(&window, &store, 500), None);
    }

    #[test]
    fn test_anchor_waits_for_prefix() {
        let mut scroller = BookmarkScroller::new();
        scroller.on_top_growth(Some(300), 0..300);
        assert_eq!(scroller.take_correction(), None);
        scroller.on_merged(&[300, 301]);
        assert_eq!(scroller.take_correction(), None);
        scroller.on_merged(&[120, 121]);
        assert_eq!(scroller.take_correction(), Some(ScrollRequest::Anchor(300)));
        assert_eq!(scroller.take_correction(), None);
    }

    #[test]
    fn test_growth_without_visible_term_needs_no_correction() {
        let mut scroller = BookmarkScroller::new();
        scroller.on_top_growth(None, 0..300);
        scroller.on_merged(&[0, 1]);
        assert_eq!(scroller.take_correction(), None);
    }

    #[test]
    fn test_resolve_against_layout() {
        let layout = Rows {
            rows: HashMap::from([(10, 4), (50, 40)]),
            height: 20,
        };
        assert_eq!(resolve(ScrollRequest::Center(50), &layout), Some(30));
        assert_eq!(resolve(ScrollRequest::Center(10), &layout), Some(0));
        assert_eq!(resolve(ScrollRequest::Anchor(50), &layout), Some(40));
        assert_eq!(resolve(ScrollRequest::Anchor(99), &layout), None);
    }
}
