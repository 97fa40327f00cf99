use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::fetcher::Edge;
use crate::logging;
use crate::store::TermStore;

/// Screen class of the device the view is drawn on. More room needs more buffered terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    Wide,
    Narrow,
}

impl DeviceProfile {
    pub fn for_columns(columns: u16, wide_columns: u16) -> Self {
        if columns >= wide_columns {
            DeviceProfile::Wide
        } else {
            DeviceProfile::Narrow
        }
    }
}

/// How many terms to show around the bookmark at first, and how many to add per growth step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSizing {
    pub display_terms: usize,
    pub load_terms: usize,
}

impl WindowSizing {
    pub const WIDE: WindowSizing = WindowSizing {
        display_terms: 1000,
        load_terms: 300,
    };
    pub const NARROW: WindowSizing = WindowSizing {
        display_terms: 400,
        load_terms: 150,
    };
}

/// Distance of the viewport from both ends of the laid-out window, in view units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub from_top: usize,
    pub from_bottom: usize,
}

/// A window transition together with the range that now needs loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Growth {
    pub edge: Edge,
    pub range: Range<usize>,
}

/// Owns the half-open index window `[begin, end)` that should be loaded and drawn.
///
/// The window only ever grows, and always stays within `[0, term_count]`.
#[derive(Debug, Clone)]
pub struct WindowController {
    sizing: WindowSizing,
    edge_threshold: usize,
    bounds: Option<Range<usize>>,
}

impl WindowController {
    pub fn new(sizing: WindowSizing, edge_threshold: usize) -> Self {
        Self {
            sizing,
            edge_threshold,
            bounds: None,
        }
    }

    pub fn set_sizing(&mut self, sizing: WindowSizing) {
        if sizing != self.sizing {
            logging::debug(format!(
                "window sizing now {} shown / {} per step",
                sizing.display_terms, sizing.load_terms
            ));
        }
        self.sizing = sizing;
    }

    pub fn bounds(&self) -> Option<Range<usize>> {
        self.bounds.clone()
    }

    /// Last index inside the window.
    pub fn last_index(&self) -> Option<usize> {
        self.bounds
            .as_ref()
            .filter(|bounds| bounds.end > bounds.start)
            .map(|bounds| bounds.end - 1)
    }

    /// Place the window around the bookmark. Does nothing once bounds are set
    /// or while the text has no terms yet.
    pub fn initialize(&mut self, bookmark: usize, term_count: usize) -> Option<Growth> {
        if self.bounds.is_some() || term_count == 0 {
            return None;
        }
        let bookmark = bookmark.min(term_count - 1);
        let begin = bookmark.saturating_sub(self.sizing.display_terms / 2);
        let end = bookmark
            .saturating_add(self.sizing.display_terms)
            .min(term_count)
            .max(bookmark + 1);

        logging::info(format!(
            "window initialized at [{begin}, {end}) around bookmark {bookmark}"
        ));
        self.bounds = Some(begin..end);
        Some(Growth {
            edge: Edge::Initial,
            range: begin..end,
        })
    }

    /// Whether both ends of the window are loaded.
    pub fn anchors_loaded(&self, store: &TermStore) -> bool {
        match (&self.bounds, self.last_index()) {
            (Some(bounds), Some(last)) => store.contains(bounds.start) && store.contains(last),
            _ => false,
        }
    }

    /// React to a scroll position. At most one edge grows per call; the top
    /// is checked first.
    pub fn on_scroll(
        &mut self,
        metrics: ScrollMetrics,
        term_count: usize,
        store: &TermStore,
    ) -> Option<Growth> {
        let bounds = self.bounds.clone()?;

        if metrics.from_top < self.edge_threshold && bounds.start > 0 {
            if !self.anchors_loaded(store) {
                return None;
            }
            let begin = bounds.start.saturating_sub(self.sizing.load_terms);
            logging::debug(format!("window begin {} -> {begin}", bounds.start));
            self.bounds = Some(begin..bounds.end);
            return Some(Growth {
                edge: Edge::Top,
                range: begin..bounds.start,
            });
        }

        if metrics.from_bottom < self.edge_threshold && bounds.end < term_count {
            let end = bounds.end.saturating_add(self.sizing.load_terms).min(term_count);
            logging::debug(format!("window end {} -> {end}", bounds.end));
            self.bounds = Some(bounds.start..end);
            return Some(Growth {
                edge: Edge::Bottom,
                range: bounds.end..end,
            });
        }

        None
    }

    /// Unloaded parts of the window, at most one request per edge.
    ///
    /// Gaps left by failed fetches are attributed to the edge nearest to them
    /// and covered by a single range per edge.
    pub fn gaps(&self, store: &TermStore) -> Vec<Growth> {
        let Some(bounds) = self.bounds.clone() else {
            return Vec::new();
        };
        let middle = bounds.start + (bounds.end - bounds.start) / 2;

        let mut top: Option<Range<usize>> = None;
        let mut bottom: Option<Range<usize>> = None;
        for gap in store.missing_in(bounds) {
            let slot = if gap.end <= middle { &mut top } else { &mut bottom };
            *slot = Some(match slot.take() {
                Some(existing) => existing.start.min(gap.start)..existing.end.max(gap.end),
                None => gap,
            });
        }

        let mut gaps = Vec::new();
        if let Some(range) = top {
            gaps.push(Growth { edge: Edge::Top, range });
        }
        if let Some(range) = bottom {
            gaps.push(Growth { edge: Edge::Bottom, range });
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LearningLevel, Term, TermRange};

    fn loaded(store: &mut TermStore, range: Range<usize>) {
        store.merge(TermRange {
            terms: range
                .clone()
                .map(|i| Term::new(i, "w", LearningLevel::Unknown))
                .collect(),
            begin: range.start,
            end: range.end,
        });
    }

    fn far() -> ScrollMetrics {
        ScrollMetrics { from_top: 500, from_bottom: 500 }
    }

    #[test]
    fn test_initialize_around_bookmark_on_wide_profile() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let growth = window.initialize(1000, 5000).unwrap();
        assert_eq!(growth, Growth { edge: Edge::Initial, range: 500..2000 });
        assert_eq!(window.bounds(), Some(500..2000));
        assert_eq!(window.last_index(), Some(1999));
    }

    #[test]
    fn test_initialize_clamps_to_document() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        assert_eq!(window.initialize(10, 120).unwrap().range, 0..120);

        let mut window = WindowController::new(WindowSizing::NARROW, 3);
        assert_eq!(window.initialize(0, 5000).unwrap().range, 0..400);
    }

    #[test]
    fn test_oversized_configured_sizing_saturates() {
        let sizing = WindowSizing { display_terms: usize::MAX, load_terms: usize::MAX };
        let mut window = WindowController::new(sizing, 3);
        let mut store = TermStore::new();
        assert_eq!(window.initialize(10, 50).unwrap().range, 0..50);

        let mut window = WindowController::new(WindowSizing::NARROW, 3);
        window.initialize(0, 5000);
        loaded(&mut store, 0..400);
        window.set_sizing(sizing);
        let growth = window
            .on_scroll(ScrollMetrics { from_top: 40, from_bottom: 0 }, 5000, &store)
            .unwrap();
        assert_eq!(growth.range, 400..5000);
    }

    #[test]
    fn test_initialize_waits_for_terms_and_runs_once() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        assert!(window.initialize(0, 0).is_none());
        assert!(window.initialize(0, 10).is_some());
        assert!(window.initialize(5, 10).is_none());
    }

    #[test]
    fn test_bottom_growth_by_load_step() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let mut store = TermStore::new();
        window.initialize(1000, 5000);
        loaded(&mut store, 500..2000);

        let growth = window
            .on_scroll(ScrollMetrics { from_top: 400, from_bottom: 1 }, 5000, &store)
            .unwrap();
        assert_eq!(growth, Growth { edge: Edge::Bottom, range: 2000..2300 });
        assert_eq!(window.bounds(), Some(500..2300));
    }

    #[test]
    fn test_bottom_growth_stops_at_term_count() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let store = TermStore::new();
        window.initialize(4500, 5000);
        assert_eq!(window.bounds(), Some(4000..5000));
        assert!(window
            .on_scroll(ScrollMetrics { from_top: 400, from_bottom: 0 }, 5000, &store)
            .is_none());
    }

    #[test]
    fn test_top_growth_requires_loaded_anchors() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let mut store = TermStore::new();
        window.initialize(1000, 5000);
        let near_top = ScrollMetrics { from_top: 0, from_bottom: 900 };

        assert!(window.on_scroll(near_top, 5000, &store).is_none());
        assert_eq!(window.bounds(), Some(500..2000));

        loaded(&mut store, 500..2000);
        let growth = window.on_scroll(near_top, 5000, &store).unwrap();
        assert_eq!(growth, Growth { edge: Edge::Top, range: 200..500 });

        // The new prefix is not loaded yet, so a second gesture is ignored.
        assert!(window.on_scroll(near_top, 5000, &store).is_none());

        loaded(&mut store, 200..500);
        let growth = window.on_scroll(near_top, 5000, &store).unwrap();
        assert_eq!(growth.range, 0..200);
        assert_eq!(window.bounds(), Some(0..2000));
        loaded(&mut store, 0..200);
        assert!(window.on_scroll(near_top, 5000, &store).is_none());
    }

    #[test]
    fn test_scroll_away_from_edges_is_a_no_op() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let mut store = TermStore::new();
        window.initialize(1000, 5000);
        loaded(&mut store, 500..2000);
        assert!(window.on_scroll(far(), 5000, &store).is_none());
        assert_eq!(window.bounds(), Some(500..2000));
    }

    #[test]
    fn test_bounds_only_move_outward_and_stay_clamped() {
        let term_count = 2345;
        let mut window = WindowController::new(WindowSizing::NARROW, 3);
        let mut store = TermStore::new();
        window.initialize(1200, term_count);
        let mut previous = window.bounds().unwrap();

        let gestures = [
            ScrollMetrics { from_top: 0, from_bottom: 50 },
            ScrollMetrics { from_top: 50, from_bottom: 0 },
            far(),
            ScrollMetrics { from_top: 0, from_bottom: 0 },
        ];
        for step in 0..40 {
            let bounds = window.bounds().unwrap();
            loaded(&mut store, bounds);
            window.on_scroll(gestures[step % gestures.len()], term_count, &store);

            let bounds = window.bounds().unwrap();
            assert!(bounds.start <= previous.start);
            assert!(bounds.end >= previous.end);
            assert!(bounds.start < bounds.end);
            assert!(window.last_index().unwrap() <= term_count - 1);
            previous = bounds;
        }
        assert_eq!(window.bounds(), Some(0..term_count));
    }

    #[test]
    fn test_gaps_grouped_per_edge() {
        let mut window = WindowController::new(WindowSizing::WIDE, 3);
        let mut store = TermStore::new();
        window.initialize(1000, 5000);
        loaded(&mut store, 600..1900);
        loaded(&mut store, 1950..1960);

        let gaps = window.gaps(&store);
        assert_eq!(
            gaps,
            vec![
                Growth { edge: Edge::Top, range: 500..600 },
                Growth { edge: Edge::Bottom, range: 1900..2000 },
            ]
        );

        loaded(&mut store, 500..2000);
        assert!(window.gaps(&store).is_empty());
    }

    #[test]
    fn test_profile_for_columns() {
        assert_eq!(DeviceProfile::for_columns(120, 100), DeviceProfile::Wide);
        assert_eq!(DeviceProfile::for_columns(80, 100), DeviceProfile::Narrow);
    }
}
