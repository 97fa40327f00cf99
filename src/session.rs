use std::ops::Range;
use std::time::{Duration, Instant};

use crate::error::{MissingReadingState, NetworkError};
use crate::fetcher::{Edge, FetchTicket, RangeFetcher};
use crate::logging;
use crate::models::{LearningLevel, LevelCounts, ReadingText, Term, TermKind, TermPatch, TermRange};
use crate::poller::{POLL_PERIOD, PollRequest, ProcessingState, ProcessingStatusPoller};
use crate::scroller::{BookmarkScroller, ScrollRequest};
use crate::store::TermStore;
use crate::timer::earliest;
use crate::viewport::{VIEWING_DEBOUNCE, ViewportObserver};
use crate::window::{Growth, ScrollMetrics, WindowController, WindowSizing};

/// Work the session wants done outside the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadText(u64),
    FetchTerms { text_id: u64, ticket: FetchTicket },
    Poll(PollRequest),
    SetBookmark { text_id: u64, index: usize },
    EditTerm(Term),
    LoadMeaning { term_id: u64, index: usize },
    LoadCountInText { term_id: u64, text_id: u64 },
    LoadStatistics(u64),
}

/// The result of an [`Effect`], fed back through [`ReadingSession::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    TextLoaded(Result<ReadingText, NetworkError>),
    TermsLoaded {
        ticket: FetchTicket,
        result: Result<TermRange, NetworkError>,
    },
    TermCount(Result<usize, NetworkError>),
    ProcessedTermCount(Result<usize, NetworkError>),
    Meaning {
        index: usize,
        result: Result<Option<String>, NetworkError>,
    },
    CountInText {
        term_id: u64,
        result: Result<Option<u32>, NetworkError>,
    },
    Statistics(Result<LevelCounts, NetworkError>),
    BookmarkSaved(Result<(), NetworkError>),
    TermEdited(Result<(), NetworkError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStep {
    Better,
    Worse,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub sizing: WindowSizing,
    pub edge_threshold: usize,
    pub anchor_stride: usize,
    pub viewing_debounce: Duration,
    pub poll_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sizing: WindowSizing::WIDE,
            edge_threshold: 3,
            anchor_stride: 20,
            viewing_debounce: VIEWING_DEBOUNCE,
            poll_period: POLL_PERIOD,
        }
    }
}

/// Everything the reading view knows about one open text.
///
/// State changes only through the methods below; anything that needs the
/// server comes back as an [`Effect`] and returns as a [`Completion`].
#[derive(Debug)]
pub struct ReadingSession {
    text_id: u64,
    text: Option<ReadingText>,
    store: TermStore,
    window: WindowController,
    fetcher: RangeFetcher,
    scroller: BookmarkScroller,
    observer: ViewportObserver,
    poller: ProcessingStatusPoller,
    selected: Option<usize>,
    pending_scroll: Option<ScrollRequest>,
    notices: Vec<String>,
}

impl ReadingSession {
    pub fn new(text_id: u64, options: SessionOptions) -> Self {
        Self {
            text_id,
            text: None,
            store: TermStore::new(),
            window: WindowController::new(options.sizing, options.edge_threshold),
            fetcher: RangeFetcher::new(),
            scroller: BookmarkScroller::new(),
            observer: ViewportObserver::new(options.anchor_stride, options.viewing_debounce),
            poller: ProcessingStatusPoller::new(options.poll_period),
            selected: None,
            pending_scroll: None,
            notices: Vec::new(),
        }
    }

    /// First effect of a freshly opened view.
    pub fn open(&self) -> Vec<Effect> {
        logging::info(format!("opening text {}", self.text_id));
        vec![Effect::LoadText(self.text_id)]
    }

    pub fn text_id(&self) -> u64 {
        self.text_id
    }

    pub fn text(&self) -> Result<&ReadingText, MissingReadingState> {
        self.text.as_ref().ok_or(MissingReadingState)
    }

    pub fn is_loaded(&self) -> bool {
        self.text.is_some()
    }

    /// A term for drawing. Asking before the text is open is a wiring bug.
    pub fn term(&self, index: usize) -> Result<Option<&Term>, MissingReadingState> {
        self.text()?;
        Ok(self.store.get(index))
    }

    pub fn store(&self) -> &TermStore {
        &self.store
    }

    pub fn window(&self) -> Option<Range<usize>> {
        self.window.bounds()
    }

    pub fn bookmark(&self) -> Option<usize> {
        self.text.as_ref().and_then(|text| text.bookmark)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn viewing_index(&self) -> Option<usize> {
        self.observer.viewing()
    }

    pub fn processing_state(&self) -> Option<ProcessingState> {
        self.text
            .as_ref()
            .map(|text| ProcessingState::of(text.term_count, text.processed_term_count))
    }

    /// The view is usable once the server knows how many terms the text has.
    pub fn is_readable(&self) -> bool {
        self.text.as_ref().is_some_and(|text| text.term_count > 0)
    }

    pub fn is_fetching(&self) -> bool {
        !self.fetcher.is_idle()
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Scroll the view should perform now, if any.
    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.pending_scroll.take().or_else(|| self.scroller.take_correction())
    }

    /// Earliest instant at which `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.poller.deadline(), self.observer.deadline()])
    }

    /// Advance timers: status polls and the debounced viewing index.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if self.observer.poll(now).is_some() {
            logging::debug(format!("viewing index {:?}", self.observer.viewing()));
        }
        let Some(text) = self.text.as_ref() else {
            return Vec::new();
        };
        self.poller
            .due(now, text)
            .into_iter()
            .map(Effect::Poll)
            .collect()
    }

    /// Scroll position changed. `top_visible` is the first index on screen.
    pub fn on_scroll(
        &mut self,
        metrics: ScrollMetrics,
        top_visible: Option<usize>,
    ) -> Vec<Effect> {
        let Some(term_count) = self.text.as_ref().map(|text| text.term_count) else {
            return Vec::new();
        };

        let mut effects = self.refill();

        if let Some(growth) = self.window.on_scroll(metrics, term_count, &self.store) {
            if growth.edge == Edge::Top {
                self.scroller.on_top_growth(top_visible, growth.range.clone());
            }
            effects.extend(self.dispatch_growth(growth));
        }
        effects
    }

    /// The viewport changed size; window sizing may change with it.
    pub fn on_resize(&mut self, sizing: WindowSizing) -> Vec<Effect> {
        self.window.set_sizing(sizing);
        self.refill()
    }

    pub fn observe_viewport(&mut self, visible: impl IntoIterator<Item = usize>, now: Instant) {
        self.observer.observe(visible, now);
    }

    pub fn apply(&mut self, completion: Completion) -> Vec<Effect> {
        match completion {
            Completion::TextLoaded(Ok(mut text)) => {
                if text.bookmark.is_none() {
                    text.bookmark = Some(0);
                }
                logging::info(format!(
                    "text {} loaded: {} terms, bookmark {:?}",
                    text.id, text.term_count, text.bookmark
                ));
                let text_id = text.id;
                self.text = Some(text);
                let mut effects = vec![Effect::LoadStatistics(text_id)];
                effects.extend(self.initialize_window());
                effects
            }
            Completion::TermsLoaded { ticket, result } => {
                let outcome = self.fetcher.complete(&ticket, result, &mut self.store);
                if let Some(notice) = outcome.notice {
                    self.notices.push(notice);
                }
                self.scroller.on_merged(&outcome.changed);
                if let Some(bookmark) = self.bookmark() {
                    if let Some(request) =
                        self.scroller.on_loaded(&self.window, &self.store, bookmark)
                    {
                        self.pending_scroll = Some(request);
                    }
                }
                Vec::new()
            }
            Completion::TermCount(Ok(term_count)) => {
                if let Some(text) = self.text.as_mut() {
                    text.term_count = term_count;
                }
                self.initialize_window()
            }
            Completion::ProcessedTermCount(Ok(processed)) => {
                if let Some(text) = self.text.as_mut() {
                    text.processed_term_count = processed;
                }
                Vec::new()
            }
            Completion::Meaning { index, result: Ok(meaning) } => {
                self.store.merge_patch(index, TermPatch::Meaning(meaning));
                Vec::new()
            }
            Completion::CountInText { term_id, result: Ok(count) } => {
                self.store
                    .merge_patch_for_id(term_id, &TermPatch::CountInText(count));
                Vec::new()
            }
            Completion::Statistics(Ok(counts)) => {
                if let Some(text) = self.text.as_mut() {
                    text.terms_count_by_learning_level = Some(counts);
                }
                Vec::new()
            }
            Completion::BookmarkSaved(Ok(())) | Completion::TermEdited(Ok(())) => Vec::new(),
            Completion::TextLoaded(Err(err))
            | Completion::TermCount(Err(err))
            | Completion::ProcessedTermCount(Err(err))
            | Completion::Meaning { result: Err(err), .. }
            | Completion::CountInText { result: Err(err), .. }
            | Completion::Statistics(Err(err))
            | Completion::BookmarkSaved(Err(err))
            | Completion::TermEdited(Err(err)) => {
                logging::warn(format!("request for text {} failed: {err}", self.text_id));
                self.notices.push(err.notice());
                Vec::new()
            }
        }
    }

    /// Open a term for inspection, fetching what it is still missing.
    pub fn inspect(&mut self, index: usize) -> Result<Vec<Effect>, MissingReadingState> {
        let text_id = self.text()?.id;
        let Some(term) = self.store.get(index) else {
            return Ok(Vec::new());
        };
        if term.kind() == TermKind::Skipped {
            return Ok(Vec::new());
        }
        self.selected = Some(index);

        let mut effects = Vec::new();
        if let Some(term_id) = term.id {
            if term.needs_meaning() {
                effects.push(Effect::LoadMeaning { term_id, index });
            }
            if term.needs_count() {
                effects.push(Effect::LoadCountInText { term_id, text_id });
            }
        }
        Ok(effects)
    }

    /// Move the learning level of a term one step. The term becomes the bookmark.
    pub fn change_level(
        &mut self,
        index: usize,
        step: LevelStep,
    ) -> Result<Vec<Effect>, MissingReadingState> {
        self.text()?;
        let Some(current) = self.store.get(index).map(|term| term.learning_level) else {
            return Ok(Vec::new());
        };
        let level = match step {
            LevelStep::Better => current.next(),
            LevelStep::Worse => current.previous(),
        };
        self.set_level(index, level)
    }

    /// Commit a learning level for a term and every loaded occurrence of the
    /// same vocabulary entry. The term becomes the bookmark.
    pub fn set_level(
        &mut self,
        index: usize,
        level: LearningLevel,
    ) -> Result<Vec<Effect>, MissingReadingState> {
        self.text()?;
        let Some((previous, term_id)) = self
            .store
            .get(index)
            .map(|term| (term.learning_level, term.id))
        else {
            return Ok(Vec::new());
        };
        if previous == LearningLevel::Skipped || level == LearningLevel::Skipped {
            return Ok(Vec::new());
        }

        let mut effects = Vec::new();
        if level != previous {
            let patch = TermPatch::LearningLevel(level);
            match term_id {
                Some(id) => {
                    self.store.merge_patch_for_id(id, &patch);
                }
                None => {
                    self.store.merge_patch(index, patch);
                }
            }
            logging::info(format!(
                "term {index} {} -> {}",
                previous.label(),
                level.label()
            ));
            if let Some(edited) = self.store.get(index) {
                effects.push(Effect::EditTerm(edited.clone()));
            }
        }

        effects.extend(self.set_bookmark(index, previous)?);
        Ok(effects)
    }

    /// Select the next (or previous) term that reacts to input, starting from
    /// the selection or the term being viewed.
    pub fn select_step(&mut self, forward: bool) -> Option<usize> {
        let window = self.window.bounds()?;
        let origin = self
            .selected
            .or(self.observer.viewing())
            .or(self.bookmark())
            .unwrap_or(window.start);

        let candidate = if forward {
            self.store
                .loaded_in(origin.saturating_add(1).max(window.start)..window.end)
                .find(|term| term.kind() != TermKind::Skipped)
        } else {
            self.store
                .loaded_in(window.start..origin.min(window.end))
                .filter(|term| term.kind() != TermKind::Skipped)
                .last()
        }
        .map(|term| term.index);

        if candidate.is_some() {
            self.selected = candidate;
        }
        candidate
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// Clear every timer this session started.
    pub fn teardown(&mut self) {
        self.poller.teardown();
        self.observer.teardown();
    }

    fn set_bookmark(
        &mut self,
        index: usize,
        level_before: LearningLevel,
    ) -> Result<Vec<Effect>, MissingReadingState> {
        let text = self.text.as_mut().ok_or(MissingReadingState)?;
        text.bookmark = Some(index);
        self.selected = Some(index);

        let mut effects = vec![Effect::SetBookmark {
            text_id: text.id,
            index,
        }];

        let level_now = self.store.get(index).map(|term| term.learning_level);
        if level_now.is_some_and(|level| level != level_before) {
            // Statistics no longer match the text once the bookmarked term moves level.
            text.terms_count_by_learning_level = None;
            effects.push(Effect::LoadStatistics(text.id));
        }
        Ok(effects)
    }

    fn initialize_window(&mut self) -> Vec<Effect> {
        let Some(text) = self.text.as_ref() else {
            return Vec::new();
        };
        let bookmark = text.bookmark.unwrap_or(0);
        match self.window.initialize(bookmark, text.term_count) {
            Some(growth) => self.dispatch_growth(growth),
            None => Vec::new(),
        }
    }

    /// Re-request unloaded parts of the window on edges with nothing in flight,
    /// leaving alone any indices a pending request will still deliver.
    fn refill(&mut self) -> Vec<Effect> {
        if self.fetcher.in_flight(Edge::Initial) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        for gap in self.window.gaps(&self.store) {
            if self.fetcher.in_flight(gap.edge) || self.fetcher.overlaps_outstanding(&gap.range) {
                continue;
            }
            logging::debug(format!(
                "refilling [{}, {}) on {:?} edge",
                gap.range.start, gap.range.end, gap.edge
            ));
            effects.extend(self.dispatch_growth(gap));
        }
        effects
    }

    fn dispatch_growth(&mut self, growth: Growth) -> Vec<Effect> {
        let Some(term_count) = self.text.as_ref().map(|text| text.term_count) else {
            return Vec::new();
        };
        match self.fetcher.request(growth.edge, growth.range, term_count) {
            Ok(ticket) => vec![Effect::FetchTerms {
                text_id: self.text_id,
                ticket,
            }],
            Err(err) => {
                logging::error(err.to_string());
                Vec::new()
            }
        }
    }
}

impl Drop for ReadingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
