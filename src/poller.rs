use std::time::{Duration, Instant};

use crate::logging;
use crate::models::ReadingText;
use crate::timer::{Interval, earliest};

pub const POLL_PERIOD: Duration = Duration::from_secs(2);

/// Server-side progress of splitting a text into terms and looking them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// The server has not reported a term count yet.
    Unprocessed,
    Processing { processed: usize, total: usize },
    Done,
}

impl ProcessingState {
    pub fn of(term_count: usize, processed_term_count: usize) -> Self {
        if term_count == 0 {
            ProcessingState::Unprocessed
        } else if processed_term_count < term_count {
            ProcessingState::Processing {
                processed: processed_term_count,
                total: term_count,
            }
        } else {
            ProcessingState::Done
        }
    }

    /// Floor percentage of processed terms, undefined until the term count is known.
    pub fn percentage(self) -> Option<usize> {
        match self {
            ProcessingState::Unprocessed => None,
            ProcessingState::Processing { processed, total } => Some(processed * 100 / total),
            ProcessingState::Done => Some(100),
        }
    }

    pub fn label(self) -> String {
        match self {
            ProcessingState::Unprocessed => "Processing".to_string(),
            ProcessingState::Processing { processed, total } => {
                format!("{processed}/{total}({}%)", processed * 100 / total)
            }
            ProcessingState::Done => "Done".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollRequest {
    TermCount(u64),
    ProcessedTermCount(u64),
}

/// Polls the server until a text is fully processed.
///
/// Each transition edge has its own interval. An interval starts the first
/// time its condition holds and is cleared as soon as it no longer does;
/// `teardown` (and drop) clear both.
#[derive(Debug)]
pub struct ProcessingStatusPoller {
    term_count_timer: Interval,
    processed_timer: Interval,
}

impl ProcessingStatusPoller {
    pub fn new(period: Duration) -> Self {
        Self {
            term_count_timer: Interval::new(period),
            processed_timer: Interval::new(period),
        }
    }

    /// Reconcile timers with `text` and return the polls that are due.
    pub fn due(&mut self, now: Instant, text: &ReadingText) -> Vec<PollRequest> {
        let mut requests = Vec::new();

        if text.term_count == 0 {
            if !self.term_count_timer.is_running() {
                logging::debug(format!("text {} unprocessed, polling term count", text.id));
            }
            self.term_count_timer.start(now);
            if self.term_count_timer.fire(now) {
                requests.push(PollRequest::TermCount(text.id));
            }
        } else {
            self.term_count_timer.clear();
        }

        if text.processed_term_count < text.term_count {
            if !self.processed_timer.is_running() {
                logging::debug(format!(
                    "text {} processing, polling processed count",
                    text.id
                ));
            }
            self.processed_timer.start(now);
            if self.processed_timer.fire(now) {
                requests.push(PollRequest::ProcessedTermCount(text.id));
            }
        } else if self.processed_timer.is_running() {
            logging::info(format!("text {} processing done", text.id));
            self.processed_timer.clear();
        }

        requests
    }

    pub fn deadline(&self) -> Option<Instant> {
        earliest([self.term_count_timer.deadline(), self.processed_timer.deadline()])
    }

    pub fn teardown(&mut self) {
        self.term_count_timer.clear();
        self.processed_timer.clear();
    }
}

impl Drop for ProcessingStatusPoller {
    fn drop(&mut self) {
        self.teardown();
    }
}
