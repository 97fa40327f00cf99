use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::api::TextApi;
use crate::logging;
use crate::poller::PollRequest;
use crate::session::{Completion, Effect};

/// Runs session effects on worker threads and hands the results back.
///
/// Each effect gets its own thread; completions come back in arrival order,
/// which is not necessarily dispatch order.
pub struct Dispatcher {
    api: Arc<dyn TextApi>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    outstanding: usize,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn TextApi>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub fn dispatch(&mut self, effect: Effect) {
        self.outstanding += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let completion = run(api.as_ref(), effect);
            // The receiver is gone once the view has closed; nothing to deliver to.
            let _ = tx.send(completion);
        });
    }

    pub fn dispatch_all(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.dispatch(effect);
        }
    }

    /// Effects dispatched whose completion has not been drained yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Completions that have arrived so far, without blocking.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut completions = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    self.outstanding = self.outstanding.saturating_sub(1);
                    completions.push(completion);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    logging::error("completion channel disconnected");
                    break;
                }
            }
        }
        completions
    }

    /// Block until the next completion arrives. Used by headless callers.
    pub fn recv(&mut self) -> Option<Completion> {
        let completion = self.rx.recv().ok()?;
        self.outstanding = self.outstanding.saturating_sub(1);
        Some(completion)
    }
}

/// Perform one effect against the API. Blocking.
pub fn run(api: &dyn TextApi, effect: Effect) -> Completion {
    match effect {
        Effect::LoadText(text_id) => Completion::TextLoaded(api.get_text_read(text_id)),
        Effect::FetchTerms { text_id, ticket } => {
            let result = api.get_text_terms(text_id, ticket.range.start, ticket.range.end);
            Completion::TermsLoaded { ticket, result }
        }
        Effect::Poll(PollRequest::TermCount(text_id)) => {
            Completion::TermCount(api.get_term_count(text_id))
        }
        Effect::Poll(PollRequest::ProcessedTermCount(text_id)) => {
            Completion::ProcessedTermCount(api.get_processed_term_count(text_id))
        }
        Effect::SetBookmark { text_id, index } => {
            Completion::BookmarkSaved(api.set_text_bookmark(text_id, index))
        }
        Effect::EditTerm(term) => Completion::TermEdited(api.edit_term(&term)),
        Effect::LoadMeaning { term_id, index } => Completion::Meaning {
            index,
            result: api.get_term_meaning(term_id, index),
        },
        Effect::LoadCountInText { term_id, text_id } => Completion::CountInText {
            term_id,
            result: api.get_term_count_in_text(term_id, text_id),
        },
        Effect::LoadStatistics(text_id) => {
            Completion::Statistics(api.get_term_count_by_learning_level(text_id))
        }
    }
}
