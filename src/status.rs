use std::io::Write;
use std::time::{Duration, Instant};

use crate::api::TextApi;
use crate::logging;
use crate::poller::{PollRequest, ProcessingState, ProcessingStatusPoller};

/// Follow a text's processing on the server until it is done, printing each
/// new status line to `out`.
///
/// Failed polls are reported on stderr and retried on the next period.
pub fn watch_processing(
    api: &dyn TextApi,
    text_id: u64,
    period: Duration,
    out: &mut impl Write,
) -> eyre::Result<ProcessingState> {
    let mut text = api
        .get_text_read(text_id)
        .map_err(|err| eyre::eyre!("{}: {err}", err.notice()))?;
    let mut poller = ProcessingStatusPoller::new(period);

    writeln!(out, "{}", text.title)?;
    let mut last_label = String::new();

    loop {
        let state = ProcessingState::of(text.term_count, text.processed_term_count);
        let label = state.label();
        if label != last_label {
            writeln!(out, "{label}")?;
            out.flush()?;
            last_label = label;
        }
        if state == ProcessingState::Done {
            return Ok(state);
        }

        let now = Instant::now();
        for request in poller.due(now, &text) {
            match request {
                PollRequest::TermCount(id) => match api.get_term_count(id) {
                    Ok(count) => text.term_count = count,
                    Err(err) => report(&err.notice(), &err.to_string()),
                },
                PollRequest::ProcessedTermCount(id) => match api.get_processed_term_count(id) {
                    Ok(count) => text.processed_term_count = count,
                    Err(err) => report(&err.notice(), &err.to_string()),
                },
            }
        }

        if let Some(deadline) = poller.deadline() {
            std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
        }
    }
}

fn report(notice: &str, detail: &str) {
    logging::warn(detail);
    eprintln!("{notice}");
}
