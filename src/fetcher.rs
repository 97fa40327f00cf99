use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::error::{InvalidRangeRequest, NetworkError};
use crate::logging;
use crate::models::TermRange;
use crate::store::TermStore;

/// Which side of the window a range request grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Initial,
    Top,
    Bottom,
}

/// Identifies one dispatched range request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub edge: Edge,
    pub serial: u64,
    pub range: Range<usize>,
}

/// What a completed request did to the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchOutcome {
    pub changed: Vec<usize>,
    /// False when a newer request on the same edge had already taken over.
    pub current: bool,
    pub notice: Option<String>,
}

/// Issues range requests and folds their responses into a [`TermStore`].
///
/// At most one request per edge is tracked. A newer request on an edge
/// replaces the tracked one; the older response is still merged when it
/// arrives, it is just no longer waited for. The ranges of every request
/// without a response are kept so the same indices are never asked twice.
#[derive(Debug, Default)]
pub struct RangeFetcher {
    next_serial: u64,
    in_flight: HashMap<Edge, u64>,
    outstanding: BTreeMap<u64, Range<usize>>,
}

impl RangeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(
        &mut self,
        edge: Edge,
        range: Range<usize>,
        term_count: usize,
    ) -> Result<FetchTicket, InvalidRangeRequest> {
        if range.start >= range.end || range.end > term_count {
            return Err(InvalidRangeRequest {
                from: range.start,
                to: range.end,
                term_count,
            });
        }

        self.next_serial += 1;
        let serial = self.next_serial;
        if let Some(previous) = self.in_flight.insert(edge, serial) {
            logging::debug(format!(
                "{edge:?} fetch #{serial} supersedes #{previous}"
            ));
        }
        logging::debug(format!(
            "fetch #{serial} on {edge:?} edge for [{}, {})",
            range.start, range.end
        ));
        self.outstanding.insert(serial, range.clone());

        Ok(FetchTicket { edge, serial, range })
    }

    pub fn in_flight(&self, edge: Edge) -> bool {
        self.in_flight.contains_key(&edge)
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Whether any request still awaiting its response covers part of `range`.
    pub fn overlaps_outstanding(&self, range: &Range<usize>) -> bool {
        self.outstanding
            .values()
            .any(|pending| pending.start < range.end && range.start < pending.end)
    }

    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<TermRange, NetworkError>,
        store: &mut TermStore,
    ) -> FetchOutcome {
        let current = self.in_flight.get(&ticket.edge) == Some(&ticket.serial);
        if current {
            self.in_flight.remove(&ticket.edge);
        }
        self.outstanding.remove(&ticket.serial);

        match result {
            Ok(mut served) => {
                if served.begin >= served.end {
                    served.begin = ticket.range.start;
                    served.end = ticket.range.end;
                }
                if served.begin != ticket.range.start || served.end != ticket.range.end {
                    logging::debug(format!(
                        "fetch #{} asked [{}, {}) but was served [{}, {})",
                        ticket.serial,
                        ticket.range.start,
                        ticket.range.end,
                        served.begin,
                        served.end
                    ));
                }
                let changed = store.merge(served);
                FetchOutcome { changed, current, notice: None }
            }
            Err(err) => {
                logging::warn(format!(
                    "fetch #{} for [{}, {}) failed: {err}",
                    ticket.serial, ticket.range.start, ticket.range.end
                ));
                FetchOutcome {
                    changed: Vec::new(),
                    current,
                    notice: Some(err.notice()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LearningLevel, Term};

    fn served(range: Range<usize>) -> TermRange {
        TermRange {
            terms: range
                .clone()
                .map(|i| Term::new(i, format!("w{i}"), LearningLevel::Unknown))
                .collect(),
            begin: range.start,
            end: range.end,
        }
    }

    #[test]
    fn test_rejects_invalid_ranges() {
        let mut fetcher = RangeFetcher::new();
        assert!(fetcher.request(Edge::Bottom, 10..10, 100).is_err());
        assert!(fetcher.request(Edge::Bottom, 20..10, 100).is_err());
        assert!(fetcher.request(Edge::Bottom, 90..101, 100).is_err());
        assert!(fetcher.is_idle());
        assert!(fetcher.request(Edge::Bottom, 90..100, 100).is_ok());
    }

    #[test]
    fn test_success_merges_and_clears_edge() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let ticket = fetcher.request(Edge::Initial, 0..5, 50).unwrap();
        assert!(fetcher.in_flight(Edge::Initial));

        let outcome = fetcher.complete(&ticket, Ok(served(0..5)), &mut store);
        assert!(outcome.current);
        assert_eq!(outcome.changed, vec![0, 1, 2, 3, 4]);
        assert!(!fetcher.in_flight(Edge::Initial));
    }

    #[test]
    fn test_superseded_response_is_still_merged() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let first = fetcher.request(Edge::Bottom, 100..400, 1000).unwrap();
        let second = fetcher.request(Edge::Bottom, 300..600, 1000).unwrap();

        let outcome = fetcher.complete(&second, Ok(served(300..600)), &mut store);
        assert!(outcome.current);
        assert!(!fetcher.in_flight(Edge::Bottom));

        let outcome = fetcher.complete(&first, Ok(served(100..400)), &mut store);
        assert!(!outcome.current);
        assert_eq!(outcome.changed, (100..300).collect::<Vec<_>>());
        assert!(store.missing_in(100..600).is_empty());
    }

    #[test]
    fn test_stale_response_keeps_newer_request_tracked() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let first = fetcher.request(Edge::Top, 0..10, 100).unwrap();
        let _second = fetcher.request(Edge::Top, 10..20, 100).unwrap();

        fetcher.complete(&first, Ok(served(0..10)), &mut store);
        assert!(fetcher.in_flight(Edge::Top));
    }

    #[test]
    fn test_outstanding_ranges_cover_superseded_requests() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let first = fetcher.request(Edge::Top, 100..200, 1000).unwrap();
        let second = fetcher.request(Edge::Top, 0..100, 1000).unwrap();

        assert!(fetcher.overlaps_outstanding(&(150..160)));
        assert!(fetcher.overlaps_outstanding(&(90..110)));
        assert!(!fetcher.overlaps_outstanding(&(200..300)));

        fetcher.complete(&second, Ok(served(0..100)), &mut store);
        assert!(!fetcher.in_flight(Edge::Top));
        assert!(!fetcher.is_idle());
        assert!(fetcher.overlaps_outstanding(&(150..160)));

        fetcher.complete(&first, Err(NetworkError::Decode("bad".to_string())), &mut store);
        assert!(!fetcher.overlaps_outstanding(&(0..1000)));
        assert!(fetcher.is_idle());
    }

    #[test]
    fn test_failure_leaves_range_unfilled() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let ticket = fetcher.request(Edge::Bottom, 0..10, 100).unwrap();

        let outcome = fetcher.complete(
            &ticket,
            Err(NetworkError::Transport("connection reset".to_string())),
            &mut store,
        );
        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.notice.as_deref(), Some("Failed to connect to server."));
        assert!(store.is_empty());
        assert!(!fetcher.in_flight(Edge::Bottom));
    }

    #[test]
    fn test_missing_served_bounds_fall_back_to_request() {
        let mut fetcher = RangeFetcher::new();
        let mut store = TermStore::new();
        let ticket = fetcher.request(Edge::Initial, 5..8, 100).unwrap();
        let mut response = served(5..8);
        response.begin = 0;
        response.end = 0;

        let outcome = fetcher.complete(&ticket, Ok(response), &mut store);
        assert_eq!(outcome.changed, vec![5, 6, 7]);
    }
}
