use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::timer::Debounce;

pub const VIEWING_DEBOUNCE: Duration = Duration::from_millis(200);

/// Reports which term the reader is looking at, without reacting to every frame of a scroll.
///
/// Only anchor terms (every `stride`-th index) are watched. When an anchor
/// comes into view its index is emitted after the debounce delay, unless
/// another anchor comes into view first.
#[derive(Debug)]
pub struct ViewportObserver {
    stride: usize,
    visible: BTreeSet<usize>,
    pending: Debounce<usize>,
    viewing: Option<usize>,
}

impl ViewportObserver {
    pub fn new(stride: usize, delay: Duration) -> Self {
        Self {
            stride: stride.max(1),
            visible: BTreeSet::new(),
            pending: Debounce::new(delay),
            viewing: None,
        }
    }

    pub fn is_anchor(&self, index: usize) -> bool {
        index % self.stride == 0
    }

    /// Feed the indices currently drawn inside the viewport.
    pub fn observe(&mut self, visible: impl IntoIterator<Item = usize>, now: Instant) {
        let anchors: BTreeSet<usize> = visible.into_iter().filter(|&i| self.is_anchor(i)).collect();

        // Newly visible anchors count in index order; the last one wins.
        let appeared = anchors.difference(&self.visible).copied().last();
        if let Some(index) = appeared {
            self.pending.schedule(index, now);
        }
        self.visible = anchors;
    }

    /// Debounced emission, at most once per scheduled index.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let index = self.pending.take_due(now)?;
        self.viewing = Some(index);
        Some(index)
    }

    pub fn viewing(&self) -> Option<usize> {
        self.viewing
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    pub fn teardown(&mut self) {
        self.pending.clear();
        self.visible.clear();
    }
}

impl Drop for ViewportObserver {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(start: Instant, millis: u64) -> Instant {
        start + Duration::from_millis(millis)
    }

    #[test]
    fn test_emits_after_debounce() {
        let start = Instant::now();
        let mut observer = ViewportObserver::new(10, VIEWING_DEBOUNCE);
        observer.observe(35..55, start);

        assert_eq!(observer.poll(ms(start, 100)), None);
        assert_eq!(observer.poll(ms(start, 200)), Some(50));
        assert_eq!(observer.poll(ms(start, 400)), None);
        assert_eq!(observer.viewing(), Some(50));
    }

    #[test]
    fn test_later_visibility_cancels_earlier() {
        let start = Instant::now();
        let mut observer = ViewportObserver::new(10, VIEWING_DEBOUNCE);
        observer.observe(0..15, start);
        observer.observe(12..25, ms(start, 150));

        assert_eq!(observer.poll(ms(start, 250)), None);
        assert_eq!(observer.poll(ms(start, 350)), Some(20));
    }

    #[test]
    fn test_anchor_staying_visible_is_not_rescheduled() {
        let start = Instant::now();
        let mut observer = ViewportObserver::new(10, VIEWING_DEBOUNCE);
        observer.observe(5..15, start);
        assert_eq!(observer.poll(ms(start, 200)), Some(10));

        observer.observe(6..16, ms(start, 300));
        assert_eq!(observer.poll(ms(start, 600)), None);
    }

    #[test]
    fn test_non_anchor_terms_are_ignored() {
        let start = Instant::now();
        let mut observer = ViewportObserver::new(20, VIEWING_DEBOUNCE);
        observer.observe(41..59, start);
        assert_eq!(observer.poll(ms(start, 1000)), None);
    }

    #[test]
    fn test_teardown_cancels_pending() {
        let start = Instant::now();
        let mut observer = ViewportObserver::new(10, VIEWING_DEBOUNCE);
        observer.observe(0..5, start);
        observer.teardown();
        assert_eq!(observer.poll(ms(start, 1000)), None);
        assert_eq!(observer.deadline(), None);
    }
}
