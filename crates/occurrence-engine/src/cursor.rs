//! Single-use, release-once cursor over a schedule's occurrences.

use crate::evaluator::{CursorHandle, Schedule};
use crate::instant::CalendarInstant;

/// Lazy, non-decreasing sequence of occurrences starting at the anchor.
///
/// The underlying handle is released exactly once: on exhaustion, on an
/// explicit [`close`](OccurrenceCursor::close), or on drop, whichever comes
/// first. Duplicates produced by the evaluator are passed through.
pub struct OccurrenceCursor<'s> {
    handle: Option<Box<dyn CursorHandle + 's>>,
    pulled: usize,
}

impl<'s> OccurrenceCursor<'s> {
    pub fn open<S: Schedule + ?Sized>(schedule: &'s S) -> Self {
        tracing::trace!("cursor opened");
        Self {
            handle: Some(schedule.open_cursor()),
            pulled: 0,
        }
    }

    /// Pull the next occurrence. Returns `None` forever once exhausted or closed.
    pub fn advance(&mut self) -> Option<CalendarInstant> {
        let next = self.handle.as_mut()?.advance();
        match next {
            Some(_) => self.pulled += 1,
            None => self.close(),
        }
        next
    }

    /// Release the evaluator handle. Later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle);
            tracing::trace!(pulled = self.pulled, "cursor released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of occurrences pulled so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }
}

impl Iterator for OccurrenceCursor<'_> {
    type Item = CalendarInstant;

    fn next(&mut self) -> Option<CalendarInstant> {
        self.advance()
    }
}

impl Drop for OccurrenceCursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
