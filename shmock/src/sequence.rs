// vim: tw=80
//! Ordering mode.
//!
//! When a mock's `order_matters()` is in effect, every expectation declared
//! afterwards takes the next position in the mock's [`Sequence`].  An
//! expectation may only be matched once every expectation at an earlier
//! position has been satisfied.

use crate::registry::Registry;

/// The range of ordered positions a call may currently resolve to.
///
/// Unordered expectations are always admitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    pub start: usize,
    /// Inclusive.
    pub end: usize,
}

impl Window {
    pub fn admits(&self, position: Option<usize>) -> bool {
        match position {
            None => true,
            Some(p) => self.start <= p && p <= self.end
        }
    }
}

/// The Order Enforcer: hands out positions at declaration time, and tracks
/// how far along the sequence the mock's calls have progressed.
#[derive(Debug, Default)]
pub(crate) struct Sequence {
    /// Position for the next declared ordered expectation.
    next_position: usize,
    /// The earliest position that may still be matched.  Never decreases.
    cursor: usize,
}

impl Sequence {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Reserve a position for a newly declared expectation.
    pub fn next(&mut self) -> usize {
        let p = self.next_position;
        self.next_position += 1;
        p
    }

    /// Record that the expectation at `position` was just called.  Earlier
    /// positions are left behind; `position` itself is left behind as well
    /// once it can take no more calls.
    pub fn satisfy(&mut self, position: usize, exhausted: bool) {
        let cursor = if exhausted { position + 1 } else { position };
        self.cursor = self.cursor.max(cursor);
    }

    /// Which positions may be matched right now?  The cursor's position,
    /// followed by every later one whose predecessors are all satisfied.
    pub fn window(&self, registry: &Registry) -> Window {
        let mut end = self.cursor;
        for e in registry.ordered() {
            match e.position() {
                Some(p) if p >= self.cursor => {
                    end = p;
                    if !e.is_satisfied() {
                        break;
                    }
                },
                _ => ()
            }
        }
        Window{start: self.cursor, end}
    }
}
