// vim: tw=80
//! Call expectations and their frequency state machine.

use std::{fmt, ops::Range, rc::Rc};

use crate::{
    error::Unmet,
    matcher::{self, Constraint},
    response::Response,
    value::Value,
};

/// Where an expectation stands relative to its call-count range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallState {
    /// Declared and not called yet.
    Pending,
    /// Called, but fewer times than the minimum.
    PartiallySatisfied,
    /// Called at least the minimum number of times, and may still be called.
    Satisfied,
    /// Called the maximum number of times.  No further call may match.
    Exhausted,
}

/// The allowed call-count range of an expectation, and its live counter.
#[derive(Debug)]
pub(crate) struct Times {
    /// How many times has the expectation already been called?
    count: usize,
    /// Allowed call counts.  `end` is exclusive.
    range: Range<usize>,
}

impl Times {
    /// Record a call.  Fails, leaving the counter alone, if that would exceed
    /// the maximum.
    pub fn call(&mut self) -> Result<(), usize> {
        if self.is_done() {
            return Err(self.max());
        }
        self.count += 1;
        Ok(())
    }

    pub fn any(&mut self) {
        self.range = 0..usize::MAX;
    }

    pub fn at_least(&mut self, n: usize) {
        self.range = n..usize::MAX;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Has this expectation already been called the maximum allowed number of
    /// times?
    pub fn is_done(&self) -> bool {
        self.count >= self.max()
    }

    /// Has this expectation already been called the minimum required number of
    /// times?
    pub fn is_satisfied(&self) -> bool {
        self.count >= self.range.start
    }

    /// Largest permitted call count.  `usize::MAX - 1` stands for unbounded.
    pub fn max(&self) -> usize {
        self.range.end.saturating_sub(1)
    }

    pub fn min(&self) -> usize {
        self.range.start
    }

    /// Exactly `n` calls.  `usize::MAX - 1` is the largest exact count, so
    /// larger requests are clamped to it.
    // https://github.com/rust-lang/rust-clippy/issues/3307
    #[allow(clippy::range_plus_one)]
    pub fn n(&mut self, n: usize) {
        let n = n.min(usize::MAX - 1);
        self.range = n..n + 1;
    }

    pub fn never(&mut self) {
        self.n(0);
    }

    pub fn range(&mut self, range: Range<usize>) {
        assert!(range.start < range.end, "Empty call count range {:?}", range);
        self.range = range;
    }

    pub fn state(&self) -> CallState {
        if self.is_done() {
            CallState::Exhausted
        } else if self.count == 0 {
            CallState::Pending
        } else if self.count < self.range.start {
            CallState::PartiallySatisfied
        } else {
            CallState::Satisfied
        }
    }
}

impl Default for Times {
    /// Exactly one call.
    fn default() -> Self {
        Times{count: 0, range: 1..2}
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let max = self.max();
        if max == usize::MAX - 1 {
            write!(f, "at least {} times", self.min())
        } else if max == self.min() {
            write!(f, "exactly {} times", max)
        } else {
            write!(f, "{} to {} times", self.min(), max)
        }
    }
}

/// One declared expectation: method, argument constraints, call-count range,
/// optional ordering position and response.
pub(crate) struct Expectation {
    method: String,
    constraints: Vec<Constraint>,
    times: Times,
    position: Option<usize>,
    response: Rc<Response>,
}

impl Expectation {
    pub(crate) fn new(method: &str, constraints: Vec<Constraint>,
                      position: Option<usize>) -> Self
    {
        Expectation {
            method: method.to_owned(),
            constraints,
            times: Times::default(),
            position,
            response: Rc::new(Response::default())
        }
    }

    /// Record a call.  On failure returns the maximum call count.
    pub(crate) fn call(&mut self) -> Result<(), usize> {
        self.times.call()
    }

    pub fn calls(&self) -> usize {
        self.times.count()
    }

    pub(crate) fn explain(&self, args: &[Value]) -> Option<String> {
        matcher::explain(&self.constraints, args)
            .or_else(|| {
                if self.response.accepts(args) {
                    None
                } else {
                    Some("no row of the return value map matches".to_owned())
                }
            })
    }

    pub fn is_done(&self) -> bool {
        self.times.is_done()
    }

    pub fn is_satisfied(&self) -> bool {
        self.times.is_satisfied()
    }

    /// Do the constraints, and the response, accept these arguments?
    pub(crate) fn matches(&self, args: &[Value]) -> bool {
        matcher::matches(&self.constraints, args) &&
            self.response.accepts(args)
    }

    pub fn max(&self) -> usize {
        self.times.max()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub(crate) fn response(&self) -> Rc<Response> {
        self.response.clone()
    }

    pub(crate) fn set_response(&mut self, response: Response) {
        self.response = Rc::new(response);
    }

    pub fn state(&self) -> CallState {
        self.times.state()
    }

    pub(crate) fn times_mut(&mut self) -> &mut Times {
        &mut self.times
    }

    /// The verification verdict: `Some` if the minimum was not reached.
    pub(crate) fn unmet(&self) -> Option<Unmet> {
        if self.times.is_satisfied() {
            None
        } else {
            Some(Unmet {
                method: self.method.clone(),
                constraints: matcher::display_constraints(&self.constraints),
                min: self.times.min(),
                calls: self.times.count()
            })
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}) {}", self.method,
               matcher::display_constraints(&self.constraints), self.times)?;
        if let Some(p) = self.position {
            write!(f, " at position {}", p)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("constraints", &self.constraints)
            .field("times", &self.times)
            .field("position", &self.position)
            .field("response", &self.response)
            .finish()
    }
}
