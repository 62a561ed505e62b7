// vim: tw=80
//! The Expectation Registry of one mock.

use std::collections::HashMap;

use crate::{
    error::{ResolutionReason, Unmet},
    expectation::Expectation,
    sequence::Window,
    value::Value,
};

/// Identifies an expectation within its registry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExpectationId(usize);

/// The outcome of looking up an expectation for a call.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Resolution {
    /// No expectation was ever declared for the method.
    Undeclared,
    Found(ExpectationId),
    Failed(ResolutionReason),
}

/// All expectations of a mock, in declaration order, indexed by method name.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    expectations: Vec<Expectation>,
    by_method: HashMap<String, Vec<ExpectationId>>,
}

impl Registry {
    pub fn get(&self, id: ExpectationId) -> &Expectation {
        &self.expectations[id.0]
    }

    pub fn get_mut(&mut self, id: ExpectationId) -> &mut Expectation {
        &mut self.expectations[id.0]
    }

    pub fn insert(&mut self, e: Expectation) -> ExpectationId {
        let id = ExpectationId(self.expectations.len());
        self.by_method.entry(e.method().to_owned())
            .or_default()
            .push(id);
        self.expectations.push(e);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item=&Expectation> {
        self.expectations.iter()
    }

    /// Ordered expectations, by position.
    pub fn ordered(&self) -> impl Iterator<Item=&Expectation> {
        // Positions are handed out in declaration order
        self.expectations.iter().filter(|e| e.position().is_some())
    }

    /// Pick the expectation for a call: the first declared one for `method`
    /// that is not exhausted, whose constraints accept `args`, and that the
    /// ordering `window` admits.
    pub fn resolve(&self, method: &str, args: &[Value],
                   window: Option<&Window>) -> Resolution
    {
        let ids = match self.by_method.get(method) {
            None => return Resolution::Undeclared,
            Some(ids) => ids
        };
        let mut never = false;
        let mut exhausted: Option<usize> = None;
        let mut blocked = false;
        for id in ids.iter() {
            let e = self.get(*id);
            if !e.matches(args) {
                continue;
            }
            if e.is_done() {
                if e.max() == 0 {
                    never = true;
                } else {
                    exhausted = Some(exhausted.map_or(e.max(),
                        |m| m.max(e.max())));
                }
                continue;
            }
            if let Some(w) = window {
                if !w.admits(e.position()) {
                    blocked = true;
                    continue;
                }
            }
            return Resolution::Found(*id);
        }
        let reason = if blocked {
            ResolutionReason::OutOfOrder {
                expected: window.map(|w| self.describe_position(w.start))
                    .unwrap_or_default()
            }
        } else if let Some(max) = exhausted {
            ResolutionReason::Exhausted{max}
        } else if never {
            ResolutionReason::Never
        } else {
            ResolutionReason::NoMatch {
                explanation: self.explain(ids, args)
            }
        };
        Resolution::Failed(reason)
    }

    /// Describe the ordered expectation at `position`.
    fn describe_position(&self, position: usize) -> String {
        self.ordered()
            .find(|e| e.position() == Some(position))
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("position {}", position))
    }

    fn explain(&self, ids: &[ExpectationId], args: &[Value]) -> String {
        let mut s = String::new();
        for id in ids {
            let e = self.get(*id);
            let why = e.explain(args)
                .unwrap_or_else(|| "matched, but unavailable".to_owned());
            s.push_str(&format!("\n  {}: {}", e, why));
        }
        s
    }

    /// Every expectation whose minimum call count was not reached.
    pub fn unmet(&self) -> Vec<Unmet> {
        self.expectations.iter()
            .filter_map(Expectation::unmet)
            .collect()
    }
}
