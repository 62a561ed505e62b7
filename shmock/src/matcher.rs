// vim: tw=80
//! Argument matching.
//!
//! An expectation carries one [`Constraint`] per leading argument.  A call
//! matches when every constraint accepts the argument at its position.
//! Arguments beyond the last constraint are not checked.

use predicates::prelude::{predicate, Predicate};
use predicates_tree::CaseTreeExt;
use std::fmt;

use crate::value::{ToValue, Value};

/// A declared constraint on one argument.
pub enum Constraint {
    /// Loosely equal to this value.  See [`Value::loose_eq`].
    Literal(Value),
    /// Accepted by this predicate.
    Predicate(Box<dyn Predicate<Value>>),
    /// Anything at all.
    Anything,
}

impl Constraint {
    pub fn accepts(&self, actual: &Value) -> bool {
        match self {
            Constraint::Literal(v) => v.loose_eq(actual),
            Constraint::Predicate(p) => p.eval(actual),
            Constraint::Anything => true,
        }
    }

    /// Describe why `actual` was rejected, or `None` if it was accepted.
    fn reject_reason(&self, actual: &Value) -> Option<String> {
        match self {
            Constraint::Literal(v) if !v.loose_eq(actual) => {
                Some(format!("expected {}, got {}", v, actual))
            },
            Constraint::Predicate(p) => {
                p.find_case(false, actual)
                    .map(|case| format!("got {}\n{}", actual, case.tree()))
            },
            _ => None
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Literal(v) => write!(f, "{}", v),
            Constraint::Predicate(p) => write!(f, "{}", p),
            Constraint::Anything => write!(f, "_"),
        }
    }
}

impl<T: ToValue> From<T> for Constraint {
    fn from(t: T) -> Self {
        Constraint::Literal(t.to_value())
    }
}

/// Constrain an argument with any [`Predicate`] over [`Value`].
///
/// ```
/// # use shmock::*;
/// let c = matching(predicate::gt(Value::Int(3)));
/// assert!(c.accepts(&Value::Int(4)));
/// assert!(!c.accepts(&Value::Str("2".into())));
/// ```
pub fn matching<P>(p: P) -> Constraint
    where P: Predicate<Value> + 'static
{
    Constraint::Predicate(Box::new(p))
}

/// Constrain an argument with a closure.  Shorthand for
/// `matching(predicate::function(f))`.
pub fn satisfies<F>(f: F) -> Constraint
    where F: Fn(&Value) -> bool + 'static
{
    matching(predicate::function(f))
}

/// Leave an argument unconstrained.
pub fn anything() -> Constraint {
    Constraint::Anything
}

/// Build a constraint list.  Each element is a literal (anything that
/// implements [`ToValue`]) or a [`Constraint`], such as those returned by
/// [`matching`], [`satisfies`] and [`anything`].
///
/// # Examples
/// ```
/// # use shmock::*;
/// let constraints = args![2, "two", anything(), [1, 2]];
/// assert_eq!(4, constraints.len());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Constraint>::new()
    };
    ($($e:expr),+ $(,)?) => {
        ::std::vec![$($crate::Constraint::from($e)),+]
    };
}

/// Does `actual` satisfy `constraints`?
pub fn matches(constraints: &[Constraint], actual: &[Value]) -> bool {
    if constraints.len() > actual.len() {
        return false;
    }
    constraints.iter()
        .zip(actual.iter())
        .all(|(c, a)| c.accepts(a))
}

/// Explain why `actual` does not satisfy `constraints`.  Returns `None` if
/// it does.
pub fn explain(constraints: &[Constraint], actual: &[Value])
    -> Option<String>
{
    if constraints.len() > actual.len() {
        return Some(format!("expected at least {} arguments, got {}",
                            constraints.len(), actual.len()));
    }
    constraints.iter()
        .zip(actual.iter())
        .enumerate()
        .find_map(|(i, (c, a))| {
            c.reject_reason(a)
                .map(|reason| format!("argument {}: {}", i, reason))
        })
}

/// Render a constraint list as `a, b, c`.
pub(crate) fn display_constraints(constraints: &[Constraint]) -> String {
    constraints.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
