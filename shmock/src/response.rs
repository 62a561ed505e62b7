// vim: tw=80
//! What a satisfied expectation produces.

use std::{cell::Cell, fmt, rc::Rc};

use crate::{
    error::{CallError, ResolutionReason},
    join_point::JoinPoint,
    mock::Handle,
    value::{display_args, ToValue, Value},
};

/// A `will` closure.
pub(crate) type ComputeFn =
    dyn Fn(&mut JoinPoint<'_, '_>) -> Result<Value, CallError>;

/// What a `will` closure may return.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Value, CallError>;
}

impl<T: ToValue> IntoOutcome for T {
    fn into_outcome(self) -> Result<Value, CallError> {
        Ok(self.to_value())
    }
}

impl IntoOutcome for Result<Value, CallError> {
    fn into_outcome(self) -> Result<Value, CallError> {
        self
    }
}

/// The response strategy of a single expectation.
///
/// Exactly one strategy is attached to each expectation.  An expectation
/// declared without one answers with [`Value::Null`].
pub enum Response {
    /// Return a fixed value.
    Return(Value),
    /// Compute the result from the join point.
    Compute(Rc<ComputeFn>),
    /// Raise the value as the method's own error.
    Throw(Value),
    /// Return each value in turn.  Once exhausted, keep returning the last
    /// one.
    Sequence {
        values: Vec<Value>,
        cursor: Cell<usize>,
    },
    /// Rows of `[arg0, .., argN, result]`.  The first row whose leading
    /// entries loosely equal the call's arguments supplies the result.
    Map(Vec<Vec<Value>>),
    /// Return the mock the call was made on.
    ReturnSelf,
    /// Return a nested mock, already in replay.
    Nested(Handle),
    /// Run the original implementation.
    Fallthrough,
}

impl Default for Response {
    fn default() -> Self {
        Response::Return(Value::Null)
    }
}

impl Response {
    pub(crate) fn sequence(values: Vec<Value>) -> Self {
        Response::Sequence{values, cursor: Cell::new(0)}
    }

    /// Can this response answer a call with these arguments at all?
    ///
    /// Only [`Response::Map`] is selective: a call with no matching row is
    /// not a match for the expectation.
    pub(crate) fn accepts(&self, args: &[Value]) -> bool {
        match self {
            Response::Map(rows) => find_row(rows, args).is_some(),
            _ => true
        }
    }

    pub(crate) fn respond(&self, jp: &mut JoinPoint<'_, '_>)
        -> Result<Value, CallError>
    {
        match self {
            Response::Return(v) => Ok(v.clone()),
            Response::Compute(f) => f(jp),
            Response::Throw(v) => Err(CallError::Thrown(v.clone())),
            Response::Sequence{values, cursor} => {
                let i = cursor.get();
                if i < values.len() {
                    cursor.set(i + 1);
                }
                Ok(values.get(i)
                    .or_else(|| values.last())
                    .cloned()
                    .unwrap_or_default())
            },
            Response::Map(rows) => {
                match find_row(rows, jp.arguments()) {
                    Some(v) => Ok(v.clone()),
                    None => {
                        let explanation = format!(
                            ": no row of the return value map matches ({})",
                            display_args(jp.arguments()));
                        Err(jp.resolution_failure(
                            ResolutionReason::NoMatch{explanation}).into())
                    }
                }
            },
            Response::ReturnSelf => Ok(jp.receiver().to_value()),
            Response::Nested(h) => Ok(Value::Mock(h.clone())),
            Response::Fallthrough => jp.call_original(),
        }
    }
}

fn find_row<'a>(rows: &'a [Vec<Value>], args: &[Value]) -> Option<&'a Value> {
    rows.iter()
        .find(|row| {
            match row.split_last() {
                Some((_, keys)) => {
                    keys.len() <= args.len() &&
                        keys.iter().zip(args).all(|(k, a)| k.loose_eq(a))
                },
                None => false
            }
        })
        .and_then(|row| row.last())
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Response::Return(v) => write!(f, "Return({})", v),
            Response::Compute(_) => write!(f, "Compute"),
            Response::Throw(v) => write!(f, "Throw({})", v),
            Response::Sequence{values, ..} => {
                write!(f, "Sequence({})", display_args(values))
            },
            Response::Map(rows) => write!(f, "Map({} rows)", rows.len()),
            Response::ReturnSelf => write!(f, "ReturnSelf"),
            Response::Nested(h) => write!(f, "Nested({})", h.target()),
            Response::Fallthrough => write!(f, "Fallthrough"),
        }
    }
}

#[cfg(test)]
mod t {
    use super::*;

    fn row(v: &[i64]) -> Vec<Value> {
        v.iter().map(|i| Value::Int(*i)).collect()
    }

    #[test]
    fn map_first_matching_row_wins() {
        let rows = vec![row(&[10, 20, 30]), row(&[1, 2, 3]), row(&[1, 2, 4])];
        assert_eq!(Some(&Value::Int(30)),
                   find_row(&rows, &row(&[10, 20])));
        assert_eq!(Some(&Value::Int(3)), find_row(&rows, &row(&[1, 2])));
        assert_eq!(None, find_row(&rows, &row(&[10, 2])));
    }

    #[test]
    fn map_rows_are_loose() {
        let rows = vec![vec![Value::Str("1".into()), Value::Int(9)]];
        assert_eq!(Some(&Value::Int(9)),
                   find_row(&rows, &[Value::Float(1.0), Value::Null]));
    }

    #[test]
    fn map_rows_need_enough_arguments() {
        let rows = vec![row(&[1, 2, 3])];
        assert_eq!(None, find_row(&rows, &row(&[1])));
        assert!(!Response::Map(rows).accepts(&row(&[1])));
    }

    #[test]
    fn empty_rows_never_match() {
        let rows = vec![Vec::new()];
        assert_eq!(None, find_row(&rows, &[]));
    }
}
