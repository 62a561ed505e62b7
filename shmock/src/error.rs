// vim: tw=80
//! Error types.

use std::fmt;

use crate::value::Value;

/// Why an intercepted call could not be resolved to an expectation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ResolutionReason {
    /// Expectations exist for the method, but none accepts the arguments.
    #[error("No matching expectation found{explanation}")]
    NoMatch { explanation: String },
    /// The only matching expectations were declared with `never()`.
    #[error("Expectation should not have been called")]
    Never,
    /// Every matching expectation already reached its maximum call count.
    #[error("Expectation called more than {max} times")]
    Exhausted { max: usize },
    /// A matching ordered expectation exists, but an earlier one in the
    /// sequence has not been satisfied yet.
    #[error("Method sequence violation: expected a call to {expected} first")]
    OutOfOrder { expected: String },
}

/// One expectation that fell short of its minimum call count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Unmet {
    pub method: String,
    /// The declared argument constraints, rendered.
    pub constraints: String,
    pub min: usize,
    pub calls: usize,
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}): Expectation called fewer than {} times (got {})",
               self.method, self.constraints, self.min, self.calls)
    }
}

/// The list of unsatisfied expectations carried by a verification failure.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UnmetList(pub Vec<Unmet>);

impl fmt::Display for UnmetList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for u in self.0.iter() {
            write!(f, "\n  {}", u)?;
        }
        Ok(())
    }
}

/// A mock expectation failure.
///
/// This is the single failure signal the engine reports to the host test
/// framework.  Synthesized mock methods panic with its message.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MockError {
    /// A call arrived with no eligible, unexhausted, order-correct
    /// expectation.
    #[error("{target}::{method}({arguments}): {reason}")]
    Resolution {
        target: String,
        method: String,
        /// The received arguments, rendered.
        arguments: String,
        reason: ResolutionReason,
    },
    /// Post-test verification found expectations whose minimum call count
    /// was not met.
    #[error("{target}: unsatisfied expectations:{unmet}")]
    Verification {
        target: String,
        unmet: UnmetList,
    },
    /// The mock was driven incorrectly, e.g. configured after `replay`.
    #[error("{target}: {message}")]
    Misuse {
        target: String,
        message: String,
    },
}

impl MockError {
    pub fn is_resolution(&self) -> bool {
        matches!(self, MockError::Resolution{..})
    }

    pub fn is_verification(&self) -> bool {
        matches!(self, MockError::Verification{..})
    }

    pub fn is_misuse(&self) -> bool {
        matches!(self, MockError::Misuse{..})
    }

    pub(crate) fn misuse(target: &str, message: impl Into<String>) -> Self {
        MockError::Misuse {
            target: target.to_owned(),
            message: message.into()
        }
    }
}

/// The error side of an intercepted call.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CallError {
    /// A mock protocol failure.
    #[error(transparent)]
    Mock(#[from] MockError),
    /// A `throw_exception` response fired.  This is the mocked method's own
    /// error, not a protocol failure.
    #[error("exception thrown: {0}")]
    Thrown(Value),
}

impl CallError {
    /// The protocol failure, if this is one.
    pub fn mock_error(&self) -> Option<&MockError> {
        match self {
            CallError::Mock(e) => Some(e),
            CallError::Thrown(_) => None
        }
    }

    /// The thrown value, if this is an exception.
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            CallError::Mock(_) => None,
            CallError::Thrown(v) => Some(v)
        }
    }
}

/// A [`Value`] could not be converted into the requested Rust type.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("cannot convert {found} value {rendered} into {expected}")]
pub struct ValueError {
    pub found: &'static str,
    pub rendered: String,
    pub expected: &'static str,
}

impl ValueError {
    pub fn new(value: &Value, expected: &'static str) -> Self {
        ValueError {
            found: value.kind(),
            rendered: value.to_string(),
            expected
        }
    }
}
