// vim: tw=80
//! The interception chain.
//!
//! Every call to a mock in replay travels through an ordered list of
//! [`Decorator`] layers.  Each layer receives the call's [`JoinPoint`], may
//! inspect or modify it, and either answers the call itself or passes it
//! further down with [`JoinPoint::execute`].  The chain of a mock is:
//!
//! 1. The order check, in ordering mode only.
//! 2. Decorators added with [`Shmock::decorate`](crate::Shmock::decorate),
//!    in the order they were added.
//! 3. Resolution of the call to an expectation.
//! 4. Call counting.
//! 5. The expectation's response.
//! 6. The fallback: the original implementation, or the absence value.
//!
//! If the resolution layer finds that the method has no expectations at all,
//! the call goes straight through counting and response to the fallback.

use std::rc::Rc;
use tracing::{debug, trace};

use crate::{
    error::{CallError, MockError, ResolutionReason},
    mock::Handle,
    registry::{ExpectationId, Resolution},
    sequence::Window,
    value::{display_args, Value},
};

/// The original implementation of a mocked method, if it has one.
///
/// It receives the call's arguments, possibly as modified by decorators, and
/// may write back to them.
pub type Original<'f> =
    dyn FnMut(&mut [Value]) -> Result<Value, CallError> + 'f;

/// One layer of the interception chain.
///
/// Closures of the right signature are decorators too.
///
/// ```
/// # use shmock::*;
/// let mut c = Shmock::<Handle>::named("Calculator");
/// c.decorate(|jp: &mut JoinPoint<'_, '_>| {
///     // Round every float argument before matching
///     for a in jp.arguments_mut().iter_mut() {
///         if let Value::Float(f) = a {
///             *a = Value::Int(f.round() as i64);
///         }
///     }
///     jp.execute()
/// });
/// c.expect("double", args![2]).return_value(4);
/// let calc = c.replay().unwrap();
/// assert_eq!(Value::Int(4),
///            calc.call("double", vec![Value::Float(1.9)]).unwrap());
/// ```
pub trait Decorator {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError>;
}

impl<F> Decorator for F
    where F: Fn(&mut JoinPoint<'_, '_>) -> Result<Value, CallError>
{
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        self(jp)
    }
}

/// What a call was made on.
#[derive(Clone, Debug)]
pub enum Receiver<'a> {
    /// An instance method, called on this mock.
    Instance(&'a Handle),
    /// A static method of the named type.
    Static(&'a str),
}

impl<'a> Receiver<'a> {
    /// The receiver as a value: the mock itself, or the type's name.
    pub fn to_value(&self) -> Value {
        match self {
            Receiver::Instance(h) => Value::Mock((*h).clone()),
            Receiver::Static(name) => Value::Str((*name).to_owned()),
        }
    }
}

/// Everything about one intercepted call, as seen by a layer of the chain.
pub struct JoinPoint<'a, 'f> {
    handle: &'a Handle,
    method: &'a str,
    arguments: &'a mut Vec<Value>,
    /// The layers not yet entered.
    layers: &'a [Rc<dyn Decorator>],
    original: Option<&'a mut Original<'f>>,
    resolved: Option<ExpectationId>,
    window: Option<Window>,
}

impl<'a, 'f> JoinPoint<'a, 'f> {
    pub(crate) fn new(handle: &'a Handle,
                      method: &'a str,
                      arguments: &'a mut Vec<Value>,
                      layers: &'a [Rc<dyn Decorator>],
                      original: Option<&'a mut Original<'f>>) -> Self
    {
        JoinPoint {
            handle,
            method,
            arguments,
            layers,
            original,
            resolved: None,
            window: None,
        }
    }

    pub fn arguments(&self) -> &[Value] {
        self.arguments
    }

    /// Modify the arguments seen by the rest of the chain.  Arguments may be
    /// replaced, added or removed.
    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        self.arguments
    }

    /// Invoke the original implementation directly, bypassing the remaining
    /// layers.  Returns [`Value::Null`] if the method has none.
    pub fn call_original(&mut self) -> Result<Value, CallError> {
        match self.original.as_mut() {
            Some(f) => {
                debug!(mock = %self.handle.target(), method = self.method,
                    "calling original implementation");
                f(self.arguments.as_mut_slice())
            },
            None => Ok(Value::Null)
        }
    }

    /// Pass the call on to the next layer of the chain.
    ///
    /// May be called more than once from the same layer; each time the rest
    /// of the chain runs again.
    pub fn execute(&mut self) -> Result<Value, CallError> {
        let layers = self.layers;
        match layers.split_first() {
            Some((layer, rest)) => {
                self.layers = rest;
                let r = layer.around(self);
                self.layers = layers;
                r
            },
            None => Ok(Value::Null)
        }
    }

    pub(crate) fn handle(&self) -> &'a Handle {
        self.handle
    }

    /// Does the mocked method have an original implementation?
    pub fn has_original(&self) -> bool {
        self.original.is_some()
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn receiver(&self) -> Receiver<'a> {
        if self.handle.is_static() {
            Receiver::Static(self.handle.target())
        } else {
            Receiver::Instance(self.handle)
        }
    }

    /// Build the failure to report when this call can't be resolved.
    pub fn resolution_failure(&self, reason: ResolutionReason) -> MockError {
        MockError::Resolution {
            target: self.handle.target().to_owned(),
            method: self.method.to_owned(),
            arguments: display_args(self.arguments),
            reason
        }
    }
}

/// Restrict resolution to the positions the ordering currently admits.
pub(crate) struct OrderCheck;

impl Decorator for OrderCheck {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        let window = jp.handle().with_state(|state| {
            state.sequence.window(&state.registry)
        });
        trace!(mock = %jp.handle().target(), method = jp.method(),
            start = window.start, end = window.end, "order window");
        jp.window = Some(window);
        jp.execute()
    }
}

/// Pick the expectation that answers the call.
pub(crate) struct Resolve;

impl Decorator for Resolve {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        let resolution = jp.handle().with_state(|state| {
            state.registry.resolve(jp.method, jp.arguments(),
                                   jp.window.as_ref())
        });
        match resolution {
            Resolution::Undeclared => {
                trace!(mock = %jp.handle().target(), method = jp.method(),
                    "no expectations declared");
                jp.execute()
            },
            Resolution::Found(id) => {
                trace!(mock = %jp.handle().target(), method = jp.method(),
                    expectation = ?id, "resolved");
                jp.resolved = Some(id);
                jp.execute()
            },
            Resolution::Failed(reason) => {
                let e = jp.resolution_failure(reason);
                debug!("{}", e);
                Err(e.into())
            }
        }
    }
}

/// Count the call against the resolved expectation, and advance the
/// ordering.
///
/// Nothing runs between resolution and counting, so the resolved expectation
/// still has a call to spare.
pub(crate) struct Count;

impl Decorator for Count {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        if let Some(id) = jp.resolved {
            let counted = jp.handle().with_state_mut(|state| {
                let e = state.registry.get_mut(id);
                e.call()?;
                if let Some(p) = e.position() {
                    let exhausted = e.is_done();
                    state.sequence.satisfy(p, exhausted);
                }
                Ok(())
            });
            if let Err(max) = counted {
                let reason = ResolutionReason::Exhausted{max};
                return Err(jp.resolution_failure(reason).into());
            }
        }
        jp.execute()
    }
}

/// Run the resolved expectation's response.
pub(crate) struct Respond;

impl Decorator for Respond {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        match jp.resolved {
            Some(id) => {
                let response = jp.handle().with_state(|state| {
                    state.registry.get(id).response()
                });
                response.respond(jp)
            },
            None => jp.execute()
        }
    }
}

/// Answer a call no expectation claimed.
pub(crate) struct Fallback;

impl Decorator for Fallback {
    fn around(&self, jp: &mut JoinPoint<'_, '_>) -> Result<Value, CallError> {
        if jp.handle().config().preserve_original_methods && jp.has_original()
        {
            jp.call_original()
        } else {
            debug!(mock = %jp.handle().target(), method = jp.method(),
                "answering with null");
            Ok(Value::Null)
        }
    }
}
