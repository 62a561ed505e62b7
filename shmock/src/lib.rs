// vim: tw=80
//! A mock-object engine built around an interception chain.
//!
//! Shmock substitutes a trait's implementation with a mock whose calls are
//! intercepted, checked against declared expectations, and answered with
//! declared responses.  Tests use it to isolate a unit from its
//! collaborators while still asserting *how* those collaborators were used:
//! how often, with which arguments, and in which order.
//!
//! # Usage
//!
//! * Annotate a trait with [`#[shmock]`](macro@shmock).  That generates a
//!   `MockFoo` struct that implements the trait.
//! * In a test, create a controller with `MockFoo::shmock()`.  The controller
//!   starts out *recording*.
//! * Declare expectations with [`Shmock::expect`].  Each expectation has
//!   argument constraints, a call count, and a response.
//! * Call [`Shmock::replay`] to get the mock and hand it to the code under
//!   test.  Calls that match no expectation panic.
//! * When the controller goes out of scope, it checks that every expectation
//!   was called often enough.
//!
//! # User Guide
//!
//! * [`Getting started`](#getting-started)
//! * [`Matching arguments`](#matching-arguments)
//! * [`Call counts`](#call-counts)
//! * [`Responses`](#responses)
//! * [`Ordering`](#ordering)
//! * [`Original implementations`](#original-implementations)
//! * [`Reference arguments`](#reference-arguments)
//! * [`Static methods`](#static-methods)
//! * [`Decorators`](#decorators)
//! * [`Dynamic mocks`](#dynamic-mocks)
//! * [`Crate features`](#crate-features)
//!
//! ## Getting Started
//! ```
//! use shmock::*;
//!
//! #[shmock]
//! trait Calculator {
//!     fn multiply(&self, a: i64, b: i64) -> i64;
//! }
//!
//! fn square(c: &dyn Calculator, x: i64) -> i64 {
//!     c.multiply(x, x)
//! }
//!
//! let mut ctrl = MockCalculator::shmock();
//! ctrl.expect("multiply", args![3, 3]).return_value(9);
//! let calc = ctrl.replay().unwrap();
//! assert_eq!(9, square(&calc, 3));
//! ```
//!
//! Every argument and result travels through the engine as a [`Value`].  The
//! [`ToValue`] and [`FromValue`] traits convert at the boundary, so declared
//! return values need only be convertible into the method's return type.
//! An expectation with no declared response answers with [`Value::Null`],
//! which converts into the return type's default.
//!
//! ## Matching arguments
//!
//! [`args!`] builds the constraint list for an expectation.  Each element is
//! either a literal or a [`Constraint`] such as [`anything`],
//! [`matching`] or [`satisfies`].  Literals compare with *loose equality*:
//! numbers compare numerically across integers, floats and numeric
//! strings, and lists and maps compare element by element.  See
//! [`Value::loose_eq`].
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Calculator {
//!     fn multiply(&self, a: f64, b: f64) -> f64;
//! }
//!
//! let mut ctrl = MockCalculator::shmock();
//! ctrl.expect("multiply", args!["1", "2"]).return_value(2);
//! let big = matching(predicate::gt(Value::Int(5)));
//! ctrl.expect("multiply", args![anything(), big]).return_value(0);
//! let calc = ctrl.replay().unwrap();
//! assert_eq!(2.0, calc.multiply(1.0, 2.0));
//! assert_eq!(0.0, calc.multiply(9.0, 6.0));
//! ```
//!
//! A call may supply more arguments than there are constraints; the extra
//! arguments are not checked.  When several expectations match a call, the
//! first declared one that can still be called wins.
//!
//! ## Call counts
//!
//! By default an expectation must be called exactly once.  A second call is
//! a failure, and so is no call at all.  [`times`], [`times_range`],
//! [`any`], [`never`] and [`at_least_once`] change that.
//!
//! ```should_panic
//! # use shmock::*;
//! #[shmock]
//! trait Foo {
//!     fn foo(&self);
//! }
//!
//! let mut ctrl = MockFoo::shmock();
//! ctrl.expect("foo", args![]).times(2);
//! let foo = ctrl.replay().unwrap();
//! foo.foo();
//! foo.foo();
//! foo.foo();    // Panics: Expectation called more than 2 times
//! ```
//!
//! Methods with no expectations at all may be called freely.  They run the
//! original implementation if there is one, and return the default value
//! otherwise.
//!
//! [`times`]: ExpectationBuilder::times
//! [`times_range`]: ExpectationBuilder::times_range
//! [`any`]: ExpectationBuilder::any
//! [`never`]: ExpectationBuilder::never
//! [`at_least_once`]: ExpectationBuilder::at_least_once
//!
//! ## Responses
//!
//! Each expectation has exactly one response:
//!
//! * [`return_value`](ExpectationBuilder::return_value): a fixed value.
//! * [`will`](ExpectationBuilder::will): computed from the [`JoinPoint`].
//! * [`return_consecutively`](ExpectationBuilder::return_consecutively):
//!   each value in turn, then the last one forever.
//! * [`return_value_map`](ExpectationBuilder::return_value_map): looked up
//!   by arguments.
//! * [`throw_exception`](ExpectationBuilder::throw_exception): an error.  A
//!   method returning `Result<T, E>` returns it as `Err(E)`.
//! * [`return_this`](ExpectationBuilder::return_this): the mock itself.
//! * [`return_shmock`](ExpectationBuilder::return_shmock): a nested mock.
//! * [`call_original`](ExpectationBuilder::call_original): the trait's
//!   default implementation.
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Calculator {
//!     fn multiply(&self, a: i64, b: i64) -> i64;
//!     fn parse(&self, s: &str) -> Result<i64, String>;
//! }
//!
//! let mut ctrl = MockCalculator::shmock();
//! ctrl.expect("multiply", args![])
//!     .return_value_map(vec![vec![10, 20, 200], vec![1, 2, 2]])
//!     .times(2);
//! ctrl.expect("multiply", args![])
//!     .will(|jp| jp.arguments()[0].as_i64().unwrap() * 100);
//! ctrl.expect("parse", args!["x"]).throw_exception("not a number");
//! let calc = ctrl.replay().unwrap();
//! assert_eq!(200, calc.multiply(10, 20));
//! assert_eq!(2, calc.multiply(1, 2));
//! assert_eq!(700, calc.multiply(7, 7));
//! assert_eq!(Err("not a number".to_owned()), calc.parse("x"));
//! ```
//!
//! ## Ordering
//!
//! After [`Shmock::order_matters`], expectations must be satisfied in the
//! order they are declared.  An expectation may only match once every
//! ordered expectation declared before it has been satisfied.
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Source {
//!     fn get_an_int(&self) -> i32;
//! }
//!
//! let mut ctrl = MockSource::shmock();
//! ctrl.order_matters();
//! ctrl.expect("get_an_int", args![]).return_value(2);
//! ctrl.expect("get_an_int", args![]).return_value(4);
//! let src = ctrl.replay().unwrap();
//! assert_eq!(2, src.get_an_int());
//! assert_eq!(4, src.get_an_int());
//! ```
//!
//! ## Original implementations
//!
//! A trait method's default body is its *original implementation*.  Calls to
//! a method with no expectations run it, unless
//! [`Shmock::dont_preserve_original_methods`] was called, in which case they
//! return the default value.  Expectations can also run it explicitly, with
//! [`call_original`](ExpectationBuilder::call_original).
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Greeter {
//!     fn name(&self) -> String;
//!     fn greet(&self) -> String {
//!         format!("Hello, {}", self.name())
//!     }
//! }
//!
//! let mut ctrl = MockGreeter::shmock();
//! ctrl.expect("name", args![]).return_value("world");
//! let g = ctrl.replay().unwrap();
//! assert_eq!("Hello, world", g.greet());
//! ```
//!
//! ## Reference arguments
//!
//! `&T` arguments are passed to the engine by value.  `&mut T` arguments are
//! passed by value too, and whatever the chain leaves in their slot of the
//! argument list is written back to the caller's variable afterwards.
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Counter {
//!     fn bump(&self, n: &mut u32);
//! }
//!
//! let mut ctrl = MockCounter::shmock();
//! ctrl.expect("bump", args![1]).will(|jp| {
//!     jp.arguments_mut()[0] = Value::Int(2);
//! });
//! let c = ctrl.replay().unwrap();
//! let mut n = 1;
//! c.bump(&mut n);
//! assert_eq!(2, n);
//! ```
//!
//! ## Static methods
//!
//! Methods without a receiver are mocked through a separate controller,
//! created with `MockFoo::shmock_static()`.  While it is in replay, calls to
//! `MockFoo`'s static methods on the same thread go to it.
//!
//! ```
//! # use shmock::*;
//! #[shmock]
//! trait Clock {
//!     fn now() -> u64;
//! }
//!
//! let mut ctrl = MockClock::shmock_static();
//! ctrl.expect("now", args![]).return_value(1234);
//! ctrl.replay().unwrap();
//! assert_eq!(1234, MockClock::now());
//! ```
//!
//! ## Decorators
//!
//! Every call travels through a chain of [`Decorator`] layers before it is
//! resolved to an expectation.  [`Shmock::decorate`] adds layers of your
//! own, which can rewrite the arguments or answer the call outright.
//!
//! ## Dynamic mocks
//!
//! `Shmock<Handle>` mocks a type that has no Rust trait.  Its methods are
//! addressed by name through [`Handle::call`].
//!
//! ```
//! # use shmock::*;
//! let mut ctrl = Shmock::<Handle>::named("Service");
//! ctrl.expect("ping", args![]).return_value("pong");
//! let svc = ctrl.replay().unwrap();
//! assert_eq!(Value::from("pong"), svc.call("ping", vec![]).unwrap());
//! ```
//!
//! ## Crate features
//!
//! * `json` - Converts `serde_json::Value` to and from [`Value`], so
//!   composite arguments can be written with `serde_json::json!`.
//!
//! ## Logging
//!
//! Shmock emits [`tracing`](https://docs.rs/tracing) events for every
//! intercepted call and every decision of the chain.  It never installs a
//! subscriber.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod expectation;
mod join_point;
mod matcher;
mod mock;
mod registry;
mod response;
mod sequence;
mod value;

pub use shmock_derive::shmock;
pub use predicates::prelude::{Predicate, predicate};

pub use crate::{
    error::{CallError, MockError, ResolutionReason, Unmet, UnmetList,
            ValueError},
    expectation::CallState,
    join_point::{Decorator, JoinPoint, Original, Receiver},
    matcher::{anything, explain, matches, matching, satisfies, Constraint},
    mock::{ExpectationBuilder, Handle, MockConfig, Shmock, Synthesize},
    response::IntoOutcome,
    value::{FromValue, Object, ToValue, Value},
};

/// Support code for `#[shmock]`.  Not public API.
#[doc(hidden)]
pub mod __private {
    use tracing::warn;

    use super::*;

    /// The handle of the static controller for `S` in replay on this thread.
    pub fn installed<S: Synthesize>() -> Handle {
        match S::static_slot().with(|slot| slot.borrow().clone()) {
            Some(h) => h,
            None => {
                let e = MockError::misuse(S::target(),
                    "static method called with no static mock in replay");
                warn!(mock = S::target(), "{}", e);
                panic!("{}", e);
            }
        }
    }

    /// Convert argument `i` for the original implementation.
    pub fn arg<T: FromValue>(ctx: &str, args: &[Value], i: usize)
        -> Result<T, CallError>
    {
        let v = args.get(i).cloned().unwrap_or_default();
        T::from_value(v).map_err(|e| {
            MockError::misuse(ctx, format!("argument {}: {}", i, e)).into()
        })
    }

    /// Convert the chain's outcome into a method's return value.
    pub fn finish<T: FromValue>(ctx: &str, r: Result<Value, CallError>) -> T
    {
        match r {
            Ok(v) => match T::from_value(v) {
                Ok(t) => t,
                Err(e) => panic!("{}: invalid return value: {}", ctx, e)
            },
            Err(CallError::Mock(e)) => panic!("{}", e),
            Err(CallError::Thrown(v)) => {
                panic!("{}: uncaught exception: {}", ctx, v)
            }
        }
    }

    /// Like [`finish`], but thrown values become the method's own `Err`.
    pub fn finish_result<T, E>(ctx: &str, r: Result<Value, CallError>)
        -> Result<T, E>
        where T: FromValue,
              E: FromValue
    {
        match r {
            Err(CallError::Thrown(v)) => match E::from_value(v) {
                Ok(e) => Err(e),
                Err(e) => panic!("{}: invalid exception: {}", ctx, e)
            },
            r => Ok(finish(ctx, r))
        }
    }

    /// Wrap an original implementation's result.
    pub fn ok_value<T: ToValue>(t: T) -> Result<Value, CallError> {
        Ok(t.to_value())
    }

    /// Wrap an original implementation's `Result`.  `Err` travels as a
    /// thrown value, like a `throw_exception` response.
    pub fn ok_result<T, E>(r: Result<T, E>) -> Result<Value, CallError>
        where T: ToValue,
              E: ToValue
    {
        r.map(|t| t.to_value())
            .map_err(|e| CallError::Thrown(e.to_value()))
    }

    /// Copy argument `i`, as left by the chain, back into a `&mut`
    /// parameter.
    pub fn write_back<T: FromValue>(ctx: &str, slot: &mut T, args: &[Value],
                                    i: usize)
    {
        if let Some(v) = args.get(i) {
            match T::from_value(v.clone()) {
                Ok(t) => *slot = t,
                Err(e) => panic!("{}: argument {}: {}", ctx, i, e)
            }
        }
    }
}
