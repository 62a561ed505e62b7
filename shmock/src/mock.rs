// vim: tw=80
//! Mocks and their controller.

use fragile::Fragile;
use std::{
    cell::{Cell, RefCell},
    fmt,
    marker::PhantomData,
    ops::Range,
    rc::Rc,
    thread::{self, LocalKey},
};
use tracing::{debug, trace};

use crate::{
    error::{CallError, MockError, Unmet, UnmetList},
    expectation::{CallState, Expectation},
    join_point::{
        Count, Decorator, Fallback, JoinPoint, OrderCheck, Original, Resolve,
        Respond
    },
    matcher::Constraint,
    registry::{ExpectationId, Registry},
    response::{IntoOutcome, Response},
    sequence::Sequence,
    value::{display_args, ToValue, Value},
};

/// Mock-level options.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MockConfig {
    /// Expectations declared while this is set must be satisfied in
    /// declaration order.
    pub order_matters: bool,
    /// Calls that no expectation claims run the original implementation,
    /// when there is one.
    pub preserve_original_methods: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig {
            order_matters: false,
            preserve_original_methods: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Recording,
    Replay,
}

/// The mutable part of a mock.
#[derive(Default)]
pub(crate) struct State {
    pub registry: Registry,
    pub sequence: Sequence,
    /// Mocks returned by `return_shmock`, verified along with this one.
    pub nested: Vec<Handle>,
    pub decorators: Vec<Rc<dyn Decorator>>,
}

struct MockCell {
    target: String,
    is_static: bool,
    methods: Option<&'static [&'static str]>,
    phase: Cell<Phase>,
    config: Cell<MockConfig>,
    state: RefCell<State>,
}

/// A shared reference to one mock.
///
/// Every substitute produced by [`Shmock::replay`] holds one.  Clones refer
/// to the same mock.  A `Handle` is `Send` and `Sync` so substitutes may be
/// stored wherever their trait requires it, but using it from any thread
/// other than the one that created it panics.
#[derive(Clone)]
pub struct Handle(Fragile<Rc<MockCell>>);

impl Handle {
    fn new(target: &str, is_static: bool,
           methods: Option<&'static [&'static str]>,
           config: MockConfig) -> Self
    {
        let cell = MockCell {
            target: target.to_owned(),
            is_static,
            methods,
            phase: Cell::new(Phase::Recording),
            config: Cell::new(config),
            state: RefCell::new(State::default()),
        };
        Handle(Fragile::new(Rc::new(cell)))
    }

    fn cell(&self) -> &MockCell {
        self.0.get()
    }

    /// Invoke a method on the mock with no original implementation.
    ///
    /// This is how dynamic mocks, those of type `Shmock<Handle>`, are called.
    pub fn call(&self, method: &str, mut arguments: Vec<Value>)
        -> Result<Value, CallError>
    {
        self.intercept(method, &mut arguments, None)
    }

    /// How many calls have been counted against `method`'s expectations?
    pub fn calls(&self, method: &str) -> usize {
        self.with_state(|state| {
            state.registry.iter()
                .filter(|e| e.method() == method)
                .map(Expectation::calls)
                .sum()
        })
    }

    /// The [`CallState`] of each expectation declared for `method`, in
    /// declaration order.
    pub fn call_states(&self, method: &str) -> Vec<CallState> {
        self.with_state(|state| {
            state.registry.iter()
                .filter(|e| e.method() == method)
                .map(Expectation::state)
                .collect()
        })
    }

    pub fn config(&self) -> MockConfig {
        self.cell().config.get()
    }

    /// Route a call through the mock's interception chain.
    ///
    /// `arguments` may be modified by the chain; synthesized methods copy
    /// them back into their `&mut` parameters.  `original` is the method's
    /// real implementation, if it has one.
    pub fn intercept(&self, method: &str, arguments: &mut Vec<Value>,
                     original: Option<&mut Original<'_>>)
        -> Result<Value, CallError>
    {
        let cell = self.cell();
        if cell.phase.get() == Phase::Recording {
            return Err(MockError::misuse(&cell.target,
                format!("{} called before replay", method)).into());
        }
        trace!(mock = %cell.target, method,
            arguments = %display_args(arguments.as_slice()), "intercepted");
        let layers = self.layers();
        let mut jp = JoinPoint::new(self, method, arguments, &layers, original);
        let r = jp.execute();
        trace!(mock = %cell.target, method, result = ?r, "returned");
        r
    }

    pub fn is_static(&self) -> bool {
        self.cell().is_static
    }

    fn layers(&self) -> Vec<Rc<dyn Decorator>> {
        let mut layers: Vec<Rc<dyn Decorator>> = Vec::new();
        if self.config().order_matters {
            layers.push(Rc::new(OrderCheck));
        }
        self.with_state(|state| {
            layers.extend(state.decorators.iter().cloned())
        });
        layers.push(Rc::new(Resolve));
        layers.push(Rc::new(Count));
        layers.push(Rc::new(Respond));
        layers.push(Rc::new(Fallback));
        layers
    }

    /// Do these two handles refer to the same mock?
    pub fn same_mock(&self, other: &Handle) -> bool {
        Rc::ptr_eq(self.0.get(), other.0.get())
    }

    /// The name of the mocked type.
    pub fn target(&self) -> &str {
        &self.cell().target
    }

    /// Every unmet expectation of this mock and of its nested mocks.
    pub fn unmet(&self) -> Vec<Unmet> {
        let (mut unmet, nested) = self.with_state(|state| {
            (state.registry.unmet(), state.nested.clone())
        });
        for h in nested {
            for mut u in h.unmet() {
                u.method = format!("{}::{}", h.target(), u.method);
                unmet.push(u);
            }
        }
        unmet
    }

    /// Check that every expectation, including those of nested mocks, was
    /// called at least its minimum number of times.
    pub fn verify(&self) -> Result<(), MockError> {
        let unmet = self.unmet();
        if unmet.is_empty() {
            debug!(mock = %self.target(), "verified");
            Ok(())
        } else {
            debug!(mock = %self.target(), unmet = unmet.len(),
                "verification failed");
            Err(MockError::Verification {
                target: self.target().to_owned(),
                unmet: UnmetList(unmet)
            })
        }
    }

    pub(crate) fn with_state<F, R>(&self, f: F) -> R
        where F: FnOnce(&State) -> R
    {
        f(&self.cell().state.borrow())
    }

    pub(crate) fn with_state_mut<F, R>(&self, f: F) -> R
        where F: FnOnce(&mut State) -> R
    {
        f(&mut self.cell().state.borrow_mut())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.try_get() {
            Ok(cell) => f.debug_struct("Handle")
                .field("target", &cell.target)
                .field("static", &cell.is_static)
                .finish(),
            Err(_) => f.write_str("Handle(<foreign thread>)")
        }
    }
}

/// A type that can stand in for a mocked target.
///
/// `#[shmock]` implements this for every `MockFoo` it generates.  `Handle`
/// implements it as well, for dynamic mocks addressed by method name.
pub trait Synthesize: Sized {
    /// The name of the mocked type.
    fn target() -> &'static str;

    /// The methods the target has, if known.  Expectations on any other
    /// method name are rejected.
    fn methods() -> Option<&'static [&'static str]> {
        None
    }

    /// Build the substitute around a mock in replay.
    fn synthesize(handle: Handle) -> Self;

    /// Where the static surface's handle is installed during replay.
    fn static_slot() -> &'static LocalKey<RefCell<Option<Handle>>>;
}

thread_local! {
    static DYNAMIC_STATIC: RefCell<Option<Handle>> = const {
        RefCell::new(None)
    };
}

impl Synthesize for Handle {
    fn target() -> &'static str {
        "Handle"
    }

    fn synthesize(handle: Handle) -> Self {
        handle
    }

    fn static_slot() -> &'static LocalKey<RefCell<Option<Handle>>> {
        &DYNAMIC_STATIC
    }
}

/// The mock controller.
///
/// A controller starts out *recording*: declare expectations with
/// [`expect`](Shmock::expect).  [`replay`](Shmock::replay) then hands out the
/// substitute, whose calls are checked against those expectations.  When
/// the controller is dropped it verifies that every expectation was called
/// often enough, and panics otherwise.
///
/// # Examples
/// ```
/// # use shmock::*;
/// let mut c = Shmock::<Handle>::named("Calculator");
/// c.expect("multiply", args![2, 3]).return_value(6);
/// let calc = c.replay().unwrap();
/// assert_eq!(Value::Int(6),
///            calc.call("multiply", vec![2.into(), 3.into()]).unwrap());
/// ```
pub struct Shmock<S: Synthesize> {
    handle: Handle,
    verified: Cell<bool>,
    /// Verified by its parent rather than on drop.
    adopted: bool,
    _substitute: PhantomData<fn() -> S>,
}

impl<S: Synthesize> Shmock<S> {
    /// A controller for an instance of `S`.
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// A controller for the static, receiver-less methods of `S`.
    pub fn new_static() -> Self {
        Self::build(S::target(), true, MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self::build(S::target(), false, config)
    }

    fn build(target: &str, is_static: bool, config: MockConfig) -> Self {
        Shmock {
            handle: Handle::new(target, is_static, S::methods(), config),
            verified: Cell::new(false),
            adopted: false,
            _substitute: PhantomData,
        }
    }

    fn cell(&self) -> &MockCell {
        self.handle.cell()
    }

    fn check_recording(&self, what: &str) -> Result<(), MockError> {
        if self.cell().phase.get() == Phase::Replay {
            Err(MockError::misuse(&self.cell().target,
                format!("{} is not allowed after replay", what)))
        } else {
            Ok(())
        }
    }

    fn configure<F: FnOnce(&mut MockConfig)>(&mut self, what: &str, f: F) {
        if let Err(e) = self.check_recording(what) {
            panic!("{}", e);
        }
        let mut config = self.cell().config.get();
        f(&mut config);
        self.cell().config.set(config);
    }

    /// Add a layer to the mock's interception chain.  Layers run in the
    /// order they were added, ahead of expectation resolution.
    pub fn decorate<D: Decorator + 'static>(&mut self, layer: D) -> &mut Self {
        if let Err(e) = self.check_recording("decorate") {
            panic!("{}", e);
        }
        self.handle.with_state_mut(|state| {
            state.decorators.push(Rc::new(layer))
        });
        self
    }

    /// Let calls that no expectation claims answer with [`Value::Null`]
    /// instead of running the original implementation.
    pub fn dont_preserve_original_methods(&mut self) -> &mut Self {
        self.configure("dont_preserve_original_methods",
            |c| c.preserve_original_methods = false);
        self
    }

    /// Declare an expectation.
    ///
    /// # Panics
    ///
    /// If the controller is already in replay, or if `S` has no method
    /// named `method`.  See [`try_expect`](Shmock::try_expect).
    pub fn expect(&mut self, method: &str, constraints: Vec<Constraint>)
        -> ExpectationBuilder<'_>
    {
        match self.try_expect(method, constraints) {
            Ok(builder) => builder,
            Err(e) => panic!("{}", e)
        }
    }

    /// Declare an expectation, reporting misuse as an error.
    pub fn try_expect(&mut self, method: &str, constraints: Vec<Constraint>)
        -> Result<ExpectationBuilder<'_>, MockError>
    {
        self.check_recording("expect")?;
        if let Some(methods) = self.cell().methods {
            if !methods.contains(&method) {
                return Err(MockError::misuse(&self.cell().target,
                    format!("no method named {}", method)));
            }
        }
        let ordered = self.cell().config.get().order_matters;
        let id = self.handle.with_state_mut(|state| {
            let position = if ordered {
                Some(state.sequence.next())
            } else {
                None
            };
            state.registry.insert(Expectation::new(method, constraints,
                                                   position))
        });
        Ok(ExpectationBuilder{handle: &self.handle, id})
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_replaying(&self) -> bool {
        self.cell().phase.get() == Phase::Replay
    }

    /// Require expectations declared from now on to be satisfied in
    /// declaration order.
    pub fn order_matters(&mut self) -> &mut Self {
        self.configure("order_matters", |c| c.order_matters = true);
        self
    }

    /// Switch to replay and return the substitute.
    ///
    /// For a static controller this also installs the mock as the target
    /// of `S`'s static methods on the current thread, until the controller
    /// is dropped.
    pub fn replay(&mut self) -> Result<S, MockError> {
        self.check_recording("replay")?;
        if self.handle.is_static() {
            let installed = S::static_slot().with(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.is_some() {
                    false
                } else {
                    *slot = Some(self.handle.clone());
                    true
                }
            });
            if !installed {
                return Err(MockError::misuse(&self.cell().target,
                    "a static mock is already in replay on this thread"));
            }
        }
        self.cell().phase.set(Phase::Replay);
        debug!(mock = %self.cell().target, "replay");
        Ok(S::synthesize(self.handle.clone()))
    }

    /// Check every expectation's minimum call count.
    ///
    /// Once called, the controller no longer verifies on drop.
    pub fn verify(&self) -> Result<(), MockError> {
        self.verified.set(true);
        self.handle.verify()
    }
}

impl Shmock<Handle> {
    /// A dynamic mock of the named type.  Any method name may be expected.
    pub fn named(target: &str) -> Self {
        Self::build(target, false, MockConfig::default())
    }
}

impl<S: Synthesize> Default for Shmock<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Synthesize> fmt::Debug for Shmock<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Shmock")
            .field("handle", &self.handle)
            .field("replaying", &self.is_replaying())
            .finish()
    }
}

impl<S: Synthesize> Drop for Shmock<S> {
    fn drop(&mut self) {
        if self.handle.is_static() && self.is_replaying() {
            let _ = S::static_slot().try_with(|slot| {
                let mut slot = slot.borrow_mut();
                if slot.as_ref().map_or(false, |h| h.same_mock(&self.handle))
                {
                    *slot = None;
                }
            });
        }
        if self.adopted || self.verified.get() || thread::panicking() {
            return;
        }
        if let Err(e) = self.handle.verify() {
            panic!("{}", e);
        }
    }
}

/// Configures one expectation.  Returned by [`Shmock::expect`].
///
/// Every method returns the builder again, so calls chain.  Without a
/// frequency the expectation must be called exactly once; without a
/// response it answers with [`Value::Null`].
pub struct ExpectationBuilder<'a> {
    handle: &'a Handle,
    id: ExpectationId,
}

impl<'a> ExpectationBuilder<'a> {
    fn update<F: FnOnce(&mut Expectation)>(&mut self, f: F) -> &mut Self {
        let id = self.id;
        self.handle.with_state_mut(|state| f(state.registry.get_mut(id)));
        self
    }

    fn respond(&mut self, response: Response) -> &mut Self {
        self.update(|e| e.set_response(response))
    }

    /// Allow any number of calls, including none.
    pub fn any(&mut self) -> &mut Self {
        self.update(|e| e.times_mut().any())
    }

    /// Require at least one call.
    pub fn at_least_once(&mut self) -> &mut Self {
        self.update(|e| e.times_mut().at_least(1))
    }

    /// Run the original implementation, with the call's arguments.
    pub fn call_original(&mut self) -> &mut Self {
        self.respond(Response::Fallthrough)
    }

    /// Forbid calls.  A matching call is a resolution failure.
    pub fn never(&mut self) -> &mut Self {
        self.update(|e| e.times_mut().never())
    }

    /// Return each of `values` in turn, then keep returning the last one.
    pub fn return_consecutively<I, T>(&mut self, values: I) -> &mut Self
        where I: IntoIterator<Item=T>,
              T: ToValue
    {
        let values = values.into_iter().map(|v| v.to_value()).collect();
        self.respond(Response::sequence(values))
    }

    /// Return a new mock of type `N`, configured by `setup`.
    ///
    /// The nested mock is verified together with this one.
    pub fn return_shmock<N, F>(&mut self, setup: F) -> &mut Self
        where N: Synthesize,
              F: FnOnce(&mut Shmock<N>)
    {
        let mut nested = Shmock::<N>::new();
        nested.adopted = true;
        setup(&mut nested);
        if !nested.is_replaying() {
            nested.cell().phase.set(Phase::Replay);
        }
        let h = nested.handle.clone();
        self.handle.with_state_mut(|state| state.nested.push(h.clone()));
        self.respond(Response::Nested(h))
    }

    /// Return the mock the call was made on.  For static methods, return
    /// the mocked type's name.
    pub fn return_this(&mut self) -> &mut Self {
        self.respond(Response::ReturnSelf)
    }

    /// Return a fixed value.
    pub fn return_value<T: ToValue>(&mut self, value: T) -> &mut Self {
        self.respond(Response::Return(value.to_value()))
    }

    /// Answer from a table.  Each row holds the leading arguments followed
    /// by the result; the first row whose arguments loosely equal the call's
    /// supplies the result.  A call that matches no row does not match this
    /// expectation.
    pub fn return_value_map<I, R, T>(&mut self, rows: I) -> &mut Self
        where I: IntoIterator<Item=R>,
              R: IntoIterator<Item=T>,
              T: ToValue
    {
        let rows = rows.into_iter()
            .map(|row| row.into_iter().map(|v| v.to_value()).collect())
            .collect();
        self.respond(Response::Map(rows))
    }

    /// Answer with a default exception.
    pub fn throw_default(&mut self) -> &mut Self {
        self.respond(Response::Throw(Value::Str("exception".to_owned())))
    }

    /// Fail the call with `e` as the method's own error.  Synthesized
    /// methods that return `Result<T, E>` convert it into `E`.
    pub fn throw_exception<T: ToValue>(&mut self, e: T) -> &mut Self {
        self.respond(Response::Throw(e.to_value()))
    }

    /// Require exactly `n` calls.
    pub fn times(&mut self, n: usize) -> &mut Self {
        self.update(|e| e.times_mut().n(n))
    }

    /// Require a call count within `range`.  The end is exclusive.
    pub fn times_range(&mut self, range: Range<usize>) -> &mut Self {
        self.update(|e| e.times_mut().range(range))
    }

    /// Compute the result from the call.
    ///
    /// The closure may return anything that implements [`ToValue`], or a
    /// `Result<Value, CallError>`.  It may also call
    /// [`JoinPoint::execute`] to run the original implementation (subject to
    /// the mock's preservation setting) or [`JoinPoint::call_original`].
    pub fn will<F, R>(&mut self, f: F) -> &mut Self
        where F: Fn(&mut JoinPoint<'_, '_>) -> R + 'static,
              R: IntoOutcome
    {
        let f = move |jp: &mut JoinPoint<'_, '_>| f(jp).into_outcome();
        self.respond(Response::Compute(Rc::new(f)))
    }
}

#[cfg(test)]
mod t {
    use super::*;
    use crate::args;

    #[test]
    fn call_before_replay_is_misuse() {
        let mut c = Shmock::<Handle>::named("Foo");
        c.expect("foo", args![]).any();
        let e = c.handle().call("foo", vec![]).unwrap_err();
        assert!(e.mock_error().unwrap().is_misuse());
    }

    #[test]
    fn replay_twice_is_misuse() {
        let mut c = Shmock::<Handle>::named("Foo");
        c.replay().unwrap();
        assert!(c.replay().unwrap_err().is_misuse());
    }

    #[test]
    fn expect_after_replay_is_misuse() {
        let mut c = Shmock::<Handle>::named("Foo");
        c.replay().unwrap();
        assert!(c.try_expect("foo", args![]).err().unwrap().is_misuse());
    }

    #[test]
    fn clones_are_the_same_mock() {
        let mut c = Shmock::<Handle>::named("Foo");
        let a = c.replay().unwrap();
        let b = a.clone();
        assert!(a.same_mock(&b));
        assert!(!a.same_mock(Shmock::<Handle>::named("Foo").handle()));
    }

    #[test]
    fn debug() {
        let c = Shmock::<Handle>::named("Foo");
        assert_eq!("Handle { target: \"Foo\", static: false }",
                   format!("{:?}", c.handle()));
    }

    #[test]
    fn static_slot_is_released_on_drop() {
        {
            let mut c = Shmock::<Handle>::new_static();
            c.replay().unwrap();
            assert!(DYNAMIC_STATIC.with(|s| s.borrow().is_some()));
        }
        assert!(DYNAMIC_STATIC.with(|s| s.borrow().is_none()));
    }

    #[test]
    fn second_static_replay_is_misuse() {
        let mut a = Shmock::<Handle>::new_static();
        a.replay().unwrap();
        let mut b = Shmock::<Handle>::new_static();
        assert!(b.replay().unwrap_err().is_misuse());
    }

    #[test]
    fn calls() {
        let mut c = Shmock::<Handle>::named("Foo");
        c.expect("foo", args![1]).any();
        c.expect("foo", args![2]).any();
        let h = c.replay().unwrap();
        h.call("foo", vec![1.into()]).unwrap();
        h.call("foo", vec![2.into()]).unwrap();
        h.call("foo", vec![2.into()]).unwrap();
        assert_eq!(3, h.calls("foo"));
        assert_eq!(0, h.calls("bar"));
    }

    #[test]
    fn call_states() {
        let mut c = Shmock::<Handle>::named("Foo");
        c.expect("foo", args![]).times(2);
        c.expect("foo", args![]).any();
        c.expect("bar", args![]).never();
        let h = c.replay().unwrap();
        assert_eq!(vec![CallState::Pending, CallState::Pending],
                   h.call_states("foo"));
        h.call("foo", vec![]).unwrap();
        assert_eq!(vec![CallState::PartiallySatisfied, CallState::Pending],
                   h.call_states("foo"));
        h.call("foo", vec![]).unwrap();
        h.call("foo", vec![]).unwrap();
        assert_eq!(vec![CallState::Exhausted, CallState::Satisfied],
                   h.call_states("foo"));
        assert_eq!(vec![CallState::Exhausted], h.call_states("bar"));
        assert!(h.call_states("baz").is_empty());
    }
}
