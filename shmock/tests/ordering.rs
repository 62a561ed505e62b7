// vim: tw=80
//! Ordered expectations
use shmock::*;

#[shmock]
trait Source {
    fn get_an_int(&self) -> i32;
    fn open(&self, name: &str);
    fn close(&self);
}

#[test]
fn same_method() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("get_an_int", args![]).return_value(2);
    ctrl.expect("get_an_int", args![]).return_value(4);
    let src = ctrl.replay().unwrap();
    assert_eq!(2, src.get_an_int());
    assert_eq!(4, src.get_an_int());
}

#[test]
fn different_methods() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args!["a"]);
    ctrl.expect("get_an_int", args![]).return_value(1);
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.open("a");
    assert_eq!(1, src.get_an_int());
    src.close();
}

#[test]
#[should_panic(expected = "Source::close(): Method sequence violation: expected a call to open(\"a\") exactly 1 times at position 0 first")]
fn out_of_order() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args!["a"]);
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.close();
}

#[test]
#[should_panic(expected = "Method sequence violation")]
fn same_method_out_of_order() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args!["a"]);
    ctrl.expect("open", args!["b"]);
    let src = ctrl.replay().unwrap();
    src.open("b");
}

/// An expectation that is satisfied but not exhausted doesn't hold up the
/// next one.
#[test]
fn satisfied_expectations_may_be_skipped() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args![]).at_least_once();
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.open("a");
    src.open("b");
    src.close();
}

#[test]
#[should_panic(expected = "Method sequence violation")]
fn no_going_back() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args![]).at_least_once();
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.open("a");
    src.close();
    src.open("b");
}

/// Optional expectations may be skipped entirely.
#[test]
fn optional_expectations() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args![]).any();
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.close();
}

/// Expectations declared before `order_matters` are unordered.
#[test]
fn unordered_expectations_mix_in() {
    let mut ctrl = MockSource::shmock();
    ctrl.expect("get_an_int", args![]).any().return_value(9);
    ctrl.order_matters();
    ctrl.expect("open", args![]);
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    assert_eq!(9, src.get_an_int());
    src.open("a");
    assert_eq!(9, src.get_an_int());
    src.close();
    assert_eq!(9, src.get_an_int());
}

#[test]
fn repeated_calls_stay_in_place() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("get_an_int", args![]).times(2).return_value(1);
    ctrl.expect("get_an_int", args![]).return_value(2);
    let src = ctrl.replay().unwrap();
    assert_eq!(1, src.get_an_int());
    assert_eq!(1, src.get_an_int());
    assert_eq!(2, src.get_an_int());
}

#[test]
#[should_panic(expected = "unsatisfied expectations")]
fn unsatisfied_ordered_expectations() {
    let mut ctrl = MockSource::shmock();
    ctrl.order_matters();
    ctrl.expect("open", args![]);
    ctrl.expect("close", args![]);
    let src = ctrl.replay().unwrap();
    src.open("a");
}
