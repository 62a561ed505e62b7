// vim: tw=80
//! Mocking methods without a receiver
use shmock::*;

#[shmock]
trait Clock {
    fn now() -> u64;
    fn zone(offset: i32) -> String {
        format!("UTC{:+}", offset)
    }
    fn tick(&self) -> u64;
}

#[test]
fn returning() {
    let mut ctrl = MockClock::shmock_static();
    ctrl.expect("now", args![]).return_value(1234);
    ctrl.replay().unwrap();
    assert_eq!(1234, MockClock::now());
}

#[test]
fn original() {
    let mut ctrl = MockClock::shmock_static();
    ctrl.replay().unwrap();
    assert_eq!("UTC+2", MockClock::zone(2));
}

#[test]
fn return_this_is_the_type_name() {
    let mut ctrl = MockClock::shmock_static();
    ctrl.expect("zone", args![]).return_this();
    ctrl.replay().unwrap();
    assert_eq!("Clock", MockClock::zone(0));
}

/// Instance and static controllers are independent.
#[test]
fn separate_from_instances() {
    let mut statics = MockClock::shmock_static();
    statics.expect("now", args![]).return_value(1);
    statics.replay().unwrap();
    let mut ctrl = MockClock::shmock();
    ctrl.expect("tick", args![]).return_value(2);
    let clock = ctrl.replay().unwrap();
    assert_eq!(2, clock.tick());
    assert_eq!(1, MockClock::now());
}

#[test]
fn released_on_drop() {
    {
        let mut ctrl = MockClock::shmock_static();
        ctrl.expect("now", args![]).return_value(1);
        ctrl.replay().unwrap();
        assert_eq!(1, MockClock::now());
    }
    let mut ctrl = MockClock::shmock_static();
    ctrl.expect("now", args![]).return_value(2);
    ctrl.replay().unwrap();
    assert_eq!(2, MockClock::now());
}

#[test]
#[should_panic(expected =
    "Clock: static method called with no static mock in replay")]
fn not_installed() {
    MockClock::now();
}

#[test]
fn second_controller() {
    let mut a = MockClock::shmock_static();
    a.replay().unwrap();
    let mut b = MockClock::shmock_static();
    assert!(b.replay().unwrap_err().is_misuse());
}
