// vim: tw=80
//! Fluent interfaces
use shmock::*;

#[shmock]
trait Builder {
    fn width(&self, w: u32) -> Self;
    fn height(&self, h: u32) -> Self;
    fn area(&self) -> u32;
}

#[test]
fn return_this() {
    let mut ctrl = MockBuilder::shmock();
    ctrl.expect("width", args![2]).return_this();
    ctrl.expect("height", args![3]).return_this();
    ctrl.expect("area", args![]).return_value(6);
    let b = ctrl.replay().unwrap();
    assert_eq!(6, b.width(2).height(3).area());
}

#[test]
fn dynamic() {
    let mut ctrl = Shmock::<Handle>::named("Builder");
    ctrl.expect("width", args![]).return_this();
    let b = ctrl.replay().unwrap();
    match b.call("width", vec![2.into()]).unwrap() {
        Value::Mock(h) => assert!(h.same_mock(&b)),
        v => panic!("Unexpected value {}", v)
    }
}
