// vim: tw=80
//! `&mut` arguments are written back to the caller
use shmock::*;

#[shmock]
trait Counter {
    fn bump(&self, n: &mut u32);
    fn fill(&mut self, buf: &mut Vec<u8>, len: usize) -> usize {
        buf.resize(len, 0xff);
        len
    }
}

#[test]
fn written_by_will() {
    let mut ctrl = MockCounter::shmock();
    ctrl.expect("bump", args![1]).will(|jp| {
        jp.arguments_mut()[0] = Value::Int(2);
    });
    let c = ctrl.replay().unwrap();
    let mut n = 1;
    c.bump(&mut n);
    assert_eq!(2, n);
}

#[test]
fn untouched() {
    let mut ctrl = MockCounter::shmock();
    ctrl.expect("bump", args![]).return_value(());
    let c = ctrl.replay().unwrap();
    let mut n = 5;
    c.bump(&mut n);
    assert_eq!(5, n);
}

#[test]
fn written_by_original() {
    let mut ctrl = MockCounter::shmock();
    let mut c = ctrl.replay().unwrap();
    let mut buf = vec![1];
    assert_eq!(3, c.fill(&mut buf, 3));
    assert_eq!(vec![1, 0xff, 0xff], buf);
}

#[test]
fn matched_on_entry_value() {
    let mut ctrl = MockCounter::shmock();
    ctrl.expect("fill", args![vec![1, 2]]).return_value(7);
    let mut c = ctrl.replay().unwrap();
    let mut buf = vec![1, 2];
    assert_eq!(7, c.fill(&mut buf, 0));
    assert_eq!(vec![1, 2], buf);
}

#[test]
#[should_panic(expected = "Counter::bump: argument 0: cannot convert")]
fn bad_write_back() {
    let mut ctrl = MockCounter::shmock();
    ctrl.expect("bump", args![]).will(|jp| {
        jp.arguments_mut()[0] = Value::from("two");
    });
    let c = ctrl.replay().unwrap();
    let mut n = 1;
    c.bump(&mut n);
}
