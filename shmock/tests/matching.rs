// vim: tw=80
//! Argument constraints and loose equality
use std::collections::HashMap;

use shmock::*;

#[shmock]
trait Calculator {
    fn add(&self, a: i64, b: i64) -> i64;
    fn scale(&self, a: f64, b: f64) -> f64;
    fn concat(&self, a: &str, b: &str) -> String;
    fn sum(&self, values: &[i32]) -> i64;
    fn lookup(&self, table: HashMap<String, i32>, key: &str) -> i32;
}

#[test]
fn exact() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![2, 2]).return_value(4);
    let calc = ctrl.replay().unwrap();
    assert_eq!(4, calc.add(2, 2));
}

#[test]
#[should_panic(expected = "Calculator::add(2, 3): No matching expectation found\n  add(2, 2) exactly 1 times: argument 1: expected 2, got 3")]
fn mismatch() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![2, 2]).return_value(4);
    let calc = ctrl.replay().unwrap();
    calc.add(2, 3);
}

/// Arguments past the last constraint are not checked.
#[test]
fn trailing_arguments() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![2]).times(2).return_value(0);
    let calc = ctrl.replay().unwrap();
    calc.add(2, 3);
    calc.add(2, 99);
}

#[test]
fn no_constraints() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![]).return_value(7);
    let calc = ctrl.replay().unwrap();
    assert_eq!(7, calc.add(-1, 1));
}

#[test]
fn numeric_strings_match_numbers() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("scale", args!["1", "2"]).return_value(2);
    let calc = ctrl.replay().unwrap();
    assert_eq!(2.0, calc.scale(1.0, 2.0));
}

#[test]
fn integers_match_floats() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("scale", args![3, 0.5]).return_value(1.5);
    let calc = ctrl.replay().unwrap();
    assert_eq!(1.5, calc.scale(3.0, 0.5));
}

#[test]
fn numbers_match_numeric_strings() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("concat", args![1, 2.5]).return_value("12.5");
    let calc = ctrl.replay().unwrap();
    assert_eq!("12.5", calc.concat("1", "2.50"));
}

#[test]
#[should_panic(expected = "No matching expectation found")]
fn strings_are_not_numbers() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("concat", args![1, 2]).return_value("12");
    let calc = ctrl.replay().unwrap();
    calc.concat("one", "two");
}

#[test]
fn lists() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("sum", args![vec!["1", "2", "3"]]).return_value(6);
    ctrl.expect("sum", args![Vec::<i32>::new()]).return_value(0);
    let calc = ctrl.replay().unwrap();
    assert_eq!(0, calc.sum(&[]));
    assert_eq!(6, calc.sum(&[1, 2, 3]));
}

#[test]
#[should_panic(expected = "No matching expectation found")]
fn lists_of_different_length() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("sum", args![vec![1, 2]]).return_value(3);
    let calc = ctrl.replay().unwrap();
    calc.sum(&[1, 2, 3]);
}

/// Maps compare by key set, whatever their order.
#[test]
fn maps() {
    let mut expected = HashMap::new();
    expected.insert("b".to_owned(), "2");
    expected.insert("a".to_owned(), "1");
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("lookup", args![expected, "a"]).return_value(1);
    let calc = ctrl.replay().unwrap();
    let mut table = HashMap::new();
    table.insert("a".to_owned(), 1);
    table.insert("b".to_owned(), 2);
    assert_eq!(1, calc.lookup(table, "a"));
}

#[test]
#[should_panic(expected = "No matching expectation found")]
fn maps_with_extra_keys() {
    let mut expected = HashMap::new();
    expected.insert("a".to_owned(), 1);
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("lookup", args![expected]).return_value(1);
    let calc = ctrl.replay().unwrap();
    let mut table = HashMap::new();
    table.insert("a".to_owned(), 1);
    table.insert("b".to_owned(), 2);
    calc.lookup(table, "a");
}

#[test]
fn anything() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![shmock::anything(), 5]).times(2).return_value(1);
    let calc = ctrl.replay().unwrap();
    calc.add(i64::MIN, 5);
    calc.add(0, 5);
}

#[test]
fn predicates() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![matching(predicate::gt(Value::Int(10)))])
        .any()
        .return_value(1);
    ctrl.expect("add", args![matching(predicate::le(Value::Int(10)))])
        .any()
        .return_value(2);
    let calc = ctrl.replay().unwrap();
    assert_eq!(1, calc.add(11, 0));
    assert_eq!(2, calc.add(10, 0));
}

#[test]
fn closures() {
    let even = || satisfies(|v| v.as_i64().map_or(false, |i| i % 2 == 0));
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![even(), even()]).return_value(1);
    ctrl.expect("add", args![]).return_value(2);
    let calc = ctrl.replay().unwrap();
    assert_eq!(2, calc.add(1, 2));
    assert_eq!(1, calc.add(4, 2));
}

#[test]
#[should_panic(expected = "argument 0: got 3")]
fn predicate_failures_are_explained() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![matching(predicate::eq(Value::Int(4)))]);
    let calc = ctrl.replay().unwrap();
    calc.add(3, 0);
}

/// When several expectations match, the first declared one wins.
#[test]
fn first_declared_wins() {
    let mut ctrl = MockCalculator::shmock();
    ctrl.expect("add", args![1]).any().return_value(10);
    ctrl.expect("add", args![]).any().return_value(20);
    let calc = ctrl.replay().unwrap();
    assert_eq!(10, calc.add(1, 1));
    assert_eq!(20, calc.add(2, 1));
    assert_eq!(10, calc.add(1, 2));
}

#[test]
fn every_candidate_is_explained() {
    let mut ctrl = Shmock::<Handle>::named("Calculator");
    ctrl.expect("add", args![1, 1]);
    ctrl.expect("add", args![2]);
    let calc = ctrl.replay().unwrap();
    let e = calc.call("add", vec![3.into(), 1.into()]).unwrap_err();
    assert_eq!("Calculator::add(3, 1): No matching expectation found\n  \
               add(1, 1) exactly 1 times: argument 0: expected 1, got 3\n  \
               add(2) exactly 1 times: argument 0: expected 2, got 3",
               e.to_string());
    ctrl.verify().unwrap_err();
}

#[test]
fn composite_arguments() {
    let mut ctrl = Shmock::<Handle>::named("Calculator");
    ctrl.expect("multiply", args![vec![2, 2], 2]).return_value(8);
    ctrl.expect("multiply", args![1, 2]).return_value(2);
    let calc = ctrl.replay().unwrap();
    let v = calc.call("multiply",
        vec![Value::List(vec![2.0.into(), "2".into()]), 2.into()]);
    assert_eq!(Value::Int(8), v.unwrap());
    let v = calc.call("multiply", vec![1.into(), 2.into(), 3.into()]);
    assert_eq!(Value::Int(2), v.unwrap());
}
