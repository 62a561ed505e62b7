// vim: tw=80
//! Dynamic values carried through the interception chain.
//!
//! Every argument of an intercepted call, and every result produced by a
//! [`Response`](crate::Response), travels as a [`Value`].  The
//! [`ToValue`] and [`FromValue`] traits convert between `Value` and ordinary
//! Rust types; the `#[shmock]` attribute uses them at the boundary of each
//! synthesized method.

use cfg_if::cfg_if;
use downcast::{downcast, Any};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug, Display},
    rc::Rc,
};

use crate::{error::ValueError, mock::Handle};

/// An opaque Rust value stored inside a [`Value::Object`].
///
/// Anything `Debug + 'static` is an `Object`.  Use
/// [`Value::downcast_ref`] to get the concrete type back.
pub trait Object: Any + Debug {}
downcast!(dyn Object);

impl<T: Debug + 'static> Object for T {}

/// A dynamically typed argument or return value.
///
/// Equality between `Value`s is *loose*: numbers compare numerically across
/// `Int`, `Float` and numeric strings, and composites compare structurally.
/// See [`Value::loose_eq`] for the complete rules.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// The absence value.  Converts to `Default::default()` of typed returns.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An ordered sequence.
    List(Vec<Value>),
    /// An ordered key/value container.  Keys are unique.
    Map(Vec<(String, Value)>),
    /// An opaque Rust value, compared by identity.
    Object(Rc<dyn Object>),
    /// A mock, as produced by `return_this` and `return_shmock`.
    Mock(Handle),
}

impl Value {
    /// Wrap an arbitrary Rust value.
    ///
    /// ```
    /// # use shmock::Value;
    /// #[derive(Debug, PartialEq)]
    /// struct Token(u32);
    ///
    /// let v = Value::object(Token(7));
    /// assert_eq!(Some(&Token(7)), v.downcast_ref::<Token>());
    /// ```
    pub fn object<T: Debug + 'static>(t: T) -> Self {
        Value::Object(Rc::new(t))
    }

    /// Borrow the concrete type inside a [`Value::Object`].
    pub fn downcast_ref<T: Debug + 'static>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.as_ref().downcast_ref::<T>().ok(),
            _ => None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None
        }
    }

    /// Numeric view of the value, parsing numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => parse_number(s),
            _ => None
        }
    }

    /// Integral view of the value.  Floats and numeric strings qualify only
    /// when they hold a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => whole_i64(*f),
            Value::Str(s) => s.trim().parse::<i64>().ok()
                .or_else(|| parse_number(s).and_then(whole_i64)),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a key of a [`Value::Map`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Mock(_) => "mock",
        }
    }

    /// Coercive equality used for literal argument constraints.
    ///
    /// * `Int` and `Float` compare numerically, so `1 == 1.0`.
    /// * A numeric string equals a number of the same magnitude, and two
    ///   numeric strings compare as numbers, so `"1" == 1` and
    ///   `"1" == "1.0"`.
    /// * `Bool` only equals `Bool` and `Null` only equals `Null`.
    /// * Lists compare element-wise.  Maps must have the same key set, and
    ///   each key's values must be loosely equal; entry order is ignored.
    /// * Objects and mocks compare by identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;

        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Int(_) | Float(_), Int(_) | Float(_) | Str(_))
                | (Str(_), Int(_) | Float(_)) =>
            {
                numeric_eq(self, other)
            },
            (Str(a), Str(b)) => a == b || numeric_eq(self, other),
            (List(a), List(b)) => {
                a.len() == b.len() &&
                    a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            },
            (Map(a), Map(b)) => {
                a.iter().all(|(k, v)| {
                    other.get(k).map_or(false, |w| v.loose_eq(w))
                }) && b.iter().all(|(k, w)| {
                    self.get(k).map_or(false, |v| v.loose_eq(w))
                })
            },
            (Object(a), Object(b)) => Rc::ptr_eq(a, b),
            (Mock(a), Mock(b)) => a.same_mock(b),
            _ => false
        }
    }
}

/// Parse a numeric string, ignoring surrounding ASCII whitespace.
fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Convert a float that holds a whole number within `i64`'s range.
fn whole_i64(f: f64) -> Option<i64> {
    // 2^63 is exact as an f64; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn numeric_eq(a: &Value, b: &Value) -> bool {
    // An Int only equals numbers that are exactly that integer
    if let Value::Int(x) = a {
        return b.as_i64() == Some(*x);
    }
    if let Value::Int(y) = b {
        return a.as_i64() == Some(*y);
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.loose_eq(other)
    }
}

impl PartialOrd for Value {
    /// Numbers (including numeric strings) order numerically, other strings
    /// lexically.  Everything else is unordered unless loosely equal.
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        if self.loose_eq(other) {
            return Some(Ordering::Equal);
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => match (self, other) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => None
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            },
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            },
            Value::Object(o) => write!(f, "{:?}", o),
            Value::Mock(h) => write!(f, "<mock {}>", h.target()),
        }
    }
}

/// Render an argument list as `a, b, c`.
pub(crate) fn display_args(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Conversion into a [`Value`].
///
/// Implemented for the primitive types, strings, options, sequences,
/// string-keyed maps, `()` and `Value`, and for references to any of them.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion out of a [`Value`].
///
/// [`Value::Null`] converts to the type's default, so a call answered with
/// the absence value still produces something of the right type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for &mut T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

/// Unit accepts, and discards, anything.
impl FromValue for () {
    fn from_value(_value: Value) -> Result<Self, ValueError> {
        Ok(())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(ValueError::new(&other, "bool"))
        }
    }
}

macro_rules! integer_value {
    ($($t:ty)*) => {$(
        impl ToValue for $t {
            #[allow(clippy::unnecessary_cast)]
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                if value.is_null() {
                    return Ok(<$t>::default());
                }
                value.as_i64()
                    .and_then(|i| <$t>::try_from(i).ok())
                    .ok_or_else(|| ValueError::new(&value, stringify!($t)))
            }
        }
    )*}
}

integer_value!{i8 i16 i32 i64 isize u8 u16 u32 usize}

/// `u64` values above `i64::MAX` do not fit a [`Value::Int`] and are carried
/// as floats.
impl ToValue for u64 {
    fn to_value(&self) -> Value {
        i64::try_from(*self)
            .map(Value::Int)
            .unwrap_or(Value::Float(*self as f64))
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        if value.is_null() {
            return Ok(0);
        }
        value.as_i64()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or_else(|| ValueError::new(&value, "u64"))
    }
}

macro_rules! float_value {
    ($($t:ty)*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Float(f64::from(*self))
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                if value.is_null() {
                    return Ok(0.0);
                }
                value.as_f64()
                    .map(|f| f as $t)
                    .ok_or_else(|| ValueError::new(&value, stringify!($t)))
            }
        }
    )*}
}

float_value!{f32 f64}

impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

/// Numbers and booleans convert to their textual form.
impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Str(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ValueError::new(&other, "String"))
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(t) => t.to_value(),
            None => Value::Null
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some)
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        self[..].to_value()
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self[..].to_value()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::List(l) => l.into_iter().map(T::from_value).collect(),
            other => Err(ValueError::new(&other, "Vec"))
        }
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect())
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(BTreeMap::new()),
            Value::Map(entries) => entries.into_iter()
                .map(|(k, v)| T::from_value(v).map(|t| (k, t)))
                .collect(),
            other => Err(ValueError::new(&other, "BTreeMap"))
        }
    }
}

/// Entries are sorted by key, since `HashMap` iteration order is arbitrary.
impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        let mut entries = self.iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Value::Map(entries)
    }
}

impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(HashMap::new()),
            Value::Map(entries) => entries.into_iter()
                .map(|(k, v)| T::from_value(v).map(|t| (k, t)))
                .collect(),
            other => Err(ValueError::new(&other, "HashMap"))
        }
    }
}

impl<T: Debug + 'static> ToValue for Rc<T> {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl ToValue for Handle {
    fn to_value(&self) -> Value {
        Value::Mock(self.clone())
    }
}

impl FromValue for Handle {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Mock(h) => Ok(h),
            other => Err(ValueError::new(&other, "Handle"))
        }
    }
}

macro_rules! from_for_value {
    ($($t:ty)*) => {$(
        impl From<$t> for Value {
            fn from(t: $t) -> Self {
                t.to_value()
            }
        }
    )*}
}

from_for_value!{bool i8 i16 i32 i64 isize u8 u16 u32 u64 usize f32 f64 char
    String &str}

impl<T: ToValue> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        v.to_value()
    }
}

cfg_if! {
    if #[cfg(feature = "json")] {
        #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
        impl ToValue for serde_json::Value {
            fn to_value(&self) -> Value {
                use serde_json::Value as J;

                match self {
                    J::Null => Value::Null,
                    J::Bool(b) => Value::Bool(*b),
                    J::Number(n) => n.as_i64()
                        .map(Value::Int)
                        .unwrap_or_else(|| {
                            Value::Float(n.as_f64().unwrap_or(f64::NAN))
                        }),
                    J::String(s) => Value::Str(s.clone()),
                    J::Array(a) => a.to_value(),
                    J::Object(o) => Value::Map(o.iter()
                        .map(|(k, v)| (k.clone(), v.to_value()))
                        .collect()),
                }
            }
        }

        #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
        impl FromValue for serde_json::Value {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                use serde_json::Value as J;

                match value {
                    Value::Null => Ok(J::Null),
                    Value::Bool(b) => Ok(J::Bool(b)),
                    Value::Int(i) => Ok(J::from(i)),
                    Value::Float(f) => serde_json::Number::from_f64(f)
                        .map(J::Number)
                        .ok_or_else(|| {
                            ValueError::new(&Value::Float(f),
                                "serde_json::Value")
                        }),
                    Value::Str(s) => Ok(J::String(s)),
                    Value::List(l) => l.into_iter()
                        .map(J::from_value)
                        .collect::<Result<Vec<_>, _>>()
                        .map(J::Array),
                    Value::Map(entries) => entries.into_iter()
                        .map(|(k, v)| J::from_value(v).map(|j| (k, j)))
                        .collect::<Result<serde_json::Map<_, _>, _>>()
                        .map(J::Object),
                    other => Err(ValueError::new(&other, "serde_json::Value"))
                }
            }
        }
    }
}

#[cfg(test)]
mod t {
    use super::*;

    fn s(x: &str) -> Value {
        Value::Str(x.to_owned())
    }

    #[test]
    fn int_float_cross_equality() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Float(2.0).loose_eq(&Value::Int(2)));
        assert!(!Value::Int(1).loose_eq(&Value::Float(1.5)));
    }

    #[test]
    fn numeric_strings() {
        assert!(s("1").loose_eq(&Value::Int(1)));
        assert!(Value::Float(2.0).loose_eq(&s("2")));
        assert!(s(" 3 ").loose_eq(&Value::Int(3)));
        assert!(s("1").loose_eq(&s("1.0")));
        assert!(!s("abc").loose_eq(&Value::Int(0)));
        assert!(!s("").loose_eq(&Value::Int(0)));
    }

    #[test]
    fn bool_and_null_are_strict() {
        assert!(!Value::Bool(true).loose_eq(&Value::Int(1)));
        assert!(!Value::Null.loose_eq(&Value::Int(0)));
        assert!(!Value::Null.loose_eq(&s("")));
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn lists_compare_elementwise() {
        let a = [2, 2].to_value();
        let b = Value::List(vec![s("2"), Value::Float(2.0)]);
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&[2, 2, 2].to_value()));
        assert!(!a.loose_eq(&[2, 3].to_value()));
    }

    #[test]
    fn maps_ignore_key_order() {
        let a = Value::Map(vec![("x".into(), Value::Int(1)),
                                ("y".into(), Value::Int(2))]);
        let b = Value::Map(vec![("y".into(), s("2")),
                                ("x".into(), Value::Float(1.0))]);
        let c = Value::Map(vec![("x".into(), Value::Int(1)),
                                ("z".into(), Value::Int(2))]);
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&c));
    }

    #[test]
    fn maps_with_duplicate_keys_are_symmetric() {
        let a = Value::Map(vec![("x".into(), Value::Int(1)),
                                ("x".into(), Value::Int(1))]);
        let b = Value::Map(vec![("x".into(), Value::Int(1)),
                                ("y".into(), Value::Int(2))]);
        assert!(!a.loose_eq(&b));
        assert!(!b.loose_eq(&a));
        let c = Value::Map(vec![("x".into(), Value::Int(1))]);
        assert_eq!(a.loose_eq(&c), c.loose_eq(&a));
    }

    #[test]
    fn huge_numbers_are_not_clamped() {
        let max = Value::Int(i64::MAX);
        assert!(!max.loose_eq(&Value::Float(1e19)));
        assert!(!max.loose_eq(&Value::Float(1e300)));
        assert!(!max.loose_eq(&Value::Float(9_223_372_036_854_775_808.0)));
        assert!(!max.loose_eq(&s("9223372036854775808")));
        assert!(!Value::Float(1e19).loose_eq(&max));
        assert!(!Value::Int(i64::MIN).loose_eq(&Value::Float(-1e300)));
        assert!(Value::Int(i64::MIN)
            .loose_eq(&Value::Float(-9_223_372_036_854_775_808.0)));
        assert_eq!(None, Value::Float(f64::INFINITY).as_i64());
        assert_eq!(None, Value::Float(f64::NAN).as_i64());
    }

    #[test]
    fn huge_numbers_do_not_convert() {
        assert!(i64::from_value(Value::Float(1e19)).is_err());
        assert!(i64::from_value(s("1e300")).is_err());
        assert!(u64::from_value(Value::Float(-1e300)).is_err());
        assert_eq!(1 << 62, i64::from_value(Value::Float(2f64.powi(62)))
                   .unwrap());
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::object(5u32);
        let b = a.clone();
        let c = Value::object(5u32);
        assert!(a.loose_eq(&b));
        assert!(!a.loose_eq(&c));
    }

    #[test]
    fn null_converts_to_defaults() {
        assert_eq!(0, i64::from_value(Value::Null).unwrap());
        assert_eq!("", String::from_value(Value::Null).unwrap());
        assert_eq!(None, Option::<u32>::from_value(Value::Null).unwrap());
        assert!(Vec::<u8>::from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn integer_conversion_is_coercive() {
        assert_eq!(7, u8::from_value(s("7")).unwrap());
        assert_eq!(4, i32::from_value(Value::Float(4.0)).unwrap());
        assert!(i32::from_value(Value::Float(4.5)).is_err());
        assert!(u8::from_value(Value::Int(300)).is_err());
    }

    #[test]
    fn ordering() {
        assert!(Value::Int(3) > Value::Float(2.5));
        assert!(s("10") > Value::Int(9));
        assert!(s("abc") < s("abd"));
        assert_eq!(None, Value::Bool(true).partial_cmp(&Value::Int(1)));
    }

    #[test]
    fn display() {
        let v = Value::List(vec![Value::Int(1), s("a"), Value::Null]);
        assert_eq!("[1, \"a\", null]", v.to_string());
    }

    #[test]
    fn rc_shares_the_allocation() {
        #[derive(Debug)]
        struct Widget(u8);
        let w = Rc::new(Widget(3));
        let v = w.to_value();
        let inner = v.downcast_ref::<Widget>().unwrap();
        assert!(std::ptr::eq(w.as_ref(), inner));
        assert!(v.downcast_ref::<String>().is_none());
    }
}
