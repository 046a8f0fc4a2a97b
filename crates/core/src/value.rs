//! The polymorphic value system used to marshal data between guest programs
//! and host peripherals.
//!
//! Ported from the reference implementation's `nn_value` tagged union
//! (`examples/original_source/src/value.c`). Retain/drop become ordinary
//! `Clone`/scope-based `Drop` backed by `Rc`; `ARRAY` and `TABLE` use
//! `Rc<RefCell<_>>` so a `set` call mutates every holder's view, matching
//! the "cells are mutable in place" contract. There is no FFI boundary in
//! this workspace, so `CSTR` is represented as a `'static` borrowed string
//! rather than a raw pointer — `'static` trivially satisfies "lifetime
//! must outlive any retain".

use std::cell::RefCell;
use std::rc::Rc;

/// An immutable, owned byte buffer (may contain interior NULs).
#[derive(Debug, PartialEq, Eq)]
pub struct NnString(Vec<u8>);

impl NnString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A tagged sum type for marshaled data.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Int(i64),
    Number(f64),
    Bool(bool),
    /// Borrowed, `'static` string constant (signal names, fixed labels).
    CStr(&'static str),
    /// Owned, reference-counted, immutable byte string.
    Str(Rc<NnString>),
    /// Reference-counted, fixed-length sequence of values, mutable in place.
    Array(Rc<RefCell<Vec<Value>>>),
    /// Reference-counted sequence of (key, value) pairs; no deduplication.
    Table(Rc<RefCell<Vec<(Value, Value)>>>),
}

impl Value {
    pub fn nil() -> Value {
        Value::Nil
    }

    pub fn int(v: i64) -> Value {
        Value::Int(v)
    }

    pub fn number(v: f64) -> Value {
        Value::Number(v)
    }

    pub fn boolean(v: bool) -> Value {
        Value::Bool(v)
    }

    pub fn cstr(v: &'static str) -> Value {
        Value::CStr(v)
    }

    /// Constructs an owned string from any byte slice.
    pub fn string(bytes: impl Into<Vec<u8>>) -> Value {
        Value::Str(Rc::new(NnString(bytes.into())))
    }

    /// Constructs an array of `len` nil-filled cells.
    pub fn array(len: usize) -> Value {
        Value::Array(Rc::new(RefCell::new(vec![Value::Nil; len])))
    }

    /// Constructs a table of `pair_count` (nil, nil) pairs.
    pub fn table(pair_count: usize) -> Value {
        Value::Table(Rc::new(RefCell::new(vec![
            (Value::Nil, Value::Nil);
            pair_count
        ])))
    }

    /// Retains this value: for reference-counted variants, equivalent to
    /// cloning the `Rc` (bumping the strong count); for everything else a
    /// cheap value copy.
    pub fn retain(&self) -> Value {
        self.clone()
    }

    /// Type tag name, used for diagnostics and bad-argument messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::CStr(_) => "string",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }

    /// `toBoolean`: only `Nil` and `Bool(false)` are false.
    pub fn to_boolean(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// `toInt`: `Int` passes through; `Number` truncates; everything else 0.
    pub fn to_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Number(n) => *n as i64,
            _ => 0,
        }
    }

    /// `toNumber`: `Int`/`Number` convert; everything else 0.0.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Number(n) => *n,
            _ => 0.0,
        }
    }

    /// `toCString`/`toString` collapsed: returns the byte contents of a
    /// `CStr` or `Str`, or `None` for every other variant.
    pub fn to_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::CStr(s) => Some(s.as_bytes()),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn to_str(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.to_bytes().map(|b| String::from_utf8_lossy(b))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

/// `get(array, i)`: out-of-range or wrong-tag is a no-op that returns nil,
/// never an abort.
pub fn array_get(array: &Value, index: usize) -> Value {
    if let Value::Array(cells) = array {
        cells.borrow().get(index).cloned().unwrap_or(Value::Nil)
    } else {
        Value::Nil
    }
}

/// `set(array, i, v)`: out-of-range or wrong-tag is a silent no-op.
pub fn array_set(array: &Value, index: usize, value: Value) {
    if let Value::Array(cells) = array {
        if let Some(cell) = cells.borrow_mut().get_mut(index) {
            *cell = value;
        }
    }
}

/// `getPair(table, i)`: out-of-range or wrong-tag returns `(nil, nil)`.
pub fn table_get_pair(table: &Value, index: usize) -> (Value, Value) {
    if let Value::Table(pairs) = table {
        pairs
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or((Value::Nil, Value::Nil))
    } else {
        (Value::Nil, Value::Nil)
    }
}

/// `setPair(table, i, k, v)`: out-of-range or wrong-tag is a silent no-op.
pub fn table_set_pair(table: &Value, index: usize, key: Value, val: Value) {
    if let Value::Table(pairs) = table {
        if let Some(pair) = pairs.borrow_mut().get_mut(index) {
            *pair = (key, val);
        }
    }
}

/// The modem/signal-queue packet-size estimator. Returns `None` when the
/// value sequence contains something unmeasurable (there is no `Userdata`
/// variant in this workspace's `Value`, so this always succeeds here, but
/// the `Option` return is kept so a future host-extension variant can
/// plug into the same contract without changing callers).
pub fn measure_packet_size(values: &[Value]) -> Option<usize> {
    let mut total = 0usize;
    for v in values {
        total = total.checked_add(measure_value_size(v)?)?;
    }
    Some(total)
}

fn measure_value_size(value: &Value) -> Option<usize> {
    let payload = match value {
        Value::Nil | Value::Bool(_) => 4,
        Value::Int(_) | Value::Number(_) => 8,
        Value::CStr(s) => s.len().max(1),
        Value::Str(s) => s.as_bytes().len().max(1),
        Value::Array(cells) => {
            let mut sum = 2usize;
            for v in cells.borrow().iter() {
                sum = sum.checked_add(measure_value_size(v)?)?;
            }
            sum
        }
        Value::Table(pairs) => {
            let mut sum = 2usize;
            for (k, v) in pairs.borrow().iter() {
                sum = sum.checked_add(measure_value_size(k)?)?;
                sum = sum.checked_add(measure_value_size(v)?)?;
            }
            sum
        }
    };
    Some(2usize.checked_add(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_boolean_matches_contract() {
        assert!(!Value::Nil.to_boolean());
        assert!(!Value::Bool(false).to_boolean());
        assert!(Value::Bool(true).to_boolean());
        assert!(Value::Int(0).to_boolean());
        assert!(Value::string("").to_boolean());
    }

    #[test]
    fn array_set_mutates_all_holders() {
        let arr = Value::array(3);
        let alias = arr.retain();
        array_set(&arr, 1, Value::int(99));
        assert_eq!(array_get(&alias, 1).to_int(), 99);
    }

    #[test]
    fn array_out_of_range_is_nil_not_panic() {
        let arr = Value::array(2);
        assert!(array_get(&arr, 50).is_nil());
        array_set(&arr, 50, Value::int(1)); // must not panic
    }

    #[test]
    fn retain_and_drop_balance_frees_once() {
        let arr = Value::array(1);
        let inner = match &arr {
            Value::Array(rc) => Rc::downgrade(rc),
            _ => unreachable!(),
        };
        {
            let alias = arr.retain();
            assert_eq!(Rc::strong_count(&inner.upgrade().unwrap()), 2);
            drop(alias);
        }
        assert_eq!(Rc::strong_count(&inner.upgrade().unwrap()), 1);
        drop(arr);
        assert!(inner.upgrade().is_none());
    }

    #[test]
    fn packet_size_is_monotone_and_bounded_below() {
        let values = vec![Value::int(1), Value::string("hi"), Value::Nil];
        let full = measure_packet_size(&values).unwrap();
        let without_last = measure_packet_size(&values[..values.len() - 1]).unwrap();
        assert!(without_last <= full);
        assert!(full >= 2 * values.len());
    }

    #[test]
    fn empty_string_costs_one_byte_payload() {
        // 2 overhead + max(len, 1) == 3 for an empty string.
        assert_eq!(measure_packet_size(&[Value::string("")]).unwrap(), 3);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Nil),
            any::<i64>().prop_map(Value::int),
            any::<bool>().prop_map(Value::boolean),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::string),
        ]
    }

    proptest! {
        #[test]
        fn packet_size_is_monotone_removing_never_increases(values in proptest::collection::vec(arb_scalar(), 0..16)) {
            let full = measure_packet_size(&values).unwrap();
            if !values.is_empty() {
                let without_last = measure_packet_size(&values[..values.len() - 1]).unwrap();
                prop_assert!(without_last <= full);
            }
            prop_assert!(full >= 2 * values.len());
        }
    }
}
