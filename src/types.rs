//! Core types shared across the crate.
//!
//! Handles into the three arenas (tree nodes, reactive cells, observers) and
//! the conversion that turns a data value into the text a node displays.

use serde_json::Value;

// =============================================================================
// Arena Handles
// =============================================================================

/// Index of a node in a [`Document`](crate::dom::Document) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a reactive cell in an [`ObservableStore`](crate::reactive::ObservableStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of an [`Observer`](crate::reactive::Observer).
///
/// Ids are allocated from a per-thread counter and never reused, so they stay
/// unique across instances living on the same thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

thread_local! {
    static NEXT_OBSERVER_ID: std::cell::Cell<u64> = const { std::cell::Cell::new(0) };
}

impl ObserverId {
    pub(crate) fn next() -> Self {
        NEXT_OBSERVER_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            Self(id)
        })
    }
}

// =============================================================================
// Display Conversion
// =============================================================================

/// Render a data value the way a bound node displays it.
///
/// Strings render raw, whole numbers without a fraction, arrays as their
/// comma-joined elements (nulls empty) and objects as `[object Object]`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Equality as seen by change detection.
///
/// Numbers compare by numeric value, so `5` and `5.0` are the same value.
/// Arrays and objects compare element-wise with the same rule.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| strict_eq(x, y)))
        }
        _ => a == b,
    }
}

fn display_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i128),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_scalars() {
        assert_eq!(display_value(&json!("hi")), "hi");
        assert_eq!(display_value(&json!(0)), "0");
        assert_eq!(display_value(&json!(-12)), "-12");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!(5.0)), "5");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&Value::Null), "null");
    }

    #[test]
    fn test_display_compound() {
        assert_eq!(display_value(&json!([1, null, "a"])), "1,,a");
        assert_eq!(display_value(&json!({"a": 1})), "[object Object]");
    }

    #[test]
    fn test_strict_eq_numbers_by_value() {
        assert!(strict_eq(&json!(5), &json!(5.0)));
        assert!(strict_eq(&json!(-0.0), &json!(0)));
        assert!(!strict_eq(&json!(5), &json!(5.5)));
        assert!(!strict_eq(&json!(5), &json!("5")));
        assert!(strict_eq(&json!({ "a": [1, 2.0] }), &json!({ "a": [1.0, 2] })));
        assert!(!strict_eq(&json!({ "a": 1 }), &json!({ "b": 1 })));
    }

    #[test]
    fn test_observer_ids_are_unique() {
        let a = ObserverId::next();
        let b = ObserverId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
