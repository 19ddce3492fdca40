//! Deterministic sorting of nested JSON data
//!
//! Output files must be byte-stable between builds, so every array inside a
//! document is put into ascending order before serialization. Objects keep
//! their own key order; only their values are normalized.
//!
//! Ordering between JSON values follows these rules:
//!
//! - numbers compare numerically with numbers, booleans count as `0`/`1`,
//! - strings compare by code point,
//! - arrays compare element by element, then by length,
//! - `null` and objects have no ordering at all.
//!
//! Any pairing outside those rules fails with [`UtilError::Unorderable`].
//! Values only need to be comparable when they share an array, so a
//! single-element array of objects sorts fine.

use crate::error::{Result, UtilError};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Return a copy of `data` with every array sorted
///
/// Objects are walked recursively. Arrays are replaced by a sorted
/// permutation of their elements; the elements themselves are compared as
/// whole values and are not normalized.
///
/// # Example
///
/// ```rust
/// use mtgjson_util::sort::sort_internal_lists;
/// use serde_json::json;
///
/// let sorted = sort_internal_lists(json!({"colors": ["W", "B", "G"]})).unwrap();
/// assert_eq!(sorted, json!({"colors": ["B", "G", "W"]}));
/// ```
pub fn sort_internal_lists(mut data: Value) -> Result<Value> {
    sort_internal_lists_in_place(&mut data)?;
    Ok(data)
}

/// Sort every array inside `data` without moving the outer value
///
/// An array that fails to sort is left untouched; arrays already visited
/// before the failure stay sorted.
pub fn sort_internal_lists_in_place(data: &mut Value) -> Result<()> {
    match data {
        Value::Object(map) => {
            for value in map.values_mut() {
                sort_internal_lists_in_place(value)?;
            }
        }
        Value::Array(items) => {
            let order = sorted_order(items)?;
            let mut slots: Vec<Option<Value>> = items.drain(..).map(Some).collect();
            *items = order.into_iter().filter_map(|index| slots[index].take()).collect();
        }
        _ => {}
    }
    Ok(())
}

/// Compare two JSON values by their natural ordering
pub fn compare_values(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => compare_sequences(a, b),
        _ => match (Numeric::of(left), Numeric::of(right)) {
            (Some(a), Some(b)) => Ok(a.compare(b)),
            _ => Err(UtilError::Unorderable {
                left: kind_name(left),
                right: kind_name(right),
            }),
        },
    }
}

/// Name of a value's JSON kind, as used in error messages
pub const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Identical elements are skipped without an ordering check, so `[null]` equals `[null]`.
// Elements that differ but compare equal (`1`, `1.0`, `true`) move on to the next pair.
fn compare_sequences(left: &[Value], right: &[Value]) -> Result<Ordering> {
    for (a, b) in left.iter().zip(right) {
        if a == b {
            continue;
        }
        match compare_values(a, b)? {
            Ordering::Equal => continue,
            ordering => return Ok(ordering),
        }
    }
    Ok(left.len().cmp(&right.len()))
}

/// Stable merge sort over indices, so a comparison failure leaves the input intact
fn sorted_order(items: &[Value]) -> Result<Vec<usize>> {
    merge_sort(items, (0..items.len()).collect())
}

fn merge_sort(items: &[Value], mut indices: Vec<usize>) -> Result<Vec<usize>> {
    if indices.len() < 2 {
        return Ok(indices);
    }

    let upper = indices.split_off(indices.len() / 2);
    let lower = merge_sort(items, indices)?;
    let upper = merge_sort(items, upper)?;

    let mut merged = Vec::with_capacity(lower.len() + upper.len());
    let mut lower = lower.into_iter().peekable();
    let mut upper = upper.into_iter().peekable();

    while let (Some(&l), Some(&u)) = (lower.peek(), upper.peek()) {
        // Ties go to the lower half to keep the sort stable
        let next = if compare_values(&items[u], &items[l])? == Ordering::Less {
            upper.next()
        } else {
            lower.next()
        };
        merged.extend(next);
    }
    merged.extend(lower);
    merged.extend(upper);

    Ok(merged)
}

/// Numeric view of a value; booleans count as integers
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Numeric {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Signed(i64::from(*b))),
            Value::Number(n) => Some(Self::from_number(n)),
            _ => None,
        }
    }

    fn from_number(number: &Number) -> Self {
        if let Some(i) = number.as_i64() {
            Self::Signed(i)
        } else if let Some(u) = number.as_u64() {
            Self::Unsigned(u)
        } else {
            Self::Float(number.as_f64().unwrap_or_default())
        }
    }

    fn compare(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Signed(a), Self::Signed(b)) => a.cmp(&b),
            (Self::Unsigned(a), Self::Unsigned(b)) => a.cmp(&b),
            // Unsigned only holds values above i64::MAX
            (Self::Signed(_), Self::Unsigned(_)) => Ordering::Less,
            (Self::Unsigned(_), Self::Signed(_)) => Ordering::Greater,
            // serde_json numbers are never NaN
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Self::Signed(i), Self::Float(f)) => compare_int_float(i128::from(i), f),
            (Self::Unsigned(u), Self::Float(f)) => compare_int_float(i128::from(u), f),
            (Self::Float(f), Self::Signed(i)) => compare_int_float(i128::from(i), f).reverse(),
            (Self::Float(f), Self::Unsigned(u)) => compare_int_float(i128::from(u), f).reverse(),
        }
    }
}

/// Exact integer/float comparison, without rounding the integer to `f64`
#[allow(clippy::cast_possible_truncation)]
fn compare_int_float(int: i128, float: f64) -> Ordering {
    // Every i64 and u64 lies strictly inside (-2^64, 2^64)
    const BOUND: f64 = 18_446_744_073_709_551_616.0;
    if float >= BOUND {
        return Ordering::Less;
    }
    if float <= -BOUND {
        return Ordering::Greater;
    }

    // |float| < 2^64, so its integral part is exact as an i128
    let whole = float.trunc() as i128;
    match int.cmp(&whole) {
        Ordering::Equal => 0.0_f64.partial_cmp(&float.fract()).unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}
