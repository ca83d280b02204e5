//! Scalar bin operations: write, read, increment, append and prepend.

use crate::error::{Error, Result};
use crate::operation::OpResult;
use crate::value::Value;
use crate::BinName;
use std::collections::BTreeMap;

pub type Bins = BTreeMap<BinName, Value>;

/// Store `value`; writing `Null` removes the bin.
pub fn write(bins: &mut Bins, bin: &str, value: &Value) {
    if value.is_null() {
        bins.remove(bin);
    } else {
        bins.insert(bin.to_string(), value.clone());
    }
}

pub fn read(bins: &Bins, bin: &str) -> OpResult {
    OpResult::Scalar(bins.get(bin).cloned().unwrap_or(Value::Null))
}

/// Add `delta` to a numeric bin, creating it when missing.
pub fn increment(bins: &mut Bins, bin: &str, delta: &Value) -> Result<()> {
    let updated = match bins.get(bin) {
        None => delta.clone(),
        Some(current) => add(current, delta).map_err(|err| match err {
            Error::NotApplicable(msg) => Error::NotApplicable(format!("bin '{bin}': {msg}")),
            other => other,
        })?,
    };
    bins.insert(bin.to_string(), updated);
    Ok(())
}

pub fn append(bins: &mut Bins, bin: &str, value: &Value) -> Result<()> {
    concat(bins, bin, value, false)
}

pub fn prepend(bins: &mut Bins, bin: &str, value: &Value) -> Result<()> {
    concat(bins, bin, value, true)
}

fn concat(bins: &mut Bins, bin: &str, value: &Value, front: bool) -> Result<()> {
    let Some(current) = bins.get_mut(bin) else {
        bins.insert(bin.to_string(), value.clone());
        return Ok(());
    };
    match (current, value) {
        (Value::String(current), Value::String(value)) => {
            if front {
                current.insert_str(0, value);
            } else {
                current.push_str(value);
            }
        }
        (Value::Bytes(current), Value::Bytes(value)) => {
            if front {
                current.splice(0..0, value.iter().copied());
            } else {
                current.extend_from_slice(value);
            }
        }
        (current, value) => {
            return Err(Error::NotApplicable(format!(
                "cannot {} {} to bin '{bin}' holding {}",
                if front { "prepend" } else { "append" },
                value.type_name(),
                current.type_name()
            )))
        }
    }
    Ok(())
}

/// Numeric addition. Integer + Integer stays integer; any double operand
/// makes the result a double.
pub fn add(current: &Value, delta: &Value) -> Result<Value> {
    match (current, delta) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(*b)
            .map(Value::Integer)
            .ok_or_else(|| Error::NotApplicable("integer overflow".into())),
        _ => match (current.as_f64(), delta.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Double(a + b)),
            _ => Err(Error::NotApplicable(format!(
                "cannot add {} to {}",
                delta.type_name(),
                current.type_name()
            ))),
        },
    }
}
