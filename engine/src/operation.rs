//! Operation types for `operate`.
//!
//! An [`Operation`] is one sub-operation of an atomic `operate` call. Each
//! variant carries exactly the fields it needs; the loosely typed wire form
//! lives in [`crate::descriptor`] and converts into this type.

use crate::cdt::{ListOp, MapOp};
use crate::error::{Error, Result};
use crate::record::{validate_bin_name, Expiration};
use crate::value::Value;
use crate::BinName;

/// A single sub-operation against one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Store `value` in `bin`; `Null` removes the bin.
    Write { bin: BinName, value: Value },
    /// Read `bin`; a missing bin reads as `Null`.
    Read { bin: BinName },
    Increment { bin: BinName, delta: Value },
    Append { bin: BinName, value: Value },
    Prepend { bin: BinName, value: Value },
    /// Reset expiration; `None` uses the write policy's TTL.
    Touch { ttl: Option<Expiration> },
    /// Delete the whole record after the call's reads.
    Delete,
    List { bin: BinName, op: ListOp },
    Map { bin: BinName, op: MapOp },
}

impl Operation {
    pub fn write(bin: impl Into<BinName>, value: impl Into<Value>) -> Self {
        Operation::Write {
            bin: bin.into(),
            value: value.into(),
        }
    }

    pub fn read(bin: impl Into<BinName>) -> Self {
        Operation::Read { bin: bin.into() }
    }

    pub fn increment(bin: impl Into<BinName>, delta: impl Into<Value>) -> Self {
        Operation::Increment {
            bin: bin.into(),
            delta: delta.into(),
        }
    }

    pub fn append(bin: impl Into<BinName>, value: impl Into<Value>) -> Self {
        Operation::Append {
            bin: bin.into(),
            value: value.into(),
        }
    }

    pub fn prepend(bin: impl Into<BinName>, value: impl Into<Value>) -> Self {
        Operation::Prepend {
            bin: bin.into(),
            value: value.into(),
        }
    }

    pub fn touch(ttl: Option<Expiration>) -> Self {
        Operation::Touch { ttl }
    }

    pub fn list(bin: impl Into<BinName>, op: ListOp) -> Self {
        Operation::List { bin: bin.into(), op }
    }

    pub fn map(bin: impl Into<BinName>, op: MapOp) -> Self {
        Operation::Map { bin: bin.into(), op }
    }

    /// The bin this operation addresses, if any.
    pub fn bin(&self) -> Option<&str> {
        match self {
            Operation::Write { bin, .. }
            | Operation::Read { bin }
            | Operation::Increment { bin, .. }
            | Operation::Append { bin, .. }
            | Operation::Prepend { bin, .. }
            | Operation::List { bin, .. }
            | Operation::Map { bin, .. } => Some(bin),
            Operation::Touch { .. } | Operation::Delete => None,
        }
    }

    pub fn is_write(&self) -> bool {
        match self {
            Operation::Read { .. } => false,
            Operation::List { op, .. } => op.is_write(),
            Operation::Map { op, .. } => op.is_write(),
            _ => true,
        }
    }

    /// Record-level writes that may only be combined with reads.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Operation::Touch { .. } | Operation::Delete)
    }

    /// Shape checks that need no record.
    pub fn validate(&self) -> Result<()> {
        if let Some(bin) = self.bin() {
            validate_bin_name(bin)?;
        }
        match self {
            Operation::Increment { delta, .. } if !delta.is_numeric() => {
                Err(Error::NotApplicable(format!(
                    "increment delta must be numeric, got {}",
                    delta.type_name()
                )))
            }
            Operation::Append { value, .. } | Operation::Prepend { value, .. }
                if !matches!(value, Value::String(_) | Value::Bytes(_)) =>
            {
                Err(Error::param(format!(
                    "append/prepend value must be a string or bytes, got {}",
                    value.type_name()
                )))
            }
            Operation::List { op, .. } => op.validate(),
            Operation::Map { op, .. } => op.validate(),
            _ => Ok(()),
        }
    }
}

/// Value produced by a sub-operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OpResult {
    Scalar(Value),
    List(Vec<Value>),
    /// Key/value pairs from a map selection.
    Pairs(Vec<(Value, Value)>),
    Count(u64),
}

impl OpResult {
    /// Collapse into a plain value; pairs flatten to `[k1, v1, k2, v2, ...]`.
    pub fn into_value(self) -> Value {
        match self {
            OpResult::Scalar(value) => value,
            OpResult::List(items) => Value::List(items),
            OpResult::Pairs(pairs) => Value::List(
                pairs
                    .into_iter()
                    .flat_map(|(k, v)| [k, v])
                    .collect(),
            ),
            OpResult::Count(n) => Value::Integer(i64::try_from(n).unwrap_or(i64::MAX)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdt::{ReturnType, Selector};

    #[test]
    fn classification() {
        assert!(!Operation::read("a").is_write());
        assert!(Operation::write("a", 1).is_write());
        assert!(Operation::touch(None).is_write());
        assert!(Operation::touch(None).is_record_level());
        assert!(!Operation::list("l", ListOp::Size).is_write());
        assert!(Operation::list(
            "l",
            ListOp::RemoveBy {
                selector: Selector::Index(0),
                return_type: ReturnType::VALUE
            }
        )
        .is_write());
        assert!(!Operation::map(
            "m",
            MapOp::GetBy {
                selector: Selector::Key("k".into()),
                return_type: ReturnType::VALUE
            }
        )
        .is_write());
        assert_eq!(Operation::Delete.bin(), None);
    }

    #[test]
    fn validation() {
        assert!(Operation::write("this_bin_name_is_long", 1).validate().is_err());
        assert!(Operation::increment("n", "x").validate().is_err());
        assert!(Operation::increment("n", 1.5).validate().is_ok());
        assert!(Operation::append("s", 3).validate().is_err());
        assert!(Operation::prepend("s", "pre").validate().is_ok());
    }

    #[test]
    fn pairs_flatten() {
        let result = OpResult::Pairs(vec![("r".into(), "s".into())]);
        assert_eq!(result.into_value(), Value::from(vec!["r", "s"]));
        assert_eq!(OpResult::Count(3).into_value(), Value::Integer(3));
    }
}
