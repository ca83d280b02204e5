//! Map sub-operations.
//!
//! Every mutating operation carries a [`MapPolicy`]. Index and rank
//! addressing always runs over the entries sorted by key, so unordered and
//! key-ordered maps answer positional queries identically.

use super::select::{report, select, View};
use super::{ReturnType, Selector};
use crate::error::{Error, Result};
use crate::operation::OpResult;
use crate::policy::{MapPolicy, MapWriteMode};
use crate::scalar::add;
use crate::value::{CdtMap, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum MapOp {
    SetPolicy { policy: MapPolicy },
    Put { key: Value, value: Value, policy: MapPolicy },
    PutItems { items: Vec<(Value, Value)>, policy: MapPolicy },
    Increment { key: Value, delta: Value, policy: MapPolicy },
    Decrement { key: Value, delta: Value, policy: MapPolicy },
    Clear,
    Size,
    GetBy { selector: Selector, return_type: ReturnType },
    RemoveBy { selector: Selector, return_type: ReturnType },
}

impl MapOp {
    pub fn validate(&self) -> Result<()> {
        match self {
            MapOp::Increment { delta, .. } | MapOp::Decrement { delta, .. } => {
                if !delta.is_numeric() {
                    return Err(Error::NotApplicable(format!(
                        "map increment delta must be numeric, got {}",
                        delta.type_name()
                    )));
                }
            }
            MapOp::PutItems { items, .. } if items.is_empty() => {
                return Err(Error::param("map put_items requires at least one item"));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, MapOp::Size | MapOp::GetBy { .. })
    }

    /// Policy to create the map with when the bin is missing.
    pub(crate) fn creates_bin(&self) -> Option<&MapPolicy> {
        match self {
            MapOp::SetPolicy { policy }
            | MapOp::Put { policy, .. }
            | MapOp::PutItems { policy, .. }
            | MapOp::Increment { policy, .. }
            | MapOp::Decrement { policy, .. } => Some(policy),
            _ => None,
        }
    }
}

/// Apply `op` to `map` in place.
pub fn apply(map: &mut CdtMap, op: &MapOp) -> Result<Option<OpResult>> {
    match op {
        MapOp::SetPolicy { policy } => {
            map.set_order(policy.order);
            Ok(None)
        }
        MapOp::Put { key, value, policy } => {
            if admit(map, key, policy)? {
                map.insert(key.clone(), value.clone());
            }
            Ok(None)
        }
        MapOp::PutItems { items, policy } => {
            let mut accepted = Vec::with_capacity(items.len());
            for (key, value) in items {
                if admit(map, key, policy)? {
                    accepted.push((key.clone(), value.clone()));
                } else if !policy.partial {
                    return Ok(None);
                }
            }
            for (key, value) in accepted {
                map.insert(key, value);
            }
            Ok(None)
        }
        MapOp::Increment { key, delta, policy } => increment(map, key, delta, policy, false),
        MapOp::Decrement { key, delta, policy } => increment(map, key, delta, policy, true),
        MapOp::Clear => {
            map.clear();
            Ok(None)
        }
        MapOp::Size => Ok(Some(OpResult::Count(map.len() as u64))),
        MapOp::GetBy {
            selector,
            return_type,
        } => {
            let view = View::map(map);
            let selection = select(&view, selector, return_type.inverted)?;
            report(&view, &selection, *return_type)
        }
        MapOp::RemoveBy {
            selector,
            return_type,
        } => {
            let view = View::map(map);
            let selection = select(&view, selector, return_type.inverted)?;
            let result = report(&view, &selection, *return_type)?;
            let doomed = view.storage_positions(&selection);
            map.remove_positions(&doomed);
            Ok(result)
        }
    }
}

/// Check the write mode for `key`. `Ok(false)` means skip under `no_fail`.
fn admit(map: &CdtMap, key: &Value, policy: &MapPolicy) -> Result<bool> {
    let denied = match (policy.write_mode, map.contains_key(key)) {
        (MapWriteMode::UpdateOnly, false) => {
            Error::ElementNotFound(format!("map key {key:?}"))
        }
        (MapWriteMode::CreateOnly, true) => Error::ElementExists(format!("map key {key:?}")),
        _ => return Ok(true),
    };
    if policy.no_fail {
        Ok(false)
    } else {
        Err(denied)
    }
}

fn increment(
    map: &mut CdtMap,
    key: &Value,
    delta: &Value,
    policy: &MapPolicy,
    negate: bool,
) -> Result<Option<OpResult>> {
    if !admit(map, key, policy)? {
        return Ok(None);
    }
    let delta = if negate { negated(delta)? } else { delta.clone() };
    let updated = match map.get(key) {
        None => delta,
        Some(current) => add(current, &delta)?,
    };
    map.insert(key.clone(), updated.clone());
    Ok(Some(OpResult::Scalar(updated)))
}

fn negated(delta: &Value) -> Result<Value> {
    match delta {
        Value::Integer(n) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::NotApplicable("decrement overflows".into())),
        Value::Double(n) => Ok(Value::Double(-n)),
        other => Err(Error::NotApplicable(format!(
            "cannot decrement by {}",
            other.type_name()
        ))),
    }
}
