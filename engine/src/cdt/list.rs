//! List sub-operations.

use super::select::{report, select, View};
use super::{ReturnType, Selector};
use crate::error::{Error, Result};
use crate::operation::OpResult;
use crate::policy::ListPolicy;
use crate::value::Value;

/// A list sub-operation.
///
/// Point and range positions (`index`) are 0-based and must not be negative;
/// selectors used by [`ListOp::GetBy`] and [`ListOp::RemoveBy`] may count from
/// the end.
#[derive(Debug, Clone, PartialEq)]
pub enum ListOp {
    Append { value: Value, policy: ListPolicy },
    /// Append several values in order.
    Merge { values: Vec<Value>, policy: ListPolicy },
    Insert { index: i64, value: Value, policy: ListPolicy },
    InsertItems { index: i64, values: Vec<Value>, policy: ListPolicy },
    Set { index: i64, value: Value, policy: ListPolicy },
    Pop { index: i64 },
    /// `count: None` pops to the end.
    PopRange { index: i64, count: Option<u64> },
    Remove { index: i64 },
    RemoveRange { index: i64, count: Option<u64> },
    Get { index: i64 },
    GetRange { index: i64, count: Option<u64> },
    /// Keep `[index, index + count)`, drop everything else.
    Trim { index: i64, count: u64 },
    Clear,
    Size,
    GetBy { selector: Selector, return_type: ReturnType },
    RemoveBy { selector: Selector, return_type: ReturnType },
}

impl ListOp {
    pub fn validate(&self) -> Result<()> {
        match self {
            ListOp::Insert { index, .. }
            | ListOp::InsertItems { index, .. }
            | ListOp::Set { index, .. }
            | ListOp::Pop { index }
            | ListOp::PopRange { index, .. }
            | ListOp::Remove { index }
            | ListOp::RemoveRange { index, .. }
            | ListOp::Get { index }
            | ListOp::GetRange { index, .. }
            | ListOp::Trim { index, .. } => {
                if *index < 0 {
                    return Err(Error::param(format!("list index must not be negative: {index}")));
                }
            }
            ListOp::GetBy {
                selector,
                return_type,
            }
            | ListOp::RemoveBy {
                selector,
                return_type,
            } => {
                if selector.is_key_based() {
                    return Err(Error::param("lists cannot be addressed by key"));
                }
                if return_type.uses_keys() {
                    return Err(Error::param("key return types are not valid for lists"));
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            ListOp::Get { .. } | ListOp::GetRange { .. } | ListOp::Size | ListOp::GetBy { .. }
        )
    }

    /// Whether the op, applied to a missing bin, starts from an empty list.
    pub(crate) fn creates_bin(&self) -> bool {
        matches!(
            self,
            ListOp::Append { .. }
                | ListOp::Merge { .. }
                | ListOp::Insert { .. }
                | ListOp::InsertItems { .. }
                | ListOp::Set { .. }
        )
    }
}

/// Apply `op` to `list` in place.
pub fn apply(list: &mut Vec<Value>, op: &ListOp) -> Result<Option<OpResult>> {
    match op {
        ListOp::Append { value, policy } => {
            insert_items(list, None, std::slice::from_ref(value), policy)?;
            Ok(None)
        }
        ListOp::Merge { values, policy } => {
            insert_items(list, None, values, policy)?;
            Ok(None)
        }
        ListOp::Insert {
            index,
            value,
            policy,
        } => {
            insert_items(list, Some(*index), std::slice::from_ref(value), policy)?;
            Ok(None)
        }
        ListOp::InsertItems {
            index,
            values,
            policy,
        } => {
            insert_items(list, Some(*index), values, policy)?;
            Ok(None)
        }
        ListOp::Set {
            index,
            value,
            policy,
        } => {
            set(list, *index, value, policy)?;
            Ok(None)
        }
        ListOp::Pop { index } => {
            let at = existing(list, *index)?;
            Ok(Some(OpResult::Scalar(list.remove(at))))
        }
        ListOp::PopRange { index, count } => {
            let range = forward_range(list.len(), *index, *count);
            Ok(Some(OpResult::List(list.drain(range).collect())))
        }
        ListOp::Remove { index } => {
            let at = existing(list, *index)?;
            list.remove(at);
            Ok(None)
        }
        ListOp::RemoveRange { index, count } => {
            let range = forward_range(list.len(), *index, *count);
            list.drain(range);
            Ok(None)
        }
        ListOp::Get { index } => {
            let at = existing(list, *index)?;
            Ok(Some(OpResult::Scalar(list[at].clone())))
        }
        ListOp::GetRange { index, count } => {
            let range = forward_range(list.len(), *index, *count);
            Ok(Some(OpResult::List(list[range].to_vec())))
        }
        ListOp::Trim { index, count } => {
            let range = forward_range(list.len(), *index, Some(*count));
            list.truncate(range.end);
            list.drain(..range.start);
            Ok(None)
        }
        ListOp::Clear => {
            list.clear();
            Ok(None)
        }
        ListOp::Size => Ok(Some(OpResult::Count(list.len() as u64))),
        ListOp::GetBy {
            selector,
            return_type,
        } => {
            let view = View::list(list);
            let selection = select(&view, selector, return_type.inverted)?;
            report(&view, &selection, *return_type)
        }
        ListOp::RemoveBy {
            selector,
            return_type,
        } => {
            let view = View::list(list);
            let selection = select(&view, selector, return_type.inverted)?;
            let result = report(&view, &selection, *return_type)?;
            if !selection.is_empty() {
                let doomed = view.storage_positions(&selection);
                remove_positions(list, &doomed);
            }
            Ok(result)
        }
    }
}

/// Position of an existing element.
fn existing(list: &[Value], index: i64) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&at| at < list.len())
        .ok_or(Error::IndexOutOfRange {
            index,
            len: list.len(),
        })
}

/// Forward-only range clipped to the list.
fn forward_range(len: usize, index: i64, count: Option<u64>) -> std::ops::Range<usize> {
    let start = usize::try_from(index).unwrap_or(usize::MAX).min(len);
    let end = match count {
        Some(count) => start.saturating_add(usize::try_from(count).unwrap_or(usize::MAX)),
        None => len,
    };
    start..end.min(len)
}

fn remove_positions(list: &mut Vec<Value>, positions: &[usize]) {
    let mut doomed = vec![false; list.len()];
    for &p in positions {
        doomed[p] = true;
    }
    let mut i = 0;
    list.retain(|_| {
        let keep = !doomed[i];
        i += 1;
        keep
    });
}

/// Filter `values` through the unique-write policy.
///
/// Returns `None` when the whole write is skipped under `no_fail`.
fn admit(list: &[Value], values: &[Value], policy: &ListPolicy) -> Result<Option<Vec<Value>>> {
    if !policy.add_unique {
        return Ok(Some(values.to_vec()));
    }
    let mut admitted: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if list.contains(value) || admitted.contains(value) {
            if !policy.no_fail {
                return Err(Error::ElementExists(format!("{value:?}")));
            }
            if !policy.partial {
                return Ok(None);
            }
            continue;
        }
        admitted.push(value.clone());
    }
    Ok(Some(admitted))
}

/// Insert at `index`, or append when `index` is `None`.
fn insert_items(
    list: &mut Vec<Value>,
    index: Option<i64>,
    values: &[Value],
    policy: &ListPolicy,
) -> Result<()> {
    let Some(values) = admit(list, values, policy)? else {
        return Ok(());
    };
    let at = match index {
        None => list.len(),
        Some(index) => match pad_to(list, index, policy)? {
            Some(at) => at,
            None => return Ok(()),
        },
    };
    list.splice(at..at, values);
    Ok(())
}

fn set(list: &mut Vec<Value>, index: i64, value: &Value, policy: &ListPolicy) -> Result<()> {
    let Some(admitted) = admit(list, std::slice::from_ref(value), policy)? else {
        return Ok(());
    };
    let Some(value) = admitted.into_iter().next() else {
        return Ok(());
    };
    let Some(at) = pad_to(list, index, policy)? else {
        return Ok(());
    };
    if at < list.len() {
        list[at] = value;
    } else {
        list.push(value);
    }
    Ok(())
}

/// Most nulls a single insert or set may pad a list with.
pub const MAX_PAD: usize = 1 << 16;

/// Make `index` addressable, padding with nulls past the end.
///
/// Bounded inserts past the end fail, or are skipped under `no_fail`.
/// Unbounded ones may pad at most [`MAX_PAD`] nulls.
fn pad_to(list: &mut Vec<Value>, index: i64, policy: &ListPolicy) -> Result<Option<usize>> {
    let at = usize::try_from(index).map_err(|_| Error::param("list index must not be negative"))?;
    if at > list.len() {
        if policy.insert_bounded {
            if policy.no_fail {
                return Ok(None);
            }
            return Err(Error::NotApplicable(format!(
                "index {at} is past the end of a list of length {}",
                list.len()
            )));
        }
        if at - list.len() > MAX_PAD {
            return Err(Error::param(format!(
                "index {at} would pad a list of length {} with more than {MAX_PAD} nulls",
                list.len()
            )));
        }
        list.resize(at, Value::Null);
    }
    Ok(Some(at))
}
