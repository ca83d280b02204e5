use super::{ReturnKind, ReturnType, Selector};
use crate::error::{Error, Result};
use crate::operation::OpResult;
use crate::value::{CdtMap, Value};
use std::ops::Range;

/// A container's elements in index order.
///
/// For lists the index order is storage order. For maps it is ascending key
/// order, whatever the map's order policy; `storage` maps each view index
/// back to the entry's storage position.
pub(super) struct View<'a> {
    keys: Option<Vec<&'a Value>>,
    values: Vec<&'a Value>,
    storage: Vec<usize>,
}

impl<'a> View<'a> {
    pub(super) fn list(items: &'a [Value]) -> Self {
        Self {
            keys: None,
            values: items.iter().collect(),
            storage: (0..items.len()).collect(),
        }
    }

    pub(super) fn map(map: &'a CdtMap) -> Self {
        let storage = map.key_order();
        let entries = map.entries();
        Self {
            keys: Some(storage.iter().map(|&p| &entries[p].0).collect()),
            values: storage.iter().map(|&p| &entries[p].1).collect(),
            storage,
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn keys(&self) -> Result<&[&'a Value]> {
        self.keys
            .as_deref()
            .ok_or_else(|| Error::param("key addressing is only valid for maps"))
    }

    /// View indices by ascending value; equal values keep index order.
    fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.values[a].cmp(self.values[b]));
        order
    }

    /// Rank of every view index.
    fn ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0; self.len()];
        for (rank, index) in self.ranked().into_iter().enumerate() {
            ranks[index] = rank;
        }
        ranks
    }

    fn matching(&self, pred: impl Fn(&Value) -> bool) -> Vec<usize> {
        (0..self.len()).filter(|&i| pred(self.values[i])).collect()
    }

    fn matching_keys(&self, pred: impl Fn(&Value) -> bool) -> Result<Vec<usize>> {
        let keys = self.keys()?;
        Ok((0..self.len()).filter(|&i| pred(keys[i])).collect())
    }

    /// Storage positions of the selected elements.
    pub(super) fn storage_positions(&self, selection: &Selection) -> Vec<usize> {
        selection.indices.iter().map(|&i| self.storage[i]).collect()
    }
}

/// Selected view indices in reporting order.
pub(super) struct Selection {
    indices: Vec<usize>,
    point: bool,
}

impl Selection {
    pub(super) fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

pub(super) fn select(view: &View<'_>, selector: &Selector, inverted: bool) -> Result<Selection> {
    let len = view.len();
    let mut indices: Vec<usize> = match selector {
        Selector::Index(index) => resolve(len, *index).into_iter().collect(),
        Selector::IndexRange { index, count } => window(len, *index, *count).collect(),
        Selector::Rank(rank) => {
            let ranked = view.ranked();
            resolve(len, *rank).map(|r| ranked[r]).into_iter().collect()
        }
        Selector::RankRange { rank, count } => view.ranked()[window(len, *rank, *count)].to_vec(),
        Selector::Value(value) => view.matching(|v| v == value),
        Selector::ValueList(values) => view.matching(|v| values.contains(v)),
        Selector::ValueRange { begin, end } => view.matching(|v| in_range(v, begin, end.as_ref())),
        Selector::ValueRelRankRange { value, rank, count } => {
            let base = view.values.iter().filter(|v| ***v < *value).count() as i64;
            let start = base.saturating_add(*rank);
            view.ranked()[clip(len, start, end_of(start, *count, len))].to_vec()
        }
        Selector::Key(key) => view.matching_keys(|k| k == key)?,
        Selector::KeyList(keys) => view.matching_keys(|k| keys.contains(k))?,
        Selector::KeyRange { begin, end } => {
            view.matching_keys(|k| in_range(k, begin, end.as_ref()))?
        }
    };

    if inverted {
        let mut picked = vec![false; len];
        for &i in &indices {
            picked[i] = true;
        }
        let universe: Vec<usize> = if selector.is_rank_style() {
            view.ranked()
        } else {
            (0..len).collect()
        };
        indices = universe.into_iter().filter(|&i| !picked[i]).collect();
    }

    Ok(Selection {
        indices,
        point: selector.is_point() && !inverted,
    })
}

/// Build the payload `return_type` asks for.
pub(super) fn report(
    view: &View<'_>,
    selection: &Selection,
    return_type: ReturnType,
) -> Result<Option<OpResult>> {
    let len = view.len();
    let shape = |items: Vec<Value>| {
        if selection.point {
            OpResult::Scalar(items.into_iter().next().unwrap_or(Value::Null))
        } else {
            OpResult::List(items)
        }
    };
    let positions = |of: &dyn Fn(usize) -> usize, reverse: bool| {
        let mut out: Vec<usize> = selection
            .indices
            .iter()
            .map(|&i| if reverse { len - 1 - of(i) } else { of(i) })
            .collect();
        out.sort_unstable();
        out.into_iter()
            .map(|p| Value::Integer(p as i64))
            .collect::<Vec<_>>()
    };

    let result = match return_type.kind {
        ReturnKind::None => return Ok(None),
        ReturnKind::Count => OpResult::Count(selection.indices.len() as u64),
        ReturnKind::Index => shape(positions(&|i| i, false)),
        ReturnKind::ReverseIndex => shape(positions(&|i| i, true)),
        ReturnKind::Rank | ReturnKind::ReverseRank => {
            let ranks = view.ranks();
            let reverse = return_type.kind == ReturnKind::ReverseRank;
            shape(positions(&|i| ranks[i], reverse))
        }
        ReturnKind::Value => shape(
            selection
                .indices
                .iter()
                .map(|&i| view.values[i].clone())
                .collect(),
        ),
        ReturnKind::Key => {
            let keys = view.keys()?;
            shape(selection.indices.iter().map(|&i| keys[i].clone()).collect())
        }
        ReturnKind::KeyValue => {
            let keys = view.keys()?;
            OpResult::Pairs(
                selection
                    .indices
                    .iter()
                    .map(|&i| (keys[i].clone(), view.values[i].clone()))
                    .collect(),
            )
        }
    };
    Ok(Some(result))
}

fn in_range(v: &Value, begin: &Value, end: Option<&Value>) -> bool {
    v >= begin && end.map_or(true, |end| v < end)
}

/// Resolve a possibly negative point position.
fn resolve(len: usize, pos: i64) -> Option<usize> {
    let pos = if pos < 0 { len as i64 + pos } else { pos };
    (0..len as i64).contains(&pos).then_some(pos as usize)
}

/// `[start, start + count)` with a negative start counted from the end.
fn window(len: usize, start: i64, count: Option<u64>) -> Range<usize> {
    let start = if start < 0 { len as i64 + start } else { start };
    clip(len, start, end_of(start, count, len))
}

fn end_of(start: i64, count: Option<u64>, len: usize) -> i64 {
    match count {
        Some(count) => start.saturating_add(i64::try_from(count).unwrap_or(i64::MAX)),
        None => len as i64,
    }
}

/// Intersect `[begin, end)` with `[0, len)`.
fn clip(len: usize, begin: i64, end: i64) -> Range<usize> {
    let len = len as i64;
    let begin = begin.clamp(0, len);
    let end = end.clamp(begin, len);
    begin as usize..end as usize
}
