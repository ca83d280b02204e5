//! Collection data types: list and map sub-operations.
//!
//! Both engines share one selection model. A [`Selector`] picks elements by
//! index, rank, value or key; a [`ReturnType`] says what to report about the
//! picked elements and, through its inverted bit, whether the operation acts
//! on the picked set or on its complement.

pub mod list;
pub mod map;
mod select;

pub use list::ListOp;
pub use map::MapOp;

use crate::error::{Error, Result};
use crate::value::Value;

/// What a selecting operation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    None,
    Index,
    ReverseIndex,
    Rank,
    ReverseRank,
    Count,
    Key,
    Value,
    KeyValue,
}

/// Return kind plus the inversion modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnType {
    pub kind: ReturnKind,
    /// Act on the complement of the selection.
    pub inverted: bool,
}

const INVERTED_BIT: i64 = 0x10000;

impl ReturnType {
    pub const NONE: ReturnType = ReturnType::of(ReturnKind::None);
    pub const INDEX: ReturnType = ReturnType::of(ReturnKind::Index);
    pub const REVERSE_INDEX: ReturnType = ReturnType::of(ReturnKind::ReverseIndex);
    pub const RANK: ReturnType = ReturnType::of(ReturnKind::Rank);
    pub const REVERSE_RANK: ReturnType = ReturnType::of(ReturnKind::ReverseRank);
    pub const COUNT: ReturnType = ReturnType::of(ReturnKind::Count);
    pub const KEY: ReturnType = ReturnType::of(ReturnKind::Key);
    pub const VALUE: ReturnType = ReturnType::of(ReturnKind::Value);
    pub const KEY_VALUE: ReturnType = ReturnType::of(ReturnKind::KeyValue);

    pub const fn of(kind: ReturnKind) -> Self {
        Self {
            kind,
            inverted: false,
        }
    }

    pub const fn inverted(self) -> Self {
        Self {
            kind: self.kind,
            inverted: true,
        }
    }

    /// Decode the wire form: a kind code optionally OR-ed with `0x10000`.
    pub fn from_bits(bits: i64) -> Result<Self> {
        let kind = match bits & !INVERTED_BIT {
            0 => ReturnKind::None,
            1 => ReturnKind::Index,
            2 => ReturnKind::ReverseIndex,
            3 => ReturnKind::Rank,
            4 => ReturnKind::ReverseRank,
            5 => ReturnKind::Count,
            6 => ReturnKind::Key,
            7 => ReturnKind::Value,
            8 => ReturnKind::KeyValue,
            _ => return Err(Error::param(format!("invalid return_type: {bits}"))),
        };
        Ok(Self {
            kind,
            inverted: bits & INVERTED_BIT != 0,
        })
    }

    pub fn bits(self) -> i64 {
        let code = match self.kind {
            ReturnKind::None => 0,
            ReturnKind::Index => 1,
            ReturnKind::ReverseIndex => 2,
            ReturnKind::Rank => 3,
            ReturnKind::ReverseRank => 4,
            ReturnKind::Count => 5,
            ReturnKind::Key => 6,
            ReturnKind::Value => 7,
            ReturnKind::KeyValue => 8,
        };
        if self.inverted {
            code | INVERTED_BIT
        } else {
            code
        }
    }

    fn uses_keys(self) -> bool {
        matches!(self.kind, ReturnKind::Key | ReturnKind::KeyValue)
    }
}

/// Element addressing shared by the list and map engines.
///
/// Index and rank positions may be negative, counting back from the end.
/// Ranges with `count: None` run to the end of the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Index(i64),
    IndexRange { index: i64, count: Option<u64> },
    Rank(i64),
    RankRange { rank: i64, count: Option<u64> },
    Value(Value),
    ValueList(Vec<Value>),
    /// `begin <= v < end`; no `end` means unbounded.
    ValueRange { begin: Value, end: Option<Value> },
    /// Rank window relative to the rank `value` holds or would hold.
    ValueRelRankRange { value: Value, rank: i64, count: Option<u64> },
    Key(Value),
    KeyList(Vec<Value>),
    KeyRange { begin: Value, end: Option<Value> },
}

impl Selector {
    pub fn is_key_based(&self) -> bool {
        matches!(
            self,
            Selector::Key(_) | Selector::KeyList(_) | Selector::KeyRange { .. }
        )
    }

    /// Point selectors report single values rather than lists.
    fn is_point(&self) -> bool {
        matches!(self, Selector::Index(_) | Selector::Rank(_) | Selector::Key(_))
    }

    /// Rank-style selectors report values in ascending rank order.
    fn is_rank_style(&self) -> bool {
        matches!(
            self,
            Selector::Rank(_) | Selector::RankRange { .. } | Selector::ValueRelRankRange { .. }
        )
    }
}
