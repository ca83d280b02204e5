//! Wire form of operations.
//!
//! An [`OpDescriptor`] is the loosely typed shape callers send:
//! `{op, bin, key?, index?, rank?, count?, range_end?, val?, return_type?,
//! list_policy?, map_policy?, ttl?}`. Converting it into an [`Operation`]
//! checks field presence and types; every failure is `ERR_PARAM`.

use crate::cdt::{ListOp, MapOp, ReturnType, Selector};
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::policy::{ListPolicy, MapPolicy};
use crate::record::Expiration;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which collection engine a selecting op targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    List,
    Map,
}

/// Addressing shape of a `*_get_by_*` / `*_remove_by_*` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Index,
    IndexRange,
    IndexRangeToEnd,
    Rank,
    RankRange,
    RankRangeToEnd,
    Value,
    ValueList,
    ValueRange,
    ValueRelRankRange,
    ValueRelRankRangeToEnd,
    Key,
    KeyList,
    KeyRange,
}

const SHAPES: &[(&str, Shape)] = &[
    ("index", Shape::Index),
    ("index_range", Shape::IndexRange),
    ("index_range_to_end", Shape::IndexRangeToEnd),
    ("rank", Shape::Rank),
    ("rank_range", Shape::RankRange),
    ("rank_range_to_end", Shape::RankRangeToEnd),
    ("value", Shape::Value),
    ("value_list", Shape::ValueList),
    ("value_range", Shape::ValueRange),
    ("value_rel_rank_range", Shape::ValueRelRankRange),
    ("value_rel_rank_range_to_end", Shape::ValueRelRankRangeToEnd),
    ("key", Shape::Key),
    ("key_list", Shape::KeyList),
    ("key_range", Shape::KeyRange),
];

/// Operation kind as named on the wire, e.g. `list_append` or
/// `map_remove_by_value_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OpKind {
    Write,
    Read,
    Incr,
    Append,
    Prepend,
    Touch,
    Delete,
    ListAppend,
    ListMerge,
    ListInsert,
    ListInsertItems,
    ListSet,
    ListPop,
    ListPopRange,
    ListPopRangeFrom,
    ListRemove,
    ListRemoveRange,
    ListRemoveRangeFrom,
    ListGet,
    ListGetRange,
    ListGetRangeFrom,
    ListTrim,
    ListClear,
    ListSize,
    MapSetPolicy,
    MapPut,
    MapPutItems,
    MapIncrement,
    MapDecrement,
    MapClear,
    MapSize,
    Select {
        container: Container,
        remove: bool,
        shape: Shape,
    },
}

const NAMED: &[(&str, OpKind)] = &[
    ("write", OpKind::Write),
    ("read", OpKind::Read),
    ("incr", OpKind::Incr),
    ("append", OpKind::Append),
    ("prepend", OpKind::Prepend),
    ("touch", OpKind::Touch),
    ("delete", OpKind::Delete),
    ("list_append", OpKind::ListAppend),
    ("list_merge", OpKind::ListMerge),
    ("list_insert", OpKind::ListInsert),
    ("list_insert_items", OpKind::ListInsertItems),
    ("list_set", OpKind::ListSet),
    ("list_pop", OpKind::ListPop),
    ("list_pop_range", OpKind::ListPopRange),
    ("list_pop_range_from", OpKind::ListPopRangeFrom),
    ("list_remove", OpKind::ListRemove),
    ("list_remove_range", OpKind::ListRemoveRange),
    ("list_remove_range_from", OpKind::ListRemoveRangeFrom),
    ("list_get", OpKind::ListGet),
    ("list_get_range", OpKind::ListGetRange),
    ("list_get_range_from", OpKind::ListGetRangeFrom),
    ("list_trim", OpKind::ListTrim),
    ("list_clear", OpKind::ListClear),
    ("list_size", OpKind::ListSize),
    ("map_set_policy", OpKind::MapSetPolicy),
    ("map_put", OpKind::MapPut),
    ("map_put_items", OpKind::MapPutItems),
    ("map_increment", OpKind::MapIncrement),
    ("map_decrement", OpKind::MapDecrement),
    ("map_clear", OpKind::MapClear),
    ("map_size", OpKind::MapSize),
];

impl FromStr for OpKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        if let Some((_, kind)) = NAMED.iter().find(|(n, _)| *n == name) {
            return Ok(*kind);
        }
        let unknown = || Error::param(format!("unknown operation: {name}"));
        let (container, rest) = if let Some(rest) = name.strip_prefix("list_") {
            (Container::List, rest)
        } else if let Some(rest) = name.strip_prefix("map_") {
            (Container::Map, rest)
        } else {
            return Err(unknown());
        };
        let (remove, rest) = if let Some(rest) = rest.strip_prefix("get_by_") {
            (false, rest)
        } else if let Some(rest) = rest.strip_prefix("remove_by_") {
            (true, rest)
        } else {
            return Err(unknown());
        };
        let shape = SHAPES
            .iter()
            .find(|(n, _)| *n == rest)
            .map(|(_, shape)| *shape)
            .ok_or_else(unknown)?;
        let by_key = matches!(shape, Shape::Key | Shape::KeyList | Shape::KeyRange);
        if container == Container::List && by_key {
            return Err(unknown());
        }
        Ok(OpKind::Select {
            container,
            remove,
            shape,
        })
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Select {
                container,
                remove,
                shape,
            } => {
                let prefix = match container {
                    Container::List => "list",
                    Container::Map => "map",
                };
                let action = if *remove { "remove" } else { "get" };
                let suffix = SHAPES
                    .iter()
                    .find(|(_, s)| s == shape)
                    .map_or("", |(n, _)| *n);
                write!(f, "{prefix}_{action}_by_{suffix}")
            }
            named => {
                let name = NAMED
                    .iter()
                    .find(|(_, k)| k == named)
                    .map_or("", |(n, _)| *n);
                f.write_str(name)
            }
        }
    }
}

impl TryFrom<String> for OpKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<OpKind> for String {
    fn from(kind: OpKind) -> Self {
        kind.to_string()
    }
}

/// Loosely typed operation as received from callers.
#[derive(Debug, Clone, PartialEq)]
pub struct OpDescriptor {
    pub op: OpKind,
    pub bin: Option<Value>,
    pub key: Option<Value>,
    pub index: Option<Value>,
    pub rank: Option<Value>,
    pub count: Option<Value>,
    pub range_end: Option<Value>,
    pub val: Option<Value>,
    pub return_type: Option<Value>,
    pub list_policy: Option<Value>,
    pub map_policy: Option<Value>,
    pub ttl: Option<Value>,
}

impl OpDescriptor {
    pub fn new(op: OpKind) -> Self {
        Self {
            op,
            bin: None,
            key: None,
            index: None,
            rank: None,
            count: None,
            range_end: None,
            val: None,
            return_type: None,
            list_policy: None,
            map_policy: None,
            ttl: None,
        }
    }

    fn required<'a>(&self, field: &'a Option<Value>, name: &str) -> Result<&'a Value> {
        field
            .as_ref()
            .ok_or_else(|| Error::param(format!("{} requires '{name}'", self.op)))
    }

    fn bin(&self) -> Result<String> {
        match self.required(&self.bin, "bin")? {
            Value::String(bin) => Ok(bin.clone()),
            other => Err(Error::param(format!(
                "bin must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    fn val(&self) -> Result<Value> {
        self.required(&self.val, "val").cloned()
    }

    fn int(&self, field: &Option<Value>, name: &str) -> Result<i64> {
        self.required(field, name)?
            .as_i64()
            .ok_or_else(|| Error::param(format!("'{name}' must be an integer")))
    }

    fn count(&self) -> Result<u64> {
        let count = self.int(&self.count, "count")?;
        u64::try_from(count)
            .map_err(|_| Error::param(format!("count must not be negative: {count}")))
    }

    /// `count`, falling back to `val` for the legacy list range form.
    fn range_count(&self) -> Result<u64> {
        if self.count.is_none() {
            if let Some(Value::Integer(n)) = self.val {
                return u64::try_from(n)
                    .map_err(|_| Error::param(format!("count must not be negative: {n}")));
            }
        }
        self.count()
    }

    fn list(&self, field: &Option<Value>, name: &str) -> Result<Vec<Value>> {
        match self.required(field, name)? {
            Value::List(items) => Ok(items.clone()),
            other => Err(Error::param(format!(
                "'{name}' must be a list, got {}",
                other.type_name()
            ))),
        }
    }

    fn range_end(&self) -> Result<Option<Value>> {
        match self.required(&self.range_end, "range_end")? {
            Value::Null => Ok(None),
            end => Ok(Some(end.clone())),
        }
    }

    fn return_type(&self) -> Result<ReturnType> {
        ReturnType::from_bits(self.int(&self.return_type, "return_type")?)
    }

    fn map_policy(&self) -> Result<MapPolicy> {
        MapPolicy::from_value(self.required(&self.map_policy, "map_policy")?)
    }

    fn list_policy(&self) -> Result<ListPolicy> {
        self.list_policy
            .as_ref()
            .map_or(Ok(ListPolicy::default()), ListPolicy::from_value)
    }

    fn ttl(&self) -> Result<Option<Expiration>> {
        match &self.ttl {
            None => Ok(None),
            Some(Value::Integer(ttl)) => Expiration::try_from(*ttl).map(Some),
            Some(other) => Err(Error::param(format!(
                "ttl must be an integer, got {}",
                other.type_name()
            ))),
        }
    }

    fn selector(&self, shape: Shape) -> Result<Selector> {
        let index = || self.int(&self.index, "index");
        let rank = || self.int(&self.rank, "rank");
        Ok(match shape {
            Shape::Index => Selector::Index(index()?),
            Shape::IndexRange => Selector::IndexRange {
                index: index()?,
                count: Some(self.count()?),
            },
            Shape::IndexRangeToEnd => Selector::IndexRange {
                index: index()?,
                count: None,
            },
            Shape::Rank => Selector::Rank(rank()?),
            Shape::RankRange => Selector::RankRange {
                rank: rank()?,
                count: Some(self.count()?),
            },
            Shape::RankRangeToEnd => Selector::RankRange {
                rank: rank()?,
                count: None,
            },
            Shape::Value => Selector::Value(self.val()?),
            Shape::ValueList => Selector::ValueList(self.list(&self.val, "val")?),
            Shape::ValueRange => Selector::ValueRange {
                begin: self.val()?,
                end: self.range_end()?,
            },
            Shape::ValueRelRankRange => Selector::ValueRelRankRange {
                value: self.val()?,
                rank: rank()?,
                count: Some(self.count()?),
            },
            Shape::ValueRelRankRangeToEnd => Selector::ValueRelRankRange {
                value: self.val()?,
                rank: rank()?,
                count: None,
            },
            Shape::Key => Selector::Key(self.required(&self.key, "key")?.clone()),
            Shape::KeyList => Selector::KeyList(self.list(&self.key, "key")?),
            Shape::KeyRange => Selector::KeyRange {
                begin: self.required(&self.key, "key")?.clone(),
                end: self.range_end()?,
            },
        })
    }

    fn list_op(&self) -> Result<ListOp> {
        let index = || self.int(&self.index, "index");
        Ok(match self.op {
            OpKind::ListAppend => ListOp::Append {
                value: self.val()?,
                policy: self.list_policy()?,
            },
            OpKind::ListMerge => ListOp::Merge {
                values: self.list(&self.val, "val")?,
                policy: self.list_policy()?,
            },
            OpKind::ListInsert => ListOp::Insert {
                index: index()?,
                value: self.val()?,
                policy: self.list_policy()?,
            },
            OpKind::ListInsertItems => ListOp::InsertItems {
                index: index()?,
                values: self.list(&self.val, "val")?,
                policy: self.list_policy()?,
            },
            OpKind::ListSet => ListOp::Set {
                index: index()?,
                value: self.val()?,
                policy: self.list_policy()?,
            },
            OpKind::ListPop => ListOp::Pop { index: index()? },
            OpKind::ListPopRange => ListOp::PopRange {
                index: index()?,
                count: Some(self.range_count()?),
            },
            OpKind::ListPopRangeFrom => ListOp::PopRange {
                index: index()?,
                count: None,
            },
            OpKind::ListRemove => ListOp::Remove { index: index()? },
            OpKind::ListRemoveRange => ListOp::RemoveRange {
                index: index()?,
                count: Some(self.range_count()?),
            },
            OpKind::ListRemoveRangeFrom => ListOp::RemoveRange {
                index: index()?,
                count: None,
            },
            OpKind::ListGet => ListOp::Get { index: index()? },
            OpKind::ListGetRange => ListOp::GetRange {
                index: index()?,
                count: Some(self.range_count()?),
            },
            OpKind::ListGetRangeFrom => ListOp::GetRange {
                index: index()?,
                count: None,
            },
            OpKind::ListTrim => ListOp::Trim {
                index: index()?,
                count: self.range_count()?,
            },
            OpKind::ListClear => ListOp::Clear,
            OpKind::ListSize => ListOp::Size,
            OpKind::Select {
                remove, shape, ..
            } => {
                let selector = self.selector(shape)?;
                let return_type = self.return_type()?;
                if remove {
                    ListOp::RemoveBy {
                        selector,
                        return_type,
                    }
                } else {
                    ListOp::GetBy {
                        selector,
                        return_type,
                    }
                }
            }
            other => return Err(Error::param(format!("{other} is not a list operation"))),
        })
    }

    fn map_op(&self) -> Result<MapOp> {
        Ok(match self.op {
            OpKind::MapSetPolicy => MapOp::SetPolicy {
                policy: self.map_policy()?,
            },
            OpKind::MapPut => MapOp::Put {
                key: self.required(&self.key, "key")?.clone(),
                value: self.val()?,
                policy: self.map_policy()?,
            },
            OpKind::MapPutItems => {
                let items = match self.val()? {
                    Value::Map(map) => map.entries().to_vec(),
                    other => {
                        return Err(Error::param(format!(
                            "map_put_items val must be a map, got {}",
                            other.type_name()
                        )))
                    }
                };
                MapOp::PutItems {
                    items,
                    policy: self.map_policy()?,
                }
            }
            OpKind::MapIncrement | OpKind::MapDecrement => {
                let key = self.required(&self.key, "key")?.clone();
                let delta = self.val()?;
                let policy = self.map_policy()?;
                if self.op == OpKind::MapIncrement {
                    MapOp::Increment { key, delta, policy }
                } else {
                    MapOp::Decrement { key, delta, policy }
                }
            }
            OpKind::MapClear => MapOp::Clear,
            OpKind::MapSize => MapOp::Size,
            OpKind::Select {
                remove, shape, ..
            } => {
                let selector = self.selector(shape)?;
                let return_type = self.return_type()?;
                if remove {
                    MapOp::RemoveBy {
                        selector,
                        return_type,
                    }
                } else {
                    MapOp::GetBy {
                        selector,
                        return_type,
                    }
                }
            }
            other => return Err(Error::param(format!("{other} is not a map operation"))),
        })
    }

    fn container(&self) -> Option<Container> {
        match self.op {
            OpKind::Select { container, .. } => Some(container),
            OpKind::ListAppend
            | OpKind::ListMerge
            | OpKind::ListInsert
            | OpKind::ListInsertItems
            | OpKind::ListSet
            | OpKind::ListPop
            | OpKind::ListPopRange
            | OpKind::ListPopRangeFrom
            | OpKind::ListRemove
            | OpKind::ListRemoveRange
            | OpKind::ListRemoveRangeFrom
            | OpKind::ListGet
            | OpKind::ListGetRange
            | OpKind::ListGetRangeFrom
            | OpKind::ListTrim
            | OpKind::ListClear
            | OpKind::ListSize => Some(Container::List),
            OpKind::MapSetPolicy
            | OpKind::MapPut
            | OpKind::MapPutItems
            | OpKind::MapIncrement
            | OpKind::MapDecrement
            | OpKind::MapClear
            | OpKind::MapSize => Some(Container::Map),
            _ => None,
        }
    }
}

impl TryFrom<&OpDescriptor> for Operation {
    type Error = Error;

    fn try_from(desc: &OpDescriptor) -> Result<Self> {
        let op = match desc.container() {
            Some(Container::List) => Operation::List {
                bin: desc.bin()?,
                op: desc.list_op()?,
            },
            Some(Container::Map) => Operation::Map {
                bin: desc.bin()?,
                op: desc.map_op()?,
            },
            None => match desc.op {
                OpKind::Write => Operation::Write {
                    bin: desc.bin()?,
                    value: desc.val()?,
                },
                OpKind::Read => Operation::Read { bin: desc.bin()? },
                OpKind::Incr => Operation::Increment {
                    bin: desc.bin()?,
                    delta: desc.val()?,
                },
                OpKind::Append => Operation::Append {
                    bin: desc.bin()?,
                    value: desc.val()?,
                },
                OpKind::Prepend => Operation::Prepend {
                    bin: desc.bin()?,
                    value: desc.val()?,
                },
                OpKind::Touch => Operation::Touch { ttl: desc.ttl()? },
                OpKind::Delete => Operation::Delete,
                other => return Err(Error::param(format!("unsupported operation: {other}"))),
            },
        };
        op.validate()?;
        Ok(op)
    }
}

impl TryFrom<OpDescriptor> for Operation {
    type Error = Error;

    fn try_from(desc: OpDescriptor) -> Result<Self> {
        Operation::try_from(&desc)
    }
}
