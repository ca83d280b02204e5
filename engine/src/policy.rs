//! Write, list and map policies.
//!
//! Record-level policies ([`WritePolicy`]) are resolved before any bin is
//! touched: existence first, then generation. Collection policies
//! ([`ListPolicy`], [`MapPolicy`]) steer how CDT writes treat duplicates and
//! missing elements.

use crate::error::{Error, Result};
use crate::record::Expiration;
use crate::value::Value;
use crate::Generation;
use serde::{Deserialize, Serialize};

/// How a write treats an existing (or missing) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordExistsAction {
    /// Create the record or update the bins of an existing one.
    #[default]
    CreateOrUpdate,
    /// Fail with `ERR_RECORD_EXISTS` if the record exists.
    Create,
    /// Fail with `ERR_RECORD_NOT_FOUND` if the record is missing.
    Update,
    /// Like `Update`, but bins not written by the call are dropped.
    Replace,
    /// Create, or replace all bins of an existing record.
    CreateOrReplace,
}

impl RecordExistsAction {
    pub fn check(self, exists: bool) -> Result<()> {
        match (self, exists) {
            (RecordExistsAction::Create, true) => Err(Error::RecordExists),
            (RecordExistsAction::Update | RecordExistsAction::Replace, false) => {
                Err(Error::RecordNotFound)
            }
            _ => Ok(()),
        }
    }

    /// Whether existing bins are discarded before the write phase.
    pub fn replaces_bins(self) -> bool {
        matches!(
            self,
            RecordExistsAction::Replace | RecordExistsAction::CreateOrReplace
        )
    }
}

/// Optimistic concurrency check against the stored generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    #[default]
    Ignore,
    /// Write only if the stored generation equals this value.
    Eq(Generation),
    /// Write only if the stored generation is greater than this value.
    Gt(Generation),
}

impl GenerationPolicy {
    /// A missing record has generation 0.
    pub fn check(self, current: Generation) -> Result<()> {
        match self {
            GenerationPolicy::Ignore => Ok(()),
            GenerationPolicy::Eq(expected) if current == expected => Ok(()),
            GenerationPolicy::Gt(expected) if current > expected => Ok(()),
            GenerationPolicy::Eq(expected) | GenerationPolicy::Gt(expected) => {
                Err(Error::GenerationMismatch {
                    expected,
                    actual: current,
                })
            }
        }
    }
}

/// Whether the user key is stored alongside the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    #[default]
    Digest,
    Send,
}

/// Record-level write policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WritePolicy {
    pub exists: RecordExistsAction,
    pub generation: GenerationPolicy,
    pub ttl: Expiration,
    pub key: KeyPolicy,
}

impl WritePolicy {
    pub fn with_exists(mut self, exists: RecordExistsAction) -> Self {
        self.exists = exists;
        self
    }

    pub fn with_generation(mut self, generation: GenerationPolicy) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_ttl(mut self, ttl: Expiration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key(mut self, key: KeyPolicy) -> Self {
        self.key = key;
        self
    }
}

/// Map ordering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapOrder {
    #[default]
    Unordered,
    KeyOrdered,
    KeyValueOrdered,
}

impl MapOrder {
    pub fn is_key_ordered(self) -> bool {
        !matches!(self, MapOrder::Unordered)
    }

    fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(MapOrder::Unordered),
            1 => Ok(MapOrder::KeyOrdered),
            3 => Ok(MapOrder::KeyValueOrdered),
            other => Err(Error::param(format!("invalid map order: {other}"))),
        }
    }
}

/// Which map puts are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapWriteMode {
    /// Create or overwrite the key.
    #[default]
    Update,
    /// Only overwrite existing keys.
    UpdateOnly,
    /// Only create new keys.
    CreateOnly,
}

const CREATE_ONLY: i64 = 1;
const UPDATE_ONLY: i64 = 2;
const ADD_UNIQUE: i64 = 1;
const INSERT_BOUNDED: i64 = 2;
const NO_FAIL: i64 = 4;
const PARTIAL: i64 = 8;

/// Policy carried by every mutating map operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPolicy {
    pub order: MapOrder,
    pub write_mode: MapWriteMode,
    /// Denied items are skipped instead of failing the call.
    pub no_fail: bool,
    /// With `no_fail`, the remaining items of a multi-item put still commit.
    pub partial: bool,
}

impl MapPolicy {
    pub fn new(order: MapOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn with_write_mode(mut self, write_mode: MapWriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_flags(mut self, no_fail: bool, partial: bool) -> Self {
        self.no_fail = no_fail;
        self.partial = partial;
        self
    }

    /// Parse the descriptor form `{"order": n, "write_flags": bits}`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut policy = MapPolicy::default();
        for (name, setting) in policy_entries(value, "map_policy")? {
            match name {
                "order" => policy.order = MapOrder::from_code(policy_int(name, setting)?)?,
                "write_flags" => {
                    let bits = policy_int(name, setting)?;
                    if bits & !(CREATE_ONLY | UPDATE_ONLY | NO_FAIL | PARTIAL) != 0 {
                        return Err(Error::param(format!("invalid map write flags: {bits}")));
                    }
                    policy.write_mode = match (bits & CREATE_ONLY != 0, bits & UPDATE_ONLY != 0) {
                        (false, false) => MapWriteMode::Update,
                        (true, false) => MapWriteMode::CreateOnly,
                        (false, true) => MapWriteMode::UpdateOnly,
                        (true, true) => {
                            return Err(Error::param(
                                "map write flags cannot be both create-only and update-only",
                            ))
                        }
                    };
                    policy.no_fail = bits & NO_FAIL != 0;
                    policy.partial = bits & PARTIAL != 0;
                }
                other => return Err(Error::param(format!("invalid map_policy entry: {other}"))),
            }
        }
        Ok(policy)
    }
}

/// Policy for mutating list operations. Lists are always unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListPolicy {
    /// Reject values already present in the list.
    pub add_unique: bool,
    /// Reject inserts past the end instead of padding with nulls.
    pub insert_bounded: bool,
    pub no_fail: bool,
    pub partial: bool,
}

impl ListPolicy {
    pub fn unique() -> Self {
        Self {
            add_unique: true,
            ..Self::default()
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let mut policy = ListPolicy::default();
        for (name, setting) in policy_entries(value, "list_policy")? {
            match name {
                "order" => {
                    if policy_int(name, setting)? != 0 {
                        return Err(Error::param("only unordered lists are supported"));
                    }
                }
                "write_flags" => {
                    let bits = policy_int(name, setting)?;
                    if bits & !(ADD_UNIQUE | INSERT_BOUNDED | NO_FAIL | PARTIAL) != 0 {
                        return Err(Error::param(format!("invalid list write flags: {bits}")));
                    }
                    policy.add_unique = bits & ADD_UNIQUE != 0;
                    policy.insert_bounded = bits & INSERT_BOUNDED != 0;
                    policy.no_fail = bits & NO_FAIL != 0;
                    policy.partial = bits & PARTIAL != 0;
                }
                other => {
                    return Err(Error::param(format!("invalid list_policy entry: {other}")))
                }
            }
        }
        Ok(policy)
    }
}

fn policy_entries<'a>(
    value: &'a Value,
    field: &str,
) -> Result<impl Iterator<Item = (&'a str, &'a Value)>> {
    let map = value
        .as_map()
        .ok_or_else(|| Error::param(format!("{field} must be a map")))?;
    if let Some((bad, _)) = map.entries().iter().find(|(k, _)| k.as_str().is_none()) {
        return Err(Error::param(format!(
            "{field} keys must be strings, got {}",
            bad.type_name()
        )));
    }
    Ok(map
        .entries()
        .iter()
        .filter_map(|(k, v)| k.as_str().map(|name| (name, v))))
}

fn policy_int(name: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::param(format!("policy entry '{name}' must be an integer")))
}
