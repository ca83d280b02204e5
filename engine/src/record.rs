//! Records: bins plus generation and expiration metadata.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::value::Value;
use crate::{BinName, Generation, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest accepted bin name, in bytes.
pub const MAX_BIN_NAME_LEN: usize = 14;

/// Reject empty or over-long bin names.
pub fn validate_bin_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::param("bin name must not be empty"));
    }
    if name.len() > MAX_BIN_NAME_LEN {
        return Err(Error::param(format!(
            "bin name '{name}' exceeds {MAX_BIN_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

/// Record time-to-live as supplied with a write.
///
/// On the wire this is a plain integer: seconds, `0` for the namespace
/// default, `-1` for never, `-2` to keep the current expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Expiration {
    /// Expire this many seconds after the write.
    At(u32),
    #[default]
    NamespaceDefault,
    Never,
    DoNotChange,
}

impl Expiration {
    /// Void time for a write at `now`, given the namespace default TTL in
    /// seconds (0 = never) and the record's current void time.
    pub fn resolve(
        self,
        now: Timestamp,
        default_ttl: u32,
        current: Option<Timestamp>,
        exists: bool,
    ) -> Option<Timestamp> {
        let after = |secs: u32| Some(now.saturating_add(u64::from(secs) * 1000));
        match self {
            Expiration::At(secs) => after(secs),
            Expiration::Never => None,
            Expiration::DoNotChange if exists => current,
            Expiration::NamespaceDefault | Expiration::DoNotChange => match default_ttl {
                0 => None,
                secs => after(secs),
            },
        }
    }
}

impl TryFrom<i64> for Expiration {
    type Error = Error;

    fn try_from(ttl: i64) -> Result<Self> {
        match ttl {
            0 => Ok(Expiration::NamespaceDefault),
            -1 => Ok(Expiration::Never),
            -2 => Ok(Expiration::DoNotChange),
            secs if secs > 0 => u32::try_from(secs)
                .map(Expiration::At)
                .map_err(|_| Error::param(format!("ttl {secs} is too large"))),
            other => Err(Error::param(format!("invalid ttl: {other}"))),
        }
    }
}

impl From<Expiration> for i64 {
    fn from(ttl: Expiration) -> Self {
        match ttl {
            Expiration::At(secs) => i64::from(secs),
            Expiration::NamespaceDefault => 0,
            Expiration::Never => -1,
            Expiration::DoNotChange => -2,
        }
    }
}

/// Metadata associated with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Write counter; 0 for a record that has never been stored.
    pub generation: Generation,
    /// When the record expires (milliseconds since epoch), `None` for never
    pub void_time: Option<Timestamp>,
    /// When the record was last written (milliseconds since epoch)
    pub last_update_time: Timestamp,
}

impl Metadata {
    /// Remaining lifetime in whole seconds, `None` if the record never expires.
    pub fn ttl(&self, now: Timestamp) -> Option<u64> {
        self.void_time.map(|void| void.saturating_sub(now) / 1000)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.void_time.is_some_and(|void| void <= now)
    }
}

/// A record in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: Key,
    pub bins: BTreeMap<BinName, Value>,
    pub metadata: Metadata,
}

impl Record {
    /// An unsaved, binless record shell for `key`.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            bins: BTreeMap::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.metadata.generation
    }

    pub fn bin(&self, name: &str) -> Option<&Value> {
        self.bins.get(name)
    }

    /// Record stamped by a committed write at `now`.
    pub(crate) fn touch_write(&mut self, void_time: Option<Timestamp>, now: Timestamp) {
        self.metadata.generation += 1;
        self.metadata.void_time = void_time;
        self.metadata.last_update_time = now;
    }

    /// Copy containing only the named bins that exist.
    pub fn select(&self, bins: &[impl AsRef<str>]) -> Record {
        let selected = bins
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.bins.get(name).map(|v| (name.to_string(), v.clone()))
            })
            .collect();
        Record {
            key: self.key.clone(),
            bins: selected,
            metadata: self.metadata,
        }
    }
}
