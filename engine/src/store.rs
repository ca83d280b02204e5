//! Store - the in-memory record container for one namespace.
//!
//! The Store keeps records keyed by digest and runs every write through
//! [`Engine::operate`], so the single-record contract (atomicity, policies,
//! generation and expiration) holds for every verb. Time is always passed
//! in; expired records are invisible to reads and reaped on the next write.

use crate::cdt::ListOp;
use crate::error::{Error, Result};
use crate::key::{Digest, Key};
use crate::operate::{Engine, EngineConfig, MissingBinPolicy, Outcome};
use crate::operation::{OpResult, Operation};
use crate::policy::{ListPolicy, WritePolicy};
use crate::record::{validate_bin_name, Expiration, Metadata, Record};
use crate::scalar::Bins;
use crate::value::Value;
use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Namespace settings for a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub namespace: String,
    /// Seconds; 0 means records written with the namespace default never expire.
    pub default_ttl: u32,
    pub missing_bin: MissingBinPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "test".to_string(),
            default_ttl: 0,
            missing_bin: MissingBinPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }
}

/// Per-key outcome of a batch call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRead<T> {
    pub key: Key,
    pub result: Result<T>,
}

/// The main store holding one namespace.
#[derive(Debug, Clone)]
pub struct Store {
    config: StoreConfig,
    engine: Engine,
    records: HashMap<Digest, Record>,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let engine = Engine::new(EngineConfig {
            default_ttl: config.default_ttl,
            missing_bin: config.missing_bin,
        });
        Self {
            config,
            engine,
            records: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of live records at `now`.
    pub fn len(&self, now: Timestamp) -> usize {
        self.records
            .values()
            .filter(|r| !r.metadata.is_expired(now))
            .count()
    }

    pub fn is_empty(&self, now: Timestamp) -> bool {
        self.len(now) == 0
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Whole record.
    pub fn get(&self, key: &Key, now: Timestamp) -> Result<Record> {
        self.check_namespace(key)?;
        self.live(key, now).cloned().ok_or(Error::RecordNotFound)
    }

    /// Record with only the named bins; missing bins are omitted.
    pub fn select(&self, key: &Key, bins: &[impl AsRef<str>], now: Timestamp) -> Result<Record> {
        bins.iter().try_for_each(|bin| validate_bin_name(bin.as_ref()))?;
        Ok(self.get(key, now)?.select(bins))
    }

    /// Metadata only.
    pub fn exists(&self, key: &Key, now: Timestamp) -> Result<Metadata> {
        self.check_namespace(key)?;
        self.live(key, now)
            .map(|record| record.metadata)
            .ok_or(Error::RecordNotFound)
    }

    /// Read many keys; each key succeeds or fails on its own.
    pub fn get_many(
        &self,
        keys: &[Key],
        bins: Option<&[String]>,
        now: Timestamp,
    ) -> Vec<BatchRead<Record>> {
        keys.iter()
            .map(|key| BatchRead {
                key: key.clone(),
                result: match bins {
                    Some(bins) => self.select(key, bins, now),
                    None => self.get(key, now),
                },
            })
            .collect()
    }

    pub fn exists_many(&self, keys: &[Key], now: Timestamp) -> Vec<BatchRead<Metadata>> {
        keys.iter()
            .map(|key| BatchRead {
                key: key.clone(),
                result: self.exists(key, now),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write every bin in `bins`; a `Null` value removes that bin.
    pub fn put(&mut self, key: &Key, bins: &Bins, policy: &WritePolicy, now: Timestamp) -> Result<()> {
        self.check_namespace(key)?;
        self.reap(key, now);
        let outcome = self
            .engine
            .put(self.records.get(&key.digest), key, bins, policy, now)?;
        self.commit(key, outcome);
        Ok(())
    }

    /// Reset the record's expiration.
    pub fn touch(&mut self, key: &Key, ttl: Expiration, now: Timestamp) -> Result<Metadata> {
        let outcome = self.operate(key, &[Operation::touch(Some(ttl))], &WritePolicy::default(), now)?;
        outcome
            .record
            .map(|record| record.metadata)
            .ok_or(Error::RecordNotFound)
    }

    /// Delete the record; the generation policy is honoured.
    pub fn remove(&mut self, key: &Key, policy: &WritePolicy, now: Timestamp) -> Result<()> {
        self.operate(key, &[Operation::Delete], policy, now).map(|_| ())
    }

    /// Drop the named bins; removing the last bin deletes the record.
    pub fn remove_bin(
        &mut self,
        key: &Key,
        bins: &[impl AsRef<str>],
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let ops: Vec<Operation> = bins
            .iter()
            .map(|bin| Operation::write(bin.as_ref(), Value::Null))
            .collect();
        self.operate(key, &ops, policy, now).map(|_| ())
    }

    pub fn append(
        &mut self,
        key: &Key,
        bin: &str,
        value: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.operate(key, &[Operation::append(bin, value)], policy, now)
            .map(|_| ())
    }

    pub fn prepend(
        &mut self,
        key: &Key,
        bin: &str,
        value: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.operate(key, &[Operation::prepend(bin, value)], policy, now)
            .map(|_| ())
    }

    pub fn increment(
        &mut self,
        key: &Key,
        bin: &str,
        delta: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.operate(key, &[Operation::increment(bin, delta)], policy, now)
            .map(|_| ())
    }

    /// Run `ops` atomically against the record for `key`.
    pub fn operate(
        &mut self,
        key: &Key,
        ops: &[Operation],
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Outcome> {
        self.check_namespace(key)?;
        self.reap(key, now);
        let outcome = self
            .engine
            .operate(self.records.get(&key.digest), key, ops, policy, now)?;
        self.commit(key, outcome.clone());
        Ok(outcome)
    }

    /// Like [`Store::operate`], with one result slot per op in op order.
    pub fn operate_ordered(
        &mut self,
        key: &Key,
        ops: &[Operation],
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Vec<Option<OpResult>>> {
        self.operate(key, ops, policy, now)
            .map(|outcome| outcome.ordered)
    }

    /// Remove records whose last update precedes `before` (every record
    /// when `None`), optionally only within `set`. Returns the count removed.
    pub fn truncate(
        &mut self,
        set: Option<&str>,
        before: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<usize> {
        if let Some(before) = before {
            if before > now {
                return Err(Error::param(format!(
                    "truncate threshold {before} is in the future"
                )));
            }
        }
        let initial = self.records.len();
        self.records.retain(|_, record| {
            let in_set = set.map_or(true, |set| record.key.set == set);
            let old = before.map_or(true, |before| record.metadata.last_update_time < before);
            !(in_set && old)
        });
        let removed = initial - self.records.len();
        debug!(
            namespace = %self.config.namespace,
            set = set.unwrap_or("*"),
            removed,
            "truncated"
        );
        Ok(removed)
    }

    /// Drop every expired record. Returns the count removed.
    pub fn reap_expired(&mut self, now: Timestamp) -> usize {
        let initial = self.records.len();
        self.records.retain(|_, record| !record.metadata.is_expired(now));
        let reaped = initial - self.records.len();
        if reaped > 0 {
            debug!(namespace = %self.config.namespace, reaped, "expired records reaped");
        }
        reaped
    }

    // ------------------------------------------------------------------
    // List helpers, each a one-op operate
    // ------------------------------------------------------------------

    pub fn list_append(
        &mut self,
        key: &Key,
        bin: &str,
        value: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let op = ListOp::Append {
            value: value.into(),
            policy: ListPolicy::default(),
        };
        self.list_op(key, bin, op, policy, now).map(|_| ())
    }

    pub fn list_merge(
        &mut self,
        key: &Key,
        bin: &str,
        values: Vec<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let op = ListOp::Merge {
            values,
            policy: ListPolicy::default(),
        };
        self.list_op(key, bin, op, policy, now).map(|_| ())
    }

    pub fn list_insert(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        value: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let op = ListOp::Insert {
            index,
            value: value.into(),
            policy: ListPolicy::default(),
        };
        self.list_op(key, bin, op, policy, now).map(|_| ())
    }

    pub fn list_insert_items(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        values: Vec<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let op = ListOp::InsertItems {
            index,
            values,
            policy: ListPolicy::default(),
        };
        self.list_op(key, bin, op, policy, now).map(|_| ())
    }

    pub fn list_set(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        value: impl Into<Value>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        let op = ListOp::Set {
            index,
            value: value.into(),
            policy: ListPolicy::default(),
        };
        self.list_op(key, bin, op, policy, now).map(|_| ())
    }

    pub fn list_pop(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Value> {
        self.list_op(key, bin, ListOp::Pop { index }, policy, now)
            .map(scalar)
    }

    pub fn list_pop_range(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        count: Option<u64>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Vec<Value>> {
        self.list_op(key, bin, ListOp::PopRange { index, count }, policy, now)
            .map(items)
    }

    pub fn list_remove(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.list_op(key, bin, ListOp::Remove { index }, policy, now)
            .map(|_| ())
    }

    pub fn list_remove_range(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        count: Option<u64>,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.list_op(key, bin, ListOp::RemoveRange { index, count }, policy, now)
            .map(|_| ())
    }

    pub fn list_trim(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        count: u64,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<()> {
        self.list_op(key, bin, ListOp::Trim { index, count }, policy, now)
            .map(|_| ())
    }

    pub fn list_clear(&mut self, key: &Key, bin: &str, policy: &WritePolicy, now: Timestamp) -> Result<()> {
        self.list_op(key, bin, ListOp::Clear, policy, now).map(|_| ())
    }

    pub fn list_get(&mut self, key: &Key, bin: &str, index: i64, now: Timestamp) -> Result<Value> {
        self.list_op(key, bin, ListOp::Get { index }, &WritePolicy::default(), now)
            .map(scalar)
    }

    pub fn list_get_range(
        &mut self,
        key: &Key,
        bin: &str,
        index: i64,
        count: Option<u64>,
        now: Timestamp,
    ) -> Result<Vec<Value>> {
        let op = ListOp::GetRange { index, count };
        self.list_op(key, bin, op, &WritePolicy::default(), now)
            .map(items)
    }

    pub fn list_size(&mut self, key: &Key, bin: &str, now: Timestamp) -> Result<u64> {
        self.list_op(key, bin, ListOp::Size, &WritePolicy::default(), now)
            .map(|result| match result {
                Some(OpResult::Count(n)) => n,
                _ => 0,
            })
    }

    fn list_op(
        &mut self,
        key: &Key,
        bin: &str,
        op: ListOp,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Option<OpResult>> {
        let mut results = self.operate_ordered(key, &[Operation::list(bin, op)], policy, now)?;
        Ok(results.pop().flatten())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_namespace(&self, key: &Key) -> Result<()> {
        if key.namespace != self.config.namespace {
            return Err(Error::NamespaceNotFound(key.namespace.clone()));
        }
        Ok(())
    }

    fn live(&self, key: &Key, now: Timestamp) -> Option<&Record> {
        self.records
            .get(&key.digest)
            .filter(|record| !record.metadata.is_expired(now))
    }

    fn reap(&mut self, key: &Key, now: Timestamp) {
        let expired = self
            .records
            .get(&key.digest)
            .is_some_and(|record| record.metadata.is_expired(now));
        if expired {
            self.records.remove(&key.digest);
            debug!(digest = %key.digest, "expired record reaped");
        }
    }

    fn commit(&mut self, key: &Key, outcome: Outcome) {
        if !outcome.wrote {
            return;
        }
        match outcome.record {
            Some(record) => {
                debug!(
                    digest = %key.digest,
                    generation = record.generation(),
                    "record written"
                );
                self.records.insert(key.digest, record);
            }
            None => {
                if self.records.remove(&key.digest).is_some() {
                    debug!(digest = %key.digest, "record removed");
                }
            }
        }
    }
}

fn scalar(result: Option<OpResult>) -> Value {
    result.map_or(Value::Null, OpResult::into_value)
}

fn items(result: Option<OpResult>) -> Vec<Value> {
    match result {
        Some(OpResult::List(items)) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::UserKey;
    use crate::policy::{GenerationPolicy, RecordExistsAction};

    const NOW: Timestamp = 1_700_000_000_000;

    fn test_store() -> Store {
        Store::new(StoreConfig::new("test"))
    }

    fn key(id: &str) -> Key {
        Key::new("test", "demo", UserKey::from(id)).unwrap()
    }

    fn bins(entries: &[(&str, Value)]) -> Bins {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn put_then_get() {
        let mut store = test_store();
        store
            .put(&key("a"), &bins(&[("name", "ann".into())]), &WritePolicy::default(), NOW)
            .unwrap();

        let record = store.get(&key("a"), NOW).unwrap();
        assert_eq!(record.bin("name"), Some(&Value::from("ann")));
        assert_eq!(record.generation(), 1);
        assert_eq!(store.len(NOW), 1);
    }

    #[test]
    fn get_missing_record() {
        let store = test_store();
        assert_eq!(store.get(&key("nope"), NOW), Err(Error::RecordNotFound));
        assert_eq!(store.exists(&key("nope"), NOW), Err(Error::RecordNotFound));
    }

    #[test]
    fn unknown_namespace() {
        let store = test_store();
        let other = Key::new("other", "demo", UserKey::from("a")).unwrap();
        assert_eq!(
            store.get(&other, NOW),
            Err(Error::NamespaceNotFound("other".into()))
        );
    }

    #[test]
    fn create_only_rejects_existing() {
        let mut store = test_store();
        let policy = WritePolicy::default().with_exists(RecordExistsAction::Create);
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &policy, NOW)
            .unwrap();
        assert_eq!(
            store.put(&key("a"), &bins(&[("x", 2.into())]), &policy, NOW),
            Err(Error::RecordExists)
        );
        assert_eq!(store.get(&key("a"), NOW).unwrap().bin("x"), Some(&Value::Integer(1)));
    }

    #[test]
    fn select_omits_missing_bins() {
        let mut store = test_store();
        store
            .put(
                &key("a"),
                &bins(&[("x", 1.into()), ("y", 2.into())]),
                &WritePolicy::default(),
                NOW,
            )
            .unwrap();
        let record = store.select(&key("a"), &["x", "zz"], NOW).unwrap();
        assert_eq!(record.bins.len(), 1);
        assert!(store.select(&key("a"), &["this_is_way_too_long"], NOW).is_err());
    }

    #[test]
    fn remove_honours_generation() {
        let mut store = test_store();
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &WritePolicy::default(), NOW)
            .unwrap();
        let stale = WritePolicy::default().with_generation(GenerationPolicy::Eq(9));
        assert!(matches!(
            store.remove(&key("a"), &stale, NOW),
            Err(Error::GenerationMismatch { .. })
        ));
        let fresh = WritePolicy::default().with_generation(GenerationPolicy::Eq(1));
        store.remove(&key("a"), &fresh, NOW).unwrap();
        assert!(store.is_empty(NOW));
        assert_eq!(
            store.remove(&key("a"), &WritePolicy::default(), NOW),
            Err(Error::RecordNotFound)
        );
    }

    #[test]
    fn remove_last_bin_deletes_record() {
        let mut store = test_store();
        store
            .put(
                &key("a"),
                &bins(&[("x", 1.into()), ("y", 2.into())]),
                &WritePolicy::default(),
                NOW,
            )
            .unwrap();
        store
            .remove_bin(&key("a"), &["x"], &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(store.get(&key("a"), NOW).unwrap().bins.len(), 1);
        store
            .remove_bin(&key("a"), &["y"], &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(store.get(&key("a"), NOW), Err(Error::RecordNotFound));
    }

    #[test]
    fn expired_records_are_invisible() {
        let mut store = test_store();
        let policy = WritePolicy::default().with_ttl(Expiration::At(10));
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &policy, NOW)
            .unwrap();
        assert!(store.exists(&key("a"), NOW + 9_999).is_ok());
        assert_eq!(store.get(&key("a"), NOW + 10_000), Err(Error::RecordNotFound));

        let create = WritePolicy::default().with_exists(RecordExistsAction::Create);
        store
            .put(&key("a"), &bins(&[("x", 2.into())]), &create, NOW + 10_000)
            .unwrap();
        assert_eq!(store.exists(&key("a"), NOW + 10_000).unwrap().generation, 1);
    }

    #[test]
    fn touch_extends_ttl() {
        let mut store = test_store();
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &WritePolicy::default(), NOW)
            .unwrap();
        let meta = store.touch(&key("a"), Expiration::At(30), NOW).unwrap();
        assert_eq!(meta.generation, 2);
        assert_eq!(meta.ttl(NOW), Some(30));
        assert_eq!(
            store.touch(&key("b"), Expiration::At(30), NOW),
            Err(Error::RecordNotFound)
        );
    }

    #[test]
    fn scalar_verbs() {
        let mut store = test_store();
        let policy = WritePolicy::default();
        store.append(&key("a"), "s", "mid", &policy, NOW).unwrap();
        store.prepend(&key("a"), "s", "<", &policy, NOW).unwrap();
        store.append(&key("a"), "s", ">", &policy, NOW).unwrap();
        store.increment(&key("a"), "n", 5, &policy, NOW).unwrap();
        store.increment(&key("a"), "n", -2, &policy, NOW).unwrap();

        let record = store.get(&key("a"), NOW).unwrap();
        assert_eq!(record.bin("s"), Some(&Value::from("<mid>")));
        assert_eq!(record.bin("n"), Some(&Value::Integer(3)));
        assert_eq!(record.generation(), 5);
    }

    #[test]
    fn list_helpers() {
        let mut store = test_store();
        let policy = WritePolicy::default();
        let k = key("l");
        store.list_append(&k, "l", 1, &policy, NOW).unwrap();
        store
            .list_merge(&k, "l", vec![2.into(), 3.into(), 4.into()], &policy, NOW)
            .unwrap();
        store.list_insert(&k, "l", 0, 0, &policy, NOW).unwrap();
        assert_eq!(store.list_size(&k, "l", NOW).unwrap(), 5);
        assert_eq!(store.list_get(&k, "l", 4, NOW).unwrap(), Value::Integer(4));
        assert_eq!(store.list_pop(&k, "l", 0, &policy, NOW).unwrap(), Value::Integer(0));
        assert_eq!(
            store.list_get_range(&k, "l", 1, Some(2), NOW).unwrap(),
            vec![Value::Integer(2), Value::Integer(3)]
        );
        store.list_set(&k, "l", 0, 10, &policy, NOW).unwrap();
        store.list_trim(&k, "l", 0, 2, &policy, NOW).unwrap();
        assert_eq!(
            store.list_pop_range(&k, "l", 0, None, &policy, NOW).unwrap(),
            vec![Value::Integer(10), Value::Integer(2)]
        );
        assert_eq!(store.list_size(&k, "l", NOW).unwrap(), 0);
        assert_eq!(store.list_size(&k, "absent", NOW).unwrap(), 0);
    }

    #[test]
    fn operate_ordered_keeps_every_slot() {
        let mut store = test_store();
        let k = key("o");
        let ops = [
            Operation::write("n", 1),
            Operation::read("n"),
            Operation::increment("m", 2),
            Operation::read("m"),
        ];
        let results = store
            .operate_ordered(&k, &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(
            results,
            vec![
                None,
                Some(OpResult::Scalar(1.into())),
                None,
                Some(OpResult::Scalar(2.into())),
            ]
        );
    }

    #[test]
    fn failed_operate_commits_nothing() {
        let mut store = test_store();
        let k = key("f");
        store
            .put(&k, &bins(&[("s", "x".into())]), &WritePolicy::default(), NOW)
            .unwrap();
        let ops = [Operation::write("a", 1), Operation::increment("s", 1)];
        assert!(store.operate(&k, &ops, &WritePolicy::default(), NOW).is_err());
        let record = store.get(&k, NOW).unwrap();
        assert!(record.bin("a").is_none());
        assert_eq!(record.generation(), 1);
    }

    #[test]
    fn batch_reads() {
        let mut store = test_store();
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &WritePolicy::default(), NOW)
            .unwrap();
        let keys = [key("a"), key("b")];
        let records = store.get_many(&keys, None, NOW);
        assert!(records[0].result.is_ok());
        assert_eq!(records[1].result, Err(Error::RecordNotFound));

        let exists = store.exists_many(&keys, NOW);
        assert_eq!(exists[0].result.as_ref().map(|m| m.generation), Ok(1));
        assert!(exists[1].result.is_err());
    }

    #[test]
    fn truncate_by_set_and_time() {
        let mut store = test_store();
        let policy = WritePolicy::default();
        let other = Key::new("test", "other", UserKey::from("a")).unwrap();
        store.put(&key("a"), &bins(&[("x", 1.into())]), &policy, NOW).unwrap();
        store.put(&key("b"), &bins(&[("x", 1.into())]), &policy, NOW + 50).unwrap();
        store.put(&other, &bins(&[("x", 1.into())]), &policy, NOW).unwrap();

        assert!(store.truncate(None, Some(NOW + 1_000), NOW + 100).is_err());
        assert_eq!(store.truncate(Some("demo"), Some(NOW + 10), NOW + 100).unwrap(), 1);
        assert!(store.exists(&key("b"), NOW + 100).is_ok());
        assert_eq!(store.truncate(None, None, NOW + 100).unwrap(), 2);
        assert!(store.is_empty(NOW + 100));
    }

    #[test]
    fn reap_expired_drops_dead_records() {
        let mut store = test_store();
        let short = WritePolicy::default().with_ttl(Expiration::At(1));
        store.put(&key("a"), &bins(&[("x", 1.into())]), &short, NOW).unwrap();
        store
            .put(&key("b"), &bins(&[("x", 1.into())]), &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(store.reap_expired(NOW + 5_000), 1);
        assert_eq!(store.len(NOW + 5_000), 1);
    }

    #[test]
    fn namespace_default_ttl() {
        let mut store = Store::new(StoreConfig {
            default_ttl: 60,
            ..StoreConfig::new("test")
        });
        store
            .put(&key("a"), &bins(&[("x", 1.into())]), &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(store.exists(&key("a"), NOW).unwrap().ttl(NOW), Some(60));
    }
}
