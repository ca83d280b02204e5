//! Atomic multi-operation execution against one record.
//!
//! [`Engine::operate`] validates every operation before touching anything,
//! applies write-class operations in list order, then read-class ones, and
//! only hands back the new record if every step succeeded. The input record
//! is never modified.

use crate::cdt::{list, map, ListOp, MapOp};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::operation::{OpResult, Operation};
use crate::policy::{KeyPolicy, WritePolicy};
use crate::record::Record;
use crate::scalar::{self, Bins};
use crate::value::{CdtMap, Value};
use crate::{BinName, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How `Clear` and `Size` treat a bin that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBinPolicy {
    /// No result, no error, no bin created.
    #[default]
    Empty,
    /// Fail with `ERR_BIN_INCOMPATIBLE_TYPE`.
    Incompatible,
}

/// Engine settings shared by every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TTL in seconds applied for `Expiration::NamespaceDefault`; 0 never expires.
    pub default_ttl: u32,
    pub missing_bin: MissingBinPolicy,
}

/// Per-bin results: the value of the last producing op for each bin.
pub type BinResults = BTreeMap<BinName, OpResult>;

/// Result of a successful `operate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Record to persist; `None` when the record is gone (deleted, emptied,
    /// or never created).
    pub record: Option<Record>,
    pub results: BinResults,
    /// Result of every op, in op order.
    pub ordered: Vec<Option<OpResult>>,
    /// Whether the call wrote, i.e. whether `record` must be persisted.
    pub wrote: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Unsaved record for a key that does not exist yet.
    ///
    /// Fails when the policy forbids creating the record. The shell has
    /// generation 0; the first committed write makes it 1.
    pub fn create_record(&self, key: &Key, policy: &WritePolicy, now: Timestamp) -> Result<Record> {
        policy.exists.check(false)?;
        policy.generation.check(0)?;
        let mut record = Record::new(stored_key(key, policy));
        record.metadata.void_time = policy
            .ttl
            .resolve(now, self.config.default_ttl, None, false);
        Ok(record)
    }

    /// Write every bin of `bins`, as a sequence of write operations.
    pub fn put(
        &self,
        existing: Option<&Record>,
        key: &Key,
        bins: &Bins,
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Outcome> {
        if bins.is_empty() {
            return Err(Error::param("put requires at least one bin"));
        }
        let ops: Vec<Operation> = bins
            .iter()
            .map(|(bin, value)| Operation::write(bin.as_str(), value.clone()))
            .collect();
        self.operate(existing, key, &ops, policy, now)
    }

    /// Apply `ops` to `existing` (or to a new record for `key`) atomically.
    pub fn operate(
        &self,
        existing: Option<&Record>,
        key: &Key,
        ops: &[Operation],
        policy: &WritePolicy,
        now: Timestamp,
    ) -> Result<Outcome> {
        let plan = Plan::check(ops)?;
        let exists = existing.is_some();

        if plan.has_write {
            if plan.record_level.is_some() && !exists {
                return Err(Error::RecordNotFound);
            }
            policy.exists.check(exists)?;
            policy
                .generation
                .check(existing.map_or(0, Record::generation))?;
        } else if !exists {
            return Err(Error::RecordNotFound);
        }

        let mut record = match existing {
            Some(current) => {
                let mut record = current.clone();
                if policy.key == KeyPolicy::Send && key.user_key.is_some() {
                    record.key = key.clone();
                }
                record
            }
            None => Record::new(stored_key(key, policy)),
        };
        if plan.has_write && plan.record_level.is_none() && policy.exists.replaces_bins() {
            record.bins.clear();
        }

        let mut ordered: Vec<Option<OpResult>> = vec![None; ops.len()];
        for (i, op) in ops.iter().enumerate().filter(|(_, op)| op.is_write()) {
            ordered[i] = self.apply(&mut record.bins, op)?;
        }
        for (i, op) in ops.iter().enumerate().filter(|(_, op)| !op.is_write()) {
            ordered[i] = self.apply(&mut record.bins, op)?;
        }

        let mut results = BinResults::new();
        for (op, result) in ops.iter().zip(&ordered) {
            if let (Some(bin), Some(result)) = (op.bin(), result) {
                results.insert(bin.to_string(), result.clone());
            }
        }

        if !plan.has_write {
            return Ok(Outcome {
                record: Some(record),
                results,
                ordered,
                wrote: false,
            });
        }
        if matches!(plan.record_level, Some(Operation::Delete)) {
            return Ok(Outcome {
                record: None,
                results,
                ordered,
                wrote: true,
            });
        }

        let ttl = match plan.record_level {
            Some(Operation::Touch { ttl: Some(ttl) }) => *ttl,
            _ => policy.ttl,
        };
        let void_time = ttl.resolve(
            now,
            self.config.default_ttl,
            record.metadata.void_time,
            exists,
        );
        record.touch_write(void_time, now);

        Ok(Outcome {
            record: (!record.bins.is_empty()).then_some(record),
            results,
            ordered,
            wrote: true,
        })
    }

    fn apply(&self, bins: &mut Bins, op: &Operation) -> Result<Option<OpResult>> {
        match op {
            Operation::Write { bin, value } => {
                scalar::write(bins, bin, value);
                Ok(None)
            }
            Operation::Read { bin } => Ok(Some(scalar::read(bins, bin))),
            Operation::Increment { bin, delta } => {
                scalar::increment(bins, bin, delta)?;
                Ok(None)
            }
            Operation::Append { bin, value } => {
                scalar::append(bins, bin, value)?;
                Ok(None)
            }
            Operation::Prepend { bin, value } => {
                scalar::prepend(bins, bin, value)?;
                Ok(None)
            }
            Operation::Touch { .. } | Operation::Delete => Ok(None),
            Operation::List { bin, op } => self.apply_list(bins, bin, op),
            Operation::Map { bin, op } => self.apply_map(bins, bin, op),
        }
    }

    fn apply_list(&self, bins: &mut Bins, bin: &str, op: &ListOp) -> Result<Option<OpResult>> {
        match bins.get_mut(bin) {
            Some(Value::List(items)) => list::apply(items, op),
            Some(other) => Err(incompatible(bin, "list", other)),
            None if op.creates_bin() => {
                let mut items = Vec::new();
                let result = list::apply(&mut items, op)?;
                bins.insert(bin.to_string(), Value::List(items));
                Ok(result)
            }
            None => self.missing(bin, "list", matches!(op, ListOp::Clear | ListOp::Size)),
        }
    }

    fn apply_map(&self, bins: &mut Bins, bin: &str, op: &MapOp) -> Result<Option<OpResult>> {
        match bins.get_mut(bin) {
            Some(Value::Map(entries)) => map::apply(entries, op),
            Some(other) => Err(incompatible(bin, "map", other)),
            None => match op.creates_bin() {
                Some(policy) => {
                    let mut entries = CdtMap::new(policy.order);
                    let result = map::apply(&mut entries, op)?;
                    bins.insert(bin.to_string(), Value::Map(entries));
                    Ok(result)
                }
                None => self.missing(bin, "map", matches!(op, MapOp::Clear | MapOp::Size)),
            },
        }
    }

    /// CDT op against a bin that does not exist.
    fn missing(&self, bin: &str, expected: &'static str, whole: bool) -> Result<Option<OpResult>> {
        if whole && self.config.missing_bin == MissingBinPolicy::Incompatible {
            return Err(Error::BinIncompatibleType {
                bin: bin.to_string(),
                expected,
                actual: "nothing",
            });
        }
        Ok(None)
    }
}

/// Shape facts gathered while validating an op list.
struct Plan<'a> {
    has_write: bool,
    record_level: Option<&'a Operation>,
}

impl<'a> Plan<'a> {
    fn check(ops: &'a [Operation]) -> Result<Self> {
        if ops.is_empty() {
            return Err(Error::param("operate requires at least one operation"));
        }
        for op in ops {
            op.validate()?;
        }

        let mut written: HashSet<&str> = HashSet::new();
        let mut writes = 0usize;
        let mut record_level = None;
        for op in ops.iter().filter(|op| op.is_write()) {
            writes += 1;
            if op.is_record_level() {
                record_level = Some(op);
            }
            if let Some(bin) = op.bin() {
                if !written.insert(bin) {
                    return Err(Error::param(format!(
                        "more than one write operation on bin '{bin}'"
                    )));
                }
            }
        }
        if record_level.is_some() && writes > 1 {
            return Err(Error::param(
                "touch and delete may only be combined with read operations",
            ));
        }
        Ok(Self {
            has_write: writes > 0,
            record_level,
        })
    }
}

fn stored_key(key: &Key, policy: &WritePolicy) -> Key {
    match policy.key {
        KeyPolicy::Send => key.clone(),
        KeyPolicy::Digest => key.digest_only(),
    }
}

fn incompatible(bin: &str, expected: &'static str, actual: &Value) -> Error {
    Error::BinIncompatibleType {
        bin: bin.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdt::{ReturnType, Selector};
    use crate::key::UserKey;
    use crate::policy::{GenerationPolicy, MapPolicy, RecordExistsAction};
    use crate::record::Expiration;

    const NOW: Timestamp = 1_700_000_000_000;

    fn key() -> Key {
        Key::new("test", "demo", UserKey::from("k1")).unwrap()
    }

    fn stored(bins: &[(&str, Value)]) -> Record {
        let mut record = Record::new(key());
        for (bin, value) in bins {
            record.bins.insert(bin.to_string(), value.clone());
        }
        record.metadata.generation = 1;
        record
    }

    fn engine() -> Engine {
        Engine::default()
    }

    #[test]
    fn empty_op_list_is_rejected() {
        let err = engine()
            .operate(None, &key(), &[], &WritePolicy::default(), NOW)
            .unwrap_err();
        assert!(matches!(err, Error::Param(_)));
    }

    #[test]
    fn writes_run_before_reads() {
        let record = stored(&[("n", 1.into())]);
        let ops = [Operation::read("n"), Operation::increment("n", 4)];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(outcome.results["n"], OpResult::Scalar(5.into()));
        assert_eq!(outcome.ordered[1], None);
        assert_eq!(outcome.record.unwrap().generation(), 2);
    }

    #[test]
    fn two_writes_on_one_bin_are_rejected() {
        let ops = [Operation::write("a", 1), Operation::append("a", "x")];
        let err = engine()
            .operate(None, &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap_err();
        assert!(matches!(err, Error::Param(_)));
    }

    #[test]
    fn touch_only_combines_with_reads() {
        let record = stored(&[("a", 1.into())]);
        let ops = [Operation::touch(Some(Expiration::At(60))), Operation::write("b", 2)];
        assert!(engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .is_err());

        let ops = [Operation::touch(Some(Expiration::At(60))), Operation::read("a")];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        let touched = outcome.record.unwrap();
        assert_eq!(touched.generation(), 2);
        assert_eq!(touched.metadata.void_time, Some(NOW + 60_000));
        assert_eq!(outcome.results["a"], OpResult::Scalar(1.into()));
    }

    #[test]
    fn touch_on_missing_record() {
        let err = engine()
            .operate(None, &key(), &[Operation::touch(None)], &WritePolicy::default(), NOW)
            .unwrap_err();
        assert_eq!(err, Error::RecordNotFound);
    }

    #[test]
    fn reads_on_missing_record() {
        let err = engine()
            .operate(None, &key(), &[Operation::read("a")], &WritePolicy::default(), NOW)
            .unwrap_err();
        assert_eq!(err, Error::RecordNotFound);
    }

    #[test]
    fn delete_after_reads() {
        let record = stored(&[("a", 7.into())]);
        let ops = [Operation::Delete, Operation::read("a")];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.record.is_none());
        assert!(outcome.wrote);
        assert_eq!(outcome.results["a"], OpResult::Scalar(7.into()));
    }

    #[test]
    fn failure_leaves_input_untouched() {
        let record = stored(&[("s", "text".into()), ("l", Value::from(vec![1]))]);
        let before = record.clone();
        let ops = [
            Operation::list(
                "l",
                ListOp::Append {
                    value: 2.into(),
                    policy: Default::default(),
                },
            ),
            Operation::increment("s", 1),
        ];
        assert!(engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn list_op_on_scalar_bin() {
        let record = stored(&[("n", 1.into())]);
        let ops = [Operation::list("n", ListOp::Size)];
        let err = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap_err();
        assert_eq!(err.status(), crate::error::Status::ErrBinIncompatibleType);
    }

    #[test]
    fn missing_bin_policy_empty() {
        let record = stored(&[("a", 1.into())]);
        let ops = [Operation::map("m", MapOp::Size)];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.results.is_empty());

        let ops = [Operation::map("m", MapOp::Clear)];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.record.unwrap().bin("m").is_none());
    }

    #[test]
    fn missing_bin_policy_incompatible() {
        let strict = Engine::new(EngineConfig {
            missing_bin: MissingBinPolicy::Incompatible,
            ..EngineConfig::default()
        });
        let record = stored(&[("a", 1.into())]);
        for op in [MapOp::Size, MapOp::Clear] {
            let err = strict
                .operate(
                    Some(&record),
                    &key(),
                    &[Operation::map("m", op)],
                    &WritePolicy::default(),
                    NOW,
                )
                .unwrap_err();
            assert_eq!(err.status(), crate::error::Status::ErrBinIncompatibleType);
        }
        let err = strict
            .operate(
                Some(&record),
                &key(),
                &[Operation::list("l", ListOp::Clear)],
                &WritePolicy::default(),
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, Error::BinIncompatibleType { .. }));
    }

    #[test]
    fn map_put_creates_bin_with_policy_order() {
        let record = stored(&[("a", 1.into())]);
        let ops = [Operation::map(
            "m",
            MapOp::Put {
                key: "k".into(),
                value: 1.into(),
                policy: MapPolicy::new(crate::policy::MapOrder::KeyOrdered),
            },
        )];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        let record = outcome.record.unwrap();
        match record.bin("m") {
            Some(Value::Map(m)) => assert!(m.order().is_key_ordered()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn removal_on_missing_bin_is_noop() {
        let record = stored(&[("a", 1.into())]);
        let ops = [Operation::list(
            "l",
            ListOp::RemoveBy {
                selector: Selector::Index(0),
                return_type: ReturnType::VALUE,
            },
        )];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.record.unwrap().bin("l").is_none());
    }

    #[test]
    fn removing_last_bin_deletes_record() {
        let record = stored(&[("a", 1.into())]);
        let ops = [Operation::write("a", Value::Null)];
        let outcome = engine()
            .operate(Some(&record), &key(), &ops, &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.record.is_none());
        assert!(outcome.wrote);
    }

    #[test]
    fn replace_drops_unwritten_bins() {
        let record = stored(&[("a", 1.into()), ("b", 2.into())]);
        let policy = WritePolicy::default().with_exists(RecordExistsAction::Replace);
        let outcome = engine()
            .operate(Some(&record), &key(), &[Operation::write("c", 3)], &policy, NOW)
            .unwrap();
        let record = outcome.record.unwrap();
        assert_eq!(record.bins.len(), 1);
        assert_eq!(record.bin("c"), Some(&Value::Integer(3)));
    }

    #[test]
    fn generation_checked_before_writes() {
        let record = stored(&[("a", 1.into())]);
        let policy = WritePolicy::default().with_generation(GenerationPolicy::Eq(5));
        let err = engine()
            .operate(Some(&record), &key(), &[Operation::write("a", 2)], &policy, NOW)
            .unwrap_err();
        assert_eq!(
            err,
            Error::GenerationMismatch {
                expected: 5,
                actual: 1
            }
        );
    }

    #[test]
    fn ttl_sentinels_on_write() {
        let engine = Engine::new(EngineConfig {
            default_ttl: 100,
            ..EngineConfig::default()
        });
        let mut record = stored(&[("a", 1.into())]);
        record.metadata.void_time = Some(NOW + 5_000);

        let keep = WritePolicy::default().with_ttl(Expiration::DoNotChange);
        let outcome = engine
            .operate(Some(&record), &key(), &[Operation::write("a", 2)], &keep, NOW)
            .unwrap();
        assert_eq!(outcome.record.unwrap().metadata.void_time, Some(NOW + 5_000));

        let outcome = engine
            .operate(
                Some(&record),
                &key(),
                &[Operation::write("a", 2)],
                &WritePolicy::default(),
                NOW,
            )
            .unwrap();
        assert_eq!(outcome.record.unwrap().metadata.void_time, Some(NOW + 100_000));

        let never = WritePolicy::default().with_ttl(Expiration::Never);
        let outcome = engine
            .operate(Some(&record), &key(), &[Operation::write("a", 2)], &never, NOW)
            .unwrap();
        assert_eq!(outcome.record.unwrap().metadata.void_time, None);
    }

    #[test]
    fn key_policy_controls_stored_user_key() {
        let outcome = engine()
            .operate(None, &key(), &[Operation::write("a", 1)], &WritePolicy::default(), NOW)
            .unwrap();
        assert!(outcome.record.unwrap().key.user_key.is_none());

        let send = WritePolicy::default().with_key(KeyPolicy::Send);
        let outcome = engine()
            .operate(None, &key(), &[Operation::write("a", 1)], &send, NOW)
            .unwrap();
        assert_eq!(
            outcome.record.unwrap().key.user_key,
            Some(UserKey::from("k1"))
        );
    }

    #[test]
    fn create_record_shell() {
        let shell = engine()
            .create_record(&key(), &WritePolicy::default(), NOW)
            .unwrap();
        assert_eq!(shell.generation(), 0);
        let update = WritePolicy::default().with_exists(RecordExistsAction::Update);
        assert_eq!(
            engine().create_record(&key(), &update, NOW),
            Err(Error::RecordNotFound)
        );
    }

    #[test]
    fn put_writes_all_bins() {
        let bins: Bins = [("a".to_string(), Value::Integer(1)), ("b".to_string(), "x".into())]
            .into_iter()
            .collect();
        let outcome = engine()
            .put(None, &key(), &bins, &WritePolicy::default(), NOW)
            .unwrap();
        let record = outcome.record.unwrap();
        assert_eq!(record.bins, bins);
        assert_eq!(record.generation(), 1);
        assert!(outcome.results.is_empty());

        assert!(engine()
            .put(None, &key(), &Bins::new(), &WritePolicy::default(), NOW)
            .is_err());
    }
}
