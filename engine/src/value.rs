//! Bin values.
//!
//! [`Value`] is the tagged union stored in record bins. It carries a total
//! order so that list and map elements can be ranked:
//!
//! - values of different types order by type:
//!   Null < Integer < String < List < Map < Bytes < Double < GeoJSON
//! - `Integer(1)` and `Double(1.0)` are different values and never equal
//! - doubles compare by IEEE-754 total order
//! - lists compare element-wise, maps compare their key-sorted entries
//!
//! Equality is structural and agrees with the order. Map equality ignores
//! entry order and the map's order policy.

use crate::policy::MapOrder;
use std::cmp::Ordering;

/// A bin value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(CdtMap),
    /// GeoJSON document kept as its JSON text.
    GeoJson(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::GeoJson(_) => "geojson",
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::String(_) => 2,
            Value::List(_) => 3,
            Value::Map(_) => 4,
            Value::Bytes(_) => 5,
            Value::Double(_) => 6,
            Value::GeoJson(_) => 7,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&CdtMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::GeoJson(a), Value::GeoJson(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<CdtMap> for Value {
    fn from(map: CdtMap) -> Self {
        Value::Map(map)
    }
}

/// Map payload: unique keys plus the order policy the map was written with.
///
/// Key-ordered maps keep `entries` sorted by key at all times. Unordered maps
/// keep insertion order; index and rank addressing still runs over the
/// key-sorted view (see [`CdtMap::key_order`]).
#[derive(Debug, Clone, Default)]
pub struct CdtMap {
    order: MapOrder,
    entries: Vec<(Value, Value)>,
}

impl CdtMap {
    pub fn new(order: MapOrder) -> Self {
        Self {
            order,
            entries: Vec::new(),
        }
    }

    /// Build a map from pairs. Later duplicates overwrite earlier ones.
    pub fn from_entries(order: MapOrder, entries: Vec<(Value, Value)>) -> Self {
        let mut map = CdtMap::new(order);
        for (key, value) in entries {
            map.insert(key, value);
        }
        map
    }

    pub fn order(&self) -> MapOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in storage order.
    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        if self.order.is_key_ordered() {
            match self.entries.binary_search_by(|(k, _)| k.cmp(&key)) {
                Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
                Err(i) => {
                    self.entries.insert(i, (key, value));
                    None
                }
            }
        } else {
            match self.position(&key) {
                Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
                None => {
                    self.entries.push((key, value));
                    None
                }
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Switch order policy, re-sorting when the new policy orders by key.
    pub fn set_order(&mut self, order: MapOrder) {
        self.order = order;
        if order.is_key_ordered() {
            self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
    }

    /// Storage positions of the entries in ascending key order.
    pub(crate) fn key_order(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..self.entries.len()).collect();
        if !self.order.is_key_ordered() {
            positions.sort_by(|&a, &b| self.entries[a].0.cmp(&self.entries[b].0));
        }
        positions
    }

    /// Drop the entries at the given storage positions.
    pub(crate) fn remove_positions(&mut self, positions: &[usize]) {
        let mut doomed = vec![false; self.entries.len()];
        for &p in positions {
            doomed[p] = true;
        }
        let mut i = 0;
        self.entries.retain(|_| {
            let keep = !doomed[i];
            i += 1;
            keep
        });
    }

    fn position(&self, key: &Value) -> Option<usize> {
        if self.order.is_key_ordered() {
            self.entries.binary_search_by(|(k, _)| k.cmp(key)).ok()
        } else {
            self.entries.iter().position(|(k, _)| k == key)
        }
    }

    fn sorted_entries(&self) -> Vec<&(Value, Value)> {
        self.key_order().into_iter().map(|i| &self.entries[i]).collect()
    }
}

impl Ord for CdtMap {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted_entries().cmp(&other.sorted_entries())
    }
}

impl PartialOrd for CdtMap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CdtMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CdtMap {}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for CdtMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = CdtMap::new(MapOrder::Unordered);
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_type_order() {
        let mut values = vec![
            Value::Double(0.5),
            Value::from("a"),
            Value::Bytes(vec![1]),
            Value::Integer(10),
            Value::Null,
            Value::from(vec![1]),
        ];
        values.sort();
        assert_eq!(
            values.iter().map(Value::type_name).collect::<Vec<_>>(),
            vec!["null", "integer", "string", "list", "bytes", "double"]
        );
    }

    #[test]
    fn integer_and_double_differ() {
        assert_ne!(Value::Integer(1), Value::Double(1.0));
        assert_eq!(Value::Double(2.5), Value::Double(2.5));
    }

    #[test]
    fn lists_compare_elementwise() {
        assert!(Value::from(vec![1, 2]) < Value::from(vec![1, 3]));
        assert!(Value::from(vec![1]) < Value::from(vec![1, 0]));
    }

    #[test]
    fn key_ordered_map_stays_sorted() {
        let mut map = CdtMap::new(MapOrder::KeyOrdered);
        map.insert("c".into(), 3.into());
        map.insert("a".into(), 1.into());
        map.insert("b".into(), 2.into());
        let keys: Vec<_> = map.entries().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![Value::from("a"), "b".into(), "c".into()]);

        assert_eq!(map.insert("a".into(), 10.into()), Some(Value::Integer(1)));
        assert_eq!(map.get(&"a".into()), Some(&Value::Integer(10)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn unordered_map_keeps_insertion_order() {
        let mut map = CdtMap::new(MapOrder::Unordered);
        map.insert("z".into(), 1.into());
        map.insert("a".into(), 2.into());
        assert_eq!(map.entries()[0].0, Value::from("z"));
        assert_eq!(map.key_order(), vec![1, 0]);

        map.set_order(MapOrder::KeyOrdered);
        assert_eq!(map.entries()[0].0, Value::from("a"));
    }

    #[test]
    fn map_equality_ignores_order() {
        let a: CdtMap = vec![("x", 1), ("y", 2)].into_iter().collect();
        let b = CdtMap::from_entries(
            MapOrder::KeyOrdered,
            vec![("y".into(), 2.into()), ("x".into(), 1.into())],
        );
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn remove_positions_drops_selected() {
        let mut map: CdtMap = vec![("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        map.remove_positions(&[0, 2]);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&"b".into()));
        assert_eq!(map.remove(&"b".into()), Some(Value::Integer(2)));
        assert!(map.is_empty());
    }
}
