//! JSON codec for values, keys, policies and operations.
//!
//! Natural JSON maps onto [`Value`] directly. Everything else travels as a
//! tagged single-key object:
//!
//! | JSON                          | Value                          |
//! |-------------------------------|--------------------------------|
//! | `{"$bytes": "<base64>"}`      | `Bytes`                        |
//! | `{"$geojson": {...}}`         | `GeoJson`                      |
//! | `{"$map": [[k, v], ...]}`     | `Map` with non-string keys     |
//!
//! JSON the engine has no type for (booleans) is handed to a [`Serializer`],
//! which turns it into bytes on the way in and recognises those bytes on the
//! way out.

use crate::descriptor::{OpDescriptor, OpKind};
use crate::error::{Error, Result};
use crate::key::{Digest, Key, UserKey};
use crate::operation::{OpResult, Operation};
use crate::policy::{MapOrder, WritePolicy};
use crate::record::{Metadata, Record};
use crate::scalar::Bins;
use crate::value::{CdtMap, Value};
use crate::Timestamp;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map as JsonMap, Value as Json};
use std::fmt;
use std::sync::Arc;

/// Strategy for JSON values with no native engine type.
pub trait Serializer: Send + Sync {
    /// Encode `value` as bin bytes.
    fn serialize(&self, value: &Json) -> Result<Vec<u8>>;

    /// Decode bytes this serializer produced; `None` for foreign bytes.
    fn deserialize(&self, bytes: &[u8]) -> Option<Json>;
}

/// Rejects anything without a native type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSerializer;

impl Serializer for NoSerializer {
    fn serialize(&self, value: &Json) -> Result<Vec<u8>> {
        Err(Error::param(format!(
            "no serializer configured for value {value}"
        )))
    }

    fn deserialize(&self, _bytes: &[u8]) -> Option<Json> {
        None
    }
}

/// Stores unsupported JSON as framed JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Frame marker; bytes without it are left alone on output.
    pub const MAGIC: &'static [u8] = b"\x00akv:json\x00";
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Json) -> Result<Vec<u8>> {
        let mut bytes = Self::MAGIC.to_vec();
        serde_json::to_writer(&mut bytes, value)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> Option<Json> {
        let body = bytes.strip_prefix(Self::MAGIC)?;
        serde_json::from_slice(body).ok()
    }
}

type SerializeFn = dyn Fn(&Json) -> Result<Vec<u8>> + Send + Sync;
type DeserializeFn = dyn Fn(&[u8]) -> Option<Json> + Send + Sync;

/// Serializer built from a pair of closures.
pub struct FnSerializer {
    serialize: Box<SerializeFn>,
    deserialize: Box<DeserializeFn>,
}

impl FnSerializer {
    pub fn new(
        serialize: impl Fn(&Json) -> Result<Vec<u8>> + Send + Sync + 'static,
        deserialize: impl Fn(&[u8]) -> Option<Json> + Send + Sync + 'static,
    ) -> Self {
        Self {
            serialize: Box::new(serialize),
            deserialize: Box::new(deserialize),
        }
    }
}

impl fmt::Debug for FnSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSerializer").finish_non_exhaustive()
    }
}

impl Serializer for FnSerializer {
    fn serialize(&self, value: &Json) -> Result<Vec<u8>> {
        (self.serialize)(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Option<Json> {
        (self.deserialize)(bytes)
    }
}

/// Converts between JSON and engine types.
#[derive(Clone)]
pub struct JsonCodec {
    serializer: Arc<dyn Serializer>,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new(JsonSerializer)
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").finish_non_exhaustive()
    }
}

impl JsonCodec {
    pub fn new(serializer: impl Serializer + 'static) -> Self {
        Self {
            serializer: Arc::new(serializer),
        }
    }

    /// Pick a serializer by name: `none` or `json`.
    pub fn named(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(Self::new(NoSerializer)),
            "json" => Ok(Self::new(JsonSerializer)),
            other => Err(Error::param(format!("unknown serializer: {other}"))),
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    pub fn to_value(&self, json: &Json) -> Result<Value> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(_) => self.serializer.serialize(json).map(Value::Bytes),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if n.is_u64() {
                    Err(Error::param(format!("integer {n} exceeds 64-bit signed range")))
                } else {
                    n.as_f64()
                        .map(Value::Double)
                        .ok_or_else(|| Error::param(format!("unrepresentable number {n}")))
                }
            }
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Array(items) => items
                .iter()
                .map(|item| self.to_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Json::Object(object) => self.object_to_value(object),
        }
    }

    fn object_to_value(&self, object: &JsonMap<String, Json>) -> Result<Value> {
        if let Some((tag, inner)) = single_entry(object) {
            match tag {
                "$bytes" => {
                    let encoded = inner
                        .as_str()
                        .ok_or_else(|| Error::param("$bytes must hold a base64 string"))?;
                    return STANDARD
                        .decode(encoded)
                        .map(Value::Bytes)
                        .map_err(|e| Error::param(format!("invalid base64: {e}")));
                }
                "$geojson" => return geojson(inner).map(Value::GeoJson),
                "$map" => return self.tagged_map(inner),
                _ => {}
            }
        }
        let mut map = CdtMap::new(MapOrder::Unordered);
        for (k, v) in object {
            map.insert(Value::String(k.clone()), self.to_value(v)?);
        }
        Ok(Value::Map(map))
    }

    fn tagged_map(&self, inner: &Json) -> Result<Value> {
        let pairs = inner
            .as_array()
            .ok_or_else(|| Error::param("$map must hold an array of [key, value] pairs"))?;
        let mut map = CdtMap::new(MapOrder::Unordered);
        for pair in pairs {
            match pair.as_array().map(Vec::as_slice) {
                Some([k, v]) => {
                    map.insert(self.to_value(k)?, self.to_value(v)?);
                }
                _ => return Err(Error::param("$map entries must be [key, value] pairs")),
            }
        }
        Ok(Value::Map(map))
    }

    pub fn to_json(&self, value: &Value) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Integer(i) => json!(i),
            Value::Double(f) => json!(f),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => self
                .serializer
                .deserialize(bytes)
                .unwrap_or_else(|| json!({ "$bytes": STANDARD.encode(bytes) })),
            Value::List(items) => Json::Array(items.iter().map(|v| self.to_json(v)).collect()),
            Value::Map(map) => {
                if map.entries().iter().all(|(k, _)| k.as_str().is_some()) {
                    let object = map
                        .entries()
                        .iter()
                        .filter_map(|(k, v)| Some((k.as_str()?.to_string(), self.to_json(v))))
                        .collect();
                    Json::Object(object)
                } else {
                    let pairs: Vec<Json> = map
                        .entries()
                        .iter()
                        .map(|(k, v)| json!([self.to_json(k), self.to_json(v)]))
                        .collect();
                    json!({ "$map": pairs })
                }
            }
            Value::GeoJson(text) => {
                let inner = serde_json::from_str(text).unwrap_or_else(|_| Json::String(text.clone()));
                json!({ "$geojson": inner })
            }
        }
    }

    /// Pairs render as `[[k, v], ...]`, counts as integers.
    pub fn result_to_json(&self, result: &OpResult) -> Json {
        match result {
            OpResult::Scalar(value) => self.to_json(value),
            OpResult::List(items) => Json::Array(items.iter().map(|v| self.to_json(v)).collect()),
            OpResult::Pairs(pairs) => Json::Array(
                pairs
                    .iter()
                    .map(|(k, v)| json!([self.to_json(k), self.to_json(v)]))
                    .collect(),
            ),
            OpResult::Count(n) => json!(n),
        }
    }

    // ------------------------------------------------------------------
    // Records and keys
    // ------------------------------------------------------------------

    pub fn bins_to_json(&self, bins: &Bins) -> Json {
        Json::Object(
            bins.iter()
                .map(|(name, value)| (name.clone(), self.to_json(value)))
                .collect(),
        )
    }

    pub fn key_to_json(&self, key: &Key) -> Json {
        let mut object = JsonMap::new();
        object.insert("ns".into(), json!(key.namespace));
        object.insert("set".into(), json!(key.set));
        if let Some(user_key) = &key.user_key {
            object.insert("key".into(), self.to_json(&user_key.to_value()));
        }
        object.insert("digest".into(), json!(key.digest.to_hex()));
        Json::Object(object)
    }

    /// `ttl` is remaining seconds, `-1` for never.
    pub fn metadata_to_json(&self, metadata: &Metadata, now: Timestamp) -> Json {
        json!({
            "generation": metadata.generation,
            "ttl": metadata.ttl(now).map_or(-1, |ttl| i64::try_from(ttl).unwrap_or(i64::MAX)),
            "lastUpdateTime": metadata.last_update_time,
        })
    }

    pub fn record_to_json(&self, record: &Record, now: Timestamp) -> Json {
        let mut object = match self.metadata_to_json(&record.metadata, now) {
            Json::Object(object) => object,
            _ => JsonMap::new(),
        };
        object.insert("key".into(), self.key_to_json(&record.key));
        object.insert("bins".into(), self.bins_to_json(&record.bins));
        Json::Object(object)
    }

    /// `{ns, set?, key}` or `{ns, set?, digest: "<hex>"}`.
    pub fn parse_key(&self, json: &Json) -> Result<Key> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::param("key must be an object"))?;
        let namespace = object
            .get("ns")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::param("key requires 'ns'"))?;
        let set = match object.get("set") {
            None | Some(Json::Null) => "",
            Some(Json::String(set)) => set.as_str(),
            Some(other) => return Err(Error::param(format!("invalid set: {other}"))),
        };
        match (object.get("key"), object.get("digest")) {
            (Some(user_key), _) if !user_key.is_null() => {
                let user_key = UserKey::from_value(&self.to_value(user_key)?)?;
                Key::new(namespace, set, user_key)
            }
            (_, Some(Json::String(hex))) => Key::from_digest(namespace, set, Digest::from_hex(hex)?),
            _ => Err(Error::param("key requires 'key' or 'digest'")),
        }
    }

    /// Missing or `null` means the default policy.
    pub fn parse_policy(&self, json: Option<&Json>) -> Result<WritePolicy> {
        match json {
            None | Some(Json::Null) => Ok(WritePolicy::default()),
            Some(json) => serde_json::from_value(json.clone())
                .map_err(|e| Error::param(format!("invalid policy: {e}"))),
        }
    }

    pub fn parse_bins(&self, json: &Json) -> Result<Bins> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::param("bins must be an object"))?;
        object
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.to_value(value)?)))
            .collect()
    }

    pub fn parse_bin_names(&self, json: &Json) -> Result<Vec<String>> {
        let items = json
            .as_array()
            .ok_or_else(|| Error::param("bin names must be an array"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::param(format!("invalid bin name: {item}")))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub fn parse_descriptor(&self, json: &Json) -> Result<OpDescriptor> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::param("operation must be an object"))?;
        let op: OpKind = object
            .get("op")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::param("operation requires 'op'"))?
            .parse()?;
        let mut desc = OpDescriptor::new(op);
        for (field, raw) in object {
            let slot = match field.as_str() {
                "op" => continue,
                "bin" => &mut desc.bin,
                "key" => &mut desc.key,
                "index" => &mut desc.index,
                "rank" => &mut desc.rank,
                "count" => &mut desc.count,
                "range_end" => &mut desc.range_end,
                "val" => &mut desc.val,
                "return_type" => &mut desc.return_type,
                "list_policy" => &mut desc.list_policy,
                "map_policy" => &mut desc.map_policy,
                "ttl" => &mut desc.ttl,
                other => return Err(Error::param(format!("unknown operation field: {other}"))),
            };
            *slot = Some(self.to_value(raw)?);
        }
        Ok(desc)
    }

    pub fn parse_operations(&self, json: &Json) -> Result<Vec<Operation>> {
        let items = json
            .as_array()
            .ok_or_else(|| Error::param("operations must be an array"))?;
        items
            .iter()
            .map(|item| Operation::try_from(self.parse_descriptor(item)?))
            .collect()
    }
}

fn single_entry(object: &JsonMap<String, Json>) -> Option<(&str, &Json)> {
    if object.len() != 1 {
        return None;
    }
    object.iter().next().map(|(k, v)| (k.as_str(), v))
}

/// Canonical text of a GeoJSON geometry.
fn geojson(inner: &Json) -> Result<String> {
    let parsed;
    let geometry = match inner {
        Json::String(text) => {
            parsed = serde_json::from_str::<Json>(text)
                .map_err(|e| Error::InvalidGeoJson(e.to_string()))?;
            &parsed
        }
        other => other,
    };
    let kind = geometry
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| Error::InvalidGeoJson("missing 'type'".into()))?;
    let has_body = match kind {
        "GeometryCollection" => geometry.get("geometries").is_some_and(Json::is_array),
        "Point" | "LineString" | "Polygon" | "MultiPoint" | "MultiLineString"
        | "MultiPolygon" | "AeroCircle" => {
            geometry.get("coordinates").is_some_and(Json::is_array)
        }
        other => return Err(Error::InvalidGeoJson(format!("unsupported type '{other}'"))),
    };
    if !has_body {
        return Err(Error::InvalidGeoJson(format!("{kind} without coordinates")));
    }
    serde_json::to_string(geometry).map_err(|e| Error::Serialization(e.to_string()))
}
