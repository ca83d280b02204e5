//! Batch and namespace-wide handlers.

use crate::error::Result;
use crate::AppState;
use aerokv_engine::{Error, JsonCodec, Key, Status, Timestamp};
use serde::Deserialize;
use serde_json::{json, Value as Json};

/// Request body for batch reads.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub keys: Vec<Json>,
    /// Bin names to read; all bins when absent
    #[serde(default)]
    pub bins: Option<Json>,
}

/// Request body for truncate.
#[derive(Debug, Deserialize)]
pub struct TruncateRequest {
    pub ns: String,
    #[serde(default)]
    pub set: Option<String>,
    /// Only records last updated before this time (ms since epoch)
    #[serde(default)]
    pub before: Option<Timestamp>,
}

/// One batch entry; keys in unknown namespaces fail on their own.
fn entry(codec: &JsonCodec, key: &Key, result: aerokv_engine::Result<Json>) -> Json {
    let rendered = codec.key_to_json(key);
    match result {
        Ok(found) => json!({ "key": rendered, "status": Status::Ok.code(), "ok": found }),
        Err(e) => json!({ "key": rendered, "status": e.status().code(), "error": e.to_string() }),
    }
}

fn parse_keys(codec: &JsonCodec, keys: &[Json]) -> Result<Vec<Key>> {
    if keys.is_empty() {
        return Err(Error::param("'keys' must not be empty").into());
    }
    Ok(keys
        .iter()
        .map(|key| codec.parse_key(key))
        .collect::<aerokv_engine::Result<_>>()?)
}

pub fn handle_get_many(state: &AppState, request: BatchRequest, now: Timestamp) -> Result<Json> {
    let codec = &state.codec;
    let keys = parse_keys(codec, &request.keys)?;
    let bins = match &request.bins {
        None | Some(Json::Null) => None,
        Some(names) => Some(codec.parse_bin_names(names)?),
    };

    let entries = keys
        .iter()
        .map(|key| {
            let read = state.with_store(&key.namespace, |store| match &bins {
                Some(bins) => store.select(key, bins, now),
                None => store.get(key, now),
            });
            entry(codec, key, read.map(|record| codec.record_to_json(&record, now)))
        })
        .collect();
    Ok(Json::Array(entries))
}

pub fn handle_exists_many(state: &AppState, request: BatchRequest, now: Timestamp) -> Result<Json> {
    let codec = &state.codec;
    let keys = parse_keys(codec, &request.keys)?;

    let entries = keys
        .iter()
        .map(|key| {
            let read = state.with_store(&key.namespace, |store| store.exists(key, now));
            entry(codec, key, read.map(|metadata| codec.metadata_to_json(&metadata, now)))
        })
        .collect();
    Ok(Json::Array(entries))
}

pub fn handle_truncate(state: &AppState, request: TruncateRequest, now: Timestamp) -> Result<Json> {
    let removed = state.with_store(&request.ns, |store| {
        store.truncate(request.set.as_deref(), request.before, now)
    })?;
    tracing::info!(namespace = %request.ns, removed, "Truncated");
    Ok(json!(removed))
}
