//! Single-record verbs.

use crate::error::Result;
use crate::AppState;
use aerokv_engine::{Expiration, Key, Timestamp};
use serde::Deserialize;
use serde_json::Value as Json;

/// Request naming one record.
#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    pub key: Json,
    #[serde(default)]
    pub policy: Option<Json>,
}

/// Request naming one record and some of its bins.
#[derive(Debug, Deserialize)]
pub struct BinsRequest {
    pub key: Json,
    pub bins: Json,
    #[serde(default)]
    pub policy: Option<Json>,
}

#[derive(Debug, Deserialize)]
pub struct TouchRequest {
    pub key: Json,
    /// Seconds; 0 namespace default, -1 never, -2 unchanged.
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Request applying one value to one bin (append, prepend, increment).
#[derive(Debug, Deserialize)]
pub struct BinValueRequest {
    pub key: Json,
    pub bin: String,
    pub val: Json,
    #[serde(default)]
    pub policy: Option<Json>,
}

fn parse_key(state: &AppState, key: &Json) -> Result<Key> {
    Ok(state.codec.parse_key(key)?)
}

pub fn handle_put(state: &AppState, request: BinsRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let bins = state.codec.parse_bins(&request.bins)?;
    let policy = state.codec.parse_policy(request.policy.as_ref())?;
    state.with_store(&key.namespace, |store| store.put(&key, &bins, &policy, now))?;
    tracing::debug!(digest = %key.digest.to_hex(), bins = bins.len(), "put");
    Ok(Json::Null)
}

pub fn handle_get(state: &AppState, request: KeyRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let record = state.with_store(&key.namespace, |store| store.get(&key, now))?;
    Ok(state.codec.record_to_json(&record, now))
}

pub fn handle_select(state: &AppState, request: BinsRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let bins = state.codec.parse_bin_names(&request.bins)?;
    let record = state.with_store(&key.namespace, |store| store.select(&key, &bins, now))?;
    Ok(state.codec.record_to_json(&record, now))
}

pub fn handle_exists(state: &AppState, request: KeyRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let metadata = state.with_store(&key.namespace, |store| store.exists(&key, now))?;
    Ok(state.codec.metadata_to_json(&metadata, now))
}

pub fn handle_remove(state: &AppState, request: KeyRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let policy = state.codec.parse_policy(request.policy.as_ref())?;
    state.with_store(&key.namespace, |store| store.remove(&key, &policy, now))?;
    Ok(Json::Null)
}

pub fn handle_remove_bin(state: &AppState, request: BinsRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let bins = state.codec.parse_bin_names(&request.bins)?;
    let policy = state.codec.parse_policy(request.policy.as_ref())?;
    state.with_store(&key.namespace, |store| store.remove_bin(&key, &bins, &policy, now))?;
    Ok(Json::Null)
}

pub fn handle_touch(state: &AppState, request: TouchRequest, now: Timestamp) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let ttl = request
        .ttl
        .map_or(Ok(Expiration::NamespaceDefault), Expiration::try_from)?;
    let metadata = state.with_store(&key.namespace, |store| store.touch(&key, ttl, now))?;
    Ok(state.codec.metadata_to_json(&metadata, now))
}

/// Which single-bin modify verb to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modify {
    Append,
    Prepend,
    Increment,
}

pub fn handle_modify(
    state: &AppState,
    verb: Modify,
    request: BinValueRequest,
    now: Timestamp,
) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    let value = state.codec.to_value(&request.val)?;
    let policy = state.codec.parse_policy(request.policy.as_ref())?;
    let bin = request.bin.as_str();
    state.with_store(&key.namespace, |store| match verb {
        Modify::Append => store.append(&key, bin, value, &policy, now),
        Modify::Prepend => store.prepend(&key, bin, value, &policy, now),
        Modify::Increment => store.increment(&key, bin, value, &policy, now),
    })?;
    Ok(Json::Null)
}

/// Digest of a key, without touching any store.
pub fn handle_digest(state: &AppState, request: KeyRequest) -> Result<Json> {
    let key = parse_key(state, &request.key)?;
    Ok(Json::String(key.digest.to_hex()))
}
