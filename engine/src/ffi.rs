//! FFI layer for embedding the store in other runtimes.
//!
//! This module provides C-compatible functions over a [`Handle`], which pairs
//! one namespace [`Store`] with the [`JsonCodec`] used to talk to it. All data
//! crosses the boundary as JSON strings, and time is passed in by the caller.
//!
//! # Memory Management
//!
//! - Strings returned by `aerokv_*` functions are allocated by Rust
//! - Caller must free them with `aerokv_string_free`
//! - Handles must be freed with `aerokv_store_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"status": 0, "ok": <result>}` on success
//! - `{"status": <code>, "error": "<message>"}` on failure

use crate::error::{Error, Result, Status};
use crate::json::JsonCodec;
use crate::key::Key;
use crate::record::Expiration;
use crate::store::{BatchRead, Store, StoreConfig};
use crate::Timestamp;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// A store and the codec its callers speak.
#[derive(Debug)]
pub struct Handle {
    pub store: Store,
    pub codec: JsonCodec,
}

/// `aerokv_store_new` configuration: the store settings plus a serializer name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HandleConfig {
    #[serde(flatten)]
    store: StoreConfig,
    serializer: Option<String>,
}

/// Response envelope.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult {
    Ok { status: i32, ok: Json },
    Err { status: i32, error: String },
}

impl FfiResult {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":{},"error":"serialization failed: {}"}}"#,
                Status::ErrClient.code(),
                e
            )
        })
    }
}

impl From<Result<Json>> for FfiResult {
    fn from(result: Result<Json>) -> Self {
        match result {
            Ok(ok) => FfiResult::Ok {
                status: Status::Ok.code(),
                ok,
            },
            Err(e) => FfiResult::Err {
                status: e.status().code(),
                error: e.to_string(),
            },
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `aerokv_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    CString::new(s.replace('\0', "\\u0000"))
        .unwrap_or_default()
        .into_raw()
}

fn respond(result: Result<Json>) -> *mut c_char {
    to_c_string(FfiResult::from(result).to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

unsafe fn parse_request(request: *const c_char) -> Result<Json> {
    let text = from_c_string(request)
        .ok_or_else(|| Error::Serialization("request is null or not UTF-8".into()))?;
    serde_json::from_str(&text).map_err(|e| Error::Serialization(format!("parse error: {e}")))
}

fn field<'a>(request: &'a Json, name: &str) -> Result<&'a Json> {
    request
        .get(name)
        .ok_or_else(|| Error::param(format!("request requires '{name}'")))
}

/// Run `f` against the handle and the parsed request.
unsafe fn call(
    handle: *mut Handle,
    request: *const c_char,
    f: impl FnOnce(&mut Handle, &Json) -> Result<Json>,
) -> *mut c_char {
    let Some(handle) = handle.as_mut() else {
        return respond(Err(Error::Serialization("null store pointer".into())));
    };
    respond(parse_request(request).and_then(|request| f(handle, &request)))
}

fn batch_entry<T>(codec: &JsonCodec, read: &BatchRead<T>, render: impl Fn(&T) -> Json) -> Json {
    let key = codec.key_to_json(&read.key);
    match &read.result {
        Ok(found) => json!({ "key": key, "status": Status::Ok.code(), "ok": render(found) }),
        Err(e) => json!({ "key": key, "status": e.status().code(), "error": e.to_string() }),
    }
}

impl Handle {
    fn key(&self, request: &Json) -> Result<Key> {
        self.codec.parse_key(field(request, "key")?)
    }

    fn keys(&self, request: &Json) -> Result<Vec<Key>> {
        field(request, "keys")?
            .as_array()
            .ok_or_else(|| Error::param("'keys' must be an array"))?
            .iter()
            .map(|key| self.codec.parse_key(key))
            .collect()
    }
}

// ============================================================================
// Store Lifecycle
// ============================================================================

/// Create a new store handle.
///
/// # Arguments
/// - `config_json`: `{"namespace", "defaultTtl", "missingBin", "serializer"}`,
///   every field optional; null means all defaults
///
/// # Returns
/// Pointer to a handle, or null on invalid configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `aerokv_store_free`
#[no_mangle]
pub unsafe extern "C" fn aerokv_store_new(config_json: *const c_char) -> *mut Handle {
    let config: HandleConfig = match from_c_string(config_json) {
        None => HandleConfig::default(),
        Some(text) => match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(_) => return ptr::null_mut(),
        },
    };
    let codec = match config.serializer.as_deref() {
        None => JsonCodec::default(),
        Some(name) => match JsonCodec::named(name) {
            Ok(codec) => codec,
            Err(_) => return ptr::null_mut(),
        },
    };
    Box::into_raw(Box::new(Handle {
        store: Store::new(config.store),
        codec,
    }))
}

/// Free a store handle.
///
/// # Safety
/// - `handle` must be a valid pointer from `aerokv_store_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn aerokv_store_free(handle: *mut Handle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from an `aerokv_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn aerokv_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Single-record verbs
// ============================================================================

/// Write bins.
///
/// Request: `{"key": {...}, "bins": {...}, "policy": {...}?}`
///
/// # Safety
/// - `handle` must be a valid pointer from `aerokv_store_new` or null
/// - `request` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `aerokv_string_free`
#[no_mangle]
pub unsafe extern "C" fn aerokv_put(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let key = h.key(req)?;
        let bins = h.codec.parse_bins(field(req, "bins")?)?;
        let policy = h.codec.parse_policy(req.get("policy"))?;
        h.store.put(&key, &bins, &policy, now)?;
        Ok(Json::Null)
    })
}

/// Read a whole record.
///
/// Request: `{"key": {...}}`
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_get(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let record = h.store.get(&h.key(req)?, now)?;
        Ok(h.codec.record_to_json(&record, now))
    })
}

/// Read selected bins.
///
/// Request: `{"key": {...}, "bins": ["a", ...]}`
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_select(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let bins = h.codec.parse_bin_names(field(req, "bins")?)?;
        let record = h.store.select(&h.key(req)?, &bins, now)?;
        Ok(h.codec.record_to_json(&record, now))
    })
}

/// Record metadata.
///
/// Request: `{"key": {...}}`
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_exists(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let metadata = h.store.exists(&h.key(req)?, now)?;
        Ok(h.codec.metadata_to_json(&metadata, now))
    })
}

/// Delete a record.
///
/// Request: `{"key": {...}, "policy": {...}?}`
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_remove(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let policy = h.codec.parse_policy(req.get("policy"))?;
        h.store.remove(&h.key(req)?, &policy, now)?;
        Ok(Json::Null)
    })
}

/// Reset a record's expiration.
///
/// Request: `{"key": {...}, "ttl": seconds}` (ttl sentinels as in write policies)
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_touch(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let ttl = match req.get("ttl") {
            None | Some(Json::Null) => Expiration::NamespaceDefault,
            Some(raw) => raw
                .as_i64()
                .ok_or_else(|| Error::param("'ttl' must be an integer"))
                .and_then(Expiration::try_from)?,
        };
        let metadata = h.store.touch(&h.key(req)?, ttl, now)?;
        Ok(h.codec.metadata_to_json(&metadata, now))
    })
}

/// Run operations atomically.
///
/// Request: `{"key": {...}, "ops": [descriptor, ...], "policy": {...}?, "ordered": bool?}`
///
/// Returns `{"bins": {bin: result}, "generation": n}`, or with `"ordered": true`
/// one result per op in op order (`null` for ops without a result).
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_operate(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let key = h.key(req)?;
        let ops = h.codec.parse_operations(field(req, "ops")?)?;
        let policy = h.codec.parse_policy(req.get("policy"))?;
        let outcome = h.store.operate(&key, &ops, &policy, now)?;

        if req.get("ordered").and_then(Json::as_bool).unwrap_or(false) {
            let ordered = outcome
                .ordered
                .iter()
                .map(|result| result.as_ref().map_or(Json::Null, |r| h.codec.result_to_json(r)))
                .collect();
            return Ok(Json::Array(ordered));
        }
        let bins: serde_json::Map<String, Json> = outcome
            .results
            .iter()
            .map(|(bin, result)| (bin.clone(), h.codec.result_to_json(result)))
            .collect();
        Ok(json!({
            "bins": bins,
            "generation": outcome.record.as_ref().map(|r| r.generation()),
        }))
    })
}

// ============================================================================
// Batch and namespace verbs
// ============================================================================

/// Read many records; each entry carries its own status.
///
/// Request: `{"keys": [{...}, ...], "bins": ["a", ...]?}`
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_get_many(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let keys = h.keys(req)?;
        let bins = match req.get("bins") {
            None | Some(Json::Null) => None,
            Some(names) => Some(h.codec.parse_bin_names(names)?),
        };
        let reads = h.store.get_many(&keys, bins.as_deref(), now);
        Ok(Json::Array(
            reads
                .iter()
                .map(|read| batch_entry(&h.codec, read, |r| h.codec.record_to_json(r, now)))
                .collect(),
        ))
    })
}

/// Remove records last updated before a threshold.
///
/// Request: `{"set": "name"?, "before": millis?}`; returns the count removed.
///
/// # Safety
/// Same as [`aerokv_put`].
#[no_mangle]
pub unsafe extern "C" fn aerokv_truncate(
    handle: *mut Handle,
    request: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    call(handle, request, |h, req| {
        let set = req.get("set").and_then(Json::as_str);
        let before = match req.get("before") {
            None | Some(Json::Null) => None,
            Some(raw) => Some(
                raw.as_u64()
                    .ok_or_else(|| Error::param("'before' must be a timestamp"))?,
            ),
        };
        Ok(json!(h.store.truncate(set, before, now)?))
    })
}

/// Compute a digest without touching any store.
///
/// Request: `{"ns": "...", "set": "...", "key": ...}`; returns the digest as hex.
///
/// # Safety
/// - `request` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `aerokv_string_free`
#[no_mangle]
pub unsafe extern "C" fn aerokv_key_digest(request: *const c_char) -> *mut c_char {
    let codec = JsonCodec::default();
    respond(parse_request(request).and_then(|req| {
        let key = codec.parse_key(&req)?;
        Ok(json!(key.digest.to_hex()))
    }))
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn aerokv_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
