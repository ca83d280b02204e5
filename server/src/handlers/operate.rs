//! Operate handler - runs a list of operations atomically on one record.

use crate::error::Result;
use crate::AppState;
use aerokv_engine::Timestamp;
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};

/// Request body for operate.
#[derive(Debug, Deserialize)]
pub struct OperateRequest {
    pub key: Json,
    /// Operation descriptors, applied in order
    pub ops: Json,
    #[serde(default)]
    pub policy: Option<Json>,
    /// Return one result per op instead of per bin
    #[serde(default)]
    pub ordered: bool,
}

/// Process an operate request.
///
/// Returns `{"bins": {bin: result}, "generation": n}`, or with `ordered`
/// one result per op in op order (`null` for ops without a result).
pub fn handle_operate(state: &AppState, request: OperateRequest, now: Timestamp) -> Result<Json> {
    let codec = &state.codec;
    let key = codec.parse_key(&request.key)?;
    let ops = codec.parse_operations(&request.ops)?;
    let policy = codec.parse_policy(request.policy.as_ref())?;

    let outcome = state.with_store(&key.namespace, |store| store.operate(&key, &ops, &policy, now))?;
    tracing::debug!(
        digest = %key.digest.to_hex(),
        ops = ops.len(),
        wrote = outcome.wrote,
        "operate"
    );

    if request.ordered {
        let ordered = outcome
            .ordered
            .iter()
            .map(|result| result.as_ref().map_or(Json::Null, |r| codec.result_to_json(r)))
            .collect();
        return Ok(Json::Array(ordered));
    }

    let bins: Map<String, Json> = outcome
        .results
        .iter()
        .map(|(bin, result)| (bin.clone(), codec.result_to_json(result)))
        .collect();
    Ok(json!({
        "bins": bins,
        "generation": outcome.record.as_ref().map(|r| r.generation()),
    }))
}
