//! Request handlers for record operations.
//!
//! Handlers are synchronous: each one takes the store lock for a single
//! namespace, runs one engine call and releases it before returning.

mod batch;
mod operate;
mod records;

pub use batch::*;
pub use operate::*;
pub use records::*;

use aerokv_engine::{Status, Timestamp};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as Json;

/// Success envelope; errors use the same `status` field.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: i32,
    pub ok: Json,
}

impl ApiResponse {
    pub fn ok(value: Json) -> Self {
        Self {
            status: Status::Ok.code(),
            ok: value,
        }
    }
}

/// Wall clock in milliseconds since the Unix epoch.
pub fn now() -> Timestamp {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
