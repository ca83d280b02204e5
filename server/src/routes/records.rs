//! Record endpoint routes.
//!
//! Every verb is a `POST` with a JSON body so keys, values and operation
//! lists travel in one shape regardless of verb.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use crate::error::Result;
use crate::handlers::{
    self, ApiResponse, BatchRequest, BinValueRequest, BinsRequest, KeyRequest, Modify,
    OperateRequest, TouchRequest, TruncateRequest,
};
use crate::AppState;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;
type Reply = Result<Json<ApiResponse>>;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/put", post(put_handler))
        .route("/v1/get", post(get_handler))
        .route("/v1/select", post(select_handler))
        .route("/v1/exists", post(exists_handler))
        .route("/v1/remove", post(remove_handler))
        .route("/v1/remove_bin", post(remove_bin_handler))
        .route("/v1/touch", post(touch_handler))
        .route("/v1/append", post(append_handler))
        .route("/v1/prepend", post(prepend_handler))
        .route("/v1/increment", post(increment_handler))
        .route("/v1/operate", post(operate_handler))
        .route("/v1/get_many", post(get_many_handler))
        .route("/v1/exists_many", post(exists_many_handler))
        .route("/v1/truncate", post(truncate_handler))
        .route("/v1/digest", post(digest_handler))
}

fn reply(value: serde_json::Value) -> Reply {
    Ok(Json(ApiResponse::ok(value)))
}

/// POST /v1/put - Write bins.
async fn put_handler(State(state): State<AppState>, body: Body<BinsRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_put(&state, request, handlers::now())?)
}

/// POST /v1/get - Read a whole record.
async fn get_handler(State(state): State<AppState>, body: Body<KeyRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_get(&state, request, handlers::now())?)
}

async fn select_handler(State(state): State<AppState>, body: Body<BinsRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_select(&state, request, handlers::now())?)
}

/// POST /v1/exists - Read metadata only.
async fn exists_handler(State(state): State<AppState>, body: Body<KeyRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_exists(&state, request, handlers::now())?)
}

async fn remove_handler(State(state): State<AppState>, body: Body<KeyRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_remove(&state, request, handlers::now())?)
}

async fn remove_bin_handler(State(state): State<AppState>, body: Body<BinsRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_remove_bin(&state, request, handlers::now())?)
}

async fn touch_handler(State(state): State<AppState>, body: Body<TouchRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_touch(&state, request, handlers::now())?)
}

async fn append_handler(State(state): State<AppState>, body: Body<BinValueRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_modify(&state, Modify::Append, request, handlers::now())?)
}

async fn prepend_handler(State(state): State<AppState>, body: Body<BinValueRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_modify(&state, Modify::Prepend, request, handlers::now())?)
}

async fn increment_handler(State(state): State<AppState>, body: Body<BinValueRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_modify(&state, Modify::Increment, request, handlers::now())?)
}

/// POST /v1/operate - Run operations atomically on one record.
async fn operate_handler(State(state): State<AppState>, body: Body<OperateRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_operate(&state, request, handlers::now())?)
}

/// POST /v1/get_many - Batch read; each entry carries its own status.
async fn get_many_handler(State(state): State<AppState>, body: Body<BatchRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_get_many(&state, request, handlers::now())?)
}

async fn exists_many_handler(State(state): State<AppState>, body: Body<BatchRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_exists_many(&state, request, handlers::now())?)
}

/// POST /v1/truncate - Remove records from a namespace.
async fn truncate_handler(State(state): State<AppState>, body: Body<TruncateRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_truncate(&state, request, handlers::now())?)
}

async fn digest_handler(State(state): State<AppState>, body: Body<KeyRequest>) -> Reply {
    let Json(request) = body?;
    reply(handlers::handle_digest(&state, request)?)
}
