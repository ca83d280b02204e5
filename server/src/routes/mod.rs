//! HTTP route definitions.

mod health;
mod records;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(records::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use aerokv_engine::{JsonCodec, MissingBinPolicy};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            namespaces: vec!["test".to_string()],
            default_ttl: 0,
            serializer: "json".to_string(),
            missing_bin: MissingBinPolicy::Empty,
            reap_interval_secs: 0,
        };
        AppState::new(config, JsonCodec::default())
    }

    async fn call(state: &AppState, path: &str, body: Value) -> (StatusCode, Value) {
        let app = create_routes().with_state(state.clone());
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn key(id: &str) -> Value {
        json!({"ns": "test", "set": "users", "key": id})
    }

    #[tokio::test]
    async fn health_lists_namespaces() {
        let app = create_routes().with_state(test_state());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["namespaces"], json!(["test"]));
    }

    #[tokio::test]
    async fn put_then_get() {
        let state = test_state();
        let (status, body) = call(
            &state,
            "/v1/put",
            json!({"key": key("alice"), "bins": {"name": "Alice", "age": 30}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 0);

        let (status, body) = call(&state, "/v1/get", json!({"key": key("alice")})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"]["bins"], json!({"name": "Alice", "age": 30}));
        assert_eq!(body["ok"]["generation"], 1);
        assert_eq!(body["ok"]["ttl"], -1);
    }

    #[tokio::test]
    async fn missing_record_is_404() {
        let state = test_state();
        let (status, body) = call(&state, "/v1/get", json!({"key": key("nobody")})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 2);
        assert_eq!(body["details"], "ERR_RECORD_NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_namespace() {
        let state = test_state();
        let (status, body) = call(
            &state,
            "/v1/get",
            json!({"key": {"ns": "other", "set": "users", "key": "alice"}}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 20);
    }

    #[tokio::test]
    async fn operate_returns_per_bin_results() {
        let state = test_state();
        let ops = json!([
            {"op": "list_merge", "bin": "scores", "val": [7, 3, 9]},
            {"op": "list_get_by_rank", "bin": "scores", "rank": -1, "return_type": 7},
            {"op": "incr", "bin": "visits", "val": 1},
        ]);
        let (status, body) = call(&state, "/v1/operate", json!({"key": key("bob"), "ops": ops})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"]["bins"]["scores"], 9);
        assert_eq!(body["ok"]["generation"], 1);
    }

    #[tokio::test]
    async fn operate_ordered() {
        let state = test_state();
        let ops = json!([
            {"op": "write", "bin": "a", "val": 1},
            {"op": "read", "bin": "a"},
        ]);
        let (_, body) = call(
            &state,
            "/v1/operate",
            json!({"key": key("carol"), "ops": ops, "ordered": true}),
        )
        .await;
        assert_eq!(body["ok"], json!([null, 1]));
    }

    #[tokio::test]
    async fn generation_conflict_is_409() {
        let state = test_state();
        call(&state, "/v1/put", json!({"key": key("dave"), "bins": {"a": 1}})).await;

        let (status, body) = call(
            &state,
            "/v1/put",
            json!({
                "key": key("dave"),
                "bins": {"a": 2},
                "policy": {"generation": {"eq": 5}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 3);
    }

    #[tokio::test]
    async fn increment_on_string_is_not_applicable() {
        let state = test_state();
        call(&state, "/v1/put", json!({"key": key("erin"), "bins": {"a": "x"}})).await;

        let (status, body) = call(
            &state,
            "/v1/increment",
            json!({"key": key("erin"), "bin": "a", "val": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 26);
    }

    #[tokio::test]
    async fn list_insert_far_past_end_is_rejected() {
        let state = test_state();
        call(&state, "/v1/put", json!({"key": key("ivan"), "bins": {"l": [1]}})).await;

        let ops = json!([{"op": "list_insert", "bin": "l", "index": i64::MAX, "val": 9}]);
        let (status, body) = call(&state, "/v1/operate", json!({"key": key("ivan"), "ops": ops})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], -2);

        let (_, body) = call(&state, "/v1/get", json!({"key": key("ivan")})).await;
        assert_eq!(body["ok"]["bins"]["l"], json!([1]));
    }

    #[tokio::test]
    async fn malformed_body_is_client_error() {
        let state = test_state();
        let (status, body) = call(&state, "/v1/put", json!({"bins": {"a": 1}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], -1);
    }

    #[tokio::test]
    async fn batch_entries_fail_independently() {
        let state = test_state();
        call(&state, "/v1/put", json!({"key": key("frank"), "bins": {"a": 1}})).await;

        let (status, body) = call(
            &state,
            "/v1/get_many",
            json!({"keys": [key("frank"), key("ghost")], "bins": ["a"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"][0]["status"], 0);
        assert_eq!(body["ok"][0]["ok"]["bins"], json!({"a": 1}));
        assert_eq!(body["ok"][1]["status"], 2);
    }

    #[tokio::test]
    async fn truncate_counts_removed() {
        let state = test_state();
        for id in ["h1", "h2", "h3"] {
            call(&state, "/v1/put", json!({"key": key(id), "bins": {"a": 1}})).await;
        }
        let (_, body) = call(&state, "/v1/truncate", json!({"ns": "test", "set": "users"})).await;
        assert_eq!(body["ok"], 3);

        let (_, body) = call(&state, "/v1/exists_many", json!({"keys": [key("h1")]})).await;
        assert_eq!(body["ok"][0]["status"], 2);
    }

    #[tokio::test]
    async fn digest_matches_engine() {
        let state = test_state();
        let (_, body) = call(&state, "/v1/digest", json!({"key": key("alice")})).await;
        let expected = aerokv_engine::Key::new("test", "users", "alice".into())
            .unwrap()
            .digest
            .to_hex();
        assert_eq!(body["ok"], expected);
    }

    #[test]
    fn reap_sweeps_every_namespace() {
        let state = test_state();
        let key = aerokv_engine::Key::new("test", "users", "short".into()).unwrap();
        let bins = [("a".to_string(), aerokv_engine::Value::from(1))]
            .into_iter()
            .collect();
        let policy = aerokv_engine::WritePolicy::default()
            .with_ttl(aerokv_engine::Expiration::At(1));
        state
            .with_store("test", |store| store.put(&key, &bins, &policy, 1_000))
            .unwrap();
        assert_eq!(state.reap_expired(5_000), 1);
    }
}
