//! Tests for the JSON request protocol shared by the HTTP server and the C ABI.
//!
//! These run the request shapes clients send through the engine's codec,
//! without starting a server.

use aerokv_engine::{JsonCodec, OpResult, Status, Store, StoreConfig};
use serde_json::json;

const NOW: u64 = 1_706_745_600_000;

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_key_by_digest_addresses_same_record() {
        let codec = JsonCodec::default();
        let by_key = codec
            .parse_key(&json!({"ns": "test", "set": "todos", "key": "todo-1"}))
            .unwrap();
        let by_digest = codec
            .parse_key(&json!({"ns": "test", "set": "todos", "digest": by_key.digest.to_hex()}))
            .unwrap();

        assert_eq!(by_key.digest, by_digest.digest);
        assert!(by_digest.user_key.is_none());
    }

    #[test]
    fn test_operate_request_round_trip() {
        let codec = JsonCodec::default();
        let mut store = Store::new(StoreConfig::new("test"));
        let key = codec
            .parse_key(&json!({"ns": "test", "set": "todos", "key": 42}))
            .unwrap();

        let ops = codec
            .parse_operations(&json!([
                {"op": "write", "bin": "title", "val": "Test todo"},
                {"op": "map_put", "bin": "tags", "key": "urgent", "val": true,
                 "map_policy": {"order": 1}},
                {"op": "map_size", "bin": "tags"},
            ]))
            .unwrap();
        let outcome = store
            .operate(
                &key,
                &ops,
                &codec.parse_policy(Some(&json!({"key": "send"}))).unwrap(),
                NOW,
            )
            .unwrap();
        assert_eq!(outcome.results["tags"], OpResult::Count(1));

        let record = store.get(&key, NOW).unwrap();
        let rendered = codec.record_to_json(&record, NOW);
        assert_eq!(rendered["bins"]["title"], "Test todo");
        assert_eq!(rendered["bins"]["tags"], json!({"urgent": true}));
        assert_eq!(rendered["key"]["key"], 42);
    }

    #[test]
    fn test_policy_shapes() {
        let codec = JsonCodec::default();
        let mut store = Store::new(StoreConfig::new("test"));
        let key = codec
            .parse_key(&json!({"ns": "test", "set": "todos", "key": "todo-2"}))
            .unwrap();
        let bins = codec.parse_bins(&json!({"done": false})).unwrap();

        let create = codec.parse_policy(Some(&json!({"exists": "create"}))).unwrap();
        store.put(&key, &bins, &create, NOW).unwrap();
        let err = store.put(&key, &bins, &create, NOW).unwrap_err();
        assert_eq!(err.status(), Status::ErrRecordExists);

        let stale = codec
            .parse_policy(Some(&json!({"generation": {"eq": 7}})))
            .unwrap();
        let err = store.put(&key, &bins, &stale, NOW).unwrap_err();
        assert_eq!(err.status().code(), 3);
    }

    #[test]
    fn test_unknown_descriptor_field_rejected() {
        let codec = JsonCodec::default();
        let err = codec
            .parse_operations(&json!([{"op": "read", "bin": "a", "colour": 1}]))
            .unwrap_err();
        assert_eq!(err.status(), Status::ErrParam);
    }

    #[test]
    fn test_status_codes_are_stable() {
        let codes = [
            (Status::Ok, 0),
            (Status::ErrClient, -1),
            (Status::ErrParam, -2),
            (Status::ErrRecordNotFound, 2),
            (Status::ErrRecordGeneration, 3),
            (Status::ErrRecordExists, 5),
            (Status::ErrBinIncompatibleType, 12),
            (Status::ErrBinNotFound, 17),
            (Status::ErrNamespaceNotFound, 20),
            (Status::ErrFailElementNotFound, 23),
            (Status::ErrFailElementExists, 24),
            (Status::ErrOpNotApplicable, 26),
            (Status::ErrGeoInvalidGeoJson, 160),
        ];
        for (status, code) in codes {
            assert_eq!(status.code(), code, "{status}");
        }
    }
}
