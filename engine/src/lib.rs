//! # AeroKV Engine
//!
//! The record operation engine of a key-value client: typed bin values,
//! digest-addressed records, and an `operate` call that applies a list of
//! scalar, list and map operations to one record atomically.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine never reads a clock, a file or a socket
//! - **Atomic**: A failed `operate` leaves the input record untouched
//! - **Validated up front**: Malformed operations fail before any bin changes
//! - **Portable**: Pure Rust, exposed to other runtimes through a JSON C ABI
//!
//! ## Core Concepts
//!
//! ### Values and records
//!
//! A [`Record`] holds named bins of [`Value`]s plus a generation counter and
//! a void time. Values have one total order across types, which is what
//! rank and value-range selectors sort by.
//!
//! ### Keys
//!
//! A [`Key`] is `(namespace, set, user key)`; the user key is hashed with
//! RIPEMD-160 into a 20-byte [`Digest`] that identifies the record.
//!
//! ### Operations
//!
//! An [`Operation`] is one step of an `operate` call. Collection steps carry
//! a [`ListOp`] or [`MapOp`]; the selecting variants take a [`Selector`] and a
//! [`ReturnType`]. Untyped callers send [`OpDescriptor`]s, which convert into
//! operations with full validation.
//!
//! ### Policies
//!
//! [`WritePolicy`] decides whether a write may create, update or replace the
//! record and checks its generation. [`ListPolicy`] and [`MapPolicy`] control
//! uniqueness, bounds and create/update-only behaviour for collection writes.
//!
//! ## Quick Start
//!
//! ```rust
//! use aerokv_engine::{
//!     Key, ListOp, Operation, OpResult, ReturnType, Selector, Store, StoreConfig,
//!     UserKey, Value, WritePolicy,
//! };
//!
//! let now = 1_706_745_600_000;
//! let mut store = Store::new(StoreConfig::new("test"));
//! let key = Key::new("test", "users", UserKey::from("user_1")).unwrap();
//!
//! let ops = [
//!     Operation::write("name", "Alice"),
//!     Operation::list(
//!         "scores",
//!         ListOp::Merge {
//!             values: vec![Value::from(7), Value::from(3), Value::from(9)],
//!             policy: Default::default(),
//!         },
//!     ),
//!     Operation::list(
//!         "scores",
//!         ListOp::GetBy {
//!             selector: Selector::Rank(-1),
//!             return_type: ReturnType::VALUE,
//!         },
//!     ),
//! ];
//! let outcome = store.operate(&key, &ops, &WritePolicy::default(), now).unwrap();
//! assert_eq!(outcome.results["scores"], OpResult::Scalar(Value::from(9)));
//!
//! let record = store.get(&key, now).unwrap();
//! assert_eq!(record.generation(), 1);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for use from other
//! languages. All data is exchanged as JSON strings through [`JsonCodec`].

pub mod cdt;
pub mod descriptor;
pub mod error;
pub mod ffi;
pub mod json;
pub mod key;
pub mod operate;
pub mod operation;
pub mod policy;
pub mod record;
pub mod scalar;
pub mod store;
pub mod value;

// Re-export main types at crate root
pub use cdt::{ListOp, MapOp, ReturnKind, ReturnType, Selector};
pub use descriptor::{OpDescriptor, OpKind};
pub use error::{Error, Result, Status};
pub use json::{FnSerializer, JsonCodec, JsonSerializer, NoSerializer, Serializer};
pub use key::{Digest, Key, UserKey};
pub use operate::{BinResults, Engine, EngineConfig, MissingBinPolicy, Outcome};
pub use operation::{OpResult, Operation};
pub use policy::{
    GenerationPolicy, KeyPolicy, ListPolicy, MapOrder, MapPolicy, MapWriteMode,
    RecordExistsAction, WritePolicy,
};
pub use record::{Expiration, Metadata, Record};
pub use scalar::Bins;
pub use store::{BatchRead, Store, StoreConfig};
pub use value::{CdtMap, Value};

/// Type aliases for clarity
pub type BinName = String;
pub type Generation = u64;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
