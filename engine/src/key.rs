//! Record keys and digests.
//!
//! A record is addressed by `(namespace, set, user key)`. The user key is
//! hashed into a 20-byte [`Digest`]; once computed, the digest is the
//! record's identity and is never derived again.
//!
//! The digest is RIPEMD-160 over `set ‖ type ‖ key bytes`, where the type
//! byte is 1 for integers (8 bytes, big-endian), 3 for strings (UTF-8) and
//! 4 for raw bytes. The namespace is not hashed.

use crate::error::{Error, Result};
use crate::value::Value;
use ripemd::{Digest as _, Ripemd160};
use std::fmt;

pub const MAX_NAMESPACE_LEN: usize = 31;
pub const MAX_SET_LEN: usize = 63;

/// User-supplied primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Integer(i64),
    String(String),
    Bytes(Vec<u8>),
}

impl UserKey {
    fn type_byte(&self) -> u8 {
        match self {
            UserKey::Integer(_) => 1,
            UserKey::String(_) => 3,
            UserKey::Bytes(_) => 4,
        }
    }

    /// Convert a bin value into a key; only integers, strings and bytes qualify.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(UserKey::Integer(*n)),
            Value::String(s) => Ok(UserKey::String(s.clone())),
            Value::Bytes(b) => Ok(UserKey::Bytes(b.clone())),
            other => Err(Error::param(format!(
                "user key must be integer, string or bytes, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            UserKey::Integer(n) => Value::Integer(*n),
            UserKey::String(s) => Value::String(s.clone()),
            UserKey::Bytes(b) => Value::Bytes(b.clone()),
        }
    }
}

impl From<i64> for UserKey {
    fn from(n: i64) -> Self {
        UserKey::Integer(n)
    }
}

impl From<&str> for UserKey {
    fn from(s: &str) -> Self {
        UserKey::String(s.to_string())
    }
}

impl From<String> for UserKey {
    fn from(s: String) -> Self {
        UserKey::String(s)
    }
}

impl From<Vec<u8>> for UserKey {
    fn from(b: Vec<u8>) -> Self {
        UserKey::Bytes(b)
    }
}

/// 20-byte record identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 20]);

impl Digest {
    pub fn compute(set: &str, key: &UserKey) -> Self {
        let mut hasher = Ripemd160::new();
        hasher.update(set.as_bytes());
        hasher.update([key.type_byte()]);
        match key {
            UserKey::Integer(n) => hasher.update(n.to_be_bytes()),
            UserKey::String(s) => hasher.update(s.as_bytes()),
            UserKey::Bytes(b) => hasher.update(b),
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 || !hex.is_ascii() {
            return Err(Error::param("digest must be 40 hex characters"));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::param(format!("invalid digest hex: {hex}")))?;
        }
        Ok(Digest(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Fully resolved record key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub namespace: String,
    pub set: String,
    pub user_key: Option<UserKey>,
    pub digest: Digest,
}

impl Key {
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, user_key: UserKey) -> Result<Self> {
        let (namespace, set) = validate_location(namespace.into(), set.into())?;
        let digest = Digest::compute(&set, &user_key);
        Ok(Self {
            namespace,
            set,
            user_key: Some(user_key),
            digest,
        })
    }

    /// Key addressed by a previously computed digest.
    pub fn from_digest(namespace: impl Into<String>, set: impl Into<String>, digest: Digest) -> Result<Self> {
        let (namespace, set) = validate_location(namespace.into(), set.into())?;
        Ok(Self {
            namespace,
            set,
            user_key: None,
            digest,
        })
    }

    /// Digest for `(ns, set, user_key)` without building a key.
    pub fn digest_of(namespace: &str, set: &str, user_key: &UserKey) -> Result<Digest> {
        validate_location(namespace.to_string(), set.to_string())?;
        Ok(Digest::compute(set, user_key))
    }

    /// Same key with the user key stripped, as stored under the digest key policy.
    pub fn digest_only(&self) -> Key {
        Key {
            user_key: None,
            ..self.clone()
        }
    }
}

fn validate_location(namespace: String, set: String) -> Result<(String, String)> {
    if namespace.is_empty() {
        return Err(Error::param("namespace must not be empty"));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(Error::param(format!(
            "namespace exceeds {MAX_NAMESPACE_LEN} bytes"
        )));
    }
    if set.len() > MAX_SET_LEN {
        return Err(Error::param(format!("set exceeds {MAX_SET_LEN} bytes")));
    }
    Ok((namespace, set))
}
