// src/cache/key.rs

use std::fmt;

use blake3::Hasher;
use serde::Serialize;
use serde_json::Value;

use crate::operation::{ExecutionContext, Operation};

/// Number of hex characters kept from each hash component.
const HASH_PREFIX_LEN: usize = 16;

/// Derived identifier used to look up prior results.
///
/// Shape: `<operation id>:<operation hash>:<context hash>`. The operation id
/// stays readable so that `clear_cache(pattern)` can target operations by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for an operation under the given context.
    pub fn for_operation(operation: &Operation, context: &ExecutionContext) -> Self {
        Self::derive(&operation.id, &operation.parameters, context)
    }

    /// Identical `(id, parameters)` plus a compatible context always derive the
    /// same key.
    pub fn derive(id: &str, parameters: &Value, context: &ExecutionContext) -> Self {
        let op_hash = operation_hash(id, parameters);
        let ctx_hash = context_hash(context);
        CacheKey(format!(
            "{id}:{}:{}",
            &op_hash[..HASH_PREFIX_LEN],
            &ctx_hash[..HASH_PREFIX_LEN]
        ))
    }

    /// Wrap a caller-chosen key verbatim.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn operation_hash(id: &str, parameters: &Value) -> String {
    let mut hasher = Hasher::new();
    hasher.update(id.as_bytes());
    hasher.update(&[0]);
    // serde_json maps are ordered by key, so this rendering is stable.
    hasher.update(parameters.to_string().as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn context_hash(context: &ExecutionContext) -> String {
    let mut hasher = Hasher::new();
    update_optional(&mut hasher, context.classification.as_deref());
    update_optional(&mut hasher, context.project_id.as_deref());
    hasher.finalize().to_hex().to_string()
}

fn update_optional(hasher: &mut Hasher, field: Option<&str>) {
    match field {
        Some(s) => {
            hasher.update(&[1]);
            hasher.update(s.as_bytes());
            hasher.update(&[0]);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}
