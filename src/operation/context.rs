// src/operation/context.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ambient parameters shared by every operation in one scheduling request.
///
/// Only `classification` and `project_id` take part in cache validity; the
/// payload is passed through to operation work untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Content classification (e.g. "blog_post", "product_page").
    #[serde(default)]
    pub classification: Option<String>,

    #[serde(default)]
    pub project_id: Option<String>,

    /// Arbitrary request payload.
    #[serde(default)]
    pub payload: Value,
}

impl ExecutionContext {
    pub fn new(classification: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            classification: Some(classification.into()),
            project_id: Some(project_id.into()),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Conservative compatibility check used for cache validity.
    ///
    /// Two contexts are compatible when classification and project id match.
    /// The payload is not compared.
    pub fn is_compatible_with(&self, other: &ExecutionContext) -> bool {
        self.classification == other.classification && self.project_id == other.project_id
    }
}
