//! Query parameter helpers shared by list endpoints.
//!
//! The types follow Rocket's `FromForm` conventions and derive `JsonSchema`
//! so generated documentation reflects the available parameters and their
//! defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const fn default_skip() -> i64 {
    0
}

const fn default_limit() -> i64 {
    100
}

const MAX_LIMIT: i64 = 100;

/// Offset pagination applied to list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
pub struct PaginationParams {
    /// Number of records to skip (defaults to 0).
    #[field(default = 0)]
    #[serde(default = "default_skip")]
    pub skip: i64,
    /// Maximum number of records to return (clamped between 1 and 100).
    #[field(default = 100)]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            skip: default_skip(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    /// Normalized offset, never negative.
    pub fn skip(&self) -> i64 {
        self.skip.max(0)
    }

    /// Normalized limit capped at [`MAX_LIMIT`].
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}
