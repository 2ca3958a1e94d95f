//! Client-facing validation errors.
//!
//! Only one input condition is a hard error: an over-long search keyword.
//! Everything else the normalizer sees degrades to a default instead.

use thiserror::Error;

/// Rejection raised by the query normalizer before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The trimmed keyword exceeds the allowed number of characters.
    #[error("query too long: {len} characters (max {max})")]
    KeywordTooLong { len: usize, max: usize },
}
