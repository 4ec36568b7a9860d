use thiserror::Error;
use warp::reject;

/// Enumerates high-level errors returned by this service.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Represents an error returned by the data layer. Propagated to the
    /// caller unchanged; no retry is attempted.
    #[error("database error")]
    Sqlx { source: sqlx::Error },

    /// Represents a request with a non-positive limit.
    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    /// Represents a request with an unparsable user ID.
    #[error("invalid user ID: {0}")]
    InvalidId(String),

    /// Represents a data-layer call that missed its deadline.
    #[error("the query did not complete in time")]
    TimedOut,
}

impl reject::Reject for FeedError {}
