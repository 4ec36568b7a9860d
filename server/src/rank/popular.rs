use std::time::Duration;

use super::{bounded, DynDb};
use crate::errors::FeedError;
use crate::voice::VoiceRow;

/// Returns up to `limit` posts by descending aggregate popularity.
///
/// The popularity score combines likes, comments, and recency inside the
/// data layer; this function treats the ordering as opaque. There is no
/// personalization: the result is identical for every caller given the same
/// limit and data state.
pub async fn popular(db: &DynDb, limit: i64, deadline: Duration) -> Result<Vec<VoiceRow>, FeedError> {
    bounded(deadline, db.popular(limit)).await
}
