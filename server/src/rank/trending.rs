use std::time::Duration;

use time::OffsetDateTime;

use super::{bounded, DynDb};
use crate::errors::FeedError;
use crate::voice::VoiceRow;

/// Returns up to `limit` posts with any like or comment in the trailing
/// 24-hour window, most recent first.
///
/// Membership is binary: one recent like is as good as a hundred. When the
/// window is empty the most recently created posts are returned instead.
pub async fn trending(
    db: &DynDb,
    limit: i64,
    now: OffsetDateTime,
    deadline: Duration,
) -> Result<Vec<VoiceRow>, FeedError> {
    bounded(deadline, select(db, limit, now)).await
}

async fn select(db: &DynDb, limit: i64, now: OffsetDateTime) -> Result<Vec<VoiceRow>, FeedError> {
    let cutoff = now - time::Duration::hours(24);
    let ids = db.engaged_ids_since(cutoff).await?;

    if ids.is_empty() {
        return db.recent(limit).await;
    }

    db.by_ids(&ids, limit).await
}
