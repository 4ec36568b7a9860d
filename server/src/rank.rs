//! The three feed-ranking strategies.
//!
//! Each ranker takes the data collaborator explicitly and runs its queries
//! under a deadline; a call that misses the deadline resolves to
//! [`FeedError::TimedOut`] instead of hanging. Rankers only ever read.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::db::Db;
use crate::errors::FeedError;

mod popular;
mod recommended;
mod trending;

pub use popular::popular;
pub use recommended::recommended;
pub use trending::trending;

pub type DynDb = Arc<dyn Db + Send + Sync>;

pub(crate) async fn bounded<T>(
    deadline: Duration,
    work: impl Future<Output = Result<T, FeedError>>,
) -> Result<T, FeedError> {
    tokio::time::timeout(deadline, work)
        .await
        .map_err(|_| FeedError::TimedOut)?
}
