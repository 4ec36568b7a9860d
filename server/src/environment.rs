use std::sync::Arc;
use std::time::Duration;

use log::Logger;

use crate::db::Db;

/// Everything a request handler needs, passed explicitly into every route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub config: Config,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, config: Config) -> Self {
        Self { logger, db, config }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// The path prefix every feed route lives under.
    pub(crate) feed_path: String,

    /// The limit applied when a request does not specify one.
    pub(crate) default_limit: i64,

    /// The deadline for a single ranking invocation.
    pub(crate) query_deadline: Duration,
}

impl Config {
    pub fn new(feed_path: impl Into<String>, default_limit: i64, query_deadline: Duration) -> Self {
        Self {
            feed_path: feed_path.into(),
            default_limit,
            query_deadline,
        }
    }
}
