use serde::Serialize;
use warp::reject;

use crate::errors::FeedError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: FeedError,
}

impl Rejection {
    pub fn new(context: Context, error: FeedError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            error: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

/// The JSON error body: the failing operation's parameters plus an `error`
/// message.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) error: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Popular {
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<i64>,
    },
    Trending {
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<i64>,
    },
    Recommended {
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<i64>,
    },
}

impl Context {
    pub fn popular(limit: Option<i64>) -> Context {
        Context::Popular { limit }
    }

    pub fn trending(limit: Option<i64>) -> Context {
        Context::Trending { limit }
    }

    pub fn recommended(user_id: Option<String>, limit: Option<i64>) -> Context {
        Context::Recommended { user_id, limit }
    }
}
