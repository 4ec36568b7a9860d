use serde::Deserialize;

/// Query parameters accepted by the unpersonalized feeds.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

/// Query parameters accepted by the personalized feed.
#[derive(Clone, Debug, Deserialize)]
pub struct RecommendedQuery {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}
