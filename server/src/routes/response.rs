use serde::Serialize;

use crate::voice::FeedItem;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Voices {
        voices: Vec<FeedItem>,
    },
}
