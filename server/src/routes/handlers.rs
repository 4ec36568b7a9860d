use std::time::{Duration, Instant};

use log::debug;
use time::OffsetDateTime;
use uuid::Uuid;
use warp::{
    reject,
    reply::{json, with_header, Reply},
};

use crate::environment::Environment;
use crate::errors::FeedError;
use crate::format::format_feed;
use crate::rank;
use crate::routes::{
    query::{FeedQuery, RecommendedQuery},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
const ALLOW_ORIGIN_HEADER: &str = "access-control-allow-origin";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            with_header(
                result,
                SERVER_TIMING_HEADER,
                format_server_timing(start.elapsed()),
            ),
            ALLOW_ORIGIN_HEADER,
            "*",
        )) as Box<dyn Reply>)
    };
}

pub async fn popular(environment: Environment, query: FeedQuery) -> RouteResult {
    timed! {
        let error_handler = |e: FeedError| Rejection::new(Context::popular(query.limit), e);

        let limit = resolve_limit(&environment, query.limit).map_err(error_handler)?;
        debug!(environment.logger, "Ranking popular voices..."; "limit" => limit);

        let rows = rank::popular(&environment.db, limit, environment.config.query_deadline)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Voices {
            voices: format_feed(rows, OffsetDateTime::now_utc()),
        })
    }
}

pub async fn trending(environment: Environment, query: FeedQuery) -> RouteResult {
    timed! {
        let error_handler = |e: FeedError| Rejection::new(Context::trending(query.limit), e);

        let limit = resolve_limit(&environment, query.limit).map_err(error_handler)?;
        debug!(environment.logger, "Ranking trending voices..."; "limit" => limit);

        let now = OffsetDateTime::now_utc();
        let rows = rank::trending(&environment.db, limit, now, environment.config.query_deadline)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Voices {
            voices: format_feed(rows, now),
        })
    }
}

pub async fn recommended(environment: Environment, query: RecommendedQuery) -> RouteResult {
    timed! {
        let RecommendedQuery { user_id, limit } = query;

        let error_handler =
            |e: FeedError| Rejection::new(Context::recommended(user_id.clone(), limit), e);

        let resolved_limit = resolve_limit(&environment, limit).map_err(&error_handler)?;
        let user = parse_user(user_id.as_deref()).map_err(&error_handler)?;
        debug!(environment.logger, "Ranking recommended voices...";
               "user_id" => user.map(|u| u.to_string()), "limit" => resolved_limit);

        let rows = rank::recommended(
            &environment.db,
            user,
            resolved_limit,
            environment.config.query_deadline,
        )
        .await
        .map_err(&error_handler)?;

        json(&SuccessResponse::Voices {
            voices: format_feed(rows, OffsetDateTime::now_utc()),
        })
    }
}

/// Applies the configured default, then rejects anything non-positive
/// before a query is issued.
fn resolve_limit(environment: &Environment, requested: Option<i64>) -> Result<i64, FeedError> {
    let limit = requested.unwrap_or(environment.config.default_limit);

    if limit < 1 {
        return Err(FeedError::InvalidLimit(limit));
    }

    Ok(limit)
}

/// Treats an absent or empty `user_id` as anonymous; anything else must be
/// a UUID.
fn parse_user(user_id: Option<&str>) -> Result<Option<Uuid>, FeedError> {
    match user_id {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| FeedError::InvalidId(raw.to_owned())),
    }
}

fn format_server_timing(elapsed: Duration) -> String {
    format!("handler;dur={}", elapsed.as_secs_f64() * 1000.0)
}
