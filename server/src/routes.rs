use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_header, with_status, Json, WithHeader, WithStatus};

use crate::errors::FeedError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

const ALLOW_ORIGIN_HEADER: &str = "access-control-allow-origin";

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithHeader<WithStatus<Json>>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Feed error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_header(
            with_status(json(&flattened), status_code_for(e)),
            ALLOW_ORIGIN_HEADER,
            "*",
        ));
    }

    Err(rej)
}

fn status_code_for(e: &FeedError) -> StatusCode {
    use FeedError::*;

    match e {
        InvalidLimit(..) | InvalidId(..) => StatusCode::BAD_REQUEST,
        TimedOut => StatusCode::GATEWAY_TIMEOUT,
        Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::reply::with_header;
    use warp::Filter;
    use warp::Reply;
    use warp::{get as g, path as p, query};

    use super::{handlers, query as q, ALLOW_ORIGIN_HEADER};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let feed = environment.config.feed_path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(feed));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_popular_route => popular, rt; p("popular"), end(), g(), query::<q::FeedQuery>());
    route!(make_trending_route => trending, rt; p("trending"), end(), g(), query::<q::FeedQuery>());
    route!(make_recommended_route => recommended, rt; p("recommended"), end(), g(), query::<q::RecommendedQuery>());

    /// Answers CORS preflights for every feed path with a bare "ok" body.
    pub fn make_preflight_route(environment: Environment) -> Route {
        let feed = environment.config.feed_path.clone();

        warp::any()
            .and(p(feed))
            .and(warp::path::tail())
            .and(warp::options())
            .map(|_tail: warp::path::Tail| {
                let reply = with_header("ok", ALLOW_ORIGIN_HEADER, "*");
                let reply = with_header(
                    reply,
                    "access-control-allow-headers",
                    "authorization, content-type",
                );
                let reply = with_header(reply, "access-control-allow-methods", "GET, OPTIONS");

                Box::new(reply) as Box<dyn Reply>
            })
            .boxed()
    }
}
