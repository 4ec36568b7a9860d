use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use warp::Filter;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use tokio::sync::mpsc;
use voicefeed::config::get_variable;
use voicefeed::db::PgDb;
use voicefeed::environment::{Config, Environment};
use voicefeed::routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("FEED_PORT")
        .parse()
        .expect("parse FEED_PORT as u16");
    let admin_port: u16 = get_variable("FEED_ADMIN_PORT")
        .parse()
        .expect("parse FEED_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("FEED_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from FEED_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let config = Config::new(
        get_variable("FEED_BASE_PATH"),
        get_variable("FEED_DEFAULT_LIMIT")
            .parse()
            .expect("parse FEED_DEFAULT_LIMIT as i64"),
        Duration::from_millis(
            get_variable("FEED_QUERY_TIMEOUT_MS")
                .parse()
                .expect("parse FEED_QUERY_TIMEOUT_MS as u64"),
        ),
    );
    let environment = Environment::new(logger.clone(), db, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            let termination_sender = termination_sender.clone();
            termination_sender.send(()).await.unwrap();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let preflight_route = routes::make_preflight_route(environment.clone());
        let popular_route = routes::make_popular_route(environment.clone());
        let trending_route = routes::make_trending_route(environment.clone());
        let recommended_route = routes::make_recommended_route(environment.clone());

        let routes = preflight_route
            .or(popular_route)
            .or(trending_route)
            .or(recommended_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
