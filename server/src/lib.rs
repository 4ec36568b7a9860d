pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod format;
pub mod rank;
pub mod routes;
pub mod voice;
