pub mod collectors;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod shutdown;
pub mod store;
pub mod throttle;
