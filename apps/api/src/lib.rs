pub mod classifier;
pub mod config;
pub mod db;
pub mod errors;
pub mod feedback;
pub mod logging;
pub mod models;
pub mod reanalysis;
pub mod routes;
pub mod sentiment;
pub mod state;
