pub mod handlers;
pub mod import;
pub mod queries;
pub mod stats;
pub mod tags;
