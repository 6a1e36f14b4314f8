// Library exports for Potluck
// This allows integration tests and the binary to share the same modules

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod scaffold;
pub mod seed;
pub mod state;
