pub mod api;
pub mod app;
pub mod auth;
pub mod blob_factory;
pub mod config;
pub mod error;
pub mod store_factory;
pub mod telemetry;
