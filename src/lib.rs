pub mod calendar;
pub mod compliance;
pub mod config;
pub mod constants;
pub mod csv_export;
pub mod error;
pub mod finance;
pub mod gestation;
pub mod logging;
pub mod metrics;
pub mod notifications;
pub mod server;
pub mod slug;
pub mod storage;
pub mod validation;

// Use cases and the adapters they plug into
pub mod app;
pub mod infra;

// Record shapes shared across layers
pub mod domain;
