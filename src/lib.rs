pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod freshness;
pub mod i18n;
pub mod reconcile;
pub mod report;
pub mod server;
