pub mod artifact;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod formats;
pub mod gateway;
pub mod handler;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod telemetry;
pub mod utils;
pub mod validate;

#[cfg(test)]
mod testing;
