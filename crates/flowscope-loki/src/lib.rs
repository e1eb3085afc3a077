//! Loki client for flowscope
//!
//! This crate provides the connection settings and the HTTP transport used to
//! run queries against a Loki log store.

mod client;
mod config;
mod error;

pub use client::{HttpClient, LokiClient, ORG_ID_HEADER, RawResponse, loki_error_message};
pub use config::LokiConfig;
pub use error::ClientError;
