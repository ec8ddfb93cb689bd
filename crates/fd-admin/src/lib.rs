//! fd-admin: Admin API client for the workflow orchestrator.
//!
//! Exposes the remote list/get contract behind the [`client::AdminClient`]
//! trait so consumers (and tests) can swap the HTTP implementation for an
//! in-memory one.

pub mod client;
pub mod config;
pub mod mock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("transport error: {0}")]
    Http(String),
    #[error("admin api error: status={status}, message={message}")]
    Api { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}
