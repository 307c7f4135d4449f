//! # rpcgate HTTP server
//!
//! HTTP transport for [`rpcgate`] dispatchers. Requests to
//! `<prefix>/<Service.Method>` are buffered, handed to the dispatcher and the
//! filled response is written back.
//!
//! ## Features
//! - GET with query-string parameters, POST with JSON, XML or form bodies
//! - Codec chosen from the `Accept` header
//! - Request body size limit

pub mod handler;
pub mod server;

pub use handler::RpcHttpHandler;
pub use server::{HttpRpcServer, HttpRpcServerBuilder, ServerConfig};

// Re-export foundational types
pub use rpcgate::{Dispatcher, Service};

/// Result type for HTTP RPC operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registration error: {0}")]
    Registry(#[from] rpcgate::RegistryError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
