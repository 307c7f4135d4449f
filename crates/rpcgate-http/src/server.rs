//! HTTP server for rpcgate services
//!
//! One hyper HTTP/1 connection task per accepted socket, all sharing a single
//! [`RpcHttpHandler`] and therefore a single dispatcher.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use rpcgate::{Dispatcher, Service};

use crate::{HttpError, Result, RpcHttpHandler};

/// Configuration for the HTTP RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path under which `Service.Method` keys are served
    pub api_prefix: String,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Codec used unless the client asks for XML
    pub default_codec: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            api_prefix: "/api".to_string(),
            max_body_size: 1024 * 1024, // 1MB
            default_codec: "json".to_string(),
        }
    }
}

/// Builder for [`HttpRpcServer`]
pub struct HttpRpcServerBuilder {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpRpcServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: Arc::new(Dispatcher::new()),
        }
    }

    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn default_codec(mut self, name: impl Into<String>) -> Self {
        self.config.default_codec = name.into();
        self
    }

    /// Use a preconfigured dispatcher. Services registered earlier are kept.
    pub fn dispatcher(mut self, dispatcher: Arc<Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Register a service on the server's dispatcher
    pub fn service<S: Service>(self, receiver: S, name: &str) -> Result<Self> {
        self.dispatcher.register_service(receiver, name)?;
        Ok(self)
    }

    pub fn build(self) -> Result<HttpRpcServer> {
        if self.dispatcher.codecs().get(&self.config.default_codec).is_none() {
            return Err(HttpError::InvalidConfig(format!(
                "unknown default codec {:?}",
                self.config.default_codec
            )));
        }

        Ok(HttpRpcServer {
            handler: RpcHttpHandler::new(self.config, self.dispatcher),
        })
    }
}

impl Default for HttpRpcServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP front end for a [`Dispatcher`]
pub struct HttpRpcServer {
    handler: RpcHttpHandler,
}

impl HttpRpcServer {
    pub fn builder() -> HttpRpcServerBuilder {
        HttpRpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        self.handler.config()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        self.handler.dispatcher()
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config().bind_address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("HTTP RPC server listening on {}", local_addr);
        info!("RPC endpoint available at: {}/<Service.Method>", self.config().api_prefix);
        info!(
            "Registered services: {:?}",
            self.dispatcher().registry().list_services().keys().collect::<Vec<_>>()
        );

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
