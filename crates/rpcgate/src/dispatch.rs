//! Request dispatch
//!
//! [`Dispatcher::dispatch`] is the single entry point per call: resolve the
//! key, decode arguments, invoke, then encode the reply or the error. Every
//! exit path leaves a complete response in the [`RequestContext`].

use std::sync::Arc;

use http::StatusCode;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::codec::{Codec, Codecs, write_envelope, write_plain_error};
use crate::context::{RequestContext, content_type};
use crate::error::{MethodError, RegistryError, RpcError};
use crate::method::Service;
use crate::pool::{DEFAULT_MAX_IDLE, ObjectPools};
use crate::registry::ServiceRegistry;

/// Formats untyped failures from handler-style methods
pub type ErrorHandler = Arc<dyn Fn(&mut RequestContext, &MethodError) + Send + Sync>;

/// Plain 500 with the error text, used unless replaced
pub fn default_error_handler(ctx: &mut RequestContext, err: &MethodError) {
    ctx.write_str(
        StatusCode::INTERNAL_SERVER_ERROR,
        content_type::HTML,
        &format!("rpcgate: error {err}"),
    );
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    registry: Option<Arc<ServiceRegistry>>,
    codecs: Codecs,
    max_idle: usize,
    error_handler: Option<ErrorHandler>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            codecs: Codecs::new(),
            max_idle: DEFAULT_MAX_IDLE,
            error_handler: None,
        }
    }

    /// Share an existing registry instead of creating an empty one
    pub fn registry(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Add or replace a codec
    pub fn codec<C: Codec + 'static>(mut self, codec: C) -> Self {
        self.codecs.register(codec);
        self
    }

    /// Idle objects kept per pool
    pub fn max_idle_objects(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut RequestContext, &MethodError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            registry: self.registry.unwrap_or_default(),
            codecs: self.codecs,
            pools: ObjectPools::with_max_idle(self.max_idle),
            error_handler: RwLock::new(
                self.error_handler
                    .unwrap_or_else(|| Arc::new(default_error_handler)),
            ),
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves `Service.Method` keys and runs the matching method
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    codecs: Codecs,
    pools: ObjectPools,
    error_handler: RwLock<ErrorHandler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        DispatcherBuilder::new().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    pub fn pools(&self) -> &ObjectPools {
        &self.pools
    }

    /// See [`ServiceRegistry::register_service`]
    pub fn register_service<S: Service>(&self, receiver: S, name: &str) -> Result<(), RegistryError> {
        self.registry.register_service(receiver, name)
    }

    /// Replace the handler used for untyped method failures
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&mut RequestContext, &MethodError) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Arc::new(handler);
    }

    pub fn reset_error_handler(&self) {
        *self.error_handler.write() = Arc::new(default_error_handler);
    }

    /// Dispatch using the codec registered under `codec_name`
    pub async fn dispatch_named(&self, ctx: &mut RequestContext, method_key: &str, codec_name: &str) {
        match self.codecs.get(codec_name) {
            Some(codec) => self.dispatch(ctx, method_key, codec.as_ref()).await,
            None => {
                warn!(codec = codec_name, "Unknown codec requested");
                write_plain_error(
                    ctx,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("rpcgate: unknown codec {codec_name:?}"),
                );
            }
        }
    }

    /// Handle one call. The response is left in `ctx`.
    pub async fn dispatch(&self, ctx: &mut RequestContext, method_key: &str, codec: &dyn Codec) {
        let mut envelope = self.pools.envelopes().acquire();

        match self.call(ctx, method_key, codec).await {
            Ok(Some(reply)) => {
                envelope.set_response(reply);
                write_envelope(ctx, codec, &envelope, StatusCode::OK);
            }
            Ok(None) => {}
            Err(MethodError::Rpc(err)) => {
                let mut record = self.pools.errors().acquire();
                record.fill_from(&err);
                envelope.set_error(record);
                write_envelope(ctx, codec, &envelope, err.status());
            }
            Err(MethodError::Encode(err)) => {
                error!(method = method_key, error = %err, "Failed to encode reply");
                write_plain_error(
                    ctx,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("rpcgate: failed to encode response: {err}"),
                );
            }
            Err(err) => {
                debug!(method = method_key, error = %err, "Method failed, using error handler");
                let handler = Arc::clone(&self.error_handler.read());
                handler(ctx, &err);
            }
        }
    }

    async fn call(
        &self,
        ctx: &mut RequestContext,
        method_key: &str,
        codec: &dyn Codec,
    ) -> Result<Option<Value>, MethodError> {
        let descriptor = self.registry.resolve(method_key).map_err(|err| {
            debug!(method = method_key, error = %err, "Method resolution failed");
            RpcError::from(err)
        })?;

        let args = match descriptor.args_type() {
            Some(_) => Some(codec.decode(ctx.request()).map_err(|err| {
                debug!(method = method_key, error = %err, "Failed to read request arguments");
                err
            })?),
            None => None,
        };

        descriptor.invoke(ctx, args).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
