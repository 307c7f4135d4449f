//! # rpcgate
//!
//! Transport-agnostic dispatch of `Service.Method` calls onto registered Rust
//! receivers. This crate holds the registry, the dispatcher, the response
//! envelope with its object pools and the JSON/XML codecs. It never opens a
//! socket; see `rpcgate-http` for the HTTP adapter.
//!
//! ## Features
//! - Handler-style methods that write their own response
//! - RPC-style methods with decoded arguments and an encoded reply
//! - Structured errors carrying HTTP status, application code and data
//! - Pooled envelopes and error records reused across requests
//!
//! ```rust
//! use rpcgate::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct AddArgs { a: i64, b: i64 }
//!
//! #[derive(Default, Serialize)]
//! struct AddReply { sum: i64 }
//!
//! struct Calculator;
//!
//! impl Calculator {
//!     fn add(&self, _ctx: &RequestContext, args: &AddArgs, reply: &mut AddReply) -> RpcResult {
//!         reply.sum = args.a + args.b;
//!         Ok(())
//!     }
//! }
//!
//! impl Service for Calculator {
//!     fn register_methods(methods: &mut MethodTable<Self>) {
//!         methods.rpc("Add", Calculator::add);
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.register_service(Calculator, "").unwrap();
//! assert!(dispatcher.registry().contains_service("Calculator"));
//! ```

pub mod codec;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod method;
pub mod pool;
pub mod prelude;
pub mod registry;

pub use codec::{ArgsPayload, Codec, Codecs, EncodedResponse, JsonCodec, XmlCodec};
pub use context::{RequestContext, TransportRequest, TransportResponse, content_type};
pub use dispatch::{Dispatcher, DispatcherBuilder, ErrorHandler, default_error_handler};
pub use envelope::{ErrorObject, ResponseEnvelope};
pub use error::{EncodeError, MethodError, RegistryError, ResolveError, RpcError};
pub use method::{Invokable, MethodShape, MethodTable, Service, TypeDescriptor};
pub use pool::{ObjectPools, Pool, Poolable, Pooled};
pub use registry::{MethodDescriptor, ServiceRegistry};

pub use http::{Method, StatusCode};

/// Return type of RPC-style methods
pub type RpcResult<T = ()> = std::result::Result<T, RpcError>;

/// Return type of handler-style methods
pub type HandlerResult<T = ()> = std::result::Result<T, MethodError>;
