//! Commonly used types
//!
//! ```rust
//! use rpcgate::prelude::*;
//! ```

pub use crate::codec::{Codec, JsonCodec, XmlCodec};
pub use crate::context::{RequestContext, TransportRequest, content_type};
pub use crate::dispatch::{Dispatcher, DispatcherBuilder};
pub use crate::error::{MethodError, RpcError};
pub use crate::method::{MethodTable, Service};
pub use crate::registry::ServiceRegistry;
pub use crate::{HandlerResult, RpcResult};

pub use http::StatusCode;
