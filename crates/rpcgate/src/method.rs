//! Callable methods and how services declare them
//!
//! Every callable is wrapped in an [`Invokable`]. The two built-in shapes are
//! fixed by the Rust signature of the function handed to [`MethodTable`]:
//!
//! - handler style: `fn(&S, &mut RequestContext) -> Result<(), MethodError>`,
//!   the method writes its own response;
//! - RPC style: `fn(&S, &RequestContext, &Args, &mut Reply) -> Result<(), RpcError>`,
//!   the dispatcher decodes `Args`, builds a default `Reply` and encodes it.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::ArgsPayload;
use crate::context::RequestContext;
use crate::error::{EncodeError, MethodError, RpcError};

/// Semantic type of an argument or reply value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified Rust type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment without generic parameters
    pub fn short_name(&self) -> &'static str {
        base_type_name(self.name)
    }

    pub fn is_exported(&self) -> bool {
        is_exported(self.short_name())
    }
}

/// `a::b::Thing<c::D>` -> `Thing`
pub(crate) fn base_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Exported names start with an uppercase letter
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Calling convention of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodShape {
    /// Receives only the request context and writes its own response
    Handler,
    /// Receives decoded arguments and fills a reply the dispatcher encodes
    Rpc {
        args: TypeDescriptor,
        reply: TypeDescriptor,
    },
}

impl MethodShape {
    pub fn args_type(&self) -> Option<TypeDescriptor> {
        match self {
            MethodShape::Handler => None,
            MethodShape::Rpc { args, .. } => Some(*args),
        }
    }

    pub fn reply_type(&self) -> Option<TypeDescriptor> {
        match self {
            MethodShape::Handler => None,
            MethodShape::Rpc { reply, .. } => Some(*reply),
        }
    }
}

/// Uniform calling contract behind every registered method
#[async_trait]
pub trait Invokable: Send + Sync {
    fn shape(&self) -> MethodShape;

    /// Whether the callable receives the request context
    fn has_context_arg(&self) -> bool {
        true
    }

    /// Run the method.
    ///
    /// `args` is present iff the shape declares an argument type. `Ok(Some)`
    /// carries the reply to encode; `Ok(None)` means the method wrote its own
    /// response into `ctx`.
    async fn invoke(
        &self,
        ctx: &mut RequestContext,
        args: Option<ArgsPayload>,
    ) -> Result<Option<Value>, MethodError>;
}

/// Handler-style method bound to its receiver
pub struct HandlerMethod<S, F> {
    receiver: Arc<S>,
    func: F,
}

impl<S, F> HandlerMethod<S, F> {
    pub fn new(receiver: Arc<S>, func: F) -> Self {
        Self { receiver, func }
    }
}

#[async_trait]
impl<S, F> Invokable for HandlerMethod<S, F>
where
    S: Send + Sync + 'static,
    F: Fn(&S, &mut RequestContext) -> Result<(), MethodError> + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::Handler
    }

    async fn invoke(
        &self,
        ctx: &mut RequestContext,
        _args: Option<ArgsPayload>,
    ) -> Result<Option<Value>, MethodError> {
        (self.func)(self.receiver.as_ref(), ctx)?;
        Ok(None)
    }
}

/// RPC-style method bound to its receiver
pub struct RpcMethod<S, A, R, F> {
    receiver: Arc<S>,
    func: F,
    _types: PhantomData<fn() -> (A, R)>,
}

impl<S, A, R, F> RpcMethod<S, A, R, F>
where
    F: Fn(&S, &RequestContext, &A, &mut R) -> Result<(), RpcError>,
{
    pub fn new(receiver: Arc<S>, func: F) -> Self {
        Self {
            receiver,
            func,
            _types: PhantomData,
        }
    }
}

#[async_trait]
impl<S, A, R, F> Invokable for RpcMethod<S, A, R, F>
where
    S: Send + Sync + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Default + Send + 'static,
    F: Fn(&S, &RequestContext, &A, &mut R) -> Result<(), RpcError> + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::Rpc {
            args: TypeDescriptor::of::<A>(),
            reply: TypeDescriptor::of::<R>(),
        }
    }

    async fn invoke(
        &self,
        ctx: &mut RequestContext,
        args: Option<ArgsPayload>,
    ) -> Result<Option<Value>, MethodError> {
        let payload = args.ok_or_else(|| {
            RpcError::bad_request("rpcgate: method request ill-formed: missing params")
        })?;
        let args: A = payload.deserialize()?;
        let mut reply = R::default();

        (self.func)(self.receiver.as_ref(), &*ctx, &args, &mut reply)?;

        let value = serde_json::to_value(&reply).map_err(EncodeError::from)?;
        Ok(Some(value))
    }
}

/// A named callable declared by a service, before eligibility checks
pub struct MethodEntry {
    pub(crate) name: String,
    pub(crate) invokable: Arc<dyn Invokable>,
}

impl MethodEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> MethodShape {
        self.invokable.shape()
    }
}

/// Collects the methods a service exposes
pub struct MethodTable<S> {
    receiver: Arc<S>,
    entries: Vec<MethodEntry>,
}

impl<S: Send + Sync + 'static> MethodTable<S> {
    pub fn new(receiver: Arc<S>) -> Self {
        Self {
            receiver,
            entries: Vec::new(),
        }
    }

    pub fn receiver(&self) -> &Arc<S> {
        &self.receiver
    }

    /// Declare a handler-style method
    pub fn handler<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(&S, &mut RequestContext) -> Result<(), MethodError> + Send + Sync + 'static,
    {
        let method = HandlerMethod::new(Arc::clone(&self.receiver), func);
        self.invokable(name, Arc::new(method))
    }

    /// Declare an RPC-style method
    pub fn rpc<A, R, F>(&mut self, name: &str, func: F) -> &mut Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Default + Send + 'static,
        F: Fn(&S, &RequestContext, &A, &mut R) -> Result<(), RpcError> + Send + Sync + 'static,
    {
        let method = RpcMethod::new(Arc::clone(&self.receiver), func);
        self.invokable(name, Arc::new(method))
    }

    /// Declare a custom callable
    pub fn invokable(&mut self, name: &str, invokable: Arc<dyn Invokable>) -> &mut Self {
        self.entries.push(MethodEntry {
            name: name.to_string(),
            invokable,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<MethodEntry> {
        self.entries
    }
}

/// A receiver type whose methods can be registered
///
/// ```ignore
/// impl Service for Calculator {
///     fn register_methods(methods: &mut MethodTable<Self>) {
///         methods.rpc("Add", Calculator::add).handler("Health", Calculator::health);
///     }
/// }
/// ```
pub trait Service: Send + Sync + Sized + 'static {
    fn register_methods(methods: &mut MethodTable<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TransportRequest, content_type};
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Default, Serialize)]
    struct AddReply {
        sum: i64,
    }

    struct Calculator {
        offset: i64,
    }

    impl Calculator {
        fn add(&self, _ctx: &RequestContext, args: &AddArgs, reply: &mut AddReply) -> Result<(), RpcError> {
            reply.sum = args.a + args.b + self.offset;
            Ok(())
        }

        fn health(&self, ctx: &mut RequestContext) -> Result<(), MethodError> {
            ctx.write_str(StatusCode::OK, content_type::PLAIN, "up");
            Ok(())
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(base_type_name("alloc::vec::Vec<u8>"), "Vec");
        assert_eq!(base_type_name("my_crate::api::EchoArgs"), "EchoArgs");
        assert_eq!(base_type_name("u32"), "u32");
        assert!(TypeDescriptor::of::<AddArgs>().is_exported());
        assert!(!TypeDescriptor::of::<u32>().is_exported());
        assert!(is_exported("Echo"));
        assert!(!is_exported("echo"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_method_table_shapes() {
        let mut table = MethodTable::new(Arc::new(Calculator { offset: 0 }));
        table.rpc("Add", Calculator::add).handler("Health", Calculator::health);
        assert_eq!(table.len(), 2);

        let entries = table.into_entries();
        assert_eq!(entries[0].name(), "Add");
        assert_eq!(
            entries[0].shape().args_type(),
            Some(TypeDescriptor::of::<AddArgs>())
        );
        assert_eq!(entries[1].shape(), MethodShape::Handler);
        assert!(entries[1].shape().reply_type().is_none());
    }

    #[tokio::test]
    async fn test_rpc_invoke_decodes_and_encodes() {
        let method = RpcMethod::new(Arc::new(Calculator { offset: 1 }), Calculator::add);
        let mut ctx = RequestContext::new(TransportRequest::get().with_query("a=2&b=3"));
        let payload = ArgsPayload::Params(bytes::Bytes::from_static(b"a=2&b=3"));

        let reply = method.invoke(&mut ctx, Some(payload)).await.unwrap();
        assert_eq!(reply, Some(serde_json::json!({"sum": 6})));
    }

    #[tokio::test]
    async fn test_rpc_invoke_without_args_is_bad_request() {
        let method = RpcMethod::new(Arc::new(Calculator { offset: 0 }), Calculator::add);
        let mut ctx = RequestContext::new(TransportRequest::post());

        match method.invoke(&mut ctx, None).await {
            Err(MethodError::Rpc(err)) => assert_eq!(err.http_status, 400),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handler_invoke_writes_response() {
        let method = HandlerMethod::new(Arc::new(Calculator { offset: 0 }), Calculator::health);
        let mut ctx = RequestContext::new(TransportRequest::get());

        let reply = method.invoke(&mut ctx, None).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(ctx.response().body_str(), Some("up"));
    }
}
