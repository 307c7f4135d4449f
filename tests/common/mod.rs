//! Services shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use rpcgate::prelude::*;
use serde::{Deserialize, Serialize};

/// Handler-style methods, one per content type, plus an untyped failure
pub struct DemoApi;

impl DemoApi {
    fn write_ok(ctx: &mut RequestContext, content_type: &str) -> HandlerResult {
        ctx.write_str(StatusCode::OK, content_type, "ok");
        Ok(())
    }

    fn test_xml(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::XML)
    }

    fn test_rss(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::RSS_XML)
    }

    fn test_atom(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::ATOM_XML)
    }

    fn test_json(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::JSON)
    }

    fn test_html(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::HTML)
    }

    fn test_protobuf(&self, ctx: &mut RequestContext) -> HandlerResult {
        Self::write_ok(ctx, content_type::PROTOBUF)
    }

    fn error_test(&self, _ctx: &mut RequestContext) -> HandlerResult {
        Err("test error".into())
    }
}

impl Service for DemoApi {
    fn register_methods(methods: &mut MethodTable<Self>) {
        methods
            .handler("TestXml", DemoApi::test_xml)
            .handler("TestRss", DemoApi::test_rss)
            .handler("TestAtom", DemoApi::test_atom)
            .handler("TestJson", DemoApi::test_json)
            .handler("TestHtml", DemoApi::test_html)
            .handler("TestProtobuf", DemoApi::test_protobuf)
            .handler("ErrorTest", DemoApi::error_test);
    }
}

pub const CONTENT_TYPE_METHODS: [(&str, &str); 6] = [
    ("TestXml", content_type::XML),
    ("TestRss", content_type::RSS_XML),
    ("TestAtom", content_type::ATOM_XML),
    ("TestJson", content_type::JSON),
    ("TestHtml", content_type::HTML),
    ("TestProtobuf", content_type::PROTOBUF),
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestArgs {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ttt: String,
}

#[derive(Debug, Default, Serialize)]
pub struct TestReply {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ttt: String,
}

/// RPC-style methods
#[derive(Default)]
pub struct RpcApi {
    pub calls: AtomicUsize,
}

impl RpcApi {
    fn echo(&self, _ctx: &RequestContext, args: &TestArgs, reply: &mut TestReply) -> RpcResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        reply.id.clone_from(&args.id);
        reply.ttt.clone_from(&args.ttt);
        Ok(())
    }

    fn error_test(&self, _ctx: &RequestContext, _args: &TestArgs, _reply: &mut TestReply) -> RpcResult {
        Err(RpcError::new(424, 606, "Test Wrong answer"))
    }
}

impl Service for RpcApi {
    fn register_methods(methods: &mut MethodTable<Self>) {
        methods
            .rpc("Echo", RpcApi::echo)
            .rpc("ErrorTest", RpcApi::error_test);
    }
}

/// Dispatcher with `demo` (handler style) and `demoerr` (RPC style)
pub fn demo_dispatcher() -> Dispatcher {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register_service(DemoApi, "demo")
        .expect("demo service registers");
    dispatcher
        .register_service(RpcApi::default(), "demoerr")
        .expect("demoerr service registers");
    dispatcher
}

pub fn json_post(body: &str) -> RequestContext {
    RequestContext::new(
        TransportRequest::post()
            .with_content_type("application/json")
            .with_body(body.to_string()),
    )
}
