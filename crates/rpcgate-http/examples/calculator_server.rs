//! # Calculator Server Example
//!
//! Serves a `Calculator` service over HTTP.
//!
//! ```text
//! curl 'http://127.0.0.1:8000/api/Calculator.Divide?a=7&b=2'
//! curl -H 'Content-Type: application/json' -d '{"a":1,"b":0}' \
//!      http://127.0.0.1:8000/api/Calculator.Divide
//! curl -H 'Accept: application/xml' http://127.0.0.1:8000/api/Calculator.Health
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use rpcgate::prelude::*;
use rpcgate_http::HttpRpcServer;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DivideArgs {
    a: f64,
    b: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct DivideReply {
    quotient: f64,
    calls: u64,
}

#[derive(Default)]
struct Calculator {
    calls: AtomicU64,
}

impl Calculator {
    fn divide(&self, _ctx: &RequestContext, args: &DivideArgs, reply: &mut DivideReply) -> RpcResult {
        if args.b == 0.0 {
            return Err(RpcError::new(422, 1, "division by zero")
                .with_data(serde_json::json!({"a": args.a})));
        }
        reply.quotient = args.a / args.b;
        reply.calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(())
    }

    fn health(&self, ctx: &mut RequestContext) -> HandlerResult {
        ctx.write_str(StatusCode::OK, content_type::PLAIN, "ok");
        Ok(())
    }
}

impl Service for Calculator {
    fn register_methods(methods: &mut MethodTable<Self>) {
        methods
            .rpc("Divide", Calculator::divide)
            .handler("Health", Calculator::health);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting calculator server");

    let server = HttpRpcServer::builder()
        .service(Calculator::default(), "")?
        .build()?;

    server.run().await?;
    Ok(())
}
