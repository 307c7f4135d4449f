//! HTTP request handler mapping `<prefix>/<Service.Method>` onto the dispatcher

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{ACCEPT, ALLOW, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use rpcgate::{Dispatcher, RequestContext, content_type};

use crate::ServerConfig;

/// Serves RPC calls for one server instance
#[derive(Clone)]
pub struct RpcHttpHandler {
    config: Arc<ServerConfig>,
    dispatcher: Arc<Dispatcher>,
}

impl RpcHttpHandler {
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Handle one HTTP request. Never fails; every outcome is a response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!("Handling {} {}", method, path);

        let Some(method_key) = self.method_key(&path) else {
            return plain_response(StatusCode::NOT_FOUND, "Not Found");
        };
        let method_key = method_key.to_string();

        if !matches!(method, Method::GET | Method::POST) {
            let mut response = plain_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, POST"));
            return response;
        }

        if declared_length(&req).is_some_and(|len| len > self.config.max_body_size as u64) {
            warn!(path = %path, "Request body exceeds limit");
            return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
        }

        let codec_name = self.codec_for(&req).to_string();

        let (parts, body) = req.into_parts();
        let body = match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(path = %path, "Request body exceeds limit");
                return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
            }
            Err(err) => {
                debug!(path = %path, error = %err, "Failed to read request body");
                return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
            }
        };

        let mut ctx = RequestContext::from_http(Request::from_parts(parts, body));
        self.dispatcher
            .dispatch_named(&mut ctx, &method_key, &codec_name)
            .await;

        let (parts, body) = ctx.into_http_response().into_parts();
        Response::from_parts(parts, Full::new(body))
    }

    /// `Service.Method` part of a path under the API prefix
    fn method_key<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix = self.config.api_prefix.trim_end_matches('/');
        path.strip_prefix(prefix)?
            .strip_prefix('/')
            .filter(|key| !key.is_empty())
    }

    fn codec_for<B>(&self, req: &Request<B>) -> &str {
        let wants_xml = req
            .headers()
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(accepts_xml);

        if wants_xml { "xml" } else { &self.config.default_codec }
    }
}

/// True when an `Accept` media range names `application/xml` or `text/xml`
fn accepts_xml(accept: &str) -> bool {
    accept.split(',').any(|range| {
        let media_type = range.split(';').next().unwrap_or_default().trim();
        media_type.eq_ignore_ascii_case("application/xml") || media_type.eq_ignore_ascii_case("text/xml")
    })
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

fn plain_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type::PLAIN));
    response
}
