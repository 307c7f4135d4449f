//! Wire codecs
//!
//! A [`Codec`] knows how to pull argument bytes out of a request and how to
//! serialize a [`ResponseEnvelope`]. Typed decoding of arguments happens in
//! [`ArgsPayload::deserialize`], which keeps the trait object safe.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::context::{RequestContext, TransportRequest, content_type};
use crate::envelope::ResponseEnvelope;
use crate::error::{EncodeError, RpcError};

pub mod json;
pub mod xml;

pub use json::JsonCodec;
pub use xml::XmlCodec;

/// Serialized envelope ready for the transport
#[derive(Debug, Clone)]
pub struct EncodedResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// Raw argument bytes tagged with how they must be decoded
#[derive(Debug, Clone)]
pub enum ArgsPayload {
    /// `application/x-www-form-urlencoded` pairs from a query string or form body
    Params(Bytes),
    /// JSON document body
    Json(Bytes),
    /// XML document body
    Xml(Bytes),
}

impl ArgsPayload {
    /// Decode into a freshly constructed argument value.
    ///
    /// Structured-parameter failures report status 444, body failures 400.
    /// Unknown fields are only rejected when the target type opts in with
    /// `#[serde(deny_unknown_fields)]`.
    pub fn deserialize<A: DeserializeOwned>(&self) -> Result<A, RpcError> {
        match self {
            ArgsPayload::Params(raw) => serde_urlencoded::from_bytes(raw)
                .map_err(|err| RpcError::param_decode(err.to_string())),
            ArgsPayload::Json(raw) => {
                if raw.is_empty() {
                    return Err(missing_params());
                }
                serde_json::from_slice(raw).map_err(|err| RpcError::bad_request(err.to_string()))
            }
            ArgsPayload::Xml(raw) => {
                if raw.is_empty() {
                    return Err(missing_params());
                }
                let text = std::str::from_utf8(raw)
                    .map_err(|err| RpcError::bad_request(err.to_string()))?;
                quick_xml::de::from_str(text).map_err(|err| RpcError::bad_request(err.to_string()))
            }
        }
    }

    pub fn is_structured_params(&self) -> bool {
        matches!(self, ArgsPayload::Params(_))
    }
}

fn missing_params() -> RpcError {
    RpcError::bad_request("rpcgate: method request ill-formed: missing params")
}

/// One wire format: argument extraction plus envelope serialization
pub trait Codec: Send + Sync {
    /// Short name used to select the codec, e.g. `json`
    fn name(&self) -> &'static str;

    /// Content type written with encoded envelopes
    fn content_type(&self) -> &'static str;

    /// Whether a request body of this media type is in this codec's format
    fn accepts(&self, media_type: &str) -> bool;

    /// Wrap a body already known to be in this codec's format
    fn body_payload(&self, body: Bytes) -> ArgsPayload;

    /// Serialize `envelope`. Must never emit both fields or null placeholders.
    fn encode(
        &self,
        envelope: &ResponseEnvelope,
        status: StatusCode,
    ) -> Result<EncodedResponse, EncodeError>;

    /// Pull the argument bytes out of `request`.
    ///
    /// GET and HEAD carry structured parameters in the query string. Other
    /// methods carry them in the body: form encoded, or in this codec's own
    /// format. Any other declared content type is a decode error.
    fn decode(&self, request: &TransportRequest) -> Result<ArgsPayload, RpcError> {
        if matches!(*request.method(), Method::GET | Method::HEAD) {
            let query = request.query().unwrap_or_default();
            return Ok(ArgsPayload::Params(Bytes::copy_from_slice(query.as_bytes())));
        }

        match request.media_type() {
            Some(media_type) if media_type.eq_ignore_ascii_case(content_type::FORM) => {
                Ok(ArgsPayload::Params(request.body().clone()))
            }
            Some(media_type) if self.accepts(media_type) => {
                Ok(self.body_payload(request.body().clone()))
            }
            Some(media_type) => Err(RpcError::bad_request(format!(
                "rpcgate: wrong Content-Type in request: {media_type}"
            ))),
            None => Err(RpcError::bad_request(
                "rpcgate: missing Content-Type in request",
            )),
        }
    }
}

/// Encode `envelope` into `ctx`, falling back to a plain-text 500 when
/// serialization fails.
pub fn write_envelope(
    ctx: &mut RequestContext,
    codec: &dyn Codec,
    envelope: &ResponseEnvelope,
    status: StatusCode,
) {
    match codec.encode(envelope, status) {
        Ok(encoded) => ctx.write_bytes(encoded.status, encoded.content_type, encoded.body),
        Err(err) => {
            error!(codec = codec.name(), error = %err, "failed to encode response envelope");
            write_plain_error(
                ctx,
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("rpcgate: failed to encode response: {err}"),
            );
        }
    }
}

/// Codec-independent error body
pub fn write_plain_error(ctx: &mut RequestContext, status: StatusCode, message: &str) {
    ctx.write_str(status, content_type::PLAIN, message);
}

/// Codecs available to a dispatcher, keyed by name
#[derive(Clone)]
pub struct Codecs {
    by_name: HashMap<&'static str, Arc<dyn Codec>>,
}

impl Codecs {
    /// JSON and XML codecs
    pub fn new() -> Self {
        let mut codecs = Self::empty();
        codecs.register(JsonCodec);
        codecs.register(XmlCodec);
        codecs
    }

    pub fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Add a codec, returning the one it replaced under the same name
    pub fn register<C>(&mut self, codec: C) -> Option<Arc<dyn Codec>>
    where
        C: Codec + 'static,
    {
        self.by_name.insert(codec.name(), Arc::new(codec))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.by_name.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new()
    }
}
