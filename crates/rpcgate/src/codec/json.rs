use bytes::Bytes;
use http::StatusCode;

use super::{ArgsPayload, Codec, EncodedResponse};
use crate::context::content_type;
use crate::envelope::ResponseEnvelope;
use crate::error::EncodeError;

/// JSON wire format: `{"response": ...}` or `{"error": {...}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        content_type::JSON
    }

    fn accepts(&self, media_type: &str) -> bool {
        media_type.eq_ignore_ascii_case("application/json")
    }

    fn body_payload(&self, body: Bytes) -> ArgsPayload {
        ArgsPayload::Json(body)
    }

    fn encode(
        &self,
        envelope: &ResponseEnvelope,
        status: StatusCode,
    ) -> Result<EncodedResponse, EncodeError> {
        let body = serde_json::to_vec(envelope)?;
        Ok(EncodedResponse {
            status,
            content_type: content_type::JSON,
            body: Bytes::from(body),
        })
    }
}
