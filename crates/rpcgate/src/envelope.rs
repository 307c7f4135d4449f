use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::RpcError;
use crate::pool::{Poolable, Pooled};

/// Wire form of an [`RpcError`]
///
/// The HTTP status travels with the record but is never serialized.
#[derive(Debug, Default, Serialize)]
pub struct ErrorObject {
    #[serde(skip)]
    http_status: u16,
    #[serde(rename = "error_code")]
    code: i64,
    #[serde(rename = "error_msg")]
    message: String,
    data: Option<Value>,
}

impl ErrorObject {
    /// Copy every field of `err` into this record, reusing its buffers
    pub fn fill_from(&mut self, err: &RpcError) {
        self.http_status = err.http_status;
        self.code = err.code;
        self.message.clear();
        self.message.push_str(&err.message);
        self.data.clone_from(&err.data);
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl Poolable for ErrorObject {
    fn reset(&mut self) {
        self.http_status = 0;
        self.code = 0;
        self.message.clear();
        self.data = None;
    }
}

/// Uniform success/error wrapper written for every call
///
/// At most one of `response` and `error` is set; setting one clears the other.
/// The unset field is left out of the serialized form.
#[derive(Debug, Default, Serialize)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Pooled<ErrorObject>>,
}

impl ResponseEnvelope {
    pub fn set_response(&mut self, response: Value) {
        self.error = None;
        self.response = Some(response);
    }

    pub fn set_error(&mut self, error: Pooled<ErrorObject>) {
        self.response = None;
        self.error = Some(error);
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Status implied by the contents: the error's own status, otherwise 200
    pub fn status(&self) -> StatusCode {
        self.error().map_or(StatusCode::OK, ErrorObject::status)
    }
}

impl Poolable for ResponseEnvelope {
    fn reset(&mut self) {
        self.response = None;
        self.error = None;
    }
}
