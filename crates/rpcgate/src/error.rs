use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// HTTP status reported when structured-parameter (query/form) decoding fails.
pub const STATUS_PARAM_DECODE: u16 = 444;

/// Structured error returned by methods and produced by the dispatcher.
///
/// `http_status` picks the transport status, `code` is the application level
/// identifier (0 means unclassified) and `message` is a single sentence shown
/// to the client. `data` carries optional structured diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RpcError {
    pub http_status: u16,
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(http_status: u16, code: i64, message: impl Into<String>) -> Self {
        Self {
            http_status,
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured diagnostics
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND.as_u16(), 0, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST.as_u16(), 0, message)
    }

    /// Failure while decoding query or form parameters into an argument value
    pub fn param_decode(message: impl Into<String>) -> Self {
        Self::new(STATUS_PARAM_DECODE, 0, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), 0, message)
    }

    /// Transport status for this error. Out-of-range values map to 500.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ResolveError> for RpcError {
    fn from(err: ResolveError) -> Self {
        RpcError::not_found(err.to_string())
    }
}

/// Failure returned from an invoked method
#[derive(Debug, Error)]
pub enum MethodError {
    /// Structured failure, written through the active codec
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The method succeeded but its reply could not be turned into a wire value
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Untyped failure, routed to the dispatcher's error handler
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl MethodError {
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        MethodError::Other(err.into())
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, MethodError::Rpc(_))
    }
}

impl From<String> for MethodError {
    fn from(message: String) -> Self {
        MethodError::other(message)
    }
}

impl From<&str> for MethodError {
    fn from(message: &str) -> Self {
        MethodError::other(message)
    }
}

/// Errors reported synchronously by service registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("rpcgate: no service name for type {0:?}")]
    EmptyServiceName(String),

    #[error("rpcgate: type {0:?} is not exported")]
    NameNotExported(String),

    #[error("rpcgate: service name must not contain '.': {0:?}")]
    InvalidServiceName(String),

    #[error("rpcgate: service already defined: {0:?}")]
    DuplicateService(String),

    #[error("rpcgate: {0:?} has no exported methods of suitable type")]
    NoEligibleMethods(String),
}

/// Errors from turning a `Service.Method` key into a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("rpcgate: service/method request ill-formed: {0:?}")]
    MalformedKey(String),

    #[error("rpcgate: service not found: {0:?}")]
    ServiceNotFound(String),

    #[error("rpcgate: can't find method {method:?}")]
    MethodNotFound { service: String, method: String },
}

/// Serialization failures while building an outgoing payload
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML element name: {0:?}")]
    InvalidElementName(String),

    #[error("character {0:?} is not allowed in XML")]
    InvalidXmlChar(char),

    #[error("XML write error: {0}")]
    Xml(String),
}
