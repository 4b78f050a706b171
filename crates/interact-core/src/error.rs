//! Error types for the interactive SDK

use thiserror::Error;

/// Core interactive errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractiveError {
    // API misuse
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Invalid state for {0}")]
    InvalidState(&'static str),

    #[error("Session is not connected")]
    NotConnected,

    // Cache lookups
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Invalid property type for {0}")]
    InvalidPropertyType(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },

    // Protocol
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Unrecognized data format: {0}")]
    UnrecognizedDataFormat(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Server error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        path: Option<String>,
    },

    // Transport
    #[error("No interactive host available")]
    NoHost,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("WebSocket connect failed: {0}")]
    WsConnectFailed(String),

    #[error("WebSocket closed")]
    WsClosed,

    #[error("WebSocket send failed: {0}")]
    WsSendFailed(String),

    #[error("WebSocket read failed: {0}")]
    WsReadFailed(String),

    // Lifecycle
    #[error("Timed out")]
    TimedOut,

    #[error("Cancelled")]
    Cancelled,
}

/// Numeric error codes handed to error callbacks
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Success
    Ok = 0,
    InvalidArgument = 1,
    InvalidState = 2,
    NotConnected = 3,
    ObjectNotFound = 4,
    PropertyNotFound = 5,
    InvalidPropertyType = 6,
    DuplicateEntry = 7,
    BufferTooSmall = 8,
    JsonParse = 9,
    UnrecognizedDataFormat = 10,
    UnknownMethod = 11,
    /// Server-side error; the server's own code travels with the error
    Rpc = 12,
    NoHost = 13,
    Http = 14,
    WsConnectFailed = 15,
    WsClosed = 16,
    WsSendFailed = 17,
    WsReadFailed = 18,
    TimedOut = 19,
    Cancelled = 20,
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

impl InteractiveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InteractiveError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            InteractiveError::InvalidState(_) => ErrorCode::InvalidState,
            InteractiveError::NotConnected => ErrorCode::NotConnected,
            InteractiveError::ObjectNotFound(_) => ErrorCode::ObjectNotFound,
            InteractiveError::PropertyNotFound(_) => ErrorCode::PropertyNotFound,
            InteractiveError::InvalidPropertyType(_) => ErrorCode::InvalidPropertyType,
            InteractiveError::DuplicateEntry(_) => ErrorCode::DuplicateEntry,
            InteractiveError::BufferTooSmall { .. } => ErrorCode::BufferTooSmall,
            InteractiveError::JsonParse(_) => ErrorCode::JsonParse,
            InteractiveError::UnrecognizedDataFormat(_) => ErrorCode::UnrecognizedDataFormat,
            InteractiveError::UnknownMethod(_) => ErrorCode::UnknownMethod,
            InteractiveError::Rpc { .. } => ErrorCode::Rpc,
            InteractiveError::NoHost => ErrorCode::NoHost,
            InteractiveError::Http(_) => ErrorCode::Http,
            InteractiveError::WsConnectFailed(_) => ErrorCode::WsConnectFailed,
            InteractiveError::WsClosed => ErrorCode::WsClosed,
            InteractiveError::WsSendFailed(_) => ErrorCode::WsSendFailed,
            InteractiveError::WsReadFailed(_) => ErrorCode::WsReadFailed,
            InteractiveError::TimedOut => ErrorCode::TimedOut,
            InteractiveError::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Code reported to the application: the server's code for RPC errors,
    /// the SDK code otherwise.
    pub fn reported_code(&self) -> i32 {
        match self {
            InteractiveError::Rpc { code, .. } => *code,
            other => other.code().into(),
        }
    }

    /// Message reported alongside `reported_code`
    pub fn reported_message(&self) -> String {
        match self {
            InteractiveError::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for InteractiveError {
    fn from(e: serde_json::Error) -> Self {
        InteractiveError::JsonParse(e.to_string())
    }
}

/// Result type for interactive operations
pub type InteractiveResult<T> = Result<T, InteractiveError>;
