//! Request-level error taxonomy
//!
//! Every failure inside the handler ends up here and is turned into a fixed,
//! minimal response. Detail (paths, io errors) only reaches the log.

use std::io;

use hyper::{Method, Response, StatusCode};

use crate::http::{self, ResponseBody};
use crate::storage::FilenameError;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("missing or incorrect credentials")]
    Unauthorized,

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(#[from] FilenameError),

    #[error("request body exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: u64 },

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("{context}: {source}")]
    Internal {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl HandlerError {
    pub fn internal(context: impl Into<String>, source: io::Error) -> Self {
        Self::Internal {
            context: context.into(),
            source,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing response; never includes the error detail
    pub fn into_response(self) -> Response<ResponseBody> {
        match self {
            Self::Unauthorized => http::build_401_response(),
            Self::NotFound(_) => http::build_404_response(),
            Self::BadRequest(_) => http::build_400_response("Bad Request"),
            Self::InvalidFilename(_) => http::build_400_response("Invalid filename"),
            Self::PayloadTooLarge { .. } => http::build_413_response(),
            Self::MethodNotAllowed(_) => http::build_405_response(),
            Self::Internal { .. } => http::build_500_response(),
        }
    }
}
