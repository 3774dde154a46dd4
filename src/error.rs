use std::time::Duration;

use thiserror::Error;

use crate::response::HttpResponse;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    Adapter,
    RetryExhausted,
    RetryTimeout,
    Unauthorized,
    NetworkUnavailable,
    SerializeBody,
    DeserializeBody,
    UnresolvedRoute,
    InvalidHeaderName,
    InvalidHeaderValue,
    InvalidConfig,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adapter => "adapter",
            Self::RetryExhausted => "retry_exhausted",
            Self::RetryTimeout => "retry_timeout",
            Self::Unauthorized => "unauthorized",
            Self::NetworkUnavailable => "network_unavailable",
            Self::SerializeBody => "serialize_body",
            Self::DeserializeBody => "deserialize_body",
            Self::UnresolvedRoute => "unresolved_route",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::InvalidConfig => "invalid_config",
        }
    }
}

/// Every failure a caller can observe from this pipeline.
///
/// The enum is `Clone` so that one in-flight token refresh failure can be
/// fanned out to every caller waiting on it.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("http request failed with status {}", status_label(.response))]
    Adapter { response: HttpResponse },
    #[error("retry end, count {retries}")]
    RetryExhausted {
        retries: usize,
        response: HttpResponse,
    },
    #[error("retry timeout, max_timeout={}ms, retry count = {count_retry}", .max_timeout.as_millis())]
    RetryTimeout {
        max_timeout: Duration,
        count_retry: usize,
    },
    #[error("authentication failed: {message}")]
    Unauthorized {
        message: String,
        response: HttpResponse,
    },
    #[error("network unavailable")]
    NetworkUnavailable { response: HttpResponse },
    #[error("failed to serialize request body: {message}")]
    SerializeBody { message: String },
    #[error("failed to decode response body: {message}")]
    DeserializeBody { message: String },
    #[error("illegal routing url: {url}")]
    UnresolvedRoute { url: String },
    #[error("invalid header name: {name}")]
    InvalidHeaderName { name: String },
    #[error("invalid header value for {name}")]
    InvalidHeaderValue { name: String },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Adapter { .. } => ErrorCode::Adapter,
            Self::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            Self::RetryTimeout { .. } => ErrorCode::RetryTimeout,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::NetworkUnavailable { .. } => ErrorCode::NetworkUnavailable,
            Self::SerializeBody { .. } => ErrorCode::SerializeBody,
            Self::DeserializeBody { .. } => ErrorCode::DeserializeBody,
            Self::UnresolvedRoute { .. } => ErrorCode::UnresolvedRoute,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// The response shape carried by this failure, when it has one.
    ///
    /// Retry predicates use this to inspect status codes without caring
    /// which taxonomy kind wrapped the response.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Adapter { response }
            | Self::RetryExhausted { response, .. }
            | Self::Unauthorized { response, .. }
            | Self::NetworkUnavailable { response } => Some(response),
            _ => None,
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            response: HttpResponse::unauthorized(),
        }
    }
}

fn status_label(response: &HttpResponse) -> String {
    match response.status {
        Some(status) => status.as_u16().to_string(),
        None => "<none>".to_owned(),
    }
}
