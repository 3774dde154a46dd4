use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::Result;
use crate::error::Error;

/// Unified response shape returned by every adapter.
///
/// `ok` is the authoritative success flag; `status` is advisory and may be
/// absent when the failure never reached the server (transport errors,
/// synthetic degradations).
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub ok: bool,
    pub status: Option<StatusCode>,
    pub status_text: Option<String>,
    pub headers: HeaderMap,
    pub data: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, data: Bytes) -> Self {
        Self {
            ok: status.is_success(),
            status: Some(status),
            status_text: status.canonical_reason().map(str::to_owned),
            headers,
            data,
        }
    }

    pub fn success(data: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), data.into())
    }

    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), Bytes::new())
    }

    /// Failure shape with no status at all, used where the original
    /// failure never produced a response (e.g. serialization errors
    /// feeding a retry predicate).
    pub fn error_shape() -> Self {
        Self {
            ok: false,
            status: None,
            status_text: None,
            headers: HeaderMap::new(),
            data: Bytes::new(),
        }
    }

    /// Synthetic response raised when token acquisition or refresh fails.
    pub fn unauthorized() -> Self {
        Self {
            ok: false,
            status: Some(StatusCode::UNAUTHORIZED),
            status_text: Some("Unauthorized 401".to_owned()),
            headers: HeaderMap::new(),
            data: Bytes::new(),
        }
    }

    /// Synthetic response raised by the default network fail-back.
    pub fn network_failure() -> Self {
        Self {
            ok: false,
            status: Some(StatusCode::GATEWAY_TIMEOUT),
            status_text: Some("network fail".to_owned()),
            headers: HeaderMap::new(),
            data: Bytes::new(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|s| s.as_u16())
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn json<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&self.data).map_err(|source| Error::DeserializeBody {
            message: source.to_string(),
        })
    }
}
