use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::Result;
use crate::error::Error;
use crate::request::HttpBody;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_PLAIN: &str = "text/plain";

/// Time source seam so token-expiry logic can be driven in tests.
pub trait Clock: Send + Sync {
    fn now_system(&self) -> SystemTime;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Media-type comparison ignoring parameters such as `; charset=utf-8`.
pub(crate) fn matches_media_type(content_type: &str, media_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    essence.eq_ignore_ascii_case(media_type)
}

pub(crate) fn supports_request_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Serialize a request body according to the request Content-Type.
///
/// Returns `None` when there is nothing to send. Text and raw bytes pass
/// through untouched; structured bodies are encoded as JSON or form data.
pub(crate) fn serialize_request_body(
    body: HttpBody,
    content_type: Option<&str>,
) -> Result<Option<Bytes>> {
    match body {
        HttpBody::Empty => Ok(None),
        HttpBody::Bytes(bytes) => Ok(Some(bytes)),
        HttpBody::Text(text) => Ok(Some(Bytes::from(text))),
        HttpBody::Form(pairs) => {
            let encoded =
                serde_urlencoded::to_string(&pairs).map_err(|source| Error::SerializeBody {
                    message: source.to_string(),
                })?;
            Ok(Some(Bytes::from(encoded)))
        }
        HttpBody::Json(value) => match content_type {
            Some(content_type) if matches_media_type(content_type, APPLICATION_FORM_URLENCODED) => {
                let encoded =
                    serde_urlencoded::to_string(&value).map_err(|source| Error::SerializeBody {
                        message: source.to_string(),
                    })?;
                Ok(Some(Bytes::from(encoded)))
            }
            Some(content_type) if !matches_media_type(content_type, APPLICATION_JSON) => {
                Err(Error::SerializeBody {
                    message: format!("unsupported content-type: {content_type}"),
                })
            }
            _ => {
                let encoded =
                    serde_json::to_vec(&value).map_err(|source| Error::SerializeBody {
                        message: source.to_string(),
                    })?;
                Ok(Some(Bytes::from(encoded)))
            }
        },
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub(crate) fn parse_header_name(name: &str) -> Result<http::header::HeaderName> {
    name.parse()
        .map_err(|_| Error::InvalidHeaderName { name: name.to_owned() })
}

pub(crate) fn parse_header_value(name: &str, value: &str) -> Result<http::HeaderValue> {
    http::HeaderValue::from_str(value).map_err(|_| Error::InvalidHeaderValue {
        name: name.to_owned(),
    })
}
