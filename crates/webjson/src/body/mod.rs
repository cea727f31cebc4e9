//! Request-body decoding for HTTP handlers.
//!
//! Framework-agnostic: callers hand over the raw body and the
//! `Content-Type` header value, if there was one.

use serde::de::DeserializeOwned;

use crate::charset::charset_param;
use crate::errors::{Result, WebJsonError};
use crate::serializer::JsonSerializer;

const READ_REQUEST_FAILED: &str = "Cannot read request";

/// Decode a JSON request body.
///
/// The charset comes from the content type's `charset` parameter, else the
/// serializer's configured default. An empty body yields `None`.
pub fn from_request_body<T>(
    serializer: &JsonSerializer,
    body: &[u8],
    content_type: Option<&str>,
) -> Result<Option<T>>
where
    T: DeserializeOwned + 'static,
{
    let encoding = content_type.and_then(charset_param);
    serializer
        .decode_bytes::<T>(body, encoding)
        .and_then(|json| serializer.decode(&json))
        .map_err(|e| match e {
            WebJsonError::Config(_) => e,
            // Already logged where it happened.
            other => WebJsonError::decode_with(READ_REQUEST_FAILED, other),
        })
}
