//! Response helpers for the resize service.
//!
//! Builders never fail: status and headers are set on an already built
//! response, and header values that cannot be represented are sanitized.

use crate::proxy::HeaderSet;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use hyper::Response;

pub type Body = Full<Bytes>;

/// Name of the header carrying a failure description
pub const ERROR_HEADER: &str = "error";

fn build(status: StatusCode, body: impl Into<Bytes>) -> Response<Body> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

/// JSON response with the given status code.
pub fn json(status: StatusCode, body: &serde_json::Value) -> Response<Body> {
    let mut response = build(status, body.to_string());
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Plain-text response with the given status code.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    let mut response = build(status, body.into());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// Image body with replayed upstream headers and a sniffed content type
pub fn image(
    status: StatusCode,
    content: Bytes,
    content_type: &'static str,
    headers: &HeaderSet,
) -> Response<Body> {
    let mut response = build(status, content);
    let map = response.headers_mut();
    // `HeaderMap` yields the name only for the first value of each header
    let mut current = None;
    for (name, value) in headers.to_header_map() {
        if name.is_some() {
            current = name;
        }
        if let Some(name) = &current {
            map.append(name.clone(), value);
        }
    }
    map.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Image body for a failed request, with the reason in the `Error` header
pub fn failure(content: Bytes, content_type: &'static str, message: &str) -> Response<Body> {
    let mut response = image(StatusCode::BAD_REQUEST, content, content_type, &HeaderSet::new());
    response
        .headers_mut()
        .insert(HeaderName::from_static(ERROR_HEADER), header_value(message));
    response
}

/// Keep printable ASCII so any message fits in a header value
pub fn header_value(message: &str) -> HeaderValue {
    let cleaned: String = message
        .chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect();
    HeaderValue::from_str(&cleaned).unwrap_or_else(|_| HeaderValue::from_static("request failed"))
}
