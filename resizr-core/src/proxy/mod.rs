//! Upstream side of the resize proxy
//!
//! Header sanitization shared by forwarding and caching, and the HTTP client
//! that fetches source images.

pub mod headers;
pub mod upstream;

pub use headers::{forwardable_request_headers, is_transport_header, HeaderSet, TRANSPORT_HEADERS};
pub use upstream::{upstream_url, Fetched, UpstreamClient};
