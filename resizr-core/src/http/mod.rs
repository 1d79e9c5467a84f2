//! HTTP surface of the resize proxy
//!
//! - `GET /` answers `{"version": ...}`
//! - `GET /:operation/:width/:height/*url` runs the [`ResizePipeline`]
//!
//! Every domain failure is a 400 carrying an image body, never a 5xx.

pub mod response;

use crate::error::{Error, Result};
use crate::imaging::sniff;
use crate::pipeline::{ResizePipeline, ResizeRequest};
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use hyper::Response;
use response::Body;
use std::sync::Arc;

pub const METHOD_NOT_ALLOWED: &str = "the method is not allowed";

/// Outcome of matching a request path
#[derive(Debug)]
pub enum Route {
    Index,
    Resize(Result<ResizeRequest>),
    NotFound,
}

impl Route {
    /// Match `path` (plus an optional query string that belongs to the upstream URL)
    pub fn parse(path: &str, query: Option<&str>) -> Self {
        if path == "/" {
            return Route::Index;
        }

        let mut segments = path.trim_start_matches('/').splitn(4, '/');
        let (operation, width, height, url) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(op), Some(w), Some(h), Some(url)) if !op.is_empty() => (op, w, h, url),
                _ => return Route::NotFound,
            };

        let source_url = match query {
            Some(q) if !q.is_empty() => format!("{}?{}", url, q),
            _ => url.to_string(),
        };

        Route::Resize(parse_dimensions(width, height).map(|(width, height)| ResizeRequest {
            operation: operation.to_string(),
            width,
            height,
            source_url,
        }))
    }
}

/// Width and height must be non-negative integers
pub fn parse_dimensions(width: &str, height: &str) -> Result<(u32, u32)> {
    let parse = |name: &str, value: &str| {
        value.parse::<u32>().map_err(|_| Error::Dimension(format!("{} {:?}", name, value)))
    };
    Ok((parse("width", width)?, parse("height", height)?))
}

/// Request handler shared by all connections
pub struct ResizeService {
    pipeline: ResizePipeline,
    error_image: Bytes,
    version: String,
}

impl ResizeService {
    pub fn new(pipeline: ResizePipeline, error_image: impl Into<Bytes>, version: &str) -> Self {
        Self { pipeline, error_image: error_image.into(), version: version.to_string() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<Body> {
        let (parts, _) = request.into_parts();
        let route = Route::parse(parts.uri.path(), parts.uri.query());

        match (route, parts.method == Method::GET) {
            (Route::Index, true) => {
                response::json(StatusCode::OK, &serde_json::json!({ "version": self.version }))
            }
            (Route::Index, false) => {
                response::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
            }
            (Route::Resize(_), false) => {
                log::error!("unsupported method {} on {}", parts.method, parts.uri.path());
                self.raw_failure(METHOD_NOT_ALLOWED)
            }
            (Route::Resize(Err(e)), true) => {
                log::error!("{}", e);
                self.raw_failure(&e.to_string())
            }
            (Route::Resize(Ok(request)), true) => self.resize(request, &parts.headers).await,
            (Route::NotFound, _) => response::text(StatusCode::NOT_FOUND, "Not Found"),
        }
    }

    async fn resize(&self, request: ResizeRequest, inbound: &HeaderMap) -> Response<Body> {
        log::info!(
            "will resize to {}x{} with operation {} image at {}",
            request.width,
            request.height,
            request.operation,
            request.source_url
        );

        match self.pipeline.process(&request, inbound).await {
            Ok(rendered) => response::image(
                StatusCode::OK,
                rendered.content,
                rendered.content_type,
                &rendered.headers,
            ),
            Err(e) => {
                if e.is_client_facing() {
                    log::error!("{}", e);
                } else {
                    log::error!("unexpected failure for {}: {}", request.source_url, e);
                }
                self.failure(&request, &e.to_string()).await
            }
        }
    }

    /// Error image rendered at the requested size, or raw when that fails
    async fn failure(&self, request: &ResizeRequest, message: &str) -> Response<Body> {
        let processor = Arc::clone(self.pipeline.processor());
        let source = self.error_image.clone();
        let (width, height, crop) = (request.width, request.height, request.crop());

        let rendered =
            tokio::task::spawn_blocking(move || processor.resize(&source, width, height, crop))
                .await;

        match rendered {
            Ok(Ok(content)) => {
                let content = Bytes::from(content);
                let content_type = sniff(&content);
                response::failure(content, content_type, message)
            }
            Ok(Err(e)) => {
                log::warn!("cannot render error image: {}", e);
                self.raw_failure(message)
            }
            Err(e) => {
                log::warn!("cannot render error image: {}", e);
                self.raw_failure(message)
            }
        }
    }

    fn raw_failure(&self, message: &str) -> Response<Body> {
        response::failure(self.error_image.clone(), sniff(&self.error_image), message)
    }
}
