//! Shared fixtures: a counting upstream image server and a counting processor

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use resizr_core::cache::DurableCache;
use resizr_core::http::ResizeService;
use resizr_core::imaging::{self, ImageProcessor, RasterProcessor};
use resizr_core::pipeline::{ResizePipeline, SharedCache};
use resizr_core::proxy::UpstreamClient;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const SOURCE_WIDTH: u32 = 80;
pub const SOURCE_HEIGHT: u32 = 60;

#[derive(Default)]
struct Recorded {
    hits: HashMap<String, usize>,
    last_headers: Option<http::HeaderMap>,
}

/// Local image server.
///
/// - `/photo.png`, `/other.png`: an 80x60 PNG with cache headers, one of them multi-valued
/// - `/text`: a 200 that is not an image
/// - anything else: 404
#[derive(Clone)]
pub struct Upstream {
    addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
    image: Bytes,
}

impl Upstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let image = Bytes::from(imaging::placeholder(SOURCE_WIDTH, SOURCE_HEIGHT).unwrap());
        let upstream = Self { addr, recorded: Arc::default(), image };

        let server = upstream.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let server = server.clone();
                tokio::spawn(async move {
                    let handler = service_fn(move |req| {
                        let server = server.clone();
                        async move { Ok::<_, Infallible>(server.respond(req)) }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), handler)
                        .await;
                });
            }
        });

        upstream
    }

    fn respond(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let path = req.uri().path().to_string();
        {
            let mut recorded = self.recorded.lock().unwrap();
            *recorded.hits.entry(path.clone()).or_default() += 1;
            recorded.last_headers = Some(req.headers().clone());
        }

        let builder = Response::builder();
        match path.as_str() {
            "/photo.png" | "/other.png" => builder
                .status(StatusCode::OK)
                .header("content-type", "application/octet-stream")
                .header("cache-control", "max-age=3600")
                .header("x-origin", "fixture")
                .header("x-variant", "small")
                .header("x-variant", "large")
                .body(Full::new(self.image.clone())),
            "/text" => builder
                .status(StatusCode::OK)
                .header("content-type", "text/plain")
                .body(Full::new(Bytes::from_static(b"just some text"))),
            _ => builder.status(StatusCode::NOT_FOUND).body(Full::new(Bytes::new())),
        }
        .unwrap()
    }

    /// Locator as it appears after `/:op/:w/:h/`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.recorded.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.recorded.lock().unwrap().hits.values().sum()
    }

    pub fn last_headers(&self) -> Option<http::HeaderMap> {
        self.recorded.lock().unwrap().last_headers.clone()
    }
}

/// [`RasterProcessor`] that counts resize calls
#[derive(Default)]
pub struct CountingProcessor {
    inner: RasterProcessor,
    resizes: AtomicUsize,
}

impl CountingProcessor {
    pub fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }
}

impl ImageProcessor for CountingProcessor {
    fn validate(&self, content: &[u8]) -> resizr_core::Result<()> {
        self.inner.validate(content)
    }

    fn resize(
        &self,
        content: &[u8],
        width: u32,
        height: u32,
        crop: bool,
    ) -> resizr_core::Result<Vec<u8>> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(content, width, height, crop)
    }
}

/// Service wired the way the server wires it, over caches rooted in `dir`
pub struct Harness {
    pub service: Arc<ResizeService>,
    pub processor: Arc<CountingProcessor>,
    pub base: Arc<DurableCache>,
    pub converted: Arc<DurableCache>,
    pub error_image: Bytes,
}

impl Harness {
    pub fn open(dir: &Path, memory_capacity: usize, storage_capacity: usize) -> Self {
        let base = Arc::new(
            DurableCache::open(memory_capacity, storage_capacity, dir.join("base")).unwrap(),
        );
        let converted = Arc::new(
            DurableCache::open(memory_capacity, storage_capacity, dir.join("converted")).unwrap(),
        );
        let processor = Arc::new(CountingProcessor::default());
        let error_image = Bytes::from(imaging::placeholder(16, 16).unwrap());

        let base_shared: SharedCache = base.clone();
        let converted_shared: SharedCache = converted.clone();
        let pipeline = ResizePipeline::new(
            base_shared,
            converted_shared,
            UpstreamClient::new(Duration::from_secs(5)).unwrap(),
            processor.clone(),
        );
        let service = Arc::new(ResizeService::new(pipeline, error_image.clone(), "test"));

        Self { service, processor, base, converted, error_image }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, http::HeaderMap, Bytes) {
        self.send(Request::get(uri).body(()).unwrap()).await
    }

    pub async fn send(&self, request: Request<()>) -> (StatusCode, http::HeaderMap, Bytes) {
        let response = self.service.handle(request).await;
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes();
        (parts.status, parts.headers, body)
    }

    /// Flush pending artifact deletions of both tiers
    pub fn shutdown(&self) {
        self.base.shutdown();
        self.converted.shutdown();
    }
}

pub fn dimensions(content: &[u8]) -> (u32, u32) {
    let decoded = image::load_from_memory(content).unwrap();
    (decoded.width(), decoded.height())
}

/// Regular files directly under `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .count()
}
