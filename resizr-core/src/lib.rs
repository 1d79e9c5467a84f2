//! Resizr - Core
//!
//! An HTTP image-resizing proxy: fetch a source image from an upstream URL,
//! resize it on demand, and cache both the original and the result in a
//! two-tier (memory + disk) LRU cache.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use resizr_core::app::ResizrServer;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = ResizrServer::new().with_port(9000).build()?;
//!     server.serve(CancellationToken::new()).await
//! }
//! ```
//!
//! Then `GET /fill/200/150/example.com/photo.jpg`.
//!
//! # Architecture
//!
//! - [`cache`] - ordered list, bounded LRU and the durable two-tier cache
//! - [`proxy`] - header sanitization and the upstream HTTP client
//! - [`imaging`] - resize, validation and format sniffing
//! - [`pipeline`] - cache-aside request orchestration
//! - [`http`] - routes and response building on hyper
//! - [`server`] - accept loop supervisor with restart and graceful drain
//! - [`app`] - composition root wiring everything from [`config`]

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod imaging;
pub mod logging;
pub mod pipeline;
pub mod proxy;
pub mod server;

pub use error::{Error, Result};

/// Crate version reported by `GET /`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
