//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `CacheStore` in memory ([`MemoryCacheStore`]) or as JSON files on disk
//!   ([`JsonFileCacheStore`], `tokio::fs` + `serde_json`)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonFileCacheStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let topics = JsonFileCacheStore::<Topic>::new("/tmp/feeder-cache");
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod cache;
mod http;

pub use cache::{JsonFileCacheList, JsonFileCacheStore, MemoryCacheList, MemoryCacheStore};
pub use http::ReqwestHttpClient;
