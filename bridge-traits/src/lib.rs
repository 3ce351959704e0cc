//! # Host Bridge Traits
//!
//! Contracts between the feeder core and the collaborators it does not own.
//!
//! ## Overview
//!
//! The core orchestrates; it never talks to a socket or a disk directly. Every
//! capability it needs is expressed here as a trait that the host injects:
//!
//! - [`HttpClient`](http::HttpClient) - Executes HTTP requests built by the API clients
//! - [`CacheStore`](cache::CacheStore) / [`CacheList`](cache::CacheList) - Named lists of
//!   previously fetched domain objects
//!
//! Desktop hosts get ready-made adapters from `bridge-desktop`.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert their backend errors into it and keep the message actionable
//! (status codes, file paths, cache keys).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so the same handle can be shared
//! between the repository refresh task and readers.

pub mod cache;
pub mod error;
pub mod http;

pub use error::BridgeError;

// Re-export commonly used types
pub use cache::{CacheList, CacheStore};
pub use http::{HttpClient, HttpRequest, HttpResponse};
