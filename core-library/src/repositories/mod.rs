//! # Cache-backed Repositories
//!
//! A repository serves a collection from a local cache while a network
//! refresh runs in the background, and switches to the network-derived items
//! once a refresh has succeeded.
//!
//! ## Available Repositories
//!
//! - `TopicRepository` - Topics listed by the cloud API

pub mod topic;

pub use topic::{RepositoryState, TopicRepository};
