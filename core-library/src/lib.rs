//! # Feeder Library
//!
//! Domain layer of the feeder core: models, resource decoding, the cached
//! topic repository and the playlist track loader.
//!
//! ## Overview
//!
//! - [`resource`] - Decodes cloud API resources into a closed set of items
//! - [`repositories`] - `TopicRepository`, served from cache while a refresh
//!   runs in the background
//! - [`loader`] - `PlaylistLoader`, sequential track resolution with per-index
//!   notifications
//! - [`client`] - Network client contracts; [`api`] implements them over the
//!   `HttpClient` bridge
//!
//! Storage and transport are injected through `bridge-traits`; nothing here
//! touches a disk or a socket directly.

pub mod api;
pub mod client;
pub mod error;
pub mod events;
pub mod loader;
pub mod models;
pub mod playlist;
pub mod repositories;
pub mod resource;

pub use client::{PlaylistifyClient, TopicClient, TopicPages, TrackDetailClient};
pub use error::{LibraryError, Result};
pub use events::{EventBus, LibraryEvent};
pub use loader::{PlaylistLoader, ResolutionPolicy, ResolutionSummary, ResolvedTracks};
pub use models::{Album, Entry, Link, Provider, ServicePlaylist, Topic, Track, TrackStatus};
pub use playlist::Playlist;
pub use repositories::{RepositoryState, TopicRepository};
pub use resource::{ItemType, MixSortType, Period, Resource, ResourceItem, ResourceType, Stream};
