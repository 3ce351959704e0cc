//! Network client contracts consumed by the repository and the loader.
//!
//! HTTP-backed implementations live in [`crate::api`]; tests substitute mocks
//! or in-memory fakes.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::{Topic, Track};
use crate::playlist::Playlist;

/// Pages of topics, ending after the last page or at the first error.
pub type TopicPages = BoxStream<'static, Result<Vec<Topic>>>;

pub trait TopicClient: Send + Sync {
    /// Start fetching topics. Nothing is requested until the stream is polled.
    fn fetch_topics(&self) -> TopicPages;
}

#[async_trait]
pub trait TrackDetailClient: Send + Sync {
    /// Resolve a track stub into a playable track.
    ///
    /// `force_refresh` bypasses any server-side cache of the resolution.
    async fn fetch_track_detail(&self, track: &Track, force_refresh: bool) -> Result<Track>;
}

#[async_trait]
pub trait PlaylistifyClient: Send + Sync {
    /// Extract a playlist from the page at `target_url`.
    ///
    /// When the request fails and `error_on_failure` is false, completes
    /// with `Ok(None)` instead of an error.
    async fn playlistify(&self, target_url: &str, error_on_failure: bool)
        -> Result<Option<Playlist>>;
}
