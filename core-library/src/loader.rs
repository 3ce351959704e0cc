//! # Playlist Loader
//!
//! Resolves the tracks of a [`Playlist`] one at a time, in playlist order.
//!
//! ## Flow
//!
//! 1. Every track is checked for expiry up front; expired tracks become stubs
//!    again.
//! 2. The `(index, track)` pairs are fixed in playlist order.
//! 3. Each pair is resolved with the detail client; the next request starts
//!    only after the previous one completed.
//! 4. Each resolved track is written back into the playlist, announced as
//!    [`LibraryEvent::TrackUpdated`] on the bus and as
//!    [`PlaylistEvent::Load`] on the playlist's own sink, before the next
//!    request starts.
//!
//! Disposing the loader (or dropping it) cancels the in-flight request and
//! stops the cursor. Tracks resolved so far stay resolved.

use chrono::Utc;
use core_runtime::events::PlaylistEvent;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::client::TrackDetailClient;
use crate::error::Result;
use crate::events::{EventBus, LibraryEvent};
use crate::models::Track;
use crate::playlist::Playlist;

/// What to do when one track fails to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// The failure ends the whole resolution.
    #[default]
    AbortOnFailure,
    /// The failed track is logged and skipped.
    SkipFailed,
}

/// Resolved `(index, track)` pairs in strictly increasing index order.
pub type ResolvedTracks = BoxStream<'static, Result<(usize, Track)>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Number of tracks in the playlist when resolution started.
    pub total: usize,
    /// Indices resolved, in order.
    pub resolved: Vec<usize>,
    /// Whether the loader was disposed before the end.
    pub cancelled: bool,
}

impl ResolutionSummary {
    pub fn is_complete(&self) -> bool {
        self.resolved.len() == self.total
    }
}

pub struct PlaylistLoader {
    playlist: Arc<Playlist>,
    client: Arc<dyn TrackDetailClient>,
    bus: EventBus,
    policy: ResolutionPolicy,
    force_refresh: bool,
    cancellation_token: CancellationToken,
}

impl PlaylistLoader {
    pub fn new(playlist: Arc<Playlist>, client: Arc<dyn TrackDetailClient>, bus: EventBus) -> Self {
        Self {
            playlist,
            client,
            bus,
            policy: ResolutionPolicy::default(),
            force_refresh: false,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ask the detail client to bypass its cache.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Cancel the in-flight request and stop resolving.
    pub fn dispose(&self) {
        if !self.cancellation_token.is_cancelled() {
            debug!(playlist_id = %self.playlist.id(), "Disposing playlist loader");
            self.cancellation_token.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Start resolving the playlist.
    ///
    /// Expired tracks are reset immediately; detail requests are issued only
    /// while the returned stream is polled. Under
    /// [`ResolutionPolicy::AbortOnFailure`] the first failure is yielded as
    /// the final item.
    pub fn fetch_tracks(&self) -> ResolvedTracks {
        let now = Utc::now();
        let mut expired = 0usize;
        self.playlist.update_all(|track| {
            if track.check_expire(now) {
                expired += 1;
            }
        });
        if expired > 0 {
            debug!(playlist_id = %self.playlist.id(), expired, "Reset expired tracks");
        }

        let cursor = ResolutionCursor {
            pairs: self.playlist.tracks().into_iter().enumerate().collect(),
            position: 0,
            finished: false,
            playlist: Arc::clone(&self.playlist),
            client: Arc::clone(&self.client),
            bus: self.bus.clone(),
            policy: self.policy,
            force_refresh: self.force_refresh,
            cancellation_token: self.cancellation_token.clone(),
        };

        stream::unfold(cursor, |mut cursor| async move {
            let item = cursor.advance().await?;
            Some((item, cursor))
        })
        .boxed()
    }

    /// Resolve every track, returning once the cursor stops.
    ///
    /// # Errors
    ///
    /// Returns the first failure under [`ResolutionPolicy::AbortOnFailure`].
    #[instrument(skip(self), fields(playlist_id = %self.playlist.id()))]
    pub async fn resolve_all(&self) -> Result<ResolutionSummary> {
        let total = self.playlist.len();
        let mut resolved = Vec::with_capacity(total);

        let mut tracks = self.fetch_tracks();
        while let Some(item) = tracks.next().await {
            let (index, _) = item?;
            resolved.push(index);
        }

        let summary = ResolutionSummary {
            total,
            resolved,
            cancelled: self.is_disposed(),
        };
        info!(
            resolved = summary.resolved.len(),
            total,
            cancelled = summary.cancelled,
            "Playlist resolution finished"
        );
        Ok(summary)
    }
}

impl Drop for PlaylistLoader {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

struct ResolutionCursor {
    pairs: Vec<(usize, Track)>,
    position: usize,
    finished: bool,
    playlist: Arc<Playlist>,
    client: Arc<dyn TrackDetailClient>,
    bus: EventBus,
    policy: ResolutionPolicy,
    force_refresh: bool,
    cancellation_token: CancellationToken,
}

impl ResolutionCursor {
    async fn advance(&mut self) -> Option<Result<(usize, Track)>> {
        while !self.finished {
            let Some((index, track)) = self.pairs.get(self.position).cloned() else {
                self.finished = true;
                break;
            };
            self.position += 1;

            let fetched = tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => None,
                result = self.client.fetch_track_detail(&track, self.force_refresh) => Some(result),
            };
            let Some(fetched) = fetched else {
                debug!(index, "Track resolution cancelled");
                self.finished = true;
                return None;
            };

            match fetched {
                Ok(resolved) => {
                    self.publish(index, &resolved);
                    return Some(Ok((index, resolved)));
                }
                Err(e) => match self.policy {
                    ResolutionPolicy::AbortOnFailure => {
                        error!(index, error = %e, "Track resolution failed");
                        self.finished = true;
                        return Some(Err(e));
                    }
                    ResolutionPolicy::SkipFailed => {
                        warn!(index, error = %e, "Skipping track that failed to resolve");
                    }
                },
            }
        }
        None
    }

    fn publish(&self, index: usize, track: &Track) {
        self.playlist.update_track(index, track.clone());

        let updated = LibraryEvent::TrackUpdated {
            playlist_id: self.playlist.id().to_string(),
            index,
            track: track.clone(),
        };
        if self.bus.emit(updated).is_err() {
            trace!("No subscribers for track updates");
        }
        if self.playlist.events().emit(PlaylistEvent::Load { index }).is_err() {
            trace!("No subscribers for playlist loads");
        }
        debug!(index, "Track resolved");
    }
}
