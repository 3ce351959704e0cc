//! Local playlist: an ordered, index-addressable list of tracks with its own
//! change sink.

use core_runtime::events::{EventSink, PlaylistEvent, Receiver, DEFAULT_EVENT_BUFFER_SIZE};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;

use crate::models::{json_array, json_string, Track};

pub struct Playlist {
    id: String,
    title: String,
    tracks: RwLock<Vec<Track>>,
    events: EventSink<PlaylistEvent>,
}

impl Playlist {
    pub fn new(id: impl Into<String>, title: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self::with_buffer_size(id, title, tracks, DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// # Panics
    ///
    /// Panics if `buffer_size` is zero.
    pub fn with_buffer_size(
        id: impl Into<String>,
        title: impl Into<String>,
        tracks: Vec<Track>,
        buffer_size: usize,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tracks: RwLock::new(tracks),
            events: EventSink::new(buffer_size),
        }
    }

    /// Decode a playlistify response.
    pub fn from_json(json: &Value) -> Self {
        Self::new(
            json_string(json, "id"),
            json_string(json, "title"),
            json_array(json, "tracks").iter().map(Track::from_json).collect(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.read().is_empty()
    }

    pub fn track(&self, index: usize) -> Option<Track> {
        self.tracks.read().get(index).cloned()
    }

    /// Snapshot of every track, in playlist order.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.read().clone()
    }

    /// Replace the track at `index`. Returns `false` when out of range.
    pub fn update_track(&self, index: usize, track: Track) -> bool {
        match self.tracks.write().get_mut(index) {
            Some(slot) => {
                *slot = track;
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every track under a single write lock.
    pub fn update_all<F>(&self, mut f: F)
    where
        F: FnMut(&mut Track),
    {
        self.tracks.write().iter_mut().for_each(|track| f(track));
    }

    /// Sink carrying per-index change notifications.
    pub fn events(&self) -> &EventSink<PlaylistEvent> {
        &self.events
    }

    pub fn subscribe(&self) -> Receiver<PlaylistEvent> {
        self.events.subscribe()
    }
}

impl fmt::Debug for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Playlist")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use serde_json::json;

    fn track(identifier: &str) -> Track {
        Track::new(identifier, Provider::YouTube, "", identifier, None)
    }

    #[test]
    fn test_index_access() {
        let playlist = Playlist::new("p", "Mix", vec![track("a"), track("b")]);
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.track(1).unwrap().identifier, "b");
        assert!(playlist.track(2).is_none());
    }

    #[test]
    fn test_update_track() {
        let playlist = Playlist::new("p", "Mix", vec![track("a"), track("b")]);
        assert!(playlist.update_track(0, track("z")));
        assert!(!playlist.update_track(5, track("y")));
        let identifiers: Vec<_> = playlist.tracks().into_iter().map(|t| t.identifier).collect();
        assert_eq!(identifiers, vec!["z", "b"]);
    }

    #[test]
    fn test_from_json() {
        let playlist = Playlist::from_json(&json!({
            "id": "pl",
            "title": "From a blog",
            "tracks": [
                { "provider": "YouTube", "identifier": "a" },
                { "provider": "SoundCloud", "identifier": "b" }
            ]
        }));
        assert_eq!(playlist.id(), "pl");
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.track(1).unwrap().provider, Provider::SoundCloud);
    }

    #[tokio::test]
    async fn test_subscribe_receives_load() {
        let playlist = Playlist::new("p", "Mix", vec![track("a")]);
        let mut rx = playlist.subscribe();
        playlist.events().emit(PlaylistEvent::Load { index: 0 }).ok();
        assert_eq!(rx.recv().await.unwrap(), PlaylistEvent::Load { index: 0 });
    }
}
