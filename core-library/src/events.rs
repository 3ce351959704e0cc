//! Process-wide domain events.
//!
//! Track resolution reports on the bus in addition to the playlist's own sink,
//! so that observers holding a different view of the same track (a player
//! queue, an album screen) can refresh it.

use core_runtime::events::EventSink;
use serde::{Deserialize, Serialize};

use crate::models::Track;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A track was resolved inside the playlist `playlist_id`.
    TrackUpdated {
        playlist_id: String,
        index: usize,
        track: Track,
    },
}

/// Process-wide event bus, owned by the service layer and injected into every
/// loader.
pub type EventBus = EventSink<LibraryEvent>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    #[test]
    fn test_track_updated_serialization() {
        let event = LibraryEvent::TrackUpdated {
            playlist_id: "p".to_string(),
            index: 2,
            track: Track::new("t", Provider::Raw, "u", "u", None),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "TrackUpdated");
        assert_eq!(json["index"], 2);
    }
}
