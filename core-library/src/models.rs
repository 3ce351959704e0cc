//! Domain models for the feeder core
//!
//! Records decoded from cloud API and pink-spider payloads. Decoding is
//! lenient throughout: a missing string field becomes empty, a missing or
//! malformed number becomes 0, and absent optional fields stay `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::playlist::Playlist;

// =============================================================================
// Lenient JSON accessors
// =============================================================================

pub(crate) fn json_string(json: &Value, key: &str) -> String {
    json.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

pub(crate) fn json_opt_string(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Integer field; numeric strings are accepted, anything else reads as 0.
pub(crate) fn json_int(json: &Value, key: &str) -> i64 {
    match json.get(key) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub(crate) fn json_array<'a>(json: &'a Value, key: &str) -> &'a [Value] {
    json.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// =============================================================================
// Streams
// =============================================================================

/// Topic as listed by the cloud API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

impl Topic {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
        }
    }

    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            label: json_string(json, "label"),
            description: json_opt_string(json, "description"),
        }
    }
}

/// Curated journal (a publication followed as a stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
}

impl Journal {
    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            label: json_string(json, "label"),
            description: json_opt_string(json, "description"),
        }
    }
}

/// Keyword, user tag or global tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub label: String,
}

impl Tag {
    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            label: json_string(json, "label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
}

impl Category {
    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            label: json_string(json, "label"),
        }
    }
}

// =============================================================================
// Tracks
// =============================================================================

/// Service a track is hosted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Provider {
    YouTube,
    SoundCloud,
    AppleMusic,
    Spotify,
    /// Direct media URL.
    #[default]
    Raw,
}

impl Provider {
    /// Parse a provider tag, case-insensitively. Unknown tags map to `Raw`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "youtube" => Provider::YouTube,
            "soundcloud" => Provider::SoundCloud,
            "applemusic" => Provider::AppleMusic,
            "spotify" => Provider::Spotify,
            _ => Provider::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::YouTube => "YouTube",
            Provider::SoundCloud => "SoundCloud",
            Provider::AppleMusic => "AppleMusic",
            Provider::Spotify => "Spotify",
            Provider::Raw => "Raw",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution status of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Stub, detail not fetched yet (or expired).
    #[default]
    Init,
    Loading,
    Available,
    Unavailable,
}

impl TrackStatus {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "init" => Some(TrackStatus::Init),
            "loading" => Some(TrackStatus::Loading),
            "available" => Some(TrackStatus::Available),
            "unavailable" => Some(TrackStatus::Unavailable),
            _ => None,
        }
    }
}

/// A playable item.
///
/// Starts life as a lazy stub (see [`Track::from_url`]) and is completed in
/// place once its detail has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub provider: Provider,
    /// Provider-specific identifier (video id, permalink, media URL).
    pub identifier: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub artwork_url: Option<String>,
    /// Duration in seconds
    pub duration: i64,
    pub status: TrackStatus,
    /// Resolved media URL, present once the detail has been fetched.
    pub stream_url: Option<String>,
    /// Unix timestamp after which `stream_url` must be re-resolved.
    pub expires_at: Option<i64>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        provider: Provider,
        url: impl Into<String>,
        identifier: impl Into<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            identifier: identifier.into(),
            url: url.into(),
            title,
            description: None,
            thumbnail_url: None,
            artwork_url: None,
            duration: 0,
            status: TrackStatus::Init,
            stream_url: None,
            expires_at: None,
        }
    }

    /// Build a lazy stub from an enclosure href.
    ///
    /// The last path segment becomes the id; `provider`, `identifier`,
    /// `title` and `duration` are read from the query string when present.
    /// An href that is not a valid URL yields a `Raw` track pointing at it.
    pub fn from_url(href: &str) -> Self {
        let mut track = Track::new("", Provider::Raw, href, href, None);
        let Ok(url) = Url::parse(href) else {
            return track;
        };

        if let Some(id) = url
            .path_segments()
            .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        {
            track.id = id.to_string();
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "provider" => track.provider = Provider::from_tag(&value),
                "identifier" if !value.is_empty() => track.identifier = value.into_owned(),
                "title" if !value.is_empty() => track.title = Some(value.into_owned()),
                "duration" => track.duration = value.parse().unwrap_or(0),
                _ => {}
            }
        }
        track
    }

    pub fn from_json(json: &Value) -> Self {
        let expires_at = json_int(json, "expires_at");
        Self {
            id: json_string(json, "id"),
            provider: Provider::from_tag(&json_string(json, "provider")),
            identifier: json_string(json, "identifier"),
            url: json_string(json, "url"),
            title: json_opt_string(json, "title"),
            description: json_opt_string(json, "description"),
            thumbnail_url: json_opt_string(json, "thumbnail_url"),
            artwork_url: json_opt_string(json, "artwork_url"),
            duration: json_int(json, "duration"),
            status: json
                .get("status")
                .and_then(Value::as_str)
                .and_then(TrackStatus::from_tag)
                .unwrap_or_default(),
            stream_url: json_opt_string(json, "stream_url"),
            expires_at: (expires_at > 0).then_some(expires_at),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == TrackStatus::Available
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map_or(false, |expires_at| expires_at <= now.timestamp())
    }

    /// Reset an expired track back to a stub so it gets resolved again.
    ///
    /// Returns whether the track had expired.
    pub fn check_expire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_expired(now) {
            return false;
        }
        self.status = TrackStatus::Init;
        self.stream_url = None;
        self.expires_at = None;
        true
    }

    /// Merge a fetched detail into this track.
    ///
    /// Fields the detail leaves empty keep their current value. A detail
    /// without an explicit status marks the track available.
    pub fn apply_detail(&mut self, detail: Track) {
        if !detail.id.is_empty() {
            self.id = detail.id;
        }
        if !detail.identifier.is_empty() {
            self.provider = detail.provider;
            self.identifier = detail.identifier;
        }
        if !detail.url.is_empty() {
            self.url = detail.url;
        }
        self.title = detail.title.or(self.title.take());
        self.description = detail.description.or(self.description.take());
        self.thumbnail_url = detail.thumbnail_url.or(self.thumbnail_url.take());
        self.artwork_url = detail.artwork_url.or(self.artwork_url.take());
        if detail.duration > 0 {
            self.duration = detail.duration;
        }
        self.status = match detail.status {
            TrackStatus::Init => TrackStatus::Available,
            status => status,
        };
        self.stream_url = detail.stream_url;
        self.expires_at = detail.expires_at;
    }
}

// =============================================================================
// Albums and service playlists
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub provider: Provider,
    pub identifier: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub artwork_url: Option<String>,
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            provider: Provider::from_tag(&json_string(json, "provider")),
            identifier: json_string(json, "identifier"),
            url: json_string(json, "url"),
            title: json_string(json, "title"),
            description: json_opt_string(json, "description"),
            thumbnail_url: json_opt_string(json, "thumbnail_url"),
            artwork_url: json_opt_string(json, "artwork_url"),
            tracks: json_array(json, "tracks").iter().map(Track::from_json).collect(),
        }
    }
}

/// Playlist hosted by a music service, as opposed to a local [`Playlist`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlaylist {
    pub id: String,
    pub provider: Provider,
    pub identifier: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub artwork_url: Option<String>,
    pub tracks: Vec<Track>,
}

impl ServicePlaylist {
    pub fn from_json(json: &Value) -> Self {
        Self {
            id: json_string(json, "id"),
            provider: Provider::from_tag(&json_string(json, "provider")),
            identifier: json_string(json, "identifier"),
            url: json_string(json, "url"),
            title: json_string(json, "title"),
            description: json_opt_string(json, "description"),
            thumbnail_url: json_opt_string(json, "thumbnail_url"),
            artwork_url: json_opt_string(json, "artwork_url"),
            tracks: json_array(json, "tracks").iter().map(Track::from_json).collect(),
        }
    }

    pub fn to_playlist(&self) -> Playlist {
        Playlist::new(self.id.clone(), self.title.clone(), self.tracks.clone())
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Link attached to an entry (alternate page or enclosure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    /// MIME type, `type` in the wire format.
    #[serde(rename = "type")]
    pub content_type: String,
    pub length: i64,
}

impl Link {
    pub fn new(href: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            content_type: content_type.into(),
            length: 0,
        }
    }

    pub fn from_json(json: &Value) -> Self {
        Self {
            href: json_string(json, "href"),
            content_type: json_string(json, "type"),
            length: json_int(json, "length"),
        }
    }
}

/// Feed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: Option<String>,
    pub alternate: Vec<Link>,
    pub enclosure: Option<Vec<Link>>,
    /// Publication time, unix milliseconds
    pub published: i64,
    #[serde(skip)]
    tracks: OnceLock<Vec<Track>>,
}

impl Entry {
    pub fn new(
        id: impl Into<String>,
        title: Option<String>,
        alternate: Vec<Link>,
        enclosure: Option<Vec<Link>>,
        published: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title,
            alternate,
            enclosure,
            published,
            tracks: OnceLock::new(),
        }
    }

    pub fn from_json(json: &Value) -> Self {
        let enclosure = json
            .get("enclosure")
            .and_then(Value::as_array)
            .map(|links| links.iter().map(Link::from_json).collect());
        Self::new(
            json_string(json, "id"),
            json_opt_string(json, "title"),
            json_array(json, "alternate").iter().map(Link::from_json).collect(),
            enclosure,
            json_int(json, "published"),
        )
    }

    /// First alternate link, if it parses as a URL.
    pub fn url(&self) -> Option<Url> {
        self.alternate
            .first()
            .and_then(|link| Url::parse(&link.href).ok())
    }

    fn enclosures_of<'a>(&'a self, content_type: &'a str) -> impl Iterator<Item = &'a Link> {
        self.enclosure
            .iter()
            .flatten()
            .filter(move |link| link.content_type.contains(content_type))
    }

    /// Track stubs for the entry's JSON enclosures. Computed on first read.
    pub fn tracks(&self) -> &[Track] {
        self.tracks.get_or_init(|| {
            self.enclosures_of("application/json")
                .map(|link| Track::from_url(&link.href))
                .collect()
        })
    }

    /// Direct audio enclosures, as raw tracks titled after the entry.
    pub fn audio_tracks(&self) -> Vec<Track> {
        self.enclosures_of("audio")
            .map(|link| {
                Track::new(
                    "",
                    Provider::Raw,
                    link.href.clone(),
                    link.href.clone(),
                    self.title.clone(),
                )
            })
            .collect()
    }

    pub fn to_playlist(&self) -> Playlist {
        Playlist::new(
            format!("playlist_{}", self.id),
            self.title.clone().unwrap_or_default(),
            self.tracks().to_vec(),
        )
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.alternate == other.alternate
            && self.enclosure == other.enclosure
            && self.published == other.published
    }
}

impl Eq for Entry {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(timestamp: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(timestamp, 0).unwrap()
    }

    #[test]
    fn test_lenient_accessors() {
        let json = json!({ "a": "x", "n": 12, "s": "34", "f": 5.9, "bad": "nope" });
        assert_eq!(json_string(&json, "a"), "x");
        assert_eq!(json_string(&json, "missing"), "");
        assert_eq!(json_int(&json, "n"), 12);
        assert_eq!(json_int(&json, "s"), 34);
        assert_eq!(json_int(&json, "f"), 5);
        assert_eq!(json_int(&json, "bad"), 0);
        assert!(json_array(&json, "a").is_empty());
    }

    #[test]
    fn test_topic_from_json() {
        let topic = Topic::from_json(&json!({ "id": "topic/rock", "label": "Rock" }));
        assert_eq!(topic, Topic::new("topic/rock", "Rock"));
    }

    #[test]
    fn test_provider_from_tag() {
        assert_eq!(Provider::from_tag("YouTube"), Provider::YouTube);
        assert_eq!(Provider::from_tag("soundcloud"), Provider::SoundCloud);
        assert_eq!(Provider::from_tag("bandcamp"), Provider::Raw);
        assert_eq!(Provider::SoundCloud.to_string(), "SoundCloud");
    }

    #[test]
    fn test_track_from_url() {
        let track = Track::from_url(
            "https://pink-spider.example.com/v1/tracks/abc123?provider=YouTube&identifier=dQw4w9WgXcQ&title=Never%20Gonna",
        );
        assert_eq!(track.id, "abc123");
        assert_eq!(track.provider, Provider::YouTube);
        assert_eq!(track.identifier, "dQw4w9WgXcQ");
        assert_eq!(track.title.as_deref(), Some("Never Gonna"));
        assert_eq!(track.status, TrackStatus::Init);
    }

    #[test]
    fn test_track_from_invalid_url() {
        let track = Track::from_url("not a url");
        assert_eq!(track.provider, Provider::Raw);
        assert_eq!(track.identifier, "not a url");
        assert!(track.id.is_empty());
    }

    #[test]
    fn test_track_from_json() {
        let track = Track::from_json(&json!({
            "id": "t1",
            "provider": "SoundCloud",
            "identifier": "123",
            "url": "https://soundcloud.com/a/b",
            "title": "B",
            "duration": "215",
            "status": "available",
            "stream_url": "https://cdn.example.com/b.mp3",
            "expires_at": 1_700_000_000
        }));
        assert_eq!(track.provider, Provider::SoundCloud);
        assert_eq!(track.duration, 215);
        assert!(track.is_resolved());
        assert_eq!(track.expires_at, Some(1_700_000_000));
    }

    #[test]
    fn test_check_expire() {
        let mut track = Track::new("t", Provider::YouTube, "u", "id", None);
        track.status = TrackStatus::Available;
        track.stream_url = Some("https://cdn.example.com/x".to_string());
        track.expires_at = Some(1_000);

        assert!(!track.check_expire(at(999)));
        assert!(track.is_resolved());

        assert!(track.check_expire(at(1_000)));
        assert_eq!(track.status, TrackStatus::Init);
        assert!(track.stream_url.is_none());
        assert!(track.expires_at.is_none());
    }

    #[test]
    fn test_track_without_expiry_never_expires() {
        let mut track = Track::new("t", Provider::Raw, "u", "u", None);
        assert!(!track.check_expire(at(i64::MAX / 2)));
    }

    #[test]
    fn test_apply_detail_keeps_missing_fields() {
        let mut stub = Track::from_url("https://ps.example.com/tracks/t9?provider=YouTube&identifier=v&title=Stub");
        let mut detail = Track::new("", Provider::YouTube, "", "", None);
        detail.stream_url = Some("https://cdn.example.com/v".to_string());
        detail.duration = 180;

        stub.apply_detail(detail);
        assert_eq!(stub.id, "t9");
        assert_eq!(stub.identifier, "v");
        assert_eq!(stub.title.as_deref(), Some("Stub"));
        assert_eq!(stub.duration, 180);
        assert_eq!(stub.status, TrackStatus::Available);
    }

    fn entry_with_enclosures() -> Entry {
        Entry::new(
            "e1",
            Some("Mixtape".to_string()),
            vec![Link::new("https://blog.example.com/post", "text/html")],
            Some(vec![
                Link::new("https://ps.example.com/tracks/1?provider=YouTube&identifier=a", "application/json"),
                Link::new("https://media.example.com/b.mp3", "audio/mpeg"),
                Link::new("https://ps.example.com/tracks/2?provider=SoundCloud&identifier=c", "application/json; charset=utf-8"),
            ]),
            0,
        )
    }

    #[test]
    fn test_entry_tracks_filters_json_enclosures() {
        let entry = entry_with_enclosures();
        let tracks = entry.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].identifier, "a");
        assert_eq!(tracks[1].provider, Provider::SoundCloud);
    }

    #[test]
    fn test_entry_tracks_memoized() {
        let entry = entry_with_enclosures();
        let first = entry.tracks().as_ptr();
        let second = entry.tracks().as_ptr();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entry_without_enclosure() {
        let entry = Entry::from_json(&json!({ "id": "e2" }));
        assert!(entry.tracks().is_empty());
        assert!(entry.audio_tracks().is_empty());
        assert!(entry.url().is_none());
    }

    #[test]
    fn test_entry_audio_tracks() {
        let entry = entry_with_enclosures();
        let audio = entry.audio_tracks();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].provider, Provider::Raw);
        assert_eq!(audio[0].url, "https://media.example.com/b.mp3");
        assert_eq!(audio[0].title.as_deref(), Some("Mixtape"));
    }

    #[test]
    fn test_entry_to_playlist() {
        let entry = entry_with_enclosures();
        let playlist = entry.to_playlist();
        assert_eq!(playlist.id(), "playlist_e1");
        assert_eq!(playlist.title(), "Mixtape");
        assert_eq!(playlist.len(), 2);

        let untitled = Entry::new("e3", None, vec![], None, 0);
        assert_eq!(untitled.to_playlist().title(), "");
    }

    #[test]
    fn test_entry_from_json() {
        let entry = Entry::from_json(&json!({
            "id": "e4",
            "title": "Post",
            "alternate": [{ "href": "https://blog.example.com/p", "type": "text/html" }],
            "enclosure": [{ "href": "https://m.example.com/x.mp3", "type": "audio/mpeg", "length": "1024" }],
            "published": 1_600_000_000_000i64
        }));
        assert_eq!(entry.url().unwrap().as_str(), "https://blog.example.com/p");
        assert_eq!(entry.enclosure.as_ref().unwrap()[0].length, 1024);
        assert_eq!(entry.published, 1_600_000_000_000);
    }

    #[test]
    fn test_album_from_json() {
        let album = Album::from_json(&json!({
            "id": "al1",
            "provider": "Spotify",
            "identifier": "xyz",
            "title": "Record",
            "tracks": [{ "id": "t1", "provider": "Spotify", "identifier": "s1" }]
        }));
        assert_eq!(album.provider, Provider::Spotify);
        assert_eq!(album.tracks.len(), 1);
        assert!(album.url.is_empty());
    }
}
