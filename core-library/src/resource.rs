//! # Resource Decoding
//!
//! Turns a resource payload from the cloud API into a [`Resource`] whose
//! `item` is one of a closed set of [`ResourceItem`] variants.
//!
//! Decoding is total: an unknown `resource_type` degrades to
//! [`ResourceType::Custom`], and an item that cannot be built for its
//! `(resource_type, item_type)` pair is simply absent. Neither is an error.
//!
//! | resource type | item type required | item |
//! |---|---|---|
//! | `stream`, `track_stream`, `album_stream`, `playlist_stream` | stream-shaped | `(Stream, Period)` |
//! | `mix`, `track_mix`, `album_mix`, `playlist_mix` | stream-shaped | `(Stream, Period, MixSortType)` |
//! | `entry`, `track`, `album`, `playlist` | the matching atomic type | atomic record |
//! | `custom` | - | none |

use serde_json::{Map, Value};

use crate::models::{json_int, json_string, Album, Category, Entry, Journal, ServicePlaylist, Tag, Topic, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Stream,
    TrackStream,
    AlbumStream,
    PlaylistStream,
    Entry,
    Track,
    Album,
    Playlist,
    Custom,
    Mix,
    TrackMix,
    AlbumMix,
    PlaylistMix,
}

impl ResourceType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "stream" => ResourceType::Stream,
            "track_stream" => ResourceType::TrackStream,
            "album_stream" => ResourceType::AlbumStream,
            "playlist_stream" => ResourceType::PlaylistStream,
            "entry" => ResourceType::Entry,
            "track" => ResourceType::Track,
            "album" => ResourceType::Album,
            "playlist" => ResourceType::Playlist,
            "custom" => ResourceType::Custom,
            "mix" => ResourceType::Mix,
            "track_mix" => ResourceType::TrackMix,
            "album_mix" => ResourceType::AlbumMix,
            "playlist_mix" => ResourceType::PlaylistMix,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Stream => "stream",
            ResourceType::TrackStream => "track_stream",
            ResourceType::AlbumStream => "album_stream",
            ResourceType::PlaylistStream => "playlist_stream",
            ResourceType::Entry => "entry",
            ResourceType::Track => "track",
            ResourceType::Album => "album",
            ResourceType::Playlist => "playlist",
            ResourceType::Custom => "custom",
            ResourceType::Mix => "mix",
            ResourceType::TrackMix => "track_mix",
            ResourceType::AlbumMix => "album_mix",
            ResourceType::PlaylistMix => "playlist_mix",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Journal,
    Topic,
    Keyword,
    Tag,
    Category,
    Entry,
    Track,
    Album,
    Playlist,
    GlobalTag,
}

impl ItemType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "journal" => ItemType::Journal,
            "topic" => ItemType::Topic,
            "keyword" => ItemType::Keyword,
            "tag" => ItemType::Tag,
            "category" => ItemType::Category,
            "entry" => ItemType::Entry,
            "track" => ItemType::Track,
            "album" => ItemType::Album,
            "playlist" => ItemType::Playlist,
            "global_tag" => ItemType::GlobalTag,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Journal => "journal",
            ItemType::Topic => "topic",
            ItemType::Keyword => "keyword",
            ItemType::Tag => "tag",
            ItemType::Category => "category",
            ItemType::Entry => "entry",
            ItemType::Track => "track",
            ItemType::Album => "album",
            ItemType::Playlist => "playlist",
            ItemType::GlobalTag => "global_tag",
        }
    }
}

/// Time window of a stream or mix. Missing or unknown tags read as `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    Today,
    Yesterday,
    Week,
    Month,
    #[default]
    Default,
}

impl Period {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "today" => Period::Today,
            "yesterday" => Period::Yesterday,
            "week" => Period::Week,
            "month" => Period::Month,
            "default" => Period::Default,
            _ => return None,
        })
    }

    /// Reads `period` from a resource's options.
    pub fn from_options(options: &Value) -> Self {
        options
            .get("period")
            .and_then(Value::as_str)
            .and_then(Self::from_tag)
            .unwrap_or_default()
    }
}

/// Ranking of a mix. Missing or unknown tags read as `Hot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MixSortType {
    #[default]
    Hot,
    Popular,
    Featured,
}

impl MixSortType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "hot" => MixSortType::Hot,
            "popular" => MixSortType::Popular,
            "featured" => MixSortType::Featured,
            _ => return None,
        })
    }

    /// Reads `type` from a resource's options.
    pub fn from_options(options: &Value) -> Self {
        options
            .get("type")
            .and_then(Value::as_str)
            .and_then(Self::from_tag)
            .unwrap_or_default()
    }
}

/// Anything that can be followed as a stream of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stream {
    Journal(Journal),
    Topic(Topic),
    /// Keywords and global tags decode as tags too.
    Tag(Tag),
    Category(Category),
}

impl Stream {
    /// Build the stream variant selected by `item_type`, or `None` when the
    /// item type does not denote a stream.
    pub fn build(item_type: ItemType, json: &Value) -> Option<Self> {
        match item_type {
            ItemType::Journal => Some(Stream::Journal(Journal::from_json(json))),
            ItemType::Topic => Some(Stream::Topic(Topic::from_json(json))),
            ItemType::Keyword | ItemType::Tag | ItemType::GlobalTag => {
                Some(Stream::Tag(Tag::from_json(json)))
            }
            ItemType::Category => Some(Stream::Category(Category::from_json(json))),
            ItemType::Entry | ItemType::Track | ItemType::Album | ItemType::Playlist => None,
        }
    }

    pub fn stream_id(&self) -> &str {
        match self {
            Stream::Journal(journal) => &journal.id,
            Stream::Topic(topic) => &topic.id,
            Stream::Tag(tag) => &tag.id,
            Stream::Category(category) => &category.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Stream::Journal(journal) => &journal.label,
            Stream::Topic(topic) => &topic.label,
            Stream::Tag(tag) => &tag.label,
            Stream::Category(category) => &category.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceItem {
    Stream(Stream, Period),
    TrackStream(Stream, Period),
    AlbumStream(Stream, Period),
    PlaylistStream(Stream, Period),
    Mix(Stream, Period, MixSortType),
    TrackMix(Stream, Period, MixSortType),
    AlbumMix(Stream, Period, MixSortType),
    PlaylistMix(Stream, Period, MixSortType),
    Entry(Entry),
    Track(Track),
    Album(Album),
    Playlist(ServicePlaylist),
}

impl ResourceItem {
    /// Build the item for a resource.
    ///
    /// Returns `None` when `item` is null, when `item_type` is absent, when a
    /// stream or mix resource carries a non-stream item type, when an atomic
    /// resource carries a different item type, and for `custom` resources.
    pub fn new(
        resource_type: ResourceType,
        item_type: Option<ItemType>,
        item: &Value,
        options: &Value,
    ) -> Option<Self> {
        if item.is_null() {
            return None;
        }
        let item_type = item_type?;

        let stream = || Stream::build(item_type, item);
        let period = || Period::from_options(options);
        let sort = || MixSortType::from_options(options);

        let built = match resource_type {
            ResourceType::Stream => ResourceItem::Stream(stream()?, period()),
            ResourceType::TrackStream => ResourceItem::TrackStream(stream()?, period()),
            ResourceType::AlbumStream => ResourceItem::AlbumStream(stream()?, period()),
            ResourceType::PlaylistStream => ResourceItem::PlaylistStream(stream()?, period()),
            ResourceType::Mix => ResourceItem::Mix(stream()?, period(), sort()),
            ResourceType::TrackMix => ResourceItem::TrackMix(stream()?, period(), sort()),
            ResourceType::AlbumMix => ResourceItem::AlbumMix(stream()?, period(), sort()),
            ResourceType::PlaylistMix => ResourceItem::PlaylistMix(stream()?, period(), sort()),
            ResourceType::Entry if item_type == ItemType::Entry => {
                ResourceItem::Entry(Entry::from_json(item))
            }
            ResourceType::Track if item_type == ItemType::Track => {
                ResourceItem::Track(Track::from_json(item))
            }
            ResourceType::Album if item_type == ItemType::Album => {
                ResourceItem::Album(Album::from_json(item))
            }
            ResourceType::Playlist if item_type == ItemType::Playlist => {
                ResourceItem::Playlist(ServicePlaylist::from_json(item))
            }
            ResourceType::Entry
            | ResourceType::Track
            | ResourceType::Album
            | ResourceType::Playlist
            | ResourceType::Custom => return None,
        };
        Some(built)
    }

    /// The stream carried by stream and mix items.
    pub fn stream(&self) -> Option<&Stream> {
        match self {
            ResourceItem::Stream(stream, _)
            | ResourceItem::TrackStream(stream, _)
            | ResourceItem::AlbumStream(stream, _)
            | ResourceItem::PlaylistStream(stream, _)
            | ResourceItem::Mix(stream, _, _)
            | ResourceItem::TrackMix(stream, _, _)
            | ResourceItem::AlbumMix(stream, _, _)
            | ResourceItem::PlaylistMix(stream, _, _) => Some(stream),
            ResourceItem::Entry(_)
            | ResourceItem::Track(_)
            | ResourceItem::Album(_)
            | ResourceItem::Playlist(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Externally assigned; unique within a `(resource_type, item_type)` pair.
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub engagement: i64,
    pub item_type: Option<ItemType>,
    pub item: Option<ResourceItem>,
    pub options: Option<Map<String, Value>>,
}

impl Resource {
    pub fn decode(json: &Value) -> Self {
        let resource_type = json
            .get("resource_type")
            .and_then(Value::as_str)
            .and_then(ResourceType::from_tag)
            .unwrap_or(ResourceType::Custom);
        let item_type = json
            .get("item_type")
            .and_then(Value::as_str)
            .and_then(ItemType::from_tag);
        let item = json.get("item").unwrap_or(&Value::Null);
        let options = json.get("options").unwrap_or(&Value::Null);

        Self {
            resource_id: json_string(json, "resource_id"),
            resource_type,
            engagement: json_int(json, "engagement"),
            item_type,
            item: ResourceItem::new(resource_type, item_type, item, options),
            options: options.as_object().cloned(),
        }
    }
}

/// Decode every element of a JSON array; a non-array payload yields nothing.
pub fn decode_all(json: &Value) -> Vec<Resource> {
    json.as_array()
        .map(|resources| resources.iter().map(Resource::decode).collect())
        .unwrap_or_default()
}
