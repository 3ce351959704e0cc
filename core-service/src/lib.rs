//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP client, cache store) into
//! the feeder core and owns the process-wide [`EventBus`]. Desktop apps
//! typically enable the `desktop-shims` feature, which supplies a
//! `ReqwestHttpClient` and a JSON file cache through `bridge-desktop`.
//!
//! ## Lifecycle
//!
//! Construction runs in a fixed order: configuration is validated, the event
//! bus is created, the network clients are built on the configured
//! `HttpClient`, and finally the topic repository loads its cache. Shutting
//! down disposes every loader handed out, cancels any topic refresh, and then
//! releases the bus.

pub mod error;

pub use error::{CoreError, Result};

use std::fmt;
use std::sync::{Arc, Weak};

use bridge_traits::cache::CacheStore;
use core_library::api::{CloudApiClient, PinkSpiderClient};
use core_library::{
    EventBus, LibraryEvent, Playlist, PlaylistLoader, PlaylistifyClient, ResolutionPolicy,
    Resource, Topic, TopicClient, TopicRepository, TrackDetailClient,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventSink, Receiver};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

/// Bridges and client overrides the core requires.
///
/// Only the topic cache is mandatory; network clients default to the
/// HTTP-backed implementations built from [`CoreConfig`].
pub struct CoreDependencies {
    pub topic_cache: Arc<dyn CacheStore<Topic>>,
    pub topic_client: Option<Arc<dyn TopicClient>>,
    pub track_detail_client: Option<Arc<dyn TrackDetailClient>>,
    pub playlistify_client: Option<Arc<dyn PlaylistifyClient>>,
}

impl CoreDependencies {
    pub fn new(topic_cache: Arc<dyn CacheStore<Topic>>) -> Self {
        Self {
            topic_cache,
            topic_client: None,
            track_detail_client: None,
            playlistify_client: None,
        }
    }

    pub fn with_topic_client(mut self, client: Arc<dyn TopicClient>) -> Self {
        self.topic_client = Some(client);
        self
    }

    pub fn with_track_detail_client(mut self, client: Arc<dyn TrackDetailClient>) -> Self {
        self.track_detail_client = Some(client);
        self
    }

    pub fn with_playlistify_client(mut self, client: Arc<dyn PlaylistifyClient>) -> Self {
        self.playlistify_client = Some(client);
        self
    }
}

/// Primary façade exposed to host applications.
pub struct FeederService {
    config: CoreConfig,
    bus: EventBus,
    cloud: CloudApiClient,
    track_detail: Arc<dyn TrackDetailClient>,
    playlistify: Arc<dyn PlaylistifyClient>,
    topics: TopicRepository,
    loaders: Mutex<Vec<Weak<PlaylistLoader>>>,
}

impl FeederService {
    /// Build the service from a configuration and its bridges.
    #[instrument(skip_all)]
    pub async fn new(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::new(config.event_buffer_size);

        let cloud = CloudApiClient::new(
            Arc::clone(&config.http_client),
            config.cloud_api_base_url.clone(),
            config.cloud_access_token.clone(),
        );
        let pink_spider = Arc::new(PinkSpiderClient::new(
            Arc::clone(&config.http_client),
            config.pink_spider_base_url.clone(),
        ));
        let topic_client = deps
            .topic_client
            .unwrap_or_else(|| Arc::new(cloud.clone()) as Arc<dyn TopicClient>);
        let track_detail = deps
            .track_detail_client
            .unwrap_or_else(|| Arc::clone(&pink_spider) as Arc<dyn TrackDetailClient>);
        let playlistify = deps
            .playlistify_client
            .unwrap_or_else(|| pink_spider as Arc<dyn PlaylistifyClient>);

        let topics = TopicRepository::new(
            config.topics_cache_key.clone(),
            deps.topic_cache,
            topic_client,
            EventSink::new(config.event_buffer_size),
        )
        .await?;

        info!(
            cloud_api = %config.cloud_api_base_url,
            cached_topics = topics.cache_items().len(),
            "Feeder service initialized"
        );

        Ok(Self {
            config,
            bus,
            cloud,
            track_detail,
            playlistify,
            topics,
            loaders: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Process-wide bus carrying [`LibraryEvent`]s.
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> Receiver<LibraryEvent> {
        self.bus.subscribe()
    }

    pub fn topics(&self) -> &TopicRepository {
        &self.topics
    }

    /// Resources attached to a stream.
    pub async fn fetch_resources(&self, stream_id: &str) -> Result<Vec<Resource>> {
        Ok(self.cloud.fetch_resources(stream_id).await?)
    }

    /// Extract a playlist from a web page.
    pub async fn playlistify(
        &self,
        target_url: &str,
        error_on_failure: bool,
    ) -> Result<Option<Arc<Playlist>>> {
        let playlist = self
            .playlistify
            .playlistify(target_url, error_on_failure)
            .await?;
        Ok(playlist.map(Arc::new))
    }

    /// Loader for `playlist`, configured from [`CoreConfig`].
    ///
    /// The service keeps a weak handle so that [`FeederService::shutdown`]
    /// can dispose it.
    pub fn playlist_loader(&self, playlist: Arc<Playlist>) -> Arc<PlaylistLoader> {
        let policy = if self.config.skip_failed_tracks {
            ResolutionPolicy::SkipFailed
        } else {
            ResolutionPolicy::AbortOnFailure
        };
        let loader = Arc::new(
            PlaylistLoader::new(playlist, Arc::clone(&self.track_detail), self.bus.clone())
                .with_policy(policy)
                .with_force_refresh(self.config.force_refresh_tracks),
        );

        let mut loaders = self.loaders.lock();
        loaders.retain(|loader| loader.strong_count() > 0);
        loaders.push(Arc::downgrade(&loader));
        loader
    }

    /// Dispose all loaders and cancel the topic refresh. Idempotent.
    pub fn shutdown(&self) {
        let loaders: Vec<_> = self.loaders.lock().drain(..).collect();
        let disposed = loaders
            .iter()
            .filter_map(Weak::upgrade)
            .inspect(|loader| loader.dispose())
            .count();
        let cancelled = self.topics.cancel();
        debug!(disposed, cancelled, "Feeder service shut down");
    }
}

impl Drop for FeederService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for FeederService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeederService")
            .field("config", &self.config)
            .field("topics", &self.topics)
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Topics are cached as JSON files under `cache_dir`.
///
/// ```ignore
/// use core_runtime::config::CoreConfig;
///
/// let config = CoreConfig::builder()
///     .cloud_api_base_url("https://cloud.example.com")
///     .build()?;
/// let service = core_service::bootstrap_desktop(config, "/tmp/feeder-cache").await?;
/// service.topics().fetch();
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    config: CoreConfig,
    cache_dir: impl Into<std::path::PathBuf>,
) -> Result<FeederService> {
    let cache_dir = cache_dir.into();
    if cache_dir.exists() && !cache_dir.is_dir() {
        return Err(CoreError::InitializationFailed(format!(
            "Cache path {} is not a directory",
            cache_dir.display()
        )));
    }
    let topic_cache = Arc::new(bridge_desktop::JsonFileCacheStore::<Topic>::new(cache_dir));
    FeederService::new(config, CoreDependencies::new(topic_cache)).await
}
