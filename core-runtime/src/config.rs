//! # Core Configuration Module
//!
//! Provides configuration management for the feeder core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the injected `HttpClient` bridge and the settings the repository
//! and track loaders read. It validates eagerly so a misconfigured host fails
//! at startup, not on its first refresh.
//!
//! ## Required Settings
//!
//! - `cloud_api_base_url` - Base URL of the cloud API serving topics and resources
//! - `HttpClient` - Required unless the `desktop-shims` feature is enabled, in
//!   which case a `ReqwestHttpClient` is injected when none is provided
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .cloud_api_base_url("https://cloud.example.com")
//!     .http_client(Arc::new(MyHttpClient))
//!     .topics_cache_key("topics")
//!     .skip_failed_tracks(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::HttpClient;
use std::sync::Arc;
use tracing::debug;

/// Default base URL of the playlistify / track detail service.
pub const DEFAULT_PINK_SPIDER_BASE_URL: &str = "http://pink-spider.herokuapp.com";

/// Default cache list key for topics.
pub const DEFAULT_TOPICS_CACHE_KEY: &str = "topics";

/// Core configuration for the feeder core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the cloud API (topics, resources)
    pub cloud_api_base_url: String,

    /// Optional OAuth access token sent to the cloud API
    pub cloud_access_token: Option<String>,

    /// Base URL of the playlistify / track detail service
    pub pink_spider_base_url: String,

    /// Cache list key the topic repository reads and replaces
    pub topics_cache_key: String,

    /// Buffer size of every event sink created by the core
    pub event_buffer_size: usize,

    /// Bypass cached track details when resolving playlists
    pub force_refresh_tracks: bool,

    /// Keep resolving a playlist after one track fails
    pub skip_failed_tracks: bool,

    /// HTTP client used by the API clients
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("cloud_api_base_url", &self.cloud_api_base_url)
            .field(
                "cloud_access_token",
                &self.cloud_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("pink_spider_base_url", &self.pink_spider_base_url)
            .field("topics_cache_key", &self.topics_cache_key)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("force_refresh_tracks", &self.force_refresh_tracks)
            .field("skip_failed_tracks", &self.skip_failed_tracks)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URLs are non-empty http(s) URLs
    /// - The topics cache key is not blank
    /// - The event buffer size is > 0 (broadcast channels reject zero)
    pub fn validate(&self) -> Result<()> {
        validate_base_url("cloud_api_base_url", &self.cloud_api_base_url)?;
        validate_base_url("pink_spider_base_url", &self.pink_spider_base_url)?;

        if self.topics_cache_key.trim().is_empty() {
            return Err(Error::Config("Topics cache key cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_base_url(field: &str, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", field)));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )));
    }
    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the cloud API. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Failed to create default ReqwestHttpClient: {}", e),
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    cloud_api_base_url: Option<String>,
    cloud_access_token: Option<String>,
    pink_spider_base_url: Option<String>,
    topics_cache_key: Option<String>,
    event_buffer_size: Option<usize>,
    force_refresh_tracks: bool,
    skip_failed_tracks: bool,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Sets the cloud API base URL. Trailing slashes are trimmed.
    pub fn cloud_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.cloud_api_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Sets the OAuth access token sent to the cloud API.
    pub fn cloud_access_token(mut self, token: impl Into<String>) -> Self {
        self.cloud_access_token = Some(token.into());
        self
    }

    /// Overrides the playlistify / track detail service base URL.
    pub fn pink_spider_base_url(mut self, url: impl Into<String>) -> Self {
        self.pink_spider_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Sets the cache list key used by the topic repository.
    pub fn topics_cache_key(mut self, key: impl Into<String>) -> Self {
        self.topics_cache_key = Some(key.into());
        self
    }

    /// Sets the buffer size of every event sink.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Bypass cached track details when resolving playlists.
    pub fn force_refresh_tracks(mut self, enabled: bool) -> Self {
        self.force_refresh_tracks = enabled;
        self
    }

    /// Keep resolving the remaining tracks after one fails.
    pub fn skip_failed_tracks(mut self, enabled: bool) -> Self {
        self.skip_failed_tracks = enabled;
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `cloud_api_base_url` is missing or invalid
    /// - No `HttpClient` was provided and no default is available
    /// - Any other value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let cloud_api_base_url = self.cloud_api_base_url.ok_or_else(|| {
            Error::Config(
                "Cloud API base URL is required. Use .cloud_api_base_url() to set it.".to_string(),
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                debug!("No HttpClient provided, injecting the default client");
                provide_default_http_client()?
            }
        };

        let config = CoreConfig {
            cloud_api_base_url,
            cloud_access_token: self.cloud_access_token,
            pink_spider_base_url: self
                .pink_spider_base_url
                .unwrap_or_else(|| DEFAULT_PINK_SPIDER_BASE_URL.to_string()),
            topics_cache_key: self
                .topics_cache_key
                .unwrap_or_else(|| DEFAULT_TOPICS_CACHE_KEY.to_string()),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            force_refresh_tracks: self.force_refresh_tracks,
            skip_failed_tracks: self.skip_failed_tracks,
            http_client,
        };

        config.validate()?;

        debug!(
            cloud_api = %config.cloud_api_base_url,
            pink_spider = %config.pink_spider_base_url,
            has_access_token = config.cloud_access_token.is_some(),
            "Core configuration built"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable("offline".to_string()))
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .cloud_api_base_url("https://cloud.example.com/")
            .http_client(Arc::new(NoopHttpClient))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.cloud_api_base_url, "https://cloud.example.com");
        assert_eq!(config.pink_spider_base_url, DEFAULT_PINK_SPIDER_BASE_URL);
        assert_eq!(config.topics_cache_key, "topics");
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(!config.force_refresh_tracks);
        assert!(!config.skip_failed_tracks);
        assert!(config.cloud_access_token.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = builder()
            .cloud_access_token("token")
            .pink_spider_base_url("http://localhost:8080/")
            .topics_cache_key("topics-v2")
            .event_buffer_size(8)
            .force_refresh_tracks(true)
            .skip_failed_tracks(true)
            .build()
            .unwrap();

        assert_eq!(config.pink_spider_base_url, "http://localhost:8080");
        assert_eq!(config.topics_cache_key, "topics-v2");
        assert_eq!(config.event_buffer_size, 8);
        assert!(config.force_refresh_tracks);
        assert!(config.skip_failed_tracks);
        assert_eq!(config.cloud_access_token.as_deref(), Some("token"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_build_logs_configuration_without_token() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            builder().cloud_access_token("s3cret").build().unwrap()
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Core configuration built"));
        assert!(output.contains("https://cloud.example.com"));
        assert!(output.contains("has_access_token=true"));
        assert!(!output.contains("s3cret"));
    }

    #[test]
    fn test_builder_requires_cloud_api_base_url() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(NoopHttpClient))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder()
            .cloud_api_base_url("https://cloud.example.com")
            .build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let result = builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let result = builder().pink_spider_base_url("ftp://example.com").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_cache_key() {
        let result = builder().topics_cache_key("   ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = builder().cloud_access_token("secret-token").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
