//! Pink-spider client: playlist extraction and track resolution.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::client::{PlaylistifyClient, TrackDetailClient};
use crate::error::Result;
use crate::models::Track;
use crate::playlist::Playlist;

#[derive(Clone)]
pub struct PinkSpiderClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl PinkSpiderClient {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PlaylistifyClient for PinkSpiderClient {
    #[instrument(skip(self), fields(target_url = %target_url))]
    async fn playlistify(
        &self,
        target_url: &str,
        error_on_failure: bool,
    ) -> Result<Option<Playlist>> {
        let request =
            HttpRequest::get(format!("{}/playlistify", self.base_url)).query("url", target_url);

        match super::get_json(self.http_client.as_ref(), request).await {
            Ok(json) => {
                let playlist = Playlist::from_json(&json);
                debug!(tracks = playlist.len(), "Playlistified page");
                Ok(Some(playlist))
            }
            Err(e) if error_on_failure => Err(e),
            Err(e) => {
                warn!(error = %e, "Playlistify failed, completing without a playlist");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl TrackDetailClient for PinkSpiderClient {
    #[instrument(skip(self, track), fields(provider = %track.provider, identifier = %track.identifier))]
    async fn fetch_track_detail(&self, track: &Track, force_refresh: bool) -> Result<Track> {
        let url = format!(
            "{}/v1/tracks/{}/{}",
            self.base_url,
            urlencoding::encode(track.provider.as_str()),
            urlencoding::encode(&track.identifier)
        );
        let mut request = HttpRequest::get(url);
        if force_refresh {
            request = request.query("force_refresh", "true");
        }

        let json = super::get_json(self.http_client.as_ref(), request).await?;
        let mut resolved = track.clone();
        resolved.apply_detail(Track::from_json(&json));
        Ok(resolved)
    }
}
