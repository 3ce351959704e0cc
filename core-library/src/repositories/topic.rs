//! Topic repository: cached topics with a background network refresh.
//!
//! ## State machine
//!
//! ```text
//!   CacheOnly ──fetch──> CacheOnlyFetching ──ok──> Normal
//!                                  └──────err────> Error
//!   Normal | Error ──fetch──> Fetching ──ok──> Normal
//!                                └────err────> Error
//! ```
//!
//! `fetch()` in any other state is rejected. Cancelling a refresh returns the
//! repository to the state the refresh started from, without an event.

use bridge_traits::cache::{CacheList, CacheStore};
use core_runtime::events::{EventSink, Receiver, RepositoryEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

use crate::client::{TopicClient, TopicPages};
use crate::error::Result;
use crate::models::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    /// Only cached items are known.
    CacheOnly,
    /// First refresh in flight; readers still see cached items.
    CacheOnlyFetching,
    /// The last refresh succeeded.
    Normal,
    /// A refresh is in flight after at least one completed attempt.
    Fetching,
    Updating,
    /// The last refresh failed.
    Error,
}

impl RepositoryState {
    /// Whether readers are served from the cache in this state.
    pub fn reads_cache(&self) -> bool {
        matches!(self, RepositoryState::CacheOnly | RepositoryState::CacheOnlyFetching)
    }

    pub fn is_fetching(&self) -> bool {
        matches!(
            self,
            RepositoryState::CacheOnlyFetching | RepositoryState::Fetching | RepositoryState::Updating
        )
    }

    /// The state a new refresh moves to, or `None` if one may not start.
    fn fetching_state(&self) -> Option<RepositoryState> {
        match self {
            RepositoryState::CacheOnly => Some(RepositoryState::CacheOnlyFetching),
            RepositoryState::Normal | RepositoryState::Error => Some(RepositoryState::Fetching),
            RepositoryState::CacheOnlyFetching
            | RepositoryState::Fetching
            | RepositoryState::Updating => None,
        }
    }
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepositoryState::CacheOnly => "cache_only",
            RepositoryState::CacheOnlyFetching => "cache_only_fetching",
            RepositoryState::Normal => "normal",
            RepositoryState::Fetching => "fetching",
            RepositoryState::Updating => "updating",
            RepositoryState::Error => "error",
        };
        f.write_str(name)
    }
}

/// In-flight refresh tracking
struct ActiveRefresh {
    cancellation_token: CancellationToken,
    resume_state: RepositoryState,
}

/// Everything readers observe, guarded together.
struct RepositoryData {
    state: RepositoryState,
    cache_items: Vec<Topic>,
    items: Vec<Topic>,
    cache_list: Arc<dyn CacheList<Topic>>,
    active: Option<ActiveRefresh>,
}

/// Shared handles used by both the repository and its refresh task.
#[derive(Clone)]
struct RepositoryShared {
    cache_key: Arc<str>,
    cache_store: Arc<dyn CacheStore<Topic>>,
    data: Arc<Mutex<RepositoryData>>,
    /// Serializes clear-then-add on the cache list.
    cache_write: Arc<tokio::sync::Mutex<()>>,
    events: EventSink<RepositoryEvent>,
}

impl RepositoryShared {
    fn emit(&self, event: RepositoryEvent) {
        if self.events.emit(event).is_err() {
            trace!("No subscribers for repository event");
        }
    }
}

/// Cache-backed topic collection.
///
/// # Example
///
/// ```ignore
/// let repository = TopicRepository::new("topics", cache_store, client, EventSink::default()).await?;
/// let mut events = repository.subscribe();
///
/// repository.fetch();
/// while let Ok(event) = events.recv().await {
///     if event.is_terminal() {
///         break;
///     }
/// }
/// let topics = repository.get_items();
/// ```
pub struct TopicRepository {
    client: Arc<dyn TopicClient>,
    shared: RepositoryShared,
}

impl TopicRepository {
    /// Create a repository and load its cache list.
    ///
    /// # Errors
    ///
    /// Fails when the cache list cannot be found or created. A list that
    /// exists but cannot be read starts the repository with no cached items.
    #[instrument(skip_all)]
    pub async fn new(
        cache_key: impl Into<String>,
        cache_store: Arc<dyn CacheStore<Topic>>,
        client: Arc<dyn TopicClient>,
        events: EventSink<RepositoryEvent>,
    ) -> Result<Self> {
        let cache_key: Arc<str> = Arc::from(cache_key.into());

        let cache_list = cache_store.find_or_create(&cache_key).await?;
        let cache_items = match cache_list.items().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to read cached topics, starting empty");
                Vec::new()
            }
        };
        debug!(cache_key = %cache_key, count = cache_items.len(), "Loaded cached topics");

        Ok(Self {
            client,
            shared: RepositoryShared {
                cache_key,
                cache_store,
                data: Arc::new(Mutex::new(RepositoryData {
                    state: RepositoryState::CacheOnly,
                    cache_items,
                    items: Vec::new(),
                    cache_list,
                    active: None,
                })),
                cache_write: Arc::new(tokio::sync::Mutex::new(())),
                events,
            },
        })
    }

    pub fn cache_key(&self) -> &str {
        &self.shared.cache_key
    }

    pub fn state(&self) -> RepositoryState {
        self.shared.data.lock().state
    }

    /// Current view: cached items until a refresh succeeds, live items after.
    pub fn get_items(&self) -> Vec<Topic> {
        let data = self.shared.data.lock();
        if data.state.reads_cache() {
            data.cache_items.clone()
        } else {
            data.items.clone()
        }
    }

    pub fn cache_items(&self) -> Vec<Topic> {
        self.shared.data.lock().cache_items.clone()
    }

    pub fn live_items(&self) -> Vec<Topic> {
        self.shared.data.lock().items.clone()
    }

    pub fn subscribe(&self) -> Receiver<RepositoryEvent> {
        self.shared.events.subscribe()
    }

    /// Start a background refresh.
    ///
    /// Returns `false`, without side effects, when a refresh is already in
    /// flight. Must be called from within a Tokio runtime.
    pub fn fetch(&self) -> bool {
        let cancellation_token = CancellationToken::new();
        {
            let mut data = self.shared.data.lock();
            let Some(next) = data.state.fetching_state() else {
                debug!(state = %data.state, "Refresh already in flight, ignoring fetch");
                return false;
            };
            debug!(from = %data.state, to = %next, "Starting topic refresh");
            data.active = Some(ActiveRefresh {
                cancellation_token: cancellation_token.clone(),
                resume_state: data.state,
            });
            data.state = next;
            self.shared.emit(RepositoryEvent::StartLoading);
        }

        let pages = self.client.fetch_topics();
        let shared = self.shared.clone();
        let span = tracing::info_span!("topic_refresh", cache_key = %shared.cache_key);
        tokio::spawn(run_refresh(shared, pages, cancellation_token).instrument(span));
        true
    }

    /// Cancel the in-flight refresh, if any.
    ///
    /// The repository returns to the state the refresh started from and no
    /// further event is emitted for it.
    pub fn cancel(&self) -> bool {
        let mut data = self.shared.data.lock();
        match data.active.take() {
            Some(active) => {
                active.cancellation_token.cancel();
                debug!(state = %active.resume_state, "Topic refresh cancelled");
                data.state = active.resume_state;
                true
            }
            None => false,
        }
    }

    /// Re-read the cache list into the cached items.
    #[instrument(skip(self), fields(cache_key = %self.shared.cache_key))]
    pub async fn reload_cache(&self) -> Result<()> {
        let cache_list = self.shared.data.lock().cache_list.clone();
        let items = cache_list.items().await?;
        debug!(count = items.len(), "Reloaded cached topics");
        self.shared.data.lock().cache_items = items;
        Ok(())
    }
}

impl Drop for TopicRepository {
    fn drop(&mut self) {
        if let Some(active) = self.shared.data.lock().active.take() {
            active.cancellation_token.cancel();
        }
    }
}

impl fmt::Debug for TopicRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.shared.data.lock();
        f.debug_struct("TopicRepository")
            .field("cache_key", &self.shared.cache_key)
            .field("state", &data.state)
            .field("cache_items", &data.cache_items.len())
            .field("items", &data.items.len())
            .finish()
    }
}

async fn run_refresh(
    shared: RepositoryShared,
    mut pages: TopicPages,
    cancellation_token: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => return,
            next = pages.next() => next,
        };

        match next {
            Some(Ok(topics)) => {
                replace_cache(&shared, &topics).await;
                let mut data = shared.data.lock();
                if cancellation_token.is_cancelled() {
                    return;
                }
                debug!(count = topics.len(), "Applied topic page");
                data.items = topics;
            }
            Some(Err(e)) => {
                let mut data = shared.data.lock();
                if cancellation_token.is_cancelled() {
                    return;
                }
                error!(error = %e, "Topic refresh failed");
                data.state = RepositoryState::Error;
                data.active = None;
                shared.emit(RepositoryEvent::FailToLoad {
                    message: e.to_string(),
                });
                return;
            }
            None => {
                let mut data = shared.data.lock();
                if cancellation_token.is_cancelled() {
                    return;
                }
                info!(count = data.items.len(), "Topic refresh completed");
                data.state = RepositoryState::Normal;
                data.active = None;
                shared.emit(RepositoryEvent::CompleteLoading);
                return;
            }
        }
    }
}

/// Replace the cache list contents with `topics`.
///
/// Failures are logged and do not affect the refresh outcome.
async fn replace_cache(shared: &RepositoryShared, topics: &[Topic]) {
    let _guard = shared.cache_write.lock().await;
    let cache_list = shared.data.lock().cache_list.clone();

    if let Err(e) = cache_list.clear().await {
        warn!(error = %e, "Failed to clear topic cache");
    }

    let cache_list = match shared.cache_store.find_or_create(&shared.cache_key).await {
        Ok(list) => {
            shared.data.lock().cache_list = list.clone();
            list
        }
        Err(e) => {
            warn!(error = %e, "Failed to reopen topic cache");
            cache_list
        }
    };

    if let Err(e) = cache_list.add(topics).await {
        warn!(error = %e, "Failed to write topic cache");
    }
}
