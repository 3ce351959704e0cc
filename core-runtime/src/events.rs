//! # Event Sinks
//!
//! Observer-facing event channels built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **[`EventSink<E>`]**: a cloneable broadcast sender. Every producer that
//!   exposes a signal (a repository, a playlist, the process-wide bus) owns
//!   one and hands out receivers through `subscribe()`.
//! - **[`EventStream<E>`]**: receiver wrapper with optional filtering.
//! - **[`RepositoryEvent`]**: lifecycle events of a cache-backed repository.
//! - **[`PlaylistEvent`]**: per-index notifications on a playlist's own sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  emit   ┌───────────────────┐  subscribe  ┌────────────┐
//! │ TopicRepository ├────────>│ EventSink<RepoEv> ├────────────>│ Subscriber │
//! └─────────────────┘         └───────────────────┘             └────────────┘
//! ┌─────────────────┐  emit   ┌───────────────────┐  subscribe  ┌────────────┐
//! │ PlaylistLoader  ├────────>│ EventSink<PlEv>   ├────────────>│ Subscriber │
//! └─────────────────┘         └───────────────────┘             └────────────┘
//! ```
//!
//! Events on one sink are delivered in the order they were emitted.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventSink, RepositoryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = EventSink::new(16);
//! let mut subscriber = sink.subscribe();
//!
//! sink.emit(RepositoryEvent::StartLoading).ok();
//! assert_eq!(subscriber.recv().await.unwrap(), RepositoryEvent::StartLoading);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind by `n` events.
//!   Non-fatal; keep receiving.
//! - **`RecvError::Closed`**: every sender has been dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`. Producers in this workspace
//! ignore that result: nobody listening is not a failure of the producer.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for event channels.
///
/// Subscribers that fall further behind than this receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Repository Events
// ============================================================================

/// Lifecycle events of a cache-backed repository.
///
/// Errors travel as their rendered message, since every subscriber receives
/// its own clone of the event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RepositoryEvent {
    /// A refresh started.
    StartLoading,
    /// The refresh finished and the live items are network-derived.
    CompleteLoading,
    /// The refresh failed. Reported once per fetch attempt.
    FailToLoad {
        /// Human-readable error message.
        message: String,
    },
    /// An incremental update started.
    StartUpdating,
    /// An incremental update failed.
    FailToUpdate {
        /// Human-readable error message.
        message: String,
    },
}

impl RepositoryEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            RepositoryEvent::StartLoading => "Loading started",
            RepositoryEvent::CompleteLoading => "Loading completed",
            RepositoryEvent::FailToLoad { .. } => "Loading failed",
            RepositoryEvent::StartUpdating => "Updating started",
            RepositoryEvent::FailToUpdate { .. } => "Updating failed",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            RepositoryEvent::FailToLoad { .. } | RepositoryEvent::FailToUpdate { .. } => {
                EventSeverity::Error
            }
            RepositoryEvent::CompleteLoading => EventSeverity::Info,
            RepositoryEvent::StartLoading | RepositoryEvent::StartUpdating => {
                EventSeverity::Debug
            }
        }
    }

    /// Whether this event ends a fetch attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RepositoryEvent::CompleteLoading | RepositoryEvent::FailToLoad { .. }
        )
    }
}

// ============================================================================
// Playlist Events
// ============================================================================

/// Notifications pushed on a playlist's own sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    /// The track at `index` was resolved and written back into the playlist.
    Load {
        /// Position of the track inside the playlist.
        index: usize,
    },
}

// ============================================================================
// Event Sink
// ============================================================================

/// Broadcast channel for one event type.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the sink)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
pub struct EventSink<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventSink<E> {
    /// Creates a new sink buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (a `tokio::sync::broadcast` restriction).
    /// Configuration validation rejects a zero buffer size before it gets here.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: E) -> Result<usize, SendError<E>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<E> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: Clone> Default for EventSink<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventSink, EventStream, RepositoryEvent};
///
/// let sink: EventSink<RepositoryEvent> = EventSink::new(16);
/// let failures = EventStream::new(sink.subscribe())
///     .filter(|event| matches!(event, RepositoryEvent::FailToLoad { .. }));
/// ```
pub struct EventStream<E> {
    receiver: Receiver<E>,
    filter: Option<EventFilter<E>>,
}

impl<E: Clone> EventStream<E> {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<E>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &E) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<E, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<E, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_creation() {
        let sink: EventSink<RepositoryEvent> = EventSink::new(10);
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_err() {
        let sink = EventSink::new(10);
        assert!(sink.emit(RepositoryEvent::StartLoading).is_err());
    }

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let sink = EventSink::new(10);
        let mut sub = sink.subscribe();

        sink.emit(RepositoryEvent::StartLoading).ok();
        sink.emit(RepositoryEvent::CompleteLoading).ok();

        assert_eq!(sub.recv().await.unwrap(), RepositoryEvent::StartLoading);
        assert_eq!(sub.recv().await.unwrap(), RepositoryEvent::CompleteLoading);
    }

    #[tokio::test]
    async fn test_cloned_sink_reaches_same_subscribers() {
        let sink = EventSink::new(10);
        let mut sub1 = sink.subscribe();
        let mut sub2 = sink.subscribe();

        let producer = sink.clone();
        producer.emit(PlaylistEvent::Load { index: 3 }).ok();

        assert_eq!(sub1.recv().await.unwrap(), PlaylistEvent::Load { index: 3 });
        assert_eq!(sub2.recv().await.unwrap(), PlaylistEvent::Load { index: 3 });
        assert_eq!(sink.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let sink = EventSink::new(10);
        let mut failures = EventStream::new(sink.subscribe())
            .filter(|event| matches!(event, RepositoryEvent::FailToLoad { .. }));

        sink.emit(RepositoryEvent::StartLoading).ok();
        let failure = RepositoryEvent::FailToLoad {
            message: "offline".to_string(),
        };
        sink.emit(failure.clone()).ok();

        assert_eq!(failures.recv().await.unwrap(), failure);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let sink: EventSink<PlaylistEvent> = EventSink::new(10);
        let mut stream = EventStream::new(sink.subscribe());
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let sink = EventSink::new(2);
        let mut sub = sink.subscribe();

        for index in 0..5 {
            sink.emit(PlaylistEvent::Load { index }).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_repository_event_severity() {
        let failure = RepositoryEvent::FailToLoad {
            message: "Failed".to_string(),
        };
        assert_eq!(failure.severity(), EventSeverity::Error);
        assert!(failure.is_terminal());
        assert_eq!(RepositoryEvent::CompleteLoading.severity(), EventSeverity::Info);
        assert_eq!(RepositoryEvent::StartLoading.severity(), EventSeverity::Debug);
        assert!(!RepositoryEvent::StartUpdating.is_terminal());
        assert_eq!(RepositoryEvent::StartLoading.description(), "Loading started");
    }

    #[test]
    fn test_event_serialization() {
        let event = RepositoryEvent::FailToUpdate {
            message: "timeout".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("FailToUpdate"));

        let deserialized: RepositoryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);

        let json = serde_json::to_string(&PlaylistEvent::Load { index: 7 }).unwrap();
        assert_eq!(json, r#"{"event":"Load","index":7}"#);
    }
}
