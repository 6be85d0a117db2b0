//! Session tracking for the HTTP-streaming transport.
//!
//! Each HTTP client connection is handed a session identifier on its
//! `initialize` handshake. The identifier is a UUID v4: unguessable and
//! unique across the process lifetime. Subsequent requests present it in
//! the `Mcp-Session-Id` header.
//!
//! The session table is the only mutable structure shared across
//! connections; it lives behind an async mutex. Idle sessions past the
//! configured threshold are reclaimed by a sweeper task. Reclamation only
//! removes table entries — dispatches already in flight hold their own
//! clones and run to completion.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Capacity of each session's server-initiated event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A server-initiated message queued on a session's event stream.
///
/// `id` is the session-local monotonic event number, used as the SSE
/// event id so clients can detect gaps.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Monotonic per-session event number, starting at 1.
    pub id: u64,
    /// The JSON-RPC message payload.
    pub payload: Value,
}

/// Per-session delivery state.
#[derive(Debug)]
struct Session {
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    next_event_id: u64,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            created_at: now,
            last_activity: now,
            next_event_id: 1,
            events,
        }
    }
}

/// Allocates and tracks sessions for the HTTP-streaming transport.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
}

impl SessionManager {
    /// Creates a manager with the given idle threshold in seconds.
    #[must_use]
    pub fn new(idle_timeout_secs: u64) -> Self {
        let secs = i64::try_from(idle_timeout_secs).unwrap_or(i64::MAX);
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: Duration::seconds(secs),
        }
    }

    /// Mints a fresh session and returns its identifier.
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(id.clone(), Session::new(Utc::now()));
        id
    }

    /// Records activity on a session.
    ///
    /// Returns `false` if the session is unknown (closed or reclaimed).
    pub async fn touch(&self, id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Returns whether a session is currently tracked.
    pub async fn is_active(&self, id: &str) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    /// Closes a session explicitly.
    ///
    /// Returns `false` if the session was not tracked.
    pub async fn close(&self, id: &str) -> bool {
        match self.sessions.lock().await.remove(id) {
            Some(session) => {
                let lifetime = Utc::now() - session.created_at;
                debug!(session = id, lifetime_secs = lifetime.num_seconds(), "session closed");
                true
            }
            None => false,
        }
    }

    /// Subscribes to a session's server-initiated event stream.
    ///
    /// Returns `None` for unknown sessions.
    pub async fn subscribe(&self, id: &str) -> Option<broadcast::Receiver<SessionEvent>> {
        let sessions = self.sessions.lock().await;
        sessions.get(id).map(|s| s.events.subscribe())
    }

    /// Queues a server-initiated message on a session's event stream,
    /// assigning it the next in-order event number.
    ///
    /// Returns `false` if the session is unknown. A send without
    /// subscribers is not an error; the message is simply dropped.
    pub async fn publish(&self, id: &str, payload: Value) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        let event = SessionEvent {
            id: session.next_event_id,
            payload,
        };
        session.next_event_id += 1;
        let _ = session.events.send(event);
        true
    }

    /// Removes sessions whose last activity is older than the idle
    /// threshold. Returns how many were reclaimed.
    pub async fn reclaim_idle(&self) -> usize {
        let cutoff = Utc::now() - self.idle_timeout;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity >= cutoff);
        before - sessions.len()
    }

    /// Number of tracked sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
