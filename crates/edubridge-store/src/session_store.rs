use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use edubridge_common::{ChatMessage, ChatRole};
use lru::LruCache;
use tracing::debug;

const SUMMARY_CHARS: usize = 60;

#[derive(Debug)]
struct Session {
    turns: VecDeque<ChatMessage>,
    last_touched: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            turns: VecDeque::new(),
            last_touched: now,
        }
    }
}

/// Listing entry for one live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub user_id: String,
    pub turns: usize,
    pub summary: String,
}

/// Per-user conversation history held in process memory.
///
/// Each user keeps at most `window` turns; older turns are dropped. At most
/// `capacity` users are tracked, evicting the least recently used, and a user
/// idle for longer than `ttl` starts over with an empty history.
///
/// A single lock guards the whole map. Callers copy the window out before any
/// network call, so the lock is never held across an await point.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, Session>>,
    window: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(window: usize, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            window: window.max(1),
            ttl,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append a turn, creating the session on first use.
    pub fn append(&self, user_id: &str, turn: ChatMessage) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let expired = sessions
            .peek(user_id)
            .is_some_and(|s| now.duration_since(s.last_touched) >= self.ttl);
        if expired {
            debug!("session for '{}' expired; starting fresh", user_id);
            sessions.pop(user_id);
        }

        if !sessions.contains(user_id) {
            if let Some((evicted, _)) = sessions.push(user_id.to_string(), Session::new(now)) {
                if evicted != user_id {
                    debug!("session store full; evicted '{}'", evicted);
                }
            }
        }

        if let Some(session) = sessions.get_mut(user_id) {
            session.turns.push_back(turn);
            while session.turns.len() > self.window {
                session.turns.pop_front();
            }
            session.last_touched = now;
        }
    }

    /// The most recent turns for `user_id`, oldest first.
    pub fn window_for(&self, user_id: &str) -> Vec<ChatMessage> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let expired = match sessions.get(user_id) {
            Some(session) => now.duration_since(session.last_touched) >= self.ttl,
            None => return Vec::new(),
        };
        if expired {
            sessions.pop(user_id);
            return Vec::new();
        }

        sessions
            .peek(user_id)
            .map(|s| s.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Summaries of all live sessions, most recently used first.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        let now = Instant::now();
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_touched) < self.ttl)
            .map(|(user_id, s)| SessionSummary {
                user_id: user_id.clone(),
                turns: s.turns.len(),
                summary: summarize(&s.turns),
            })
            .collect()
    }

    /// Drop every session idle past the TTL. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_touched) >= self.ttl)
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &expired {
            sessions.pop(user_id);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn summarize(turns: &VecDeque<ChatMessage>) -> String {
    let first = turns
        .iter()
        .find(|t| t.role == ChatRole::User)
        .map(|t| t.content.trim())
        .unwrap_or_default();

    let mut summary: String = first.chars().take(SUMMARY_CHARS).collect();
    if first.chars().count() > SUMMARY_CHARS {
        summary.push('…');
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(window: usize, capacity: usize) -> SessionStore {
        SessionStore::new(window, capacity, Duration::from_secs(3600))
    }

    #[test]
    fn unknown_user_has_empty_window() {
        let store = store(10, 10);
        assert!(store.window_for("nobody").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn first_append_creates_session() {
        let store = store(10, 10);
        store.append("guest", ChatMessage::user("hello"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.window_for("guest"), vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn window_keeps_most_recent_turns_in_order() {
        let store = store(10, 10);
        for i in 0..25 {
            store.append("teacher", ChatMessage::user(format!("turn {i}")));
            assert!(store.window_for("teacher").len() <= 10);
        }

        let window = store.window_for("teacher");
        assert_eq!(window.len(), 10);
        let contents: Vec<_> = window.iter().map(|t| t.content.as_str()).collect();
        let expected: Vec<String> = (15..25).map(|i| format!("turn {i}")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn users_are_isolated() {
        let store = store(10, 10);
        store.append("a", ChatMessage::user("from a"));
        store.append("b", ChatMessage::user("from b"));
        store.append("a", ChatMessage::assistant("reply a"));

        assert_eq!(store.window_for("a").len(), 2);
        assert_eq!(store.window_for("b"), vec![ChatMessage::user("from b")]);
    }

    #[test]
    fn least_recently_used_user_is_evicted_at_capacity() {
        let store = store(10, 2);
        store.append("a", ChatMessage::user("1"));
        store.append("b", ChatMessage::user("2"));
        // Touch `a` so `b` becomes the eviction candidate.
        store.window_for("a");
        store.append("c", ChatMessage::user("3"));

        assert_eq!(store.len(), 2);
        assert!(store.window_for("b").is_empty());
        assert_eq!(store.window_for("a").len(), 1);
        assert_eq!(store.window_for("c").len(), 1);
    }

    #[test]
    fn idle_sessions_expire_after_ttl() {
        let store = SessionStore::new(10, 10, Duration::from_millis(20));
        store.append("a", ChatMessage::user("old"));
        std::thread::sleep(Duration::from_millis(40));

        assert!(store.window_for("a").is_empty());

        store.append("a", ChatMessage::user("new"));
        assert_eq!(store.window_for("a"), vec![ChatMessage::user("new")]);
    }

    #[test]
    fn prune_expired_removes_idle_users() {
        let store = SessionStore::new(10, 10, Duration::from_millis(20));
        store.append("a", ChatMessage::user("1"));
        store.append("b", ChatMessage::user("2"));
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(store.prune_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn sessions_summarize_first_user_turn() {
        let store = store(10, 10);
        store.append("a", ChatMessage::user("Explain photosynthesis to grade 5"));
        store.append("a", ChatMessage::assistant("Plants make food from light."));

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].user_id, "a");
        assert_eq!(sessions[0].turns, 2);
        assert_eq!(sessions[0].summary, "Explain photosynthesis to grade 5");
    }

    #[test]
    fn long_summaries_are_truncated() {
        let store = store(10, 10);
        store.append("a", ChatMessage::user("x".repeat(200)));
        let summary = &store.sessions()[0].summary;
        assert_eq!(summary.chars().count(), SUMMARY_CHARS + 1);
        assert!(summary.ends_with('…'));
    }
}
