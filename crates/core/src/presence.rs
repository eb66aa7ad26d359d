//! Per-project viewer presence with heartbeat-based expiry.
//!
//! There is no explicit "leave" signal: clients heartbeat periodically and an
//! entry whose last heartbeat is older than the staleness window disappears
//! the next time its project is touched.
//!
//! [`PresenceTable`] holds the pure logic (every operation takes `now`
//! explicitly); [`PresenceTracker`] is the shared, clock-driven wrapper used
//! by the HTTP layer.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::types::{ProjectId, Timestamp, UserId};

/// Default staleness window (20 seconds).
pub const DEFAULT_STALE_WINDOW: Duration = Duration::from_millis(20_000);

/// One viewer of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub user_name: String,
    /// Last heartbeat time, serialized as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: Timestamp,
}

// ---------------------------------------------------------------------------
// PresenceTable
// ---------------------------------------------------------------------------

/// Viewer lists keyed by project. Projects with no live viewers have no key.
#[derive(Debug)]
pub struct PresenceTable {
    by_project: HashMap<ProjectId, Vec<PresenceEntry>>,
    stale_window: chrono::Duration,
}

impl PresenceTable {
    pub fn new(stale_window: Duration) -> Self {
        Self {
            by_project: HashMap::new(),
            stale_window: chrono::Duration::from_std(stale_window)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Record a heartbeat, replacing any previous entry for the user.
    ///
    /// An empty `user_name` falls back to the user id.
    pub fn heartbeat(
        &mut self,
        project_id: &str,
        user_id: &str,
        user_name: &str,
        now: Timestamp,
    ) -> PresenceEntry {
        let entry = PresenceEntry {
            user_id: user_id.to_string(),
            user_name: if user_name.is_empty() {
                user_id.to_string()
            } else {
                user_name.to_string()
            },
            last_seen: now,
        };

        let list = self.by_project.entry(project_id.to_string()).or_default();
        match list.iter_mut().find(|e| e.user_id == user_id) {
            Some(existing) => *existing = entry.clone(),
            None => list.push(entry.clone()),
        }

        self.prune(project_id, now);
        entry
    }

    /// Live viewers of a project, oldest heartbeat first.
    pub fn viewers(&mut self, project_id: &str, now: Timestamp) -> Vec<PresenceEntry> {
        self.prune(project_id, now);
        let mut list = self
            .by_project
            .get(project_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by_key(|e| e.last_seen);
        list
    }

    /// Drop stale entries of one project, and the project key if it empties.
    pub fn prune(&mut self, project_id: &str, now: Timestamp) {
        let Some(list) = self.by_project.get_mut(project_id) else {
            return;
        };
        let window = self.stale_window;
        list.retain(|e| now.signed_duration_since(e.last_seen) < window);
        if list.is_empty() {
            self.by_project.remove(project_id);
        }
    }

    /// Whether the project currently has a key in the table.
    pub fn contains_project(&self, project_id: &str) -> bool {
        self.by_project.contains_key(project_id)
    }
}

// ---------------------------------------------------------------------------
// PresenceTracker
// ---------------------------------------------------------------------------

/// Shared presence state, safe to wrap in `Arc` and use from handlers.
pub struct PresenceTracker {
    table: Mutex<PresenceTable>,
}

impl PresenceTracker {
    pub fn new(stale_window: Duration) -> Self {
        Self {
            table: Mutex::new(PresenceTable::new(stale_window)),
        }
    }

    pub async fn heartbeat(&self, project_id: &str, user_id: &str, user_name: &str) -> PresenceEntry {
        let entry = self
            .table
            .lock()
            .await
            .heartbeat(project_id, user_id, user_name, chrono::Utc::now());
        tracing::trace!(project_id, user_id, "Presence heartbeat");
        entry
    }

    pub async fn viewers(&self, project_id: &str) -> Vec<PresenceEntry> {
        self.table
            .lock()
            .await
            .viewers(project_id, chrono::Utc::now())
    }

    pub async fn contains_project(&self, project_id: &str) -> bool {
        self.table.lock().await.contains_project(project_id)
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
