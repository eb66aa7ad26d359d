//! Project rooms and best-effort event fan-out.
//!
//! A room is the set of connections currently joined to one project. Each
//! member owns a bounded queue; [`RoomHub::broadcast`] never waits on a slow
//! member and drops the event for that member when its queue is full.
//! Camera and focus signals are superseded quickly, so losing one is harmless.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use vantage_core::collaboration::{CollabEvent, Participant};
use vantage_core::types::ProjectId;

/// Identifier of one live connection.
pub type ConnId = String;

/// Sending half of a member's outbound queue.
pub type EventSender = mpsc::Sender<CollabEvent>;

/// Receiving half of a member's outbound queue.
pub type EventReceiver = mpsc::Receiver<CollabEvent>;

/// Outbound queue depth per member.
pub const MEMBER_QUEUE_CAPACITY: usize = 64;

/// Create the outbound queue for a new connection.
pub fn member_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(MEMBER_QUEUE_CAPACITY)
}

struct Member {
    participant: Participant,
    sender: EventSender,
}

/// Index of project rooms.
///
/// Rooms are created on first join and removed as soon as their last member
/// leaves. Nothing is persisted.
pub struct RoomHub {
    rooms: RwLock<HashMap<ProjectId, HashMap<ConnId, Member>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a project's room, creating the room if needed.
    ///
    /// Re-adding an existing connection id replaces its entry.
    pub async fn join(
        &self,
        project_id: &str,
        conn_id: &str,
        participant: Participant,
        sender: EventSender,
    ) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(project_id.to_string()).or_default();
        room.insert(conn_id.to_string(), Member { participant, sender });
        tracing::debug!(project_id, conn_id, members = room.len(), "Joined room");
    }

    /// Remove a connection from a room. Deletes the room once empty.
    ///
    /// Returns `false` if the connection was not a member.
    pub async fn leave(&self, project_id: &str, conn_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(project_id) else {
            return false;
        };
        let removed = room.remove(conn_id).is_some();
        if room.is_empty() {
            rooms.remove(project_id);
            tracing::debug!(project_id, "Room closed");
        }
        removed
    }

    /// Send `event` to every member of the room except `exclude`.
    ///
    /// Returns the number of members the event was queued for. Full or
    /// closed queues are skipped.
    pub async fn broadcast(
        &self,
        project_id: &str,
        event: &CollabEvent,
        exclude: Option<&str>,
    ) -> usize {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(project_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, member) in room {
            if exclude == Some(conn_id.as_str()) {
                continue;
            }
            match member.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(
                        project_id,
                        conn_id = %conn_id,
                        user_id = %member.participant.user_id,
                        "Member queue full, event dropped",
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Number of members in a project's room (0 if it does not exist).
    pub async fn member_count(&self, project_id: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(project_id)
            .map_or(0, HashMap::len)
    }

    /// Whether the room index holds an entry for the project.
    pub async fn has_room(&self, project_id: &str) -> bool {
        self.rooms.read().await.contains_key(project_id)
    }

    /// Drop every room and member queue. Used during shutdown.
    pub async fn close_all(&self) {
        let mut rooms = self.rooms.write().await;
        let count = rooms.len();
        rooms.clear();
        tracing::info!(count, "Closed all collaboration rooms");
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
