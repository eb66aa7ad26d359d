//! Real-time collaboration wire protocol.
//!
//! Clients exchange JSON text frames carrying a `"type"` discriminator.
//! Inbound frames parse into [`ClientMessage`]; anything that does not parse
//! is dropped by the caller without a reply. Outbound frames are
//! [`CollabEvent`]s fanned out to the other members of a project room.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ProjectId, UserId};

/// User id assumed when a join message carries none.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Bind this connection to a project room.
    Join {
        #[serde(default)]
        project_id: Option<ProjectId>,
        #[serde(default)]
        user_id: Option<UserId>,
        #[serde(default)]
        user_name: Option<String>,
    },
    /// The sender's current camera/viewpoint.
    Camera {
        #[serde(default)]
        payload: Option<Value>,
    },
    /// The sender focused an annotation.
    AnnotationFocus {
        #[serde(default)]
        annotation_id: Option<Value>,
    },
}

impl ClientMessage {
    /// Parse a raw text frame. Malformed or unknown messages yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Identity a connection presents once it has joined a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub user_name: String,
}

impl Participant {
    /// Apply the join defaults: missing or empty user id becomes
    /// [`ANONYMOUS_USER_ID`], missing or empty name becomes the user id.
    pub fn from_join(user_id: Option<String>, user_name: Option<String>) -> Self {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER_ID.to_string());
        let user_name = user_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user_id.clone());
        Self { user_id, user_name }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Events broadcast to the other members of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CollabEvent {
    UserJoined {
        user_id: UserId,
        user_name: String,
    },
    UserLeft {
        user_id: UserId,
        user_name: String,
    },
    /// The camera payload's own keys are flattened beside the sender identity.
    Camera {
        user_id: UserId,
        user_name: String,
        #[serde(flatten)]
        view: Map<String, Value>,
    },
    AnnotationFocus {
        user_id: UserId,
        user_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        annotation_id: Option<Value>,
    },
}

impl CollabEvent {
    pub fn user_joined(who: &Participant) -> Self {
        CollabEvent::UserJoined {
            user_id: who.user_id.clone(),
            user_name: who.user_name.clone(),
        }
    }

    pub fn user_left(who: &Participant) -> Self {
        CollabEvent::UserLeft {
            user_id: who.user_id.clone(),
            user_name: who.user_name.clone(),
        }
    }

    /// Build a camera event. Non-object payloads contribute no fields, and
    /// payload keys may not shadow `type`, `userId` or `userName`.
    pub fn camera(who: &Participant, payload: Option<Value>) -> Self {
        let mut view = match payload {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for reserved in ["type", "userId", "userName"] {
            view.remove(reserved);
        }
        CollabEvent::Camera {
            user_id: who.user_id.clone(),
            user_name: who.user_name.clone(),
            view,
        }
    }

    pub fn annotation_focus(who: &Participant, annotation_id: Option<Value>) -> Self {
        CollabEvent::AnnotationFocus {
            user_id: who.user_id.clone(),
            user_name: who.user_name.clone(),
            annotation_id: annotation_id.filter(|v| !v.is_null()),
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> String {
        // Serialization of these variants cannot fail: all keys are strings.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
