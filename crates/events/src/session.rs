//! Per-connection collaboration protocol.
//!
//! A [`CollabSession`] starts unbound. `join` binds it to a project room;
//! `camera` and `annotationFocus` are relayed to the other members only once
//! bound. Anything else is ignored without a reply, and the connection is
//! never closed because of bad input.

use std::sync::Arc;

use vantage_core::collaboration::{ClientMessage, CollabEvent, Participant};
use vantage_core::types::ProjectId;

use crate::rooms::{member_channel, ConnId, EventReceiver, EventSender, RoomHub};

pub struct CollabSession {
    conn_id: ConnId,
    hub: Arc<RoomHub>,
    sender: EventSender,
    joined: Option<(ProjectId, Participant)>,
}

impl CollabSession {
    /// Open a session; the receiver yields events addressed to this
    /// connection.
    pub fn open(hub: Arc<RoomHub>, conn_id: impl Into<ConnId>) -> (Self, EventReceiver) {
        let (sender, receiver) = member_channel();
        let session = Self {
            conn_id: conn_id.into(),
            hub,
            sender,
            joined: None,
        };
        (session, receiver)
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// The project this connection is bound to, if any.
    pub fn project_id(&self) -> Option<&str> {
        self.joined.as_ref().map(|(p, _)| p.as_str())
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.joined.as_ref().map(|(_, who)| who)
    }

    /// Parse and apply one raw text frame. Unparseable frames are dropped.
    pub async fn handle_text(&mut self, raw: &str) {
        match ClientMessage::parse(raw) {
            Some(msg) => self.handle(msg).await,
            None => {
                tracing::trace!(conn_id = %self.conn_id, "Dropped malformed collaboration message");
            }
        }
    }

    /// Apply one parsed message.
    pub async fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Join {
                project_id,
                user_id,
                user_name,
            } => {
                let Some(project_id) = project_id.filter(|p| !p.is_empty()) else {
                    return;
                };
                self.join(&project_id, Participant::from_join(user_id, user_name))
                    .await;
            }
            ClientMessage::Camera { payload } => {
                if let Some((project_id, who)) = &self.joined {
                    let event = CollabEvent::camera(who, payload);
                    self.hub
                        .broadcast(project_id, &event, Some(&self.conn_id))
                        .await;
                }
            }
            ClientMessage::AnnotationFocus { annotation_id } => {
                if let Some((project_id, who)) = &self.joined {
                    let event = CollabEvent::annotation_focus(who, annotation_id);
                    self.hub
                        .broadcast(project_id, &event, Some(&self.conn_id))
                        .await;
                }
            }
        }
    }

    /// Bind to a project room and announce the arrival to the other members.
    ///
    /// A session already bound to a room leaves it first.
    pub async fn join(&mut self, project_id: &str, participant: Participant) {
        self.leave().await;

        self.hub
            .join(
                project_id,
                &self.conn_id,
                participant.clone(),
                self.sender.clone(),
            )
            .await;
        self.hub
            .broadcast(
                project_id,
                &CollabEvent::user_joined(&participant),
                Some(&self.conn_id),
            )
            .await;

        tracing::info!(
            conn_id = %self.conn_id,
            project_id,
            user_id = %participant.user_id,
            "Collaborator joined",
        );
        self.joined = Some((project_id.to_string(), participant));
    }

    /// Leave the current room, if any, and announce the departure.
    pub async fn leave(&mut self) {
        let Some((project_id, who)) = self.joined.take() else {
            return;
        };
        self.hub.leave(&project_id, &self.conn_id).await;
        self.hub
            .broadcast(&project_id, &CollabEvent::user_left(&who), None)
            .await;
        tracing::info!(
            conn_id = %self.conn_id,
            project_id = %project_id,
            user_id = %who.user_id,
            "Collaborator left",
        );
    }

    /// Tear down the session when the connection closes.
    pub async fn disconnect(mut self) {
        self.leave().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
