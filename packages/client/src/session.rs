//! Local session mirror.
//!
//! One authoritative mirror per process, reconciled from server events.
//! The mirror never invents state: snapshots replace it wholesale, and the
//! derived facts (current participant, host flag) are re-computed by id
//! lookup on every full update rather than carried over.

use std::collections::HashSet;

use pokerplan_server::domain::{Participant, ParticipantId, Session, SessionId};
use pokerplan_server::infrastructure::dto::websocket::ServerMessage;

/// The client's view of its session.
#[derive(Debug, Default)]
pub struct SessionView {
    pub session: Option<Session>,
    pub current_participant: Option<Participant>,
    pub join_code: Option<String>,
    pub is_host: bool,
    /// Participants known to have voted in the current round. Tracked
    /// separately because votes before reveal arrive as lightweight notices
    /// without a session snapshot.
    pub voted: HashSet<ParticipantId>,
    /// Last error event, as (message, code).
    pub last_error: Option<(String, String)>,
}

impl SessionView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the mirrored session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Apply one server event to the mirror.
    pub fn apply(&mut self, event: &ServerMessage) {
        match event {
            ServerMessage::SessionCreated(payload) | ServerMessage::SessionJoined(payload) => {
                self.is_host = payload.session.host_id == payload.participant.id;
                self.voted = voted_in(&payload.session);
                self.session = Some(payload.session.clone());
                self.current_participant = Some(payload.participant.clone());
                self.join_code = Some(payload.join_code.clone());
                self.last_error = None;
            }
            ServerMessage::SessionUpdated(payload) => {
                // Re-derive the local participant and host flag from the new
                // snapshot; the previous values may be stale (host handoff,
                // eviction of this participant)
                let my_id = self.current_participant.as_ref().map(|p| p.id);
                self.current_participant = my_id
                    .and_then(|id| payload.session.participant(&id))
                    .cloned();
                self.is_host = match &self.current_participant {
                    Some(me) => payload.session.host_id == me.id,
                    None => false,
                };
                self.voted = voted_in(&payload.session);
                self.session = Some(payload.session.clone());
            }
            ServerMessage::SessionLeft(payload) => {
                if payload.success {
                    *self = Self::new();
                }
            }
            ServerMessage::SessionError(payload) => {
                self.last_error = Some((payload.message.clone(), payload.code.clone()));
            }
            ServerMessage::ParticipantJoined(payload) => {
                if let Some(session) = &mut self.session
                    && session.id == payload.session_id
                    && session.participant(&payload.participant.id).is_none()
                {
                    session.participants.push(payload.participant.clone());
                }
            }
            ServerMessage::ParticipantLeft(payload) => {
                // Partial update to keep the list fresh without waiting for
                // the session snapshot. Not authoritative for host status.
                if let Some(session) = &mut self.session
                    && session.id == payload.session_id
                {
                    session
                        .participants
                        .retain(|p| p.id != payload.participant_id);
                }
                self.voted.remove(&payload.participant_id);
            }
            ServerMessage::ParticipantVoted(payload) => {
                if self.session_id() == Some(payload.session_id) {
                    self.voted.insert(payload.participant_id);
                }
            }
            ServerMessage::Pong(_) => {}
        }
    }

    /// Count of voters who have cast a vote, against the total voters.
    pub fn vote_progress(&self) -> (usize, usize) {
        let Some(session) = &self.session else {
            return (0, 0);
        };
        let cast = session
            .voters()
            .filter(|p| self.voted.contains(&p.id))
            .count();
        (cast, session.voters().count())
    }
}

fn voted_in(session: &Session) -> HashSet<ParticipantId> {
    session
        .participants
        .iter()
        .filter(|p| p.has_voted())
        .map(|p| p.id)
        .collect()
}
