//! WebSocket message DTOs.
//!
//! Both directions share the envelope `{type, payload, timestamp}`. The
//! message set is a closed sum type per direction, so an unhandled intent
//! is a compile error in the router, and an unknown `type` string fails
//! deserialization instead of being silently dropped.

use serde::{Deserialize, Serialize};

use pokerplan_shared::now_millis;

use crate::domain::{Participant, ParticipantId, PokerValue, Session, SessionId, StoryId};

/// Wire envelope shared by both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<M> {
    #[serde(flatten)]
    pub message: M,
    /// Unix milliseconds at send time
    pub timestamp: i64,
}

impl<M> Envelope<M> {
    /// Wrap a message with the current timestamp.
    pub fn now(message: M) -> Self {
        Self {
            message,
            timestamp: now_millis(),
        }
    }
}

/// Client-to-server intents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "session:create")]
    SessionCreate(CreateSessionPayload),
    #[serde(rename = "session:join")]
    SessionJoin(JoinSessionPayload),
    #[serde(rename = "session:leave")]
    SessionLeave(LeaveSessionPayload),
    #[serde(rename = "vote:select")]
    VoteSelect(SelectVotePayload),
    #[serde(rename = "vote:reveal")]
    VoteReveal(RevealVotesPayload),
    #[serde(rename = "vote:reset")]
    VoteReset(ResetVotingPayload),
    #[serde(rename = "voting:start")]
    VotingStart(StartVotingPayload),
    #[serde(rename = "story:add")]
    StoryAdd(AddStoryPayload),
    #[serde(rename = "story:remove")]
    StoryRemove(RemoveStoryPayload),
    #[serde(rename = "story:update")]
    StoryUpdate(UpdateStoryPayload),
    #[serde(rename = "story:next")]
    StoryNext(NextStoryPayload),
    #[serde(rename = "ping")]
    Ping(PingPayload),
}

/// Server-to-client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "session:created")]
    SessionCreated(SessionSnapshotPayload),
    #[serde(rename = "session:joined")]
    SessionJoined(SessionSnapshotPayload),
    #[serde(rename = "session:updated")]
    SessionUpdated(SessionUpdatedPayload),
    #[serde(rename = "session:left")]
    SessionLeft(SessionLeftPayload),
    #[serde(rename = "session:error")]
    SessionError(SessionErrorPayload),
    #[serde(rename = "participant:joined")]
    ParticipantJoined(ParticipantJoinedPayload),
    #[serde(rename = "participant:left")]
    ParticipantLeft(ParticipantLeftPayload),
    #[serde(rename = "participant:voted")]
    ParticipantVoted(ParticipantVotedPayload),
    #[serde(rename = "pong")]
    Pong(PongPayload),
}

// ============================================
// Client message payloads
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionPayload {
    pub session_name: String,
    pub participant_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionPayload {
    /// Raw user input; canonicalized server-side
    pub join_code: String,
    pub participant_name: String,
    pub as_observer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSessionPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectVotePayload {
    pub session_id: SessionId,
    pub value: PokerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealVotesPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetVotingPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVotingPayload {
    pub session_id: SessionId,
    pub story: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStoryPayload {
    pub session_id: SessionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStoryPayload {
    pub session_id: SessionId,
    pub story_id: StoryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoryPayload {
    pub session_id: SessionId,
    pub story_id: StoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStoryPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingPayload {}

// ============================================
// Server message payloads
// ============================================

/// Full session snapshot sent on create/join acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshotPayload {
    pub session: Session,
    pub join_code: String,
    pub participant: Participant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdatedPayload {
    pub session: Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLeftPayload {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionErrorPayload {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantJoinedPayload {
    pub participant: Participant,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeftPayload {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
}

/// "Someone voted" notice emitted while cards are hidden.
///
/// Deliberately carries no value so hidden votes never leak.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantVotedPayload {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongPayload {}
