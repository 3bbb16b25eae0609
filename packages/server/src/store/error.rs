//! Store operation error definitions.

use thiserror::Error;

use crate::domain::SessionError;

/// Failure of a session store operation.
///
/// The variants keep the error taxonomy of the protocol: not-found,
/// unauthorized and precondition failures must stay distinguishable so the
/// router can emit the correct user-facing error code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The connection is not attributed to any participant/session
    #[error("connection is not registered to any session")]
    NotRegistered,

    /// Join code or session id does not resolve to a live session
    #[error("session not found, check the join code")]
    SessionNotFound,

    /// A host-only operation was attempted by a non-host participant
    #[error("only the host may perform this operation")]
    NotHost,

    /// An observer attempted to vote
    #[error("observers cannot vote")]
    ObserverCannotVote,

    /// A domain precondition failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl StoreError {
    /// Stable error code carried in `session:error` events.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotRegistered | StoreError::SessionNotFound => "SESSION_NOT_FOUND",
            StoreError::NotHost => "NOT_AUTHORIZED",
            StoreError::ObserverCannotVote => "VOTE_FAILED",
            StoreError::Session(SessionError::RevealUnavailable) => "REVEAL_FAILED",
            StoreError::Session(SessionError::NoMoreStories) => "NO_MORE_STORIES",
            StoreError::Session(SessionError::StoryNotFound) => "STORY_NOT_FOUND",
            StoreError::Session(SessionError::DuplicateParticipant) => "JOIN_FAILED",
            StoreError::Session(SessionError::ObserversNotAllowed) => "OBSERVERS_NOT_ALLOWED",
        }
    }
}
