//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Participant name validation error
    #[error("participant name cannot be empty")]
    ParticipantNameEmpty,

    /// Participant name too long error
    #[error("participant name cannot exceed {max} characters (got {actual})")]
    ParticipantNameTooLong { max: usize, actual: usize },

    /// Session name validation error
    #[error("session name cannot be empty")]
    SessionNameEmpty,

    /// Session name too long error
    #[error("session name cannot exceed {max} characters (got {actual})")]
    SessionNameTooLong { max: usize, actual: usize },

    /// Join code format error (wrong length or disallowed character)
    #[error("join code must be {expected_len} characters from the restricted alphabet (got: {input})")]
    InvalidJoinCode { input: String, expected_len: usize },

    /// Card value is not part of the fixed deck
    #[error("'{0}' is not a valid card value")]
    InvalidCardValue(String),
}

/// Errors related to Session domain logic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A participant with the same id is already in the session
    #[error("participant is already in the session")]
    DuplicateParticipant,

    /// Session configuration disallows observers
    #[error("observers are not allowed in this session")]
    ObserversNotAllowed,

    /// Reveal requires an active voting round with a current story
    #[error("cards can only be revealed during voting with a current story")]
    RevealUnavailable,

    /// Story queue has no remaining unestimated entry
    #[error("no unestimated story remains in the queue")]
    NoMoreStories,

    /// Story id does not resolve within the queue
    #[error("story not found in the queue")]
    StoryNotFound,
}
