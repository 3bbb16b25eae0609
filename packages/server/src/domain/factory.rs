//! Domain factories for creating identifiers and join codes.

use rand::Rng;

use super::value_object::{
    JOIN_CODE_CHARS, JOIN_CODE_LENGTH, JoinCode, ParticipantId, SessionId, StoryId,
};

/// Factory for generating entity identifiers.
///
/// Encapsulates id generation so the value objects stay free of
/// randomness concerns.
pub struct IdFactory;

impl IdFactory {
    /// Generate a new SessionId (random UUID v4).
    pub fn session_id() -> SessionId {
        SessionId::from_uuid(uuid::Uuid::new_v4())
    }

    /// Generate a new ParticipantId (random UUID v4).
    pub fn participant_id() -> ParticipantId {
        ParticipantId::from_uuid(uuid::Uuid::new_v4())
    }

    /// Generate a new StoryId (random UUID v4).
    pub fn story_id() -> StoryId {
        StoryId::from_uuid(uuid::Uuid::new_v4())
    }
}

/// Factory for generating join codes.
pub struct JoinCodeFactory;

impl JoinCodeFactory {
    /// Generate a random join code from the restricted alphabet.
    ///
    /// Uniqueness among live sessions is the store's responsibility; the
    /// factory only guarantees the format.
    pub fn generate() -> JoinCode {
        let mut rng = rand::thread_rng();
        let chars: Vec<char> = JOIN_CODE_CHARS.chars().collect();
        let code: String = (0..JOIN_CODE_LENGTH)
            .map(|_| chars[rng.gen_range(0..chars.len())])
            .collect();
        JoinCode::from_canonical(code)
    }
}
