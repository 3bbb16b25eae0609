//! Domain layer for the planning poker server.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod stats;
pub mod value_object;

pub use entity::{Participant, Session, SessionStatus, Story};
pub use error::{SessionError, ValueObjectError};
pub use factory::{IdFactory, JoinCodeFactory};
pub use stats::{VoteDistribution, VoteResult};
pub use value_object::{
    JoinCode, ParticipantId, ParticipantName, PokerValue, SessionId, SessionName, StoryId,
    Timestamp,
};
