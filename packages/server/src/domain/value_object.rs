//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ValueObjectError;

/// Alphabet for join codes. Visually confusable characters (0, 1, I, O)
/// are excluded.
pub const JOIN_CODE_CHARS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Session identifier value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub(crate) fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant identifier value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(uuid::Uuid);

impl ParticipantId {
    pub(crate) fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Story identifier value object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(uuid::Uuid);

impl StoryId {
    pub(crate) fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant display name value object.
///
/// The name is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Create a new ParticipantName.
    ///
    /// # Arguments
    ///
    /// * `name` - The display name (surrounding whitespace is trimmed)
    ///
    /// # Returns
    ///
    /// A Result containing the ParticipantName or an error if validation fails
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::ParticipantNameEmpty);
        }
        let len = trimmed.chars().count();
        if len > 50 {
            return Err(ValueObjectError::ParticipantNameTooLong {
                max: 50,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session display name value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionName(String);

impl SessionName {
    /// Create a new SessionName.
    ///
    /// # Arguments
    ///
    /// * `name` - The session name (surrounding whitespace is trimmed)
    ///
    /// # Returns
    ///
    /// A Result containing the SessionName or an error if validation fails
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::SessionNameEmpty);
        }
        let len = trimmed.chars().count();
        if len > 100 {
            return Err(ValueObjectError::SessionNameTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Join code value object.
///
/// Exactly [`JOIN_CODE_LENGTH`] characters from [`JOIN_CODE_CHARS`].
/// Input is case-insensitive and canonicalized to uppercase; codes are
/// unique among live sessions only and recycled after deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinCode(String);

impl JoinCode {
    /// Parse a user-entered join code.
    ///
    /// # Arguments
    ///
    /// * `input` - The entered code (any case, surrounding whitespace allowed)
    ///
    /// # Returns
    ///
    /// A Result containing the canonicalized JoinCode or an error if the
    /// input is not a valid code
    pub fn parse(input: &str) -> Result<Self, ValueObjectError> {
        let canonical = input.trim().to_uppercase();
        if canonical.len() != JOIN_CODE_LENGTH
            || !canonical.chars().all(|c| JOIN_CODE_CHARS.contains(c))
        {
            return Err(ValueObjectError::InvalidJoinCode {
                input: input.to_string(),
                expected_len: JOIN_CODE_LENGTH,
            });
        }
        Ok(Self(canonical))
    }

    /// Construct from an already-canonical code. Only the factory uses this.
    pub(crate) fn from_canonical(code: String) -> Self {
        debug_assert!(code.len() == JOIN_CODE_LENGTH);
        Self(code)
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Poker card value.
///
/// Fibonacci-based deck with "?" (unsure) and "☕" (break) extras. The
/// wire representation is the literal card label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PokerValue {
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "0.5")]
    Half,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "13")]
    Thirteen,
    #[serde(rename = "21")]
    TwentyOne,
    #[serde(rename = "34")]
    ThirtyFour,
    #[serde(rename = "55")]
    FiftyFive,
    #[serde(rename = "89")]
    EightyNine,
    #[serde(rename = "?")]
    Unsure,
    #[serde(rename = "☕")]
    Coffee,
}

impl PokerValue {
    /// Every card in the deck, in display order.
    pub const ALL: [PokerValue; 14] = [
        PokerValue::Zero,
        PokerValue::Half,
        PokerValue::One,
        PokerValue::Two,
        PokerValue::Three,
        PokerValue::Five,
        PokerValue::Eight,
        PokerValue::Thirteen,
        PokerValue::TwentyOne,
        PokerValue::ThirtyFour,
        PokerValue::FiftyFive,
        PokerValue::EightyNine,
        PokerValue::Unsure,
        PokerValue::Coffee,
    ];

    /// The card label as shown on the wire and in UIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PokerValue::Zero => "0",
            PokerValue::Half => "0.5",
            PokerValue::One => "1",
            PokerValue::Two => "2",
            PokerValue::Three => "3",
            PokerValue::Five => "5",
            PokerValue::Eight => "8",
            PokerValue::Thirteen => "13",
            PokerValue::TwentyOne => "21",
            PokerValue::ThirtyFour => "34",
            PokerValue::FiftyFive => "55",
            PokerValue::EightyNine => "89",
            PokerValue::Unsure => "?",
            PokerValue::Coffee => "☕",
        }
    }

    /// Numeric value of the card, if it has one.
    ///
    /// "?" and "☕" return None and are excluded from average/median.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            PokerValue::Unsure | PokerValue::Coffee => None,
            other => other.as_str().parse().ok(),
        }
    }
}

impl FromStr for PokerValue {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PokerValue::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| ValueObjectError::InvalidCardValue(s.to_string()))
    }
}

impl fmt::Display for PokerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp from Unix milliseconds.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
