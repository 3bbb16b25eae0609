//! Core domain models for the planning poker server.

use serde::{Deserialize, Serialize};

use super::{
    error::SessionError,
    stats::{VoteResult, vote_mode},
    value_object::{
        ParticipantId, ParticipantName, PokerValue, SessionId, SessionName, StoryId, Timestamp,
    },
};

/// Status of a planning poker session.
///
/// `Completed` is part of the protocol but no transition currently enters
/// it; it is kept so clients can already handle the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Voting,
    Revealed,
    Completed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Voting => "voting",
            SessionStatus::Revealed => "revealed",
            SessionStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Represents a participant in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Participant identifier
    pub id: ParticipantId,
    /// Display name
    pub name: ParticipantName,
    /// Selected card value (None until a card is chosen)
    pub selected_value: Option<PokerValue>,
    /// Observers are excluded from voting
    pub is_observer: bool,
    /// Timestamp when the participant joined
    pub joined_at: Timestamp,
}

impl Participant {
    /// Create a new participant
    pub fn new(
        id: ParticipantId,
        name: ParticipantName,
        is_observer: bool,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            selected_value: None,
            is_observer,
            joined_at,
        }
    }

    /// Select a card. Returns false if the participant is an observer.
    pub fn select_card(&mut self, value: PokerValue) -> bool {
        if self.is_observer {
            return false;
        }
        self.selected_value = Some(value);
        true
    }

    /// Clear the card selection.
    pub fn reset_selection(&mut self) {
        self.selected_value = None;
    }

    /// Whether the participant has cast a vote.
    pub fn has_voted(&self) -> bool {
        self.selected_value.is_some()
    }
}

/// A story queued for estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Story identifier
    pub id: StoryId,
    /// Title (trimmed)
    pub title: String,
    /// Optional description (trimmed; empty becomes None)
    pub description: Option<String>,
    /// Marked once the story was estimated and advanced past
    pub estimated: bool,
    /// Finalized estimate (mode of the revealed votes)
    pub estimated_value: Option<PokerValue>,
}

impl Story {
    /// Create a new unestimated story
    pub fn new(id: StoryId, title: &str, description: Option<&str>) -> Self {
        Self {
            id,
            title: title.trim().to_string(),
            description: normalize_description(description),
            estimated: false,
            estimated_value: None,
        }
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Represents a planning poker session.
///
/// The aggregate holds all session state and enforces its invariants when
/// mutated by the store; it performs no I/O itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Display name of the session
    pub name: SessionName,
    /// Title of the story currently being estimated
    pub current_story: Option<String>,
    /// Description of the current story
    pub current_story_description: Option<String>,
    /// All participants in join order
    pub participants: Vec<Participant>,
    /// Current lifecycle status
    pub status: SessionStatus,
    /// Whether votes are currently visible
    pub cards_revealed: bool,
    /// Id of the host; always the id of some current participant while the
    /// session is non-empty
    pub host_id: ParticipantId,
    /// Creation timestamp
    pub created_at: Timestamp,
    /// Last mutation timestamp
    pub updated_at: Timestamp,
    /// Index of the active story in the queue (-1 = none)
    pub current_story_index: i64,
    /// Ordered queue of prepared stories
    pub story_queue: Vec<Story>,
    /// Whether observers may join
    pub allow_observers: bool,
}

impl Session {
    /// Create a new empty session.
    ///
    /// The host participant must be added right afterwards; the store does
    /// both inside a single call.
    pub fn new(id: SessionId, name: SessionName, host_id: ParticipantId, now: Timestamp) -> Self {
        Self {
            id,
            name,
            current_story: None,
            current_story_description: None,
            participants: Vec::new(),
            status: SessionStatus::Waiting,
            cards_revealed: false,
            host_id,
            created_at: now,
            updated_at: now,
            current_story_index: -1,
            story_queue: Vec::new(),
            allow_observers: true,
        }
    }

    /// Add a participant to the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DuplicateParticipant` if the id already
    /// exists, or `SessionError::ObserversNotAllowed` if observers are
    /// disabled for this session.
    pub fn add_participant(
        &mut self,
        participant: Participant,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        if self.participant(&participant.id).is_some() {
            return Err(SessionError::DuplicateParticipant);
        }
        if participant.is_observer && !self.allow_observers {
            return Err(SessionError::ObserversNotAllowed);
        }
        self.participants.push(participant);
        self.touch(now);
        Ok(())
    }

    /// Remove a participant by id. Returns false if the id was not present.
    ///
    /// If the removed participant was the host and others remain, the
    /// participant now at index 0 becomes the new host. Positional, not
    /// most-senior: a deliberate policy choice.
    pub fn remove_participant(&mut self, participant_id: &ParticipantId, now: Timestamp) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| &p.id != participant_id);
        if self.participants.len() == before {
            return false;
        }

        if &self.host_id == participant_id
            && let Some(next_host) = self.participants.first()
        {
            self.host_id = next_host.id;
        }

        self.touch(now);
        true
    }

    /// Find a participant by id
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Find a participant by id (mutable)
    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    /// All voting participants (non-observers)
    pub fn voters(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.is_observer)
    }

    /// All observers
    pub fn observers(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_observer)
    }

    /// Whether every voter has cast a vote (false with zero voters)
    pub fn all_votes_in(&self) -> bool {
        let mut voters = self.voters().peekable();
        voters.peek().is_some() && voters.all(Participant::has_voted)
    }

    /// Start a new voting round for the given story.
    ///
    /// Clears every participant's vote and hides the cards.
    pub fn start_voting(&mut self, story: &str, description: Option<&str>, now: Timestamp) {
        self.current_story = Some(story.trim().to_string());
        self.current_story_description = normalize_description(description);
        self.status = SessionStatus::Voting;
        self.cards_revealed = false;
        self.clear_votes();
        self.touch(now);
    }

    /// Reveal all cards and compute the round statistics.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RevealUnavailable` unless the session is
    /// voting on a current story. Calling reveal twice in a row fails the
    /// second time.
    pub fn reveal_cards(&mut self, now: Timestamp) -> Result<VoteResult, SessionError> {
        let story = match (&self.status, &self.current_story) {
            (SessionStatus::Voting, Some(story)) => story.clone(),
            _ => return Err(SessionError::RevealUnavailable),
        };

        self.cards_revealed = true;
        self.status = SessionStatus::Revealed;
        self.touch(now);

        Ok(VoteResult::calculate(
            story,
            self.current_story_description.clone(),
            self.cast_votes(),
            now,
        ))
    }

    /// Reset the round for a re-vote.
    ///
    /// Votes are cleared and cards hidden; the status reverts to voting if
    /// a current story is set, otherwise to waiting. An already-estimated
    /// current queue entry is un-marked so it can be voted on again.
    pub fn reset_voting(&mut self, now: Timestamp) {
        self.cards_revealed = false;
        self.status = if self.current_story.is_some() {
            SessionStatus::Voting
        } else {
            SessionStatus::Waiting
        };
        self.clear_votes();

        if let Some(story) = self.current_queue_story_mut() {
            story.estimated = false;
            story.estimated_value = None;
        }

        self.touch(now);
    }

    /// Append a story to the queue
    pub fn add_story(&mut self, story: Story, now: Timestamp) {
        self.story_queue.push(story);
        self.touch(now);
    }

    /// Remove a story from the queue.
    ///
    /// Removing the active story collapses the session back to waiting
    /// with no current story; removing an earlier entry shifts the active
    /// index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StoryNotFound` if the id does not resolve.
    pub fn remove_story(&mut self, story_id: &StoryId, now: Timestamp) -> Result<(), SessionError> {
        let index = self
            .story_queue
            .iter()
            .position(|s| &s.id == story_id)
            .ok_or(SessionError::StoryNotFound)?;
        self.story_queue.remove(index);

        let index = index as i64;
        if index < self.current_story_index {
            self.current_story_index -= 1;
        } else if index == self.current_story_index {
            self.current_story_index = -1;
            self.current_story = None;
            self.current_story_description = None;
            self.status = SessionStatus::Waiting;
        }

        self.touch(now);
        Ok(())
    }

    /// Update a story's title and description.
    ///
    /// If the edited story is the active one, the session's current
    /// story/description are refreshed as well.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StoryNotFound` if the id does not resolve.
    pub fn update_story(
        &mut self,
        story_id: &StoryId,
        title: &str,
        description: Option<&str>,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        let story = self
            .story_queue
            .iter_mut()
            .find(|s| &s.id == story_id)
            .ok_or(SessionError::StoryNotFound)?;

        story.title = title.trim().to_string();
        story.description = normalize_description(description);
        let (title, description) = (story.title.clone(), story.description.clone());

        if self.current_queue_story().is_some_and(|s| &s.id == story_id) {
            self.current_story = Some(title);
            self.current_story_description = description;
        }

        self.touch(now);
        Ok(())
    }

    /// Finalize the active story and advance to the next unestimated one.
    ///
    /// If the active story's cards are revealed it is marked estimated and
    /// the mode of the cast votes becomes its finalized estimate; that
    /// mark persists even when no further story exists. The scan skips
    /// queue entries already marked estimated.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoMoreStories` when no unestimated entry
    /// remains after the current index.
    pub fn next_story(&mut self, now: Timestamp) -> Result<(), SessionError> {
        if self.cards_revealed {
            let cast: Vec<PokerValue> = self.cast_votes().into_iter().map(|(_, v)| v).collect();
            if let Some(story) = self.current_queue_story_mut() {
                story.estimated = true;
                if !cast.is_empty() {
                    story.estimated_value = vote_mode(&cast);
                }
            }
        }

        let start = (self.current_story_index + 1).max(0) as usize;
        let next = self
            .story_queue
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, s)| !s.estimated);

        let Some((index, story)) = next else {
            self.touch(now);
            return Err(SessionError::NoMoreStories);
        };

        self.current_story_index = index as i64;
        self.current_story = Some(story.title.clone());
        self.current_story_description = story.description.clone();
        self.status = SessionStatus::Voting;
        self.cards_revealed = false;
        self.clear_votes();
        self.touch(now);
        Ok(())
    }

    /// Cast votes in participant order (observers and non-voters excluded)
    pub fn cast_votes(&self) -> Vec<(ParticipantId, PokerValue)> {
        self.voters()
            .filter_map(|p| p.selected_value.map(|v| (p.id, v)))
            .collect()
    }

    fn current_queue_story(&self) -> Option<&Story> {
        usize::try_from(self.current_story_index)
            .ok()
            .and_then(|i| self.story_queue.get(i))
    }

    fn current_queue_story_mut(&mut self) -> Option<&mut Story> {
        usize::try_from(self.current_story_index)
            .ok()
            .and_then(|i| self.story_queue.get_mut(i))
    }

    fn clear_votes(&mut self) {
        for p in &mut self.participants {
            p.reset_selection();
        }
    }

    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }
}
