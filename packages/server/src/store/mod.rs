//! Authoritative in-memory session store.
//!
//! The store owns every live session together with the connection registry
//! that attributes an inbound message to a participant and session in O(1).
//! All four lookup maps are mutated inside single `&mut self` calls, so they
//! can never be observed in a partially-updated state. The WebSocket layer
//! serializes every mutation behind one `tokio::sync::Mutex`; the store
//! itself contains no locking.
//!
//! There is exactly one store per process, constructed at server start and
//! passed by reference through the application state.

pub mod error;

use std::collections::HashMap;

use tokio::sync::mpsc;

use pokerplan_shared::now_millis;

use crate::domain::{
    IdFactory, JoinCode, JoinCodeFactory, Participant, ParticipantId, ParticipantName, PokerValue,
    Session, SessionError, SessionId, SessionName, Story, StoryId, Timestamp, VoteResult,
};

pub use error::StoreError;

/// Sessions idle for longer than this are evicted by the sweep.
pub const IDLE_TIMEOUT_MS: i64 = 60 * 60 * 1000;

/// Interval of the idle sweep.
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// Identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(uuid::Uuid);

impl PeerId {
    /// Allocate a fresh peer id for a new connection.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live connection: its id plus the channel that feeds its socket.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    sender: mpsc::UnboundedSender<String>,
}

impl Peer {
    pub fn new(id: PeerId, sender: mpsc::UnboundedSender<String>) -> Self {
        Self { id, sender }
    }

    /// Queue a text frame for this peer. Returns false when the receiving
    /// task is gone (connection already closed).
    pub fn send(&self, text: String) -> bool {
        self.sender.send(text).is_ok()
    }
}

/// A session plus its live connections and idle timer.
struct ManagedSession {
    session: Session,
    join_code: JoinCode,
    connections: HashMap<ParticipantId, Peer>,
    last_activity: i64,
}

/// Result of a successful create operation.
pub struct CreatedSession {
    pub session: Session,
    pub join_code: JoinCode,
    pub participant: Participant,
}

/// Result of a successful join operation.
pub struct JoinedSession {
    pub session: Session,
    pub join_code: JoinCode,
    pub participant: Participant,
}

/// Result of a successful leave operation.
///
/// `session` is None when the session was deleted because it became empty.
pub struct LeftSession {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub session: Option<Session>,
}

/// Result of a recorded vote.
pub struct VoteRecorded {
    pub session: Session,
    pub participant_id: ParticipantId,
}

/// The authoritative session store with its connection registry.
pub struct SessionStore {
    sessions: HashMap<SessionId, ManagedSession>,
    join_codes: HashMap<JoinCode, SessionId>,
    participant_sessions: HashMap<ParticipantId, SessionId>,
    peer_participants: HashMap<PeerId, ParticipantId>,
    idle_timeout_ms: i64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT_MS)
    }

    /// Store with a custom idle timeout (tests use a short one).
    pub fn with_idle_timeout(idle_timeout_ms: i64) -> Self {
        Self {
            sessions: HashMap::new(),
            join_codes: HashMap::new(),
            participant_sessions: HashMap::new(),
            peer_participants: HashMap::new(),
            idle_timeout_ms,
        }
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Create a new session with the acting peer as host.
    pub fn create_session(
        &mut self,
        name: SessionName,
        host_name: ParticipantName,
        peer: Peer,
    ) -> CreatedSession {
        let now = Timestamp::new(now_millis());
        let session_id = IdFactory::session_id();
        let join_code = self.unique_join_code();
        let participant_id = IdFactory::participant_id();

        let participant = Participant::new(participant_id, host_name, false, now);
        let mut session = Session::new(session_id, name, participant_id, now);
        session
            .add_participant(participant.clone(), now)
            .expect("a fresh session cannot reject its host");

        let managed = ManagedSession {
            session: session.clone(),
            join_code: join_code.clone(),
            connections: HashMap::from([(participant_id, peer.clone())]),
            last_activity: now.value(),
        };

        self.sessions.insert(session_id, managed);
        self.join_codes.insert(join_code.clone(), session_id);
        self.participant_sessions.insert(participant_id, session_id);
        self.peer_participants.insert(peer.id, participant_id);

        CreatedSession {
            session,
            join_code,
            participant,
        }
    }

    /// Join a live session via its join code.
    pub fn join_session(
        &mut self,
        join_code: &JoinCode,
        participant_name: ParticipantName,
        as_observer: bool,
        peer: Peer,
    ) -> Result<JoinedSession, StoreError> {
        let session_id = *self
            .join_codes
            .get(join_code)
            .ok_or(StoreError::SessionNotFound)?;
        let managed = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;

        let now = Timestamp::new(now_millis());
        let participant = Participant::new(
            IdFactory::participant_id(),
            participant_name,
            as_observer,
            now,
        );
        managed.session.add_participant(participant.clone(), now)?;
        managed.connections.insert(participant.id, peer.clone());
        managed.last_activity = now.value();

        self.participant_sessions.insert(participant.id, session_id);
        self.peer_participants.insert(peer.id, participant.id);

        Ok(JoinedSession {
            session: managed.session.clone(),
            join_code: managed.join_code.clone(),
            participant,
        })
    }

    /// Remove the peer's participant from its session.
    ///
    /// An empty session is deleted and its join code freed; otherwise a
    /// departing host is replaced by the participant now at index 0.
    pub fn leave_session(&mut self, peer_id: &PeerId) -> Result<LeftSession, StoreError> {
        let participant_id = self
            .peer_participants
            .get(peer_id)
            .copied()
            .ok_or(StoreError::NotRegistered)?;
        let session_id = self
            .participant_sessions
            .get(&participant_id)
            .copied()
            .ok_or(StoreError::NotRegistered)?;
        let managed = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;

        let now = Timestamp::new(now_millis());
        managed.session.remove_participant(&participant_id, now);
        managed.connections.remove(&participant_id);
        managed.last_activity = now.value();

        self.participant_sessions.remove(&participant_id);
        self.peer_participants.remove(peer_id);

        if managed.session.participants.is_empty() {
            let managed = self
                .sessions
                .remove(&session_id)
                .expect("session was present above");
            self.join_codes.remove(&managed.join_code);
            return Ok(LeftSession {
                session_id,
                participant_id,
                session: None,
            });
        }

        Ok(LeftSession {
            session_id,
            participant_id,
            session: Some(managed.session.clone()),
        })
    }

    /// Record a vote for the peer's participant.
    ///
    /// Votes are accepted in any session status; the round lifecycle only
    /// controls visibility, not acceptance.
    pub fn select_vote(
        &mut self,
        peer_id: &PeerId,
        value: PokerValue,
    ) -> Result<VoteRecorded, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        let now = Timestamp::new(now_millis());

        let participant = managed
            .session
            .participant_mut(&participant_id)
            .ok_or(StoreError::NotRegistered)?;
        if !participant.select_card(value) {
            return Err(StoreError::ObserverCannotVote);
        }

        managed.session.updated_at = now;
        managed.last_activity = now.value();

        Ok(VoteRecorded {
            session: managed.session.clone(),
            participant_id,
        })
    }

    /// Reveal the cards. Host-only.
    pub fn reveal_cards(
        &mut self,
        peer_id: &PeerId,
    ) -> Result<(Session, VoteResult), StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        let result = managed.session.reveal_cards(now)?;
        managed.last_activity = now.value();

        Ok((managed.session.clone(), result))
    }

    /// Reset the voting round. Host-only.
    pub fn reset_voting(&mut self, peer_id: &PeerId) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        managed.session.reset_voting(now);
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// Start a voting round for an ad-hoc story. Host-only.
    pub fn start_voting(
        &mut self,
        peer_id: &PeerId,
        story: &str,
        description: Option<&str>,
    ) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        managed.session.start_voting(story, description, now);
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// Append a story to the queue. Host-only.
    pub fn add_story(
        &mut self,
        peer_id: &PeerId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        let story = Story::new(IdFactory::story_id(), title, description);
        managed.session.add_story(story, now);
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// Remove a story from the queue. Host-only.
    pub fn remove_story(
        &mut self,
        peer_id: &PeerId,
        story_id: &StoryId,
    ) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        managed.session.remove_story(story_id, now)?;
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// Update a story's title/description. Host-only.
    pub fn update_story(
        &mut self,
        peer_id: &PeerId,
        story_id: &StoryId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        managed
            .session
            .update_story(story_id, title, description, now)?;
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// Finalize the active story and advance the queue. Host-only.
    pub fn next_story(&mut self, peer_id: &PeerId) -> Result<Session, StoreError> {
        let (managed, participant_id) = self.managed_for_peer(peer_id)?;
        require_host(&managed.session, &participant_id)?;

        let now = Timestamp::new(now_millis());
        managed.session.next_story(now)?;
        managed.last_activity = now.value();

        Ok(managed.session.clone())
    }

    /// All live peers of a session, for broadcast fan-out.
    pub fn connections(&self, session_id: &SessionId) -> Vec<Peer> {
        self.sessions
            .get(session_id)
            .map(|m| m.connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Session the peer currently belongs to, if any.
    pub fn session_id_for_peer(&self, peer_id: &PeerId) -> Option<SessionId> {
        let participant_id = self.peer_participants.get(peer_id)?;
        self.participant_sessions.get(participant_id).copied()
    }

    /// Evict sessions whose last activity is older than the idle timeout.
    ///
    /// Returns the evicted sessions so the caller can log them. Join codes
    /// are freed for reuse.
    pub fn evict_idle(&mut self, now_ms: i64) -> Vec<(SessionId, JoinCode)> {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, m)| now_ms - m.last_activity > self.idle_timeout_ms)
            .map(|(id, _)| *id)
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for session_id in expired {
            let managed = self
                .sessions
                .remove(&session_id)
                .expect("id collected above");
            self.join_codes.remove(&managed.join_code);
            for (participant_id, peer) in &managed.connections {
                self.participant_sessions.remove(participant_id);
                self.peer_participants.remove(&peer.id);
            }
            evicted.push((session_id, managed.join_code));
        }
        evicted
    }

    /// Resolve the peer to its managed session and participant id.
    fn managed_for_peer(
        &mut self,
        peer_id: &PeerId,
    ) -> Result<(&mut ManagedSession, ParticipantId), StoreError> {
        let participant_id = self
            .peer_participants
            .get(peer_id)
            .copied()
            .ok_or(StoreError::NotRegistered)?;
        let session_id = self
            .participant_sessions
            .get(&participant_id)
            .copied()
            .ok_or(StoreError::NotRegistered)?;
        let managed = self
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;
        Ok((managed, participant_id))
    }

    /// Generate a join code that no live session uses.
    fn unique_join_code(&self) -> JoinCode {
        let mut code = JoinCodeFactory::generate();
        while self.join_codes.contains_key(&code) {
            code = JoinCodeFactory::generate();
        }
        code
    }
}

fn require_host(session: &Session, participant_id: &ParticipantId) -> Result<(), StoreError> {
    if &session.host_id != participant_id {
        return Err(StoreError::NotHost);
    }
    Ok(())
}
