//! WebSocket connection handler and message router.
//!
//! The router is the boundary between the wire format and the store: it
//! decodes inbound envelopes, dispatches each intent to exactly one store
//! operation, and fans the resulting state out to the session's peers.
//! It never mutates session state itself.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{JoinCode, ParticipantName, SessionName},
    infrastructure::dto::websocket::{
        ClientMessage, Envelope, ParticipantJoinedPayload, ParticipantLeftPayload,
        ParticipantVotedPayload, PongPayload, ServerMessage, SessionErrorPayload,
        SessionLeftPayload, SessionSnapshotPayload, SessionUpdatedPayload,
    },
    store::{Peer, PeerId, StoreError},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = PeerId::generate();
    tracing::info!("Peer connected: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();

    // Channel feeding this peer's socket; the store holds clones of the
    // sending half for fan-out.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peer = Peer::new(peer_id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_peer = peer.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error for peer {}: {}", recv_peer.id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    route_message(&recv_state, &recv_peer, &text).await;
                }
                Message::Close(_) => {
                    tracing::info!("Peer {} requested close", recv_peer.id);
                    break;
                }
                // Transport-level ping/pong is handled by the protocol
                _ => {}
            }
        }
    });

    // If either task completes, the connection is done
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    handle_disconnect(&state, &peer).await;
    tracing::info!("Peer disconnected: {}", peer_id);
}

/// Decode one inbound envelope and dispatch it.
///
/// Unparseable input produces a direct `session:error` reply to the
/// originating peer only; it is never broadcast.
async fn route_message(state: &Arc<AppState>, peer: &Peer, text: &str) {
    let envelope: Envelope<ClientMessage> = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Invalid message from peer {}: {}", peer.id, e);
            send_error(peer, "invalid message", "INVALID_MESSAGE");
            return;
        }
    };

    match envelope.message {
        ClientMessage::SessionCreate(payload) => {
            handle_create_session(state, peer, payload.session_name, payload.participant_name)
                .await;
        }
        ClientMessage::SessionJoin(payload) => {
            handle_join_session(
                state,
                peer,
                payload.join_code,
                payload.participant_name,
                payload.as_observer,
            )
            .await;
        }
        ClientMessage::SessionLeave(_) => {
            handle_leave_session(state, peer).await;
        }
        ClientMessage::VoteSelect(payload) => {
            handle_select_vote(state, peer, payload.value).await;
        }
        ClientMessage::VoteReveal(_) => {
            handle_reveal_cards(state, peer).await;
        }
        ClientMessage::VoteReset(_) => {
            let result = state.store.lock().await.reset_voting(&peer.id);
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::VotingStart(payload) => {
            let result = state.store.lock().await.start_voting(
                &peer.id,
                &payload.story,
                payload.description.as_deref(),
            );
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::StoryAdd(payload) => {
            let result = state.store.lock().await.add_story(
                &peer.id,
                &payload.title,
                payload.description.as_deref(),
            );
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::StoryRemove(payload) => {
            let result = state
                .store
                .lock()
                .await
                .remove_story(&peer.id, &payload.story_id);
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::StoryUpdate(payload) => {
            let result = state.store.lock().await.update_story(
                &peer.id,
                &payload.story_id,
                &payload.title,
                payload.description.as_deref(),
            );
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::StoryNext(_) => {
            let result = state.store.lock().await.next_story(&peer.id);
            respond_session_wide(state, peer, result).await;
        }
        ClientMessage::Ping(_) => {
            send_to_peer(peer, &ServerMessage::Pong(PongPayload {}));
        }
    }
}

async fn handle_create_session(
    state: &Arc<AppState>,
    peer: &Peer,
    session_name: String,
    participant_name: String,
) {
    let (session_name, participant_name) = match (
        SessionName::new(session_name),
        ParticipantName::new(participant_name),
    ) {
        (Ok(s), Ok(p)) => (s, p),
        (Err(e), _) | (_, Err(e)) => {
            send_error(peer, &e.to_string(), "INVALID_MESSAGE");
            return;
        }
    };

    let created = state
        .store
        .lock()
        .await
        .create_session(session_name, participant_name, peer.clone());

    tracing::info!(
        "Session {} created with join code {}",
        created.session.id,
        created.join_code
    );

    send_to_peer(
        peer,
        &ServerMessage::SessionCreated(SessionSnapshotPayload {
            session: created.session,
            join_code: created.join_code.as_str().to_string(),
            participant: created.participant,
        }),
    );
}

async fn handle_join_session(
    state: &Arc<AppState>,
    peer: &Peer,
    join_code: String,
    participant_name: String,
    as_observer: bool,
) {
    let participant_name = match ParticipantName::new(participant_name) {
        Ok(name) => name,
        Err(e) => {
            send_error(peer, &e.to_string(), "INVALID_MESSAGE");
            return;
        }
    };

    // A malformed code cannot resolve to a session, so it reports the
    // same not-found error as an unknown one
    let join_code = match JoinCode::parse(&join_code) {
        Ok(code) => code,
        Err(_) => {
            send_error(peer, "session not found, check the join code", "SESSION_NOT_FOUND");
            return;
        }
    };

    let (joined, peers) = {
        let mut store = state.store.lock().await;
        match store.join_session(&join_code, participant_name, as_observer, peer.clone()) {
            Ok(joined) => {
                let peers = store.connections(&joined.session.id);
                (joined, peers)
            }
            Err(e) => {
                send_store_error(peer, &e);
                return;
            }
        }
    };

    tracing::info!(
        "Participant {} joined session {}",
        joined.participant.id,
        joined.session.id
    );

    send_to_peer(
        peer,
        &ServerMessage::SessionJoined(SessionSnapshotPayload {
            session: joined.session.clone(),
            join_code: joined.join_code.as_str().to_string(),
            participant: joined.participant.clone(),
        }),
    );

    // Everyone already in the session learns about the newcomer
    broadcast(
        &peers,
        &ServerMessage::ParticipantJoined(ParticipantJoinedPayload {
            participant: joined.participant,
            session_id: joined.session.id,
        }),
        Some(peer.id),
    );
}

async fn handle_leave_session(state: &Arc<AppState>, peer: &Peer) {
    let Some((left, peers)) = ({
        let mut store = state.store.lock().await;
        match store.leave_session(&peer.id) {
            Ok(left) => {
                let peers = store.connections(&left.session_id);
                Some((left, peers))
            }
            Err(_) => None,
        }
    }) else {
        send_to_peer(
            peer,
            &ServerMessage::SessionLeft(SessionLeftPayload { success: false }),
        );
        return;
    };

    send_to_peer(
        peer,
        &ServerMessage::SessionLeft(SessionLeftPayload { success: true }),
    );

    notify_departure(&peers, &left);
}

async fn handle_select_vote(
    state: &Arc<AppState>,
    peer: &Peer,
    value: crate::domain::PokerValue,
) {
    let (recorded, peers) = {
        let mut store = state.store.lock().await;
        match store.select_vote(&peer.id, value) {
            Ok(recorded) => {
                let peers = store.connections(&recorded.session.id);
                (recorded, peers)
            }
            Err(e) => {
                send_store_error(peer, &e);
                return;
            }
        }
    };

    if recorded.session.cards_revealed {
        // Votes are visible; the full session carries the new value
        broadcast(
            &peers,
            &ServerMessage::SessionUpdated(SessionUpdatedPayload {
                session: recorded.session,
            }),
            None,
        );
    } else {
        // Cards are hidden: only signal that someone voted, never the value
        broadcast(
            &peers,
            &ServerMessage::ParticipantVoted(ParticipantVotedPayload {
                participant_id: recorded.participant_id,
                session_id: recorded.session.id,
            }),
            None,
        );
    }
}

async fn handle_reveal_cards(state: &Arc<AppState>, peer: &Peer) {
    let (session, result, peers) = {
        let mut store = state.store.lock().await;
        match store.reveal_cards(&peer.id) {
            Ok((session, result)) => {
                let peers = store.connections(&session.id);
                (session, result, peers)
            }
            Err(e) => {
                send_store_error(peer, &e);
                return;
            }
        }
    };

    tracing::info!(
        "Session {} revealed: average={:?} median={:?} mode={:?} consensus={}",
        session.id,
        result.average,
        result.median,
        result.mode,
        result.has_consensus
    );

    broadcast(
        &peers,
        &ServerMessage::SessionUpdated(SessionUpdatedPayload { session }),
        None,
    );
}

/// Shared tail for host-driven session-wide mutations: on success the
/// updated session goes to every peer in the session, on failure the
/// acting peer gets a direct error.
async fn respond_session_wide(
    state: &Arc<AppState>,
    peer: &Peer,
    result: Result<crate::domain::Session, StoreError>,
) {
    let session = match result {
        Ok(session) => session,
        Err(e) => {
            send_store_error(peer, &e);
            return;
        }
    };

    let peers = state.store.lock().await.connections(&session.id);
    broadcast(
        &peers,
        &ServerMessage::SessionUpdated(SessionUpdatedPayload { session }),
        None,
    );
}

/// A closed socket is an implicit leave; remaining peers are notified the
/// same way as for an explicit one.
async fn handle_disconnect(state: &Arc<AppState>, peer: &Peer) {
    let departed = {
        let mut store = state.store.lock().await;
        match store.leave_session(&peer.id) {
            Ok(left) => {
                let peers = store.connections(&left.session_id);
                Some((left, peers))
            }
            // Peer never joined a session; nothing to clean up
            Err(_) => None,
        }
    };

    if let Some((left, peers)) = departed {
        notify_departure(&peers, &left);
    }
}

fn notify_departure(peers: &[Peer], left: &crate::store::LeftSession) {
    let Some(session) = &left.session else {
        // Session was deleted with its last participant; no one to notify
        return;
    };

    broadcast(
        peers,
        &ServerMessage::ParticipantLeft(ParticipantLeftPayload {
            participant_id: left.participant_id,
            session_id: left.session_id,
        }),
        None,
    );
    broadcast(
        peers,
        &ServerMessage::SessionUpdated(SessionUpdatedPayload {
            session: session.clone(),
        }),
        None,
    );
}

/// Send one event to one peer.
fn send_to_peer(peer: &Peer, message: &ServerMessage) {
    match serde_json::to_string(&Envelope::now(message)) {
        Ok(json) => {
            if !peer.send(json) {
                tracing::warn!("Failed to send to peer {}", peer.id);
            }
        }
        Err(e) => tracing::error!("Failed to encode server message: {}", e),
    }
}

/// Send one event to every peer in the list, serializing once.
fn broadcast(peers: &[Peer], message: &ServerMessage, exclude: Option<PeerId>) {
    let json = match serde_json::to_string(&Envelope::now(message)) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode broadcast: {}", e);
            return;
        }
    };

    for target in peers {
        if exclude.is_some_and(|id| id == target.id) {
            continue;
        }
        if !target.send(json.clone()) {
            tracing::warn!("Failed to broadcast to peer {}", target.id);
        }
    }
}

fn send_store_error(peer: &Peer, error: &StoreError) {
    send_error(peer, &error.to_string(), error.code());
}

fn send_error(peer: &Peer, message: &str, code: &str) {
    send_to_peer(
        peer,
        &ServerMessage::SessionError(SessionErrorPayload {
            message: message.to_string(),
            code: code.to_string(),
        }),
    );
}
