//! Interactive command REPL.
//!
//! Slash commands are translated into wire intents; server events are
//! printed by a background task as they reconcile the shared mirror.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use pokerplan_server::domain::PokerValue;
use pokerplan_server::infrastructure::dto::websocket::{
    AddStoryPayload, ClientMessage, CreateSessionPayload, JoinSessionPayload, LeaveSessionPayload,
    NextStoryPayload, RemoveStoryPayload, ResetVotingPayload, RevealVotesPayload,
    SelectVotePayload, ServerMessage, StartVotingPayload, UpdateStoryPayload,
};

use crate::connection::{CONNECT_TIMEOUT_SECS, ConnectionManager};
use crate::error::ClientError;
use crate::session::SessionView;

/// One parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Create { session_name: String },
    Join { code: String, observer: bool },
    Leave,
    Vote { value: PokerValue },
    Reveal,
    Reset,
    Start { story: String },
    Add { title: String },
    Remove { index: usize },
    Next,
    Status,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "/create" if !rest.is_empty() => Ok(Self::Create {
                session_name: rest.to_string(),
            }),
            "/join" if !rest.is_empty() => {
                let mut parts = rest.split_whitespace();
                let code = parts.next().unwrap_or_default().to_string();
                let observer = parts.next() == Some("observer");
                Ok(Self::Join { code, observer })
            }
            "/leave" => Ok(Self::Leave),
            "/vote" if !rest.is_empty() => {
                // "coffee" as an ASCII-friendly alias for the ☕ card
                let value = if rest.eq_ignore_ascii_case("coffee") {
                    PokerValue::Coffee
                } else {
                    PokerValue::from_str(rest)
                        .map_err(|e| format!("{e} (try /vote 5 or /vote ?)"))?
                };
                Ok(Self::Vote { value })
            }
            "/reveal" => Ok(Self::Reveal),
            "/reset" => Ok(Self::Reset),
            "/start" if !rest.is_empty() => Ok(Self::Start {
                story: rest.to_string(),
            }),
            "/add" if !rest.is_empty() => Ok(Self::Add {
                title: rest.to_string(),
            }),
            "/remove" if !rest.is_empty() => {
                let index: usize = rest
                    .parse()
                    .map_err(|_| "usage: /remove <story number>".to_string())?;
                Ok(Self::Remove { index })
            }
            "/next" => Ok(Self::Next),
            "/status" => Ok(Self::Status),
            "/help" => Ok(Self::Help),
            "/quit" | "/exit" => Ok(Self::Quit),
            _ => Err(format!("unknown command: {head} (see /help)")),
        }
    }
}

const HELP: &str = "\
Commands:
  /create <session name>    create a session and become its host
  /join <code> [observer]   join a session by its 6-character code
  /leave                    leave the current session
  /vote <value>             select a card (0 0.5 1 2 3 5 8 13 21 34 55 89 ? coffee)
  /reveal                   reveal the cards (host only)
  /reset                    reset the voting round (host only)
  /start <story>            start voting on an ad-hoc story (host only)
  /add <title>              add a story to the queue (host only)
  /remove <n>               remove story number n from the queue (host only)
  /next                     finalize and advance to the next story (host only)
  /status                   show the current session
  /quit                     exit";

/// Run the REPL until the user quits or input ends.
///
/// Spawns the event printer, then drives rustyline on a blocking thread;
/// outgoing sends are synchronous channel pushes, so the prompt never waits
/// on the network except for the bounded connect gate of create/join.
pub async fn run_repl(
    manager: ConnectionManager,
    events: mpsc::UnboundedReceiver<ServerMessage>,
    participant_name: String,
) -> Result<(), ClientError> {
    let view = Arc::new(Mutex::new(SessionView::new()));
    let printer = tokio::spawn(print_events(events, view.clone()));

    let handle = tokio::runtime::Handle::current();
    let result = tokio::task::spawn_blocking(move || {
        repl_loop(&manager, &view, &participant_name, &handle)
    })
    .await
    .unwrap_or(Ok(()));

    printer.abort();
    result
}

fn repl_loop(
    manager: &ConnectionManager,
    view: &Arc<Mutex<SessionView>>,
    participant_name: &str,
    handle: &tokio::runtime::Handle,
) -> Result<(), ClientError> {
    let mut editor = DefaultEditor::new()?;
    println!("pokerplan — type /help for commands");

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&line);

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match execute(command, manager, view, participant_name, handle) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(ClientError::ConnectTimeout) => {
                println!("still not connected, try again in a moment");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Execute one command. Returns Ok(true) when the REPL should exit.
fn execute(
    command: Command,
    manager: &ConnectionManager,
    view: &Arc<Mutex<SessionView>>,
    participant_name: &str,
    handle: &tokio::runtime::Handle,
) -> Result<bool, ClientError> {
    let gate = Duration::from_secs(CONNECT_TIMEOUT_SECS);
    match command {
        Command::Create { session_name } => {
            // Gated: fail after the bounded wait instead of queuing forever
            handle.block_on(manager.ensure_connected(gate))?;
            manager.send(ClientMessage::SessionCreate(CreateSessionPayload {
                session_name,
                participant_name: participant_name.to_string(),
            }))?;
        }
        Command::Join { code, observer } => {
            handle.block_on(manager.ensure_connected(gate))?;
            manager.send(ClientMessage::SessionJoin(JoinSessionPayload {
                join_code: code,
                participant_name: participant_name.to_string(),
                as_observer: observer,
            }))?;
        }
        Command::Leave => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::SessionLeave(LeaveSessionPayload {
                    session_id,
                }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Vote { value } => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::VoteSelect(SelectVotePayload {
                    session_id,
                    value,
                }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Reveal => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::VoteReveal(RevealVotesPayload { session_id }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Reset => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::VoteReset(ResetVotingPayload { session_id }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Start { story } => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::VotingStart(StartVotingPayload {
                    session_id,
                    story,
                    description: None,
                }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Add { title } => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::StoryAdd(AddStoryPayload {
                    session_id,
                    title,
                    description: None,
                }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Remove { index } => {
            let target = {
                let view = view.lock().unwrap();
                view.session.as_ref().and_then(|s| {
                    index
                        .checked_sub(1)
                        .and_then(|i| s.story_queue.get(i))
                        .map(|story| (s.id, story.id))
                })
            };
            match target {
                Some((session_id, story_id)) => {
                    manager.send(ClientMessage::StoryRemove(RemoveStoryPayload {
                        session_id,
                        story_id,
                    }))?;
                }
                None => println!("no story number {index}"),
            }
        }
        Command::Next => {
            if let Some(session_id) = view.lock().unwrap().session_id() {
                manager.send(ClientMessage::StoryNext(NextStoryPayload { session_id }))?;
            } else {
                println!("not in a session");
            }
        }
        Command::Status => print_status(&view.lock().unwrap()),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(true),
    }
    Ok(false)
}

fn print_status(view: &SessionView) {
    let Some(session) = &view.session else {
        println!("not in a session");
        return;
    };

    println!(
        "session: {} [{}]  code: {}  you: {}{}",
        session.name.as_str(),
        session.status,
        view.join_code.as_deref().unwrap_or("?"),
        view.current_participant
            .as_ref()
            .map(|p| p.name.as_str().to_string())
            .unwrap_or_default(),
        if view.is_host { " (host)" } else { "" },
    );
    if let Some(story) = &session.current_story {
        println!("current story: {story}");
    }

    let (cast, total) = view.vote_progress();
    println!("votes: {cast}/{total}");
    for participant in &session.participants {
        let marker = if participant.is_observer {
            "observer".to_string()
        } else if session.cards_revealed {
            participant
                .selected_value
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| "-".to_string())
        } else if view.voted.contains(&participant.id) {
            "voted".to_string()
        } else {
            "…".to_string()
        };
        println!("  {:<20} {}", participant.name.as_str(), marker);
    }

    if !session.story_queue.is_empty() {
        println!("stories:");
        for (i, story) in session.story_queue.iter().enumerate() {
            let estimate = story
                .estimated_value
                .map(|v| format!(" = {}", v.as_str()))
                .unwrap_or_default();
            let done = if story.estimated { " (done)" } else { "" };
            println!("  {}. {}{}{}", i + 1, story.title, estimate, done);
        }
    }
}

/// Print server events as they arrive, keeping the mirror current.
async fn print_events(
    mut events: mpsc::UnboundedReceiver<ServerMessage>,
    view: Arc<Mutex<SessionView>>,
) {
    while let Some(event) = events.recv().await {
        let mut view = view.lock().unwrap();
        view.apply(&event);
        match &event {
            ServerMessage::SessionCreated(payload) => {
                println!(
                    "\rsession created — share join code {}",
                    payload.join_code
                );
            }
            ServerMessage::SessionJoined(payload) => {
                println!("\rjoined session {}", payload.session.name.as_str());
            }
            ServerMessage::SessionUpdated(payload) => {
                if payload.session.cards_revealed {
                    println!("\rcards revealed");
                }
            }
            ServerMessage::SessionLeft(_) => println!("\rleft the session"),
            ServerMessage::SessionError(payload) => {
                println!("\rerror [{}]: {}", payload.code, payload.message);
            }
            ServerMessage::ParticipantJoined(payload) => {
                println!("\r{} joined", payload.participant.name.as_str());
            }
            ServerMessage::ParticipantLeft(_) => println!("\ra participant left"),
            ServerMessage::ParticipantVoted(_) => {
                let (cast, total) = view.vote_progress();
                println!("\ra vote came in ({cast}/{total})");
            }
            ServerMessage::Pong(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_keeps_full_session_name() {
        // テスト項目: /create は空白を含むセッション名をそのまま保持する
        // given (前提条件) / when (操作):
        let command = Command::parse("/create Sprint 42 Planning").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::Create {
                session_name: "Sprint 42 Planning".to_string()
            }
        );
    }

    #[test]
    fn test_parse_join_with_observer_flag() {
        // テスト項目: /join の observer フラグの解釈
        // given (前提条件) / when (操作) / then (期待する結果):
        assert_eq!(
            Command::parse("/join abc234 observer").unwrap(),
            Command::Join {
                code: "abc234".to_string(),
                observer: true
            }
        );
        assert_eq!(
            Command::parse("/join ABC234").unwrap(),
            Command::Join {
                code: "ABC234".to_string(),
                observer: false
            }
        );
    }

    #[test]
    fn test_parse_vote_accepts_card_labels() {
        // テスト項目: /vote はカードラベルを受け付け、不正値を拒否する
        // given (前提条件) / when (操作) / then (期待する結果):
        assert_eq!(
            Command::parse("/vote 0.5").unwrap(),
            Command::Vote {
                value: PokerValue::Half
            }
        );
        assert_eq!(
            Command::parse("/vote ?").unwrap(),
            Command::Vote {
                value: PokerValue::Unsure
            }
        );
        assert_eq!(
            Command::parse("/vote coffee").unwrap(),
            Command::Vote {
                value: PokerValue::Coffee
            }
        );
        assert!(Command::parse("/vote 4").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        // テスト項目: 未知のコマンドはエラーになる
        // given (前提条件) / when (操作) / then (期待する結果):
        assert!(Command::parse("/destroy").is_err());
        assert!(Command::parse("hello").is_err());
    }
}
