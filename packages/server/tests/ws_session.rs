//! WebSocket session lifecycle integration tests.
//!
//! Drives the real endpoint with raw wire frames, asserting on the JSON the
//! server actually emits.

mod fixtures;

use fixtures::{TestServer, WsClient, recv_event, recv_json, send_json};
use serde_json::json;

async fn create_session(ws: &mut WsClient, session_name: &str, participant_name: &str) -> serde_json::Value {
    send_json(
        ws,
        json!({
            "type": "session:create",
            "payload": {"sessionName": session_name, "participantName": participant_name},
            "timestamp": 0,
        }),
    )
    .await;
    recv_event(ws, "session:created").await
}

async fn join_session(ws: &mut WsClient, join_code: &str, participant_name: &str) -> serde_json::Value {
    send_json(
        ws,
        json!({
            "type": "session:join",
            "payload": {"joinCode": join_code, "participantName": participant_name, "asObserver": false},
            "timestamp": 0,
        }),
    )
    .await;
    recv_event(ws, "session:joined").await
}

#[tokio::test]
async fn test_create_session_returns_snapshot_with_join_code() {
    // テスト項目: セッション作成で参加コード付きスナップショットが返る
    // given (前提条件):
    let server = TestServer::start(19180);
    let mut alice = server.connect().await;

    // when (操作):
    let created = create_session(&mut alice, "Sprint", "Alice").await;

    // then (期待する結果):
    let code = created["joinCode"].as_str().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(created["session"]["status"], "waiting");
    assert_eq!(
        created["session"]["hostId"],
        created["participant"]["id"]
    );
    assert_eq!(created["participant"]["name"], "Alice");
}

#[tokio::test]
async fn test_full_voting_round_over_the_wire() {
    // テスト項目: 作成 → 参加 → 投票 → 公開のシナリオをワイヤ経由で検証する
    // given (前提条件): Alice がセッションを作成し Bob が参加
    let server = TestServer::start(19181);
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let code = created["joinCode"].as_str().unwrap().to_string();
    let session_id = created["session"]["id"].clone();

    let joined = join_session(&mut bob, &code, "Bob").await;
    assert_eq!(joined["session"]["participants"].as_array().unwrap().len(), 2);

    // Alice には participant:joined が届く
    let notice = recv_event(&mut alice, "participant:joined").await;
    assert_eq!(notice["participant"]["name"], "Bob");

    // when (操作): Alice が開始、両者が投票、Alice が公開
    send_json(
        &mut alice,
        json!({
            "type": "voting:start",
            "payload": {"sessionId": session_id, "story": "Story A"},
            "timestamp": 0,
        }),
    )
    .await;
    let started = recv_event(&mut alice, "session:updated").await;
    assert_eq!(started["session"]["status"], "voting");
    assert_eq!(started["session"]["currentStory"], "Story A");
    recv_event(&mut bob, "session:updated").await;

    send_json(
        &mut alice,
        json!({
            "type": "vote:select",
            "payload": {"sessionId": session_id, "value": "3"},
            "timestamp": 0,
        }),
    )
    .await;
    // 公開前の投票は値を含まない participant:voted として届く
    let voted = recv_event(&mut alice, "participant:voted").await;
    assert!(voted.get("value").is_none());
    recv_event(&mut bob, "participant:voted").await;

    send_json(
        &mut bob,
        json!({
            "type": "vote:select",
            "payload": {"sessionId": session_id, "value": "5"},
            "timestamp": 0,
        }),
    )
    .await;
    recv_event(&mut alice, "participant:voted").await;
    recv_event(&mut bob, "participant:voted").await;

    send_json(
        &mut alice,
        json!({
            "type": "vote:reveal",
            "payload": {"sessionId": session_id},
            "timestamp": 0,
        }),
    )
    .await;

    // then (期待する結果): 全員に公開済みセッションが配信され、票が見える
    for ws in [&mut alice, &mut bob] {
        let revealed = recv_event(ws, "session:updated").await;
        assert_eq!(revealed["session"]["status"], "revealed");
        assert_eq!(revealed["session"]["cardsRevealed"], true);
        let values: Vec<_> = revealed["session"]["participants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["selectedValue"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(values, ["3", "5"]);
    }
}

#[tokio::test]
async fn test_join_with_unknown_code_returns_error() {
    // テスト項目: 存在しない参加コードはエラー応答になる
    // given (前提条件):
    let server = TestServer::start(19182);
    let mut ws = server.connect().await;

    // when (操作):
    send_json(
        &mut ws,
        json!({
            "type": "session:join",
            "payload": {"joinCode": "ZZZZZZ", "participantName": "Bob", "asObserver": false},
            "timestamp": 0,
        }),
    )
    .await;

    // then (期待する結果):
    let error = recv_event(&mut ws, "session:error").await;
    assert_eq!(error["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_frame_returns_invalid_message() {
    // テスト項目: 解釈できないフレームは INVALID_MESSAGE を返す
    // given (前提条件):
    let server = TestServer::start(19183);
    let mut ws = server.connect().await;

    // when (操作):
    send_json(&mut ws, json!({"type": "session:destroy", "payload": {}, "timestamp": 0})).await;

    // then (期待する結果):
    let error = recv_event(&mut ws, "session:error").await;
    assert_eq!(error["code"], "INVALID_MESSAGE");
}

#[tokio::test]
async fn test_non_host_reveal_rejected_without_broadcast() {
    // テスト項目: 非ホストの公開要求は本人だけにエラーが返る
    // given (前提条件):
    let server = TestServer::start(19184);
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let code = created["joinCode"].as_str().unwrap().to_string();
    let session_id = created["session"]["id"].clone();
    join_session(&mut bob, &code, "Bob").await;
    recv_event(&mut alice, "participant:joined").await;

    // when (操作):
    send_json(
        &mut bob,
        json!({
            "type": "vote:reveal",
            "payload": {"sessionId": session_id},
            "timestamp": 0,
        }),
    )
    .await;

    // then (期待する結果): Bob にエラー、Alice には何も配信されない
    let error = recv_event(&mut bob, "session:error").await;
    assert_eq!(error["code"], "NOT_AUTHORIZED");

    send_json(&mut alice, json!({"type": "ping", "payload": {}, "timestamp": 0})).await;
    let next = recv_json(&mut alice).await;
    assert_eq!(next["type"], "pong");
}

#[tokio::test]
async fn test_reveal_without_voting_round_fails() {
    // テスト項目: voting 状態でない公開要求は REVEAL_FAILED になる
    // given (前提条件): waiting 状態のセッション
    let server = TestServer::start(19185);
    let mut alice = server.connect().await;
    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let session_id = created["session"]["id"].clone();

    // when (操作):
    send_json(
        &mut alice,
        json!({
            "type": "vote:reveal",
            "payload": {"sessionId": session_id},
            "timestamp": 0,
        }),
    )
    .await;

    // then (期待する結果):
    let error = recv_event(&mut alice, "session:error").await;
    assert_eq!(error["code"], "REVEAL_FAILED");
}

#[tokio::test]
async fn test_leave_notifies_remaining_participants() {
    // テスト項目: 離脱で残りの参加者に participant:left と更新が届く
    // given (前提条件):
    let server = TestServer::start(19186);
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let code = created["joinCode"].as_str().unwrap().to_string();
    let session_id = created["session"]["id"].clone();
    let joined = join_session(&mut bob, &code, "Bob").await;
    let bob_id = joined["participant"]["id"].clone();
    recv_event(&mut alice, "participant:joined").await;

    // when (操作): Bob が明示的に離脱
    send_json(
        &mut bob,
        json!({
            "type": "session:leave",
            "payload": {"sessionId": session_id},
            "timestamp": 0,
        }),
    )
    .await;

    // then (期待する結果):
    let left = recv_event(&mut bob, "session:left").await;
    assert_eq!(left["success"], true);

    let notice = recv_event(&mut alice, "participant:left").await;
    assert_eq!(notice["participantId"], bob_id);
    let updated = recv_event(&mut alice, "session:updated").await;
    assert_eq!(
        updated["session"]["participants"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_disconnect_performs_implicit_leave() {
    // テスト項目: 切断が暗黙の離脱として残りの参加者に通知される
    // given (前提条件):
    let server = TestServer::start(19187);
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let code = created["joinCode"].as_str().unwrap().to_string();
    join_session(&mut bob, &code, "Bob").await;
    recv_event(&mut alice, "participant:joined").await;

    // when (操作): Bob の接続を落とす
    drop(bob);

    // then (期待する結果):
    let notice = recv_json(&mut alice).await;
    assert_eq!(notice["type"], "participant:left");
    let updated = recv_event(&mut alice, "session:updated").await;
    assert_eq!(
        updated["session"]["participants"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_story_queue_operations() {
    // テスト項目: ストーリーの追加・開始・確定・進行の一連の操作
    // given (前提条件):
    let server = TestServer::start(19188);
    let mut alice = server.connect().await;
    let created = create_session(&mut alice, "Sprint", "Alice").await;
    let session_id = created["session"]["id"].clone();

    // when (操作): ストーリーを 2 件追加して進行を開始
    for title in ["First", "Second"] {
        send_json(
            &mut alice,
            json!({
                "type": "story:add",
                "payload": {"sessionId": session_id, "title": title},
                "timestamp": 0,
            }),
        )
        .await;
        recv_event(&mut alice, "session:updated").await;
    }
    send_json(
        &mut alice,
        json!({"type": "story:next", "payload": {"sessionId": session_id}, "timestamp": 0}),
    )
    .await;
    let advanced = recv_event(&mut alice, "session:updated").await;

    // then (期待する結果): 先頭ストーリーで voting が始まる
    assert_eq!(advanced["session"]["currentStory"], "First");
    assert_eq!(advanced["session"]["status"], "voting");

    // 投票して公開し、次に進むと見積もりが確定する
    send_json(
        &mut alice,
        json!({
            "type": "vote:select",
            "payload": {"sessionId": session_id, "value": "8"},
            "timestamp": 0,
        }),
    )
    .await;
    recv_event(&mut alice, "participant:voted").await;
    send_json(
        &mut alice,
        json!({"type": "vote:reveal", "payload": {"sessionId": session_id}, "timestamp": 0}),
    )
    .await;
    recv_event(&mut alice, "session:updated").await;
    send_json(
        &mut alice,
        json!({"type": "story:next", "payload": {"sessionId": session_id}, "timestamp": 0}),
    )
    .await;
    let finalized = recv_event(&mut alice, "session:updated").await;
    let queue = finalized["session"]["storyQueue"].as_array().unwrap();
    assert_eq!(queue[0]["estimated"], true);
    assert_eq!(queue[0]["estimatedValue"], "8");
    assert_eq!(finalized["session"]["currentStory"], "Second");
}
