use std::time::Duration;

use crate::{TestClient, TestServer};

use quiz_battle::model::battle::Phase;
use quiz_battle::model::client_message::ClientIntent;

#[tokio::test]
async fn quit_discards_the_battle_and_returns_to_start() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client.send_json(&ClientIntent::QuitMatch).await;

    let state = client.wait_for_state(|s| s.phase == Phase::Start).await;
    assert!(state.question.is_none());
    assert_eq!(state.booster_balance, 25, "the balance mirror survives the match");
}

#[tokio::test]
async fn quit_mid_resolution_cancels_the_staged_callbacks() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let wrong = (state.correct_option.unwrap() + 1) % 4;

    // Resolve a wrong answer and quit before the hit can land
    client
        .send_json(&ClientIntent::SubmitAnswer { index: wrong })
        .await;
    client.send_json(&ClientIntent::QuitMatch).await;

    client.wait_for_state(|s| s.phase == Phase::Start).await;

    // Well past the staged impact and advance delays: the discarded
    // battle must never resurface, and nothing may lose life.
    client
        .assert_no_state(
            |s| s.phase != Phase::Start || s.player_life > 0,
            Duration::from_millis(300),
        )
        .await;

    // A fresh match starts clean
    let fresh = client.start_match(None).await;
    assert_eq!(fresh.player_life, 100);
    assert_eq!(fresh.opponent_life, 100);
    assert_eq!(fresh.score, 0);

    // And the stale callbacks from the quit match still never land
    client
        .assert_no_state(|s| s.player_life < 100, Duration::from_millis(300))
        .await;
}

#[tokio::test]
async fn quit_without_a_match_is_harmless() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.next_battle_state().await;
    assert_eq!(state.phase, Phase::Start);

    client.send_json(&ClientIntent::QuitMatch).await;
    let state = client.next_battle_state().await;
    assert_eq!(state.phase, Phase::Start);
}
