use std::time::Duration;

use crate::{TestClient, TestServer, test_config};

use quiz_battle::booster::BoosterTier;
use quiz_battle::model::client_message::ClientIntent;

#[tokio::test]
async fn extra_time_extends_the_running_countdown() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;

    let state = client
        .wait_for_state(|s| s.boosters_used.contains(&BoosterTier::Extra10))
        .await;
    assert_eq!(state.booster_balance, 24);
    assert!(
        state.time_left_seconds >= 9,
        "a 3s question plus 10s should leave plenty of time, got {}",
        state.time_left_seconds
    );
    assert!(!state.timer_paused, "extra time never pauses the countdown");
}

#[tokio::test]
async fn a_tier_is_single_use_per_question() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;
    let state = client
        .wait_for_state(|s| s.boosters_used.contains(&BoosterTier::Extra10))
        .await;
    assert!(
        !state.boosters_available.contains(&BoosterTier::Extra10),
        "a spent tier is no longer an available affordance"
    );

    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;
    let message = client.next_error().await;
    assert!(
        message.contains("already used"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn different_tiers_stack_their_costs() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra20,
        })
        .await;

    let state = client
        .wait_for_state(|s| s.boosters_used.len() == 2)
        .await;
    assert_eq!(state.booster_balance, 22);
}

#[tokio::test]
async fn freeze_pauses_the_countdown_until_the_answer() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.unwrap();

    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Freeze,
        })
        .await;
    let frozen = client.wait_for_state(|s| s.timer_paused).await;
    assert_eq!(frozen.booster_balance, 25 - 8);

    // Sit out the whole nominal question duration: no timeout may fire
    tokio::time::sleep(Duration::from_millis(3300)).await;
    client
        .assert_no_state(|s| s.player_life < 100, Duration::from_millis(200))
        .await;

    // The frozen question can still be answered
    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;
    let impact = client.wait_for_state(|s| s.opponent_life < 100).await;
    assert!(impact.player_life == 100);
}

#[tokio::test]
async fn reveal_exposes_the_correct_option_without_side_effects() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.unwrap();

    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Reveal,
        })
        .await;
    let revealed = client
        .wait_for_state(|s| s.revealed_option.is_some())
        .await;
    assert_eq!(revealed.revealed_option, Some(correct));
    assert_eq!(revealed.booster_balance, 15);
    assert_eq!(revealed.player_life, 100);
    assert_eq!(revealed.opponent_life, 100);
    assert_eq!(revealed.score, 0);
}

#[tokio::test]
async fn insufficient_balance_is_refused() {
    let mut cfg = test_config();
    cfg.starting_booster_balance = 2;
    let server = TestServer::start_with_config(cfg).await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Freeze,
        })
        .await;

    let message = client.next_error().await;
    assert!(
        message.contains("Not enough"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn flags_reset_when_the_next_question_loads() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.unwrap();

    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;
    client
        .wait_for_state(|s| s.boosters_used.contains(&BoosterTier::Extra10))
        .await;

    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;
    let next = client
        .wait_for_state(|s| s.selected_answer.is_none() && !s.timer_paused && s.score == 100)
        .await;
    assert!(next.boosters_used.is_empty());

    // The same tier is available again on the new question
    client
        .send_json(&ClientIntent::UseBooster {
            tier: BoosterTier::Extra10,
        })
        .await;
    let state = client
        .wait_for_state(|s| s.boosters_used.contains(&BoosterTier::Extra10))
        .await;
    assert_eq!(state.booster_balance, 23);
}
