use crate::{TestClient, TestServer};

use quiz_battle::model::battle::{AnimationState, MatchOutcome, Phase};
use quiz_battle::model::client_message::ClientIntent;
use quiz_battle::model::question::Difficulty;

#[tokio::test]
async fn connecting_yields_a_start_snapshot() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.next_battle_state().await;
    assert_eq!(state.phase, Phase::Start);
    assert_eq!(state.player_name, "Guest");
    assert_eq!(state.booster_balance, 25);
    assert!(state.question.is_none());
}

#[tokio::test]
async fn starting_a_match_presents_the_first_question() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(Some(Difficulty::Easy)).await;
    assert_eq!(state.player_life, 100);
    assert_eq!(state.opponent_life, 100);
    assert_eq!(state.max_life, 100);
    assert_eq!(state.score, 0);
    assert!(state.selected_answer.is_none());
    assert!(!state.timer_paused);

    let question = state.question.expect("a question should be presented");
    assert_eq!(question.round_number, 1);
    assert_eq!(question.total_rounds, 10);
    assert_eq!(question.options.len(), 4);
}

#[tokio::test]
async fn correct_answer_damages_the_opponent_and_advances() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.expect("test build exposes the answer");

    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;

    // The answer is acknowledged immediately: selection locked, timer paused
    let acked = client
        .wait_for_state(|s| s.selected_answer == Some(correct))
        .await;
    assert!(acked.timer_paused);
    assert_eq!(acked.score, 100);
    assert_eq!(acked.match_streak, 1);
    assert_eq!(acked.correct_count, 1);

    // A fast answer lands the top damage step
    let impact = client.wait_for_state(|s| s.opponent_life < 100).await;
    assert_eq!(impact.opponent_life, 90);
    assert_eq!(impact.opponent_animation, AnimationState::Hit);
    assert_eq!(impact.player_life, 100);

    // Then the next question loads with per-question state reset
    let next = client
        .wait_for_state(|s| s.selected_answer.is_none() && !s.timer_paused)
        .await;
    assert_eq!(next.question.unwrap().round_number, 2);
    assert_eq!(next.player_animation, AnimationState::Idle);
}

#[tokio::test]
async fn wrong_answer_damages_the_player_and_breaks_the_streak() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.unwrap();
    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;
    let next = client
        .wait_for_state(|s| s.selected_answer.is_none() && !s.timer_paused && s.score == 100)
        .await;
    assert_eq!(next.match_streak, 1);

    let wrong = (next.correct_option.unwrap() + 1) % 4;
    client
        .send_json(&ClientIntent::SubmitAnswer { index: wrong })
        .await;

    let impact = client.wait_for_state(|s| s.player_life < 100).await;
    assert_eq!(impact.player_life, 90);
    assert_eq!(impact.opponent_life, 90, "a wrong answer never heals or hurts the opponent");
    assert_eq!(impact.match_streak, 0);
    assert_eq!(impact.best_streak, 1);
    assert_eq!(impact.incorrect_count, 1);
    assert_eq!(impact.score, 100, "points are only earned, never lost");
}

#[tokio::test]
async fn ten_fast_correct_answers_win_the_match() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let mut state = client.start_match(None).await;
    loop {
        let correct = state.correct_option.expect("question should be visible");
        client
            .send_json(&ClientIntent::SubmitAnswer { index: correct })
            .await;
        state = client
            .wait_for_state(|s| {
                s.phase == Phase::Gameover || (s.selected_answer.is_none() && !s.timer_paused)
            })
            .await;
        if state.phase == Phase::Gameover {
            break;
        }
    }

    assert_eq!(state.outcome, Some(MatchOutcome::Victory));
    assert_eq!(state.opponent_life, 0);
    assert_eq!(state.player_life, 100);
    assert_eq!(state.correct_count, 10);
    assert_eq!(state.player_animation, AnimationState::Victory);
    assert!(state.timer_paused, "the countdown stops at gameover");
}

#[tokio::test]
async fn starting_twice_is_refused() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;
    client
        .send_json(&ClientIntent::StartMatch { difficulty: None })
        .await;

    let message = client.next_error().await;
    assert!(
        message.contains("already in progress"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn empty_bank_refuses_to_enter_playing() {
    let server = TestServer::start_with_bank(Vec::new()).await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client
        .send_json(&ClientIntent::StartMatch { difficulty: None })
        .await;

    let message = client.next_error().await;
    assert!(
        message.contains("No questions available"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn restart_redraws_a_fresh_match() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(Some(Difficulty::Easy)).await;
    let correct = state.correct_option.unwrap();
    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;
    client.wait_for_state(|s| s.opponent_life < 100).await;

    client.send_json(&ClientIntent::RestartMatch).await;
    let fresh = client
        .wait_for_state(|s| s.phase == Phase::Playing && s.score == 0)
        .await;
    assert_eq!(fresh.player_life, 100);
    assert_eq!(fresh.opponent_life, 100);
    assert_eq!(fresh.question.unwrap().round_number, 1);
    assert_eq!(fresh.difficulty, Some(Difficulty::Easy));
}
