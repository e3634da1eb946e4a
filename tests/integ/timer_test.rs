use crate::{TestClient, TestServer};

use quiz_battle::model::client_message::ClientIntent;

#[tokio::test]
async fn ticks_count_down_towards_zero() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;

    let first = client.next_timer_tick().await;
    let second = client.next_timer_tick().await;
    assert!(first <= 3, "3s question, got a tick of {first}");
    assert!(second < first, "ticks must count down: {first} then {second}");
}

#[tokio::test]
async fn an_unanswered_question_times_out_as_a_wrong_answer() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.start_match(None).await;

    // Sit through the 3s countdown without answering
    let impact = client.wait_for_state(|s| s.player_life < 100).await;
    assert_eq!(impact.player_life, 90);
    assert_eq!(impact.opponent_life, 100);
    assert_eq!(impact.incorrect_count, 1);
    assert!(
        impact.selected_answer.is_none(),
        "a timeout never fabricates a selection"
    );
}

#[tokio::test]
async fn an_answer_in_flight_beats_the_timeout() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    let correct = state.correct_option.unwrap();

    // Wait until the countdown is nearly spent, then answer
    loop {
        if client.next_timer_tick().await <= 1 {
            break;
        }
    }
    client
        .send_json(&ClientIntent::SubmitAnswer { index: correct })
        .await;

    let resolved = client
        .wait_for_state(|s| s.opponent_life < 100 || s.player_life < 100)
        .await;
    assert_eq!(
        resolved.player_life, 100,
        "the submitted answer must win the race against the timeout"
    );
    assert_eq!(resolved.correct_count, 1);
    assert_eq!(resolved.incorrect_count, 0);
}
