use crate::{TestClient, TestServer, create_test_jwt};

use quiz_battle::model::battle::Phase;
use quiz_battle::model::client_message::ClientIntent;

#[tokio::test]
async fn authenticating_names_the_player() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let token = create_test_jwt("user-1", "Ada");
    client.send_json(&ClientIntent::Authenticate { token }).await;

    let state = client.wait_for_state(|s| s.player_name == "Ada").await;
    assert_eq!(state.phase, Phase::Start);
}

#[tokio::test]
async fn a_bad_token_is_refused() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client
        .send_json(&ClientIntent::Authenticate {
            token: "not-a-jwt".to_string(),
        })
        .await;

    let message = client.next_error().await;
    assert!(
        message.contains("Authentication failed"),
        "unexpected error: {message}"
    );
}

#[tokio::test]
async fn guests_can_play_without_signing_in() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let state = client.start_match(None).await;
    assert_eq!(state.player_name, "Guest");
    assert!(state.question.is_some());
}

#[tokio::test]
async fn an_authenticated_match_keeps_the_name() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    let token = create_test_jwt("user-2", "Grace");
    client.send_json(&ClientIntent::Authenticate { token }).await;
    client.wait_for_state(|s| s.player_name == "Grace").await;

    let state = client.start_match(None).await;
    assert_eq!(state.player_name, "Grace");
}
