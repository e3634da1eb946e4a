use crate::{TestClient, TestServer};

#[tokio::test]
async fn invalid_json_message_returns_error() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client.send_raw_text("{this is not valid json}").await;

    let message = client.next_error().await;
    assert!(
        message.contains("parse"),
        "Error should mention parsing, got: {message}"
    );
}

#[tokio::test]
async fn unknown_intent_type_returns_error() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server.ws_url()).await;

    client
        .send_raw_text(r#"{"type":"launchMissiles","target":"opponent"}"#)
        .await;

    let message = client.next_error().await;
    assert!(
        message.contains("parse"),
        "Error should mention parsing, got: {message}"
    );
}
