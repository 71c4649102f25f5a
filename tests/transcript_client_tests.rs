use serde_json::json;
use wellchat::api::{FetchError, HttpTranscriptClient, TranscriptSource};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

/// A transcript body for conversation `c1` with two messages.
fn transcript_body() -> serde_json::Value {
    json!({
        "chat": {
            "id": "c1",
            "name": null,
            "participants": [
                { "id": "me", "name": "Me" },
                { "id": "u2", "name": "Ada" }
            ]
        },
        "messages": [
            {
                "id": "m1",
                "senderId": "u2",
                "content": "Herbal tea?",
                "conversationId": "c1",
                "createdAt": "2024-05-01T10:00:00Z"
            },
            {
                "id": "m2",
                "senderId": "me",
                "content": "Yes please",
                "conversationId": "c1",
                "createdAt": "2024-05-01T10:01:00Z"
            }
        ],
        "currentUser": { "id": "me", "name": "Me" }
    })
}

fn client_for(server: &MockServer, token: Option<&str>) -> HttpTranscriptClient {
    HttpTranscriptClient::new(format!("{}/api", server.uri()), token.map(String::from))
}

async fn fetch_with_status(status: u16) -> Result<wellchat::core::types::Transcript, FetchError> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats/c1/messages"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .mount(&mock_server)
        .await;
    client_for(&mock_server, None).fetch_transcript("c1").await
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_fetch_transcript_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats/c1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transcript = client_for(&mock_server, None)
        .fetch_transcript("c1")
        .await
        .unwrap();

    assert_eq!(transcript.conversation.id, "c1");
    assert_eq!(transcript.actor.id, "me");
    let ids: Vec<&str> = transcript.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(transcript.messages[0].sender_id, "u2");
    assert_eq!(transcript.messages[0].content, "Herbal tea?");
}

#[tokio::test]
async fn test_fetch_sends_bearer_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats/c1/messages"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server, Some("secret-token"))
        .fetch_transcript("c1")
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_missing_messages_field_means_empty_history() {
    let mock_server = MockServer::start().await;
    let mut body = transcript_body();
    body.as_object_mut().unwrap().remove("messages");
    Mock::given(method("GET"))
        .and(path("/api/chats/c1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let transcript = client_for(&mock_server, None)
        .fetch_transcript("c1")
        .await
        .unwrap();
    assert!(transcript.messages.is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_unauthorized_and_forbidden() {
    assert_eq!(fetch_with_status(401).await, Err(FetchError::Unauthorized));
    assert_eq!(fetch_with_status(403).await, Err(FetchError::Unauthorized));
}

#[tokio::test]
async fn test_not_found() {
    assert_eq!(fetch_with_status(404).await, Err(FetchError::NotFound));
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let result = fetch_with_status(500).await;
    assert_eq!(
        result,
        Err(FetchError::Api {
            status: 500,
            message: "nope".into()
        })
    );
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats/c1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"chat\": 42}"))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server, None).fetch_transcript("c1").await;
    assert!(matches!(result, Err(FetchError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = HttpTranscriptClient::new("http://127.0.0.1:9/api", None);
    let result = client.fetch_transcript("c1").await;
    assert!(matches!(result, Err(FetchError::Network(_))));
}
