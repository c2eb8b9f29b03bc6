//! Chat turns against mocked provider endpoints.

use blueprint_chat::{
    ChatClient, ChatError, ChatSession, Message, ProviderConfig, ProviderError, ProviderKind,
    ProviderSettings, Role, TurnObserver, TurnStatus,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder {
    transcript: Vec<String>,
    blueprints: Vec<String>,
    cancel_after_first: Option<CancellationToken>,
}

impl TurnObserver for Recorder {
    fn on_transcript(&mut self, text: &str) {
        self.transcript.push(text.to_string());
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
    }

    fn on_blueprint(&mut self, blueprint: &str) {
        self.blueprints.push(blueprint.to_string());
    }
}

fn openai_sse(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let frame = serde_json::json!({"choices": [{"delta": {"content": delta}}]});
        body.push_str(&format!("data: {frame}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn session_for(server: &MockServer, kind: ProviderKind) -> ChatSession {
    let settings = ProviderSettings::new(vec![
        ProviderConfig::new(kind, "test-model", "test-key").base_url(server.uri()),
    ]);
    ChatSession::new(ChatClient::new(), settings)
}

async fn mount_sse(server: &MockServer, route: &str, body: String) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn hello_world_aggregates_without_extraction() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", openai_sse(&["Hello", " world"])).await;

    let mut session = session_for(&server, ProviderKind::OpenAi);
    let mut recorder = Recorder::default();
    let outcome = session
        .send("Say hello", "", &mut recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::Completed);
    assert_eq!(outcome.text, "Hello world");
    assert_eq!(outcome.blueprint, None);
    assert_eq!(recorder.transcript, vec!["Hello", "Hello world"]);
    assert!(recorder.blueprints.is_empty());
    assert_eq!(
        session.transcript(),
        &[Message::user("Say hello"), Message::assistant("Hello world")]
    );
}

#[tokio::test]
async fn fenced_blueprint_is_extracted_and_finalized() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "/chat/completions",
        openai_sse(&[
            "Sure! ```blueprint\n",
            "Begin Object Name=\"A\"\n",
            "End Object\n",
            "```\nEnjoy.",
        ]),
    )
    .await;

    let mut session = session_for(&server, ProviderKind::OpenRouter);
    let mut recorder = Recorder::default();
    let outcome = session
        .send("Make a node", "", &mut recorder, &CancellationToken::new())
        .await
        .unwrap();

    let expected = "Begin Object Name=\"A\"\nEnd Object";
    assert_eq!(outcome.blueprint.as_deref(), Some(expected));
    assert_eq!(
        recorder.blueprints,
        vec![
            "Begin Object Name=\"A\"\n".to_string(),
            "Begin Object Name=\"A\"\nEnd Object\n".to_string(),
            expected.to_string(),
        ]
    );
}

#[tokio::test]
async fn malformed_frame_does_not_interrupt_aggregation() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"one \"}}]}\n\n",
        "data: {not json at all\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    mount_sse(&server, "/chat/completions", body.to_string()).await;

    let mut session = session_for(&server, ProviderKind::OpenAi);
    let outcome = session
        .send("count", "", &mut Recorder::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.text, "one two");
}

#[tokio::test]
async fn anthropic_turn_streams_text_deltas() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Begin Object\\nEnd Object\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );
    mount_sse(&server, "/messages", body.to_string()).await;

    let mut session = session_for(&server, ProviderKind::Anthropic);
    let mut recorder = Recorder::default();
    let outcome = session
        .send("raw please", "", &mut recorder, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.blueprint.as_deref(), Some("Begin Object\nEnd Object"));
    // Streaming candidate and terminal pass are both reported.
    assert_eq!(recorder.blueprints.len(), 2);
}

#[tokio::test]
async fn http_error_surfaces_once_without_callbacks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server, ProviderKind::OpenAi);
    let mut recorder = Recorder::default();
    let err = session
        .send("hi", "", &mut recorder, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ChatError::Provider(ProviderError::ServiceUnavailable(_))
    ));
    assert!(err.is_retryable());
    assert!(recorder.transcript.is_empty());
    assert!(recorder.blueprints.is_empty());
    // The user message is kept; no assistant message was started.
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript()[0].role, Role::User);
}

#[tokio::test]
async fn cancelling_mid_stream_stops_callbacks() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "/chat/completions",
        openai_sse(&["Begin Object", " Name=\"A\"", "\nEnd Object"]),
    )
    .await;

    let mut session = session_for(&server, ProviderKind::OpenAi);
    let cancel = CancellationToken::new();
    let mut recorder = Recorder {
        cancel_after_first: Some(cancel.clone()),
        ..Recorder::default()
    };
    let outcome = session
        .send("go", "", &mut recorder, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.status, TurnStatus::Cancelled);
    assert_eq!(outcome.text, "Begin Object");
    // Cancelled inside the transcript callback: extraction never runs.
    assert_eq!(outcome.blueprint, None);
    assert_eq!(recorder.transcript, vec!["Begin Object"]);
    assert!(recorder.blueprints.is_empty());
    // The partial reply stays in the transcript.
    assert_eq!(
        session.transcript().last(),
        Some(&Message::assistant("Begin Object"))
    );
}

#[tokio::test]
async fn blueprint_context_and_history_are_sent() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", openai_sse(&["ok"])).await;

    let mut session = session_for(&server, ProviderKind::OpenAi)
        .with_transcript(vec![Message::user("earlier"), Message::assistant("reply")]);
    session
        .send("next", "Begin Object\nEnd Object", &mut Recorder::default(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    // system, two history messages, the new prompt, blueprint context
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[3]["content"], "next");
    assert!(
        messages[4]["content"]
            .as_str()
            .unwrap()
            .contains("Begin Object\nEnd Object")
    );
    assert_eq!(session.transcript().len(), 4);
}
