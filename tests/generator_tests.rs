use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use askwiki::config::CompletionConfig;
use askwiki::error::GenerationError;
use askwiki::generator::{AnswerGenerator, ChatCompletionGenerator};

mod common;

fn generator(server: &MockServer) -> ChatCompletionGenerator {
    generator_at(&format!("{}/v1", server.uri()), Duration::from_secs(5))
}

fn generator_at(base_url: &str, timeout: Duration) -> ChatCompletionGenerator {
    let cfg = CompletionConfig {
        base_url: base_url.to_string(),
        api_key: "sk-test".to_string(),
        model: "gpt-test".to_string(),
        system_prompt: "You answer questions about the internal docs.".to_string(),
    };
    ChatCompletionGenerator::new(&cfg, timeout).unwrap()
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

#[tokio::test]
async fn test_generate_sends_two_messages_and_trims_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Use o perfil corporativo.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = generator(&server)
        .generate("Como acesso a VPN?", "Title: VPN\nPerfil corporativo\n\n")
        .await
        .unwrap();
    assert_eq!(answer, "Use o perfil corporativo.");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 2, "only model and messages are sent: {body}");

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(
        messages[0]["content"],
        "You answer questions about the internal docs."
    );
    assert_eq!(messages[1]["role"], "user");
    let user = messages[1]["content"].as_str().unwrap();
    assert!(user.contains("Como acesso a VPN?"));
    assert!(user.contains("Title: VPN\nPerfil corporativo\n\n"));
}

#[tokio::test]
async fn test_generate_with_empty_context() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("general answer")))
        .mount(&server)
        .await;

    let answer = generator(&server).generate("X", "").await.unwrap();
    assert_eq!(answer, "general answer");
}

#[tokio::test]
async fn test_generate_upstream_status_error() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided: sk-test", "type": "invalid_request_error" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = generator(&server).generate("q", "c").await.unwrap_err();
    match err {
        GenerationError::Status { status, snippet } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(snippet.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_generate_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = generator(&server).generate("q", "c").await.unwrap_err();
    assert!(matches!(err, GenerationError::Decode(_)));
}

#[tokio::test]
async fn test_generate_without_choices() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = generator(&server).generate("q", "c").await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyChoices));
}

#[tokio::test]
async fn test_generate_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let generator = generator_at(&format!("{}/v1", server.uri()), Duration::from_millis(200));
    let err = generator.generate("q", "c").await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)), "{err:?}");
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_generate_body_read_timeout_counts_as_timeout() {
    let base_url = common::stalled_body_server(r#"{"choices": ["#).await;

    let generator = generator_at(&base_url, Duration::from_millis(300));
    let err = generator.generate("q", "c").await.unwrap_err();
    assert!(matches!(err, GenerationError::Decode(_)), "{err:?}");
    assert!(err.is_timeout());
}
