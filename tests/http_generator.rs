//! Integration tests for the HTTP generator against a mock endpoint

use roundtable::llm::{GenerationError, HttpGenerator, HttpGeneratorConfig, TextGenerator};
use std::time::Duration;

fn generator_for(server: &mockito::ServerGuard) -> HttpGenerator {
    let config = HttpGeneratorConfig {
        endpoint: format!("{}/v1/chat/completions", server.url()),
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
        timeout: Duration::from_secs(5),
    };
    HttpGenerator::new(config).unwrap()
}

#[tokio::test]
async fn successful_generation_returns_first_choice_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"role":"assistant","content":"Restart the node."}}]}"#,
        )
        .create_async()
        .await;

    let generator = generator_for(&server);
    let text = generator
        .generate(Some("You are terse."), "what now?", 400)
        .await
        .unwrap();

    assert_eq!(text, "Restart the node.");
    mock.assert_async().await;
}

#[tokio::test]
async fn rate_limit_status_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let generator = generator_for(&server);
    let err = generator.generate(None, "hello", 100).await.unwrap_err();
    assert!(matches!(err, GenerationError::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let generator = generator_for(&server);
    let err = generator.generate(None, "hello", 100).await.unwrap_err();
    assert!(matches!(err, GenerationError::Api(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unparseable_body_maps_to_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body("not json at all")
        .create_async()
        .await;

    let generator = generator_for(&server);
    let err = generator.generate(None, "hello", 100).await.unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn empty_choices_maps_to_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let generator = generator_for(&server);
    let err = generator.generate(None, "hello", 100).await.unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_endpoint_maps_to_network_error() {
    let config = HttpGeneratorConfig {
        endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        api_key: None,
        model: "test-model".to_string(),
        timeout: Duration::from_secs(2),
    };
    let generator = HttpGenerator::new(config).unwrap();

    let err = generator.generate(None, "hello", 100).await.unwrap_err();
    assert!(err.is_transient());
}
