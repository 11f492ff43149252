//! The OpenAI provider from `edgequake-llm`, driven by the review pipeline
//! against a local mock server.

mod common;

use common::{pdf_with_text, OFERTA_TEXT, PLIEGO_TEXT};
use edgequake_llm::OpenAIProvider;
use lupia::{run_review, run_stage, LupiaError, ReviewConfig, ReviewRequest, StageKind};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000u32,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop",
            "logprobs": null
        }],
        "usage": { "prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49 }
    })
}

fn api_error(message: &str, kind: &str) -> Value {
    json!({
        "error": { "message": message, "type": kind, "param": null, "code": null }
    })
}

fn config_for(server: &MockServer) -> ReviewConfig {
    ReviewConfig::builder()
        .base_url(format!("{}/v1", server.uri()))
        .retry_backoff_ms(1)
        .api_timeout_secs(10)
        .build()
        .unwrap()
}

fn sample_request(key: &str) -> ReviewRequest {
    ReviewRequest::new(pdf_with_text(PLIEGO_TEXT), pdf_with_text(OFERTA_TEXT), key)
}

#[tokio::test]
async fn stage_sends_credential_model_options_and_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.5,
            "max_completion_tokens": 256
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("| R1 | Si |")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAIProvider::compatible("sk-test", format!("{}/v1", server.uri()))
        .with_model("gpt-4o-mini");
    let config = ReviewConfig::builder()
        .temperature(0.5)
        .max_tokens(256)
        .build()
        .unwrap();

    let result = run_stage(&provider, StageKind::TechnicalA, "Analiza".into(), &config)
        .await
        .unwrap();
    assert_eq!(result.output_text, "| R1 | Si |");
    assert_eq!(result.input_tokens, 42);
    assert_eq!(result.output_tokens, 7);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("Asistente Tecnico 1"));
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "Analiza");
}

#[tokio::test]
async fn full_review_through_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-run-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Cumple: Si")))
        .expect(3)
        .mount(&server)
        .await;

    let result = run_review(sample_request("sk-run-key"), &config_for(&server))
        .await
        .unwrap();
    assert_eq!(result.consensus.output_text, "Cumple: Si");
    assert_eq!(result.stats.total_input_tokens, 126);
    assert_eq!(result.stats.total_output_tokens, 21);
    assert!(result.report.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn rejected_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(api_error("Invalid authentication credentials", "invalid_request_error")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = run_review(sample_request("sk-wrong"), &config_for(&server))
        .await
        .unwrap_err();
    match err {
        LupiaError::ModelInvocation {
            stage, attempts, ..
        } => {
            assert_eq!(stage, StageKind::TechnicalA);
            assert_eq!(attempts, 1);
        }
        other => panic!("expected ModelInvocation, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_answers_exhaust_the_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("")))
        .expect(2)
        .mount(&server)
        .await;

    let err = run_review(sample_request("sk-test"), &config_for(&server))
        .await
        .unwrap_err();
    match err {
        LupiaError::ModelInvocation {
            stage,
            attempts,
            detail,
        } => {
            assert_eq!(stage, StageKind::TechnicalA);
            assert_eq!(attempts, 2);
            assert!(detail.contains("no text"), "got: {detail}");
        }
        other => panic!("expected ModelInvocation, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_fails_the_stage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = run_review(sample_request("sk-test"), &config_for(&server))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LupiaError::ModelInvocation {
            stage: StageKind::TechnicalA,
            ..
        }
    ));
}
