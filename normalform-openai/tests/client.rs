use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use normalform_openai::{
    ChatCompletionRequest, ChatMessage, EmbeddingRequest, Method, OpenAiClient, OpenAiError,
    OutboundRequest, RequestHook,
};
use serde_json::json;

#[derive(Default)]
struct SeenRequests {
    requests: Mutex<Vec<(String, String, Option<String>)>>,
}

impl RequestHook for SeenRequests {
    fn on_request(&self, request: &OutboundRequest<'_>) {
        let auth = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((
            request.method.to_string(),
            request.url.path().to_string(),
            auth,
        ));
    }
}

fn chat_response() -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello!"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    })
}

fn client_for(server: &MockServer, hook: Arc<dyn RequestHook>) -> OpenAiClient {
    OpenAiClient::builder()
        .base_url(format!("{}/v1", server.base_url()))
        .api_key("sk-test")
        .organization("org-1")
        .hook(hook)
        .build()
        .unwrap()
}

#[tokio::test]
async fn chat_completion_posts_json_and_maps_response() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .header("openai-organization", "org-1")
            .json_body(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "Say hello"}],
                "temperature": 0.7
            }));
        then.status(200).json_body(chat_response());
    });

    let seen = Arc::new(SeenRequests::default());
    let client = client_for(&server, seen.clone());
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("Say hello")])
        .temperature(0.7);

    let response = client.chat_completion(&request).await.unwrap();

    mock.assert();
    assert_eq!(response.content(), Some("Hello!"));
    assert_eq!(response.usage.unwrap().total_tokens, 21);
    let requests = seen.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "POST");
    assert_eq!(requests[0].1, "/v1/chat/completions");
    assert_eq!(requests[0].2.as_deref(), Some("Bearer sk-test"));
}

#[tokio::test]
async fn every_operation_passes_through_hooks() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2]}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/v1/models");
        then.status(200).json_body(json!({
            "object": "list",
            "data": [{"id": "gpt-4o-mini", "object": "model", "created": 1, "owned_by": "openai"}]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/v1/moderations");
        then.status(200).json_body(json!({"results": []}));
    });

    let seen = Arc::new(SeenRequests::default());
    let client = client_for(&server, seen.clone());

    let embeddings = client
        .embeddings(&EmbeddingRequest::new("text-embedding-3-small", "hi"))
        .await
        .unwrap();
    assert_eq!(embeddings.data[0].embedding, vec![0.1, 0.2]);

    let models = client.list_models().await.unwrap();
    assert_eq!(models.data[0].id, "gpt-4o-mini");

    let moderation = client
        .request_json(Method::POST, "/moderations", Some(&json!({"input": "hi"})))
        .await
        .unwrap();
    assert_eq!(moderation, json!({"results": []}));

    let paths: Vec<String> = seen
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|(method, path, _)| format!("{method} {path}"))
        .collect();
    assert_eq!(
        paths,
        vec![
            "POST /v1/embeddings",
            "GET /v1/models",
            "POST /v1/moderations"
        ]
    );
}

#[tokio::test]
async fn api_errors_keep_status_and_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401).json_body(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        }));
    });

    let seen = Arc::new(SeenRequests::default());
    let client = client_for(&server, seen.clone());
    let request = ChatCompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]);

    let err = client.chat_completion(&request).await.unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(
        err.to_string(),
        "OpenAI API returned HTTP 401: Incorrect API key provided"
    );
    assert_eq!(seen.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/models");
        then.status(200).body("not json");
    });

    let client = client_for(&server, Arc::new(SeenRequests::default()));
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, OpenAiError::Decode { .. }));
}

#[tokio::test]
async fn leading_hook_runs_before_existing_hooks() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/models");
        then.status(200).json_body(json!({"data": []}));
    });

    let order = Arc::new(Mutex::new(Vec::new()));
    let late = order.clone();
    let early = order.clone();
    let client = OpenAiClient::builder()
        .base_url(format!("{}/v1", server.base_url()))
        .api_key("sk-test")
        .hook(Arc::new(move |_: &OutboundRequest<'_>| {
            late.lock().unwrap().push("user")
        }))
        .build()
        .unwrap()
        .with_leading_hook(Arc::new(move |_: &OutboundRequest<'_>| {
            early.lock().unwrap().push("recorder")
        }));

    client.list_models().await.unwrap();

    assert_eq!(client.hooks().len(), 2);
    assert_eq!(*order.lock().unwrap(), vec!["recorder", "user"]);
}

#[tokio::test]
async fn panicking_hook_does_not_fail_the_call() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v1/models");
        then.status(200).json_body(json!({"data": []}));
    });

    let client = OpenAiClient::builder()
        .base_url(format!("{}/v1", server.base_url()))
        .api_key("sk-test")
        .hook(Arc::new(|_: &OutboundRequest<'_>| panic!("hook bug")))
        .build()
        .unwrap();

    let models = client.list_models().await.unwrap();
    assert!(models.data.is_empty());
    mock.assert();
}

#[test]
fn builder_requires_api_key() {
    let err = OpenAiClient::builder().build().unwrap_err();
    assert!(matches!(err, OpenAiError::MissingApiKey));

    let err = OpenAiClient::builder().api_key("  \n").build().unwrap_err();
    assert!(matches!(err, OpenAiError::MissingApiKey));
}

#[test]
fn builder_validates_base_url_and_headers() {
    let err = OpenAiClient::builder()
        .api_key("sk-test")
        .base_url("not a url")
        .build()
        .unwrap_err();
    assert!(matches!(err, OpenAiError::InvalidBaseUrl { .. }));

    let err = OpenAiClient::builder()
        .api_key("sk-test")
        .default_header("bad header", "x")
        .build()
        .unwrap_err();
    assert!(matches!(err, OpenAiError::InvalidHeader { .. }));
}

#[test]
fn builder_defaults_and_trims_base_url() {
    let client = OpenAiClient::new("sk-test").unwrap();
    assert_eq!(client.base_url(), "https://api.openai.com/v1");

    let client = OpenAiClient::builder()
        .api_key("sk-test")
        .base_url("http://localhost:8080/v1/")
        .build()
        .unwrap();
    assert_eq!(client.base_url(), "http://localhost:8080/v1");
}

#[test]
fn debug_output_redacts_api_key() {
    let builder = OpenAiClient::builder().api_key("sk-very-secret");
    assert!(!format!("{builder:?}").contains("sk-very-secret"));

    let client = builder.build().unwrap();
    let debug = format!("{client:?}");
    assert!(!debug.contains("sk-very-secret"));
    assert!(debug.contains("<redacted>"));
}

#[tokio::test]
async fn hooks_see_default_headers_and_content_length() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("accept", "application/json")
            .header_exists("user-agent");
        then.status(200).json_body(chat_response());
    });

    let headers = Arc::new(Mutex::new(Vec::new()));
    let sink = headers.clone();
    let client = OpenAiClient::builder()
        .base_url(format!("{}/v1", server.base_url()))
        .api_key("sk-test")
        .hook(Arc::new(move |request: &OutboundRequest<'_>| {
            let body_len = request.body.map(<[u8]>::len).unwrap_or_default();
            let mut seen = sink.lock().unwrap();
            for (name, value) in request.headers {
                seen.push((name.to_string(), value.to_str().unwrap_or_default().to_string()));
            }
            seen.push(("body-len".to_string(), body_len.to_string()));
        }))
        .build()
        .unwrap();

    client
        .chat_completion(&ChatCompletionRequest::new(
            "gpt-4o-mini",
            vec![ChatMessage::user("hi")],
        ))
        .await
        .unwrap();

    mock.assert();
    let seen = headers.lock().unwrap();
    let lookup = |name: &str| {
        seen.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };
    assert_eq!(lookup("accept").as_deref(), Some("application/json"));
    assert!(lookup("user-agent").unwrap().starts_with("normalform/"));
    assert_eq!(lookup("content-type").as_deref(), Some("application/json"));
    assert_eq!(lookup("content-length"), lookup("body-len"));
}
