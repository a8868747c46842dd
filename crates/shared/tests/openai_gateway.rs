use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::config::ChatGatewayConfig;
use shared::llm::{
    ChatCompletionRequest, ChatGateway, ChatGatewayError, ChatMessage, MessageContent,
    OpenAiCompatGateway, Role,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn returns_reply_text_and_sends_bearer_key() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("# Photosynthesis\n\nPlants make food from light."),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 1, 0)).expect("gateway should build");
    let reply = gateway
        .complete(tutor_request())
        .await
        .expect("completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert!(reply.starts_with("# Photosynthesis"));

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-chat-key".to_string()]);

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1);
    assert_eq!(seen_bodies[0]["model"], "test-model");
    assert_eq!(seen_bodies[0]["messages"][0]["role"], "system");
}

#[tokio::test]
async fn rate_limit_maps_to_distinct_error_without_retry() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 2, 0)).expect("gateway should build");
    let err = gateway
        .complete(tutor_request())
        .await
        .expect_err("rate limited request should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert!(matches!(err, ChatGatewayError::RateLimited));

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 1, "429 must not be retried");
}

#[tokio::test]
async fn quota_exhaustion_maps_to_distinct_error() {
    let state = TestServerState::with_replies(vec![provider_error_reply(
        StatusCode::PAYMENT_REQUIRED,
        "quota_exceeded",
    )]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 2, 0)).expect("gateway should build");
    let err = gateway
        .complete(tutor_request())
        .await
        .expect_err("quota exceeded request should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert!(matches!(err, ChatGatewayError::QuotaExceeded));
}

#[tokio::test]
async fn transient_server_errors_retry_before_succeeding() {
    let state = TestServerState::with_replies(vec![
        provider_error_reply(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        provider_error_reply(StatusCode::BAD_GATEWAY, "upstream_gateway"),
        MockReply {
            status: StatusCode::OK,
            body: success_response_body("Recovered lesson."),
        },
    ]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 2, 0)).expect("gateway should build");
    let reply = gateway
        .complete(tutor_request())
        .await
        .expect("request should succeed after retries");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert_eq!(reply, "Recovered lesson.");

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(seen_bodies.len(), 3);
}

#[tokio::test]
async fn missing_choice_is_an_invalid_payload() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({ "choices": [] }),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 0, 0)).expect("gateway should build");
    let err = gateway
        .complete(tutor_request())
        .await
        .expect_err("empty choices should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert!(matches!(err, ChatGatewayError::InvalidPayload(_)));
}

#[tokio::test]
async fn vision_content_is_sent_as_typed_parts() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_response_body("Lesson about the attached picture."),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let gateway = OpenAiCompatGateway::new(config_for(url, 0, 0)).expect("gateway should build");
    let request = ChatCompletionRequest {
        model: "test-model".to_string(),
        messages: vec![
            ChatMessage::system("You are a tutor."),
            ChatMessage {
                role: Role::User,
                content: MessageContent::text_with_image(
                    "What is in this picture?",
                    "data:image/png;base64,AAAA",
                ),
            },
        ],
    };
    gateway
        .complete(request)
        .await
        .expect("vision completion should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    let seen_bodies = state.seen_bodies.lock().await.clone();
    let user_content = &seen_bodies[0]["messages"][1]["content"];
    assert_eq!(user_content[0]["type"], "text");
    assert_eq!(user_content[1]["type"], "image_url");
    assert_eq!(
        user_content[1]["image_url"]["url"],
        "data:image/png;base64,AAAA"
    );
}

fn tutor_request() -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "test-model".to_string(),
        messages: vec![
            ChatMessage::system("You are a tutor."),
            ChatMessage::user("explain photosynthesis"),
        ],
    }
}

fn config_for(
    chat_completions_url: String,
    max_retries: u32,
    retry_base_backoff_ms: u64,
) -> ChatGatewayConfig {
    ChatGatewayConfig {
        chat_completions_url,
        api_key: "test-chat-key".to_string(),
        model: "test-model".to_string(),
        timeout_ms: 5_000,
        max_retries,
        retry_base_backoff_ms,
    }
}

fn success_response_body(content: &str) -> Value {
    json!({
        "id": "req-success",
        "model": "provider-model",
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": content
                }
            }
        ]
    })
}

fn provider_error_reply(status: StatusCode, code: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "error": {
                "code": code
            }
        }),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/chat/completions", post(test_chat_completions_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/chat/completions"),
        shutdown_tx,
        server_task,
    )
}

async fn test_chat_completions_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen_bodies.lock().await.push(payload);

    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({
            "error": {
                "code": "exhausted_test_replies"
            }
        }),
    });

    (reply.status, Json(reply.body))
}
