//! Shared helpers: a local stand-in for the chat completion API and
//! throwaway image files.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use qc_vision::{QcClient, QcOptions};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const ANSWER: &str = "1. **Number of Q-Tips:**\n   - Reference Image: 11 Q-Tips\n   - Check Image: 12 Q-Tips\n\n4. **General Comment:**\n   - Do not ship.";

pub fn completion_body(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-9ObN26dFCzIodoc99n0eS4RB3GLeq",
        "object": "chat.completion",
        "created": 1715650552,
        "model": "gpt-4o-2024-05-13",
        "system_fingerprint": "fp_927397958d",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "logprobs": null,
            "message": {"role": "assistant", "content": content, "tool_calls": null}
        }],
        "usage": {"completion_tokens": 199, "prompt_tokens": 379, "total_tokens": 578}
    })
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: Value,
}

/// Scripted responses, served in order; the last one repeats
#[derive(Clone)]
struct MockState {
    responses: Arc<Vec<(StatusCode, Value)>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockApi {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockApi {
    pub async fn start(responses: Vec<(StatusCode, Value)>) -> Self {
        Self::start_delayed(Duration::ZERO, responses).await
    }

    /// Like [`start`](Self::start), but every reply is held back for `delay`.
    pub async fn start_delayed(delay: Duration, responses: Vec<(StatusCode, Value)>) -> Self {
        let state = MockState {
            responses: Arc::new(responses),
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
            recorded: Arc::new(Mutex::new(Vec::new())),
        };
        let calls = state.calls.clone();
        let recorded = state.recorded.clone();

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            calls,
            recorded,
        }
    }

    pub async fn answering(content: &str) -> Self {
        Self::start(vec![(StatusCode::OK, completion_body(content))]).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn options(&self) -> qc_vision::QcOptionsBuilder {
        QcOptions::builder()
            .api_key("sk-test")
            .base_url(self.base_url())
            .timeout(5)
    }

    pub fn client(&self) -> QcClient {
        QcClient::new(self.options().build().unwrap()).unwrap()
    }
}

async fn chat_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = state.calls.fetch_add(1, Ordering::SeqCst);
    state.recorded.lock().unwrap().push(Recorded {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let (status, body) = state
        .responses
        .get(n)
        .or_else(|| state.responses.last())
        .cloned()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, Value::Null));
    (status, Json(body))
}

/// Writes `bytes` to a unique file under the system temp directory.
pub fn temp_image(name: &str, bytes: &[u8]) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("qc-vision-test-{}-{}", std::process::id(), n));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
