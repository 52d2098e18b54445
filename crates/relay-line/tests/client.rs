// LineClient against a local stand-in for api.line.me.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    routing::post,
    Json, Router,
};
use relay_channels::{Messenger, SendError};
use relay_line::LineClient;
use serde_json::Value;

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    auth: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Api {
    seen: Arc<Mutex<Vec<Seen>>>,
}

async fn record(
    State(api): State<Api>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let is_used = body["replyToken"] == "used-token";
    api.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });
    if is_used {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    }
}

async fn spawn_api() -> (Api, String) {
    let api = Api::default();
    let app = Router::new()
        .route("/v2/bot/message/reply", post(record))
        .route("/v2/bot/message/push", post(record))
        .with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (api, format!("http://{addr}"))
}

#[tokio::test]
async fn reply_and_push_hit_the_right_endpoints() {
    let (api, base) = spawn_api().await;
    let client = LineClient::new("channel-token".to_string(), Some(base)).unwrap();

    client.reply("rt-1", "first").await.unwrap();
    client.push("U1", "second").await.unwrap();

    let seen = api.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);

    assert_eq!(seen[0].path, "/v2/bot/message/reply");
    assert_eq!(seen[0].auth.as_deref(), Some("Bearer channel-token"));
    assert_eq!(seen[0].body["replyToken"], "rt-1");
    assert_eq!(seen[0].body["messages"][0]["text"], "first");

    assert_eq!(seen[1].path, "/v2/bot/message/push");
    assert_eq!(seen[1].body["to"], "U1");
    assert_eq!(seen[1].body["messages"][0]["type"], "text");
}

#[tokio::test]
async fn rejected_reply_token_is_reported() {
    let (_api, base) = spawn_api().await;
    let client = LineClient::new("channel-token".to_string(), Some(base)).unwrap();

    let err = client.reply("used-token", "hello").await.unwrap_err();
    assert!(matches!(err, SendError::Rejected { status: 400, .. }));
}

#[tokio::test]
async fn unreachable_api_is_transport_error() {
    // Port 9 (discard) is closed on loopback in test environments.
    let client =
        LineClient::new("t".to_string(), Some("http://127.0.0.1:9".to_string())).unwrap();
    let err = client.push("U1", "hello").await.unwrap_err();
    assert!(matches!(err, SendError::Transport(_)));
}
