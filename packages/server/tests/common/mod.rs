//! Helpers shared by the integration tests.
//!
//! Each test starts its own server on an ephemeral port.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nounou_server::{config::ServerConfig, ui::Server};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const PARENT: u64 = 1;
pub const SITTER: u64 = 2;
pub const STRANGER: u64 = 3;

pub struct TestServer {
    pub addr: String,
    pub client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = Server::new(config);
        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                eprintln!("server error: {e}");
            }
        });

        let server = TestServer {
            addr,
            client: reqwest::Client::new(),
            handle,
        };
        for (id, name) in [(PARENT, "Claire"), (SITTER, "Sophie"), (STRANGER, "Marc")] {
            let response = server
                .client
                .put(server.url(&format!("/internal/users/{id}")))
                .json(&json!({ "name": name }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, user_id: u64, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-user-id", user_id.to_string())
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, user_id: u64, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-user-id", user_id.to_string())
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Sitter proposes 15 €/h; returns the conversation id.
    pub async fn open_negotiation(&self) -> u64 {
        let response = self
            .post(
                SITTER,
                "/api/applications",
                json!({
                    "parent_id": PARENT,
                    "babysitter_id": SITTER,
                    "terms": { "hourly_rate_cents": 1500 },
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let application: Value = response.json().await.unwrap();
        application["conversation_id"].as_u64().unwrap()
    }

    pub async fn connect(&self, user_id: u64) -> Socket {
        let url = format!("ws://{}/ws?user_id={}", self.addr, user_id);
        let (socket, _) = connect_async(url).await.unwrap();
        socket
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn send_frame(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::text(frame.to_string()))
        .await
        .unwrap();
}

/// Next JSON frame, skipping control frames.
pub async fn next_frame(socket: &mut Socket) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(text.as_str()).unwrap();
                }
                Some(Ok(_)) => continue,
                other => panic!("socket closed: {other:?}"),
            }
        }
    })
    .await
    .expect("no frame within 2s")
}

/// Subscribe and wait for the reply frame.
pub async fn subscribe(socket: &mut Socket, channel: &str) -> Value {
    send_frame(socket, json!({ "event": "subscribe", "channel": channel })).await;
    next_frame(socket).await
}

/// Assert that nothing arrives within a short window.
pub async fn assert_silent(socket: &mut Socket) {
    let result = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                _ => return String::new(),
            }
        }
    })
    .await;
    if let Ok(frame) = result {
        assert!(frame.is_empty(), "unexpected frame: {frame}");
    }
}
