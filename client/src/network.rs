use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use shared::ServerMessage;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A headless phone: sends commands and reads what the server answers.
pub struct PhoneClient {
    ws: WsStream,
    received: usize,
}

impl PhoneClient {
    /// Connects to `url`, e.g. `ws://127.0.0.1:8888`.
    pub async fn connect(url: &str) -> ClientResult<Self> {
        let (ws, _response) = connect_async(url).await?;
        info!("Connected to {}", url);
        Ok(PhoneClient { ws, received: 0 })
    }

    pub async fn send_json(&mut self, value: &Value) -> ClientResult<()> {
        self.send_raw(&value.to_string()).await
    }

    /// Sends a text frame as is, valid JSON or not.
    pub async fn send_raw(&mut self, text: &str) -> ClientResult<()> {
        debug!("-> {}", text);
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Waits up to `wait` for the next server message.
    ///
    /// Returns `Ok(None)` on timeout. Frames that are not valid server
    /// messages are logged and skipped.
    pub async fn recv(&mut self, wait: Duration) -> ClientResult<Option<ServerMessage>> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = match timeout(remaining, self.ws.next()).await {
                Ok(frame) => frame,
                Err(_) => return Ok(None),
            };

            match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        self.received += 1;
                        debug!("<- {}", text);
                        return Ok(Some(message));
                    }
                    Err(e) => warn!("Unexpected frame from server ({}): {}", e, text),
                },
                Some(Ok(Message::Close(_))) | None => return Err("connection closed by server".into()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Reads messages until one of type `kind` arrives, dropping the others.
    pub async fn expect(&mut self, kind: &str, wait: Duration) -> ClientResult<ServerMessage> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining).await? {
                Some(message) if message.kind() == kind => return Ok(message),
                Some(other) => debug!("Skipping {} while waiting for {}", other.kind(), kind),
                None => return Err(format!("timed out waiting for {}", kind).into()),
            }
        }
    }

    /// Collects every message that arrives within `wait`.
    pub async fn drain(&mut self, wait: Duration) -> ClientResult<Vec<ServerMessage>> {
        let deadline = Instant::now() + wait;
        let mut messages = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.recv(remaining).await? {
                Some(message) => messages.push(message),
                None => return Ok(messages),
            }
        }
    }

    pub fn received_count(&self) -> usize {
        self.received
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
