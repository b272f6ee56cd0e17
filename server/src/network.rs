//! WebSocket front-end: accepts phone connections and feeds the game loop

use crate::dispatch::TaskSender;
use crate::game::Game;
use crate::registry::SessionId;
use crate::responder::Responder;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, ServerMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Accept loop handing every connection its own reader and writer task
pub struct Server {
    listener: TcpListener,
    responder: Responder,
    tasks: TaskSender<Game>,
    next_session: Arc<AtomicU64>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        responder: Responder,
        tasks: TaskSender<Game>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("WebSocket server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            responder,
            tasks,
            next_session: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the game loop goes away
    pub async fn run(self) {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            if self.tasks.is_closed() {
                warn!("Game loop has stopped, closing the accept loop");
                break;
            }

            let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
            let responder = self.responder.clone();
            let tasks = self.tasks.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, session, responder, tasks).await {
                    warn!("Connection {} from {} ended with an error: {}", session, addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    session: SessionId,
    responder: Responder,
    tasks: TaskSender<Game>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    info!("{} connected from {}", session, addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<String>();

    // Writer: the only place that touches the sink
    tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(text)).await {
                debug!("Write to {} failed: {}", session, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    responder.register(session, outbox);
    responder.send_to(
        session,
        &ServerMessage::Connected {
            message: format!("Welcome to the museum quest, you are {}", session),
        },
    );
    tasks.enqueue(move |game: &mut Game| game.on_connect(session));

    let mut result = Ok(());
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let command = decode(&text);
                debug!("{} -> {}", session, command.kind());
                if !tasks.enqueue(move |game: &mut Game| game.handle(session, command)) {
                    break;
                }
            }
            Ok(Message::Binary(bytes)) => {
                warn!("{} sent {} bytes of binary data, ignoring", session, bytes.len());
            }
            Ok(Message::Close(frame)) => {
                debug!("{} sent close frame {:?}", session, frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }
    }

    // Dropping the outbox ends the writer task
    responder.unregister(session);
    tasks.enqueue(move |game: &mut Game| game.on_disconnect(session));
    info!("{} disconnected", session);
    result
}
