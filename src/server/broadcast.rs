//! TCP fan-out of detection events to any number of clients.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::error::{DrumlineError, Result};
use crate::server::protocol::ServerEvent;

/// Streams `ServerEvent`s to every connected client as JSON lines.
///
/// Clients subscribe to a shared lossy broadcast channel; a slow client
/// that falls more than the channel capacity behind skips ahead and its
/// missed-event count shows up in the next `stats` message, rather than
/// back-pressuring the detection thread.
pub struct EventServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl EventServer {
    /// Binds the listen socket.
    ///
    /// # Errors
    /// `ServerSocket` if the address cannot be parsed or bound.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DrumlineError::ServerSocket {
                message: format!("Failed to bind {}: {}", addr, e),
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| DrumlineError::ServerSocket {
                message: format!("Failed to read local address: {}", e),
            })?;
        Ok(Self {
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound, useful when the port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag that stops the accept loop when set.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Accepts clients until the shutdown flag is set. Each client gets
    /// `hello` first, then everything published on `events`.
    pub async fn run(self, events: broadcast::Sender<ServerEvent>, hello: ServerEvent) -> Result<()> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Bounded accept wait so the shutdown flag is rechecked
            let accepted = tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                self.listener.accept(),
            )
            .await;

            match accepted {
                Ok(Ok((stream, peer))) => {
                    let receiver = events.subscribe();
                    let hello = hello.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(stream, receiver, hello).await {
                            eprintln!("Client {} dropped: {}", peer, e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(DrumlineError::ServerConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => continue,
            }
        }
        Ok(())
    }
}

async fn serve_client(
    mut stream: TcpStream,
    mut receiver: broadcast::Receiver<ServerEvent>,
    hello: ServerEvent,
) -> Result<()> {
    write_event(&mut stream, &hello).await?;

    loop {
        match receiver.recv().await {
            Ok(event) => write_event(&mut stream, &event).await?,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // Skip ahead; the client keeps its connection but loses
                // the oldest events.
                let notice = ServerEvent::Stats {
                    chunks: 0,
                    hits: 0,
                    dropped_events: missed,
                };
                write_event(&mut stream, &notice).await?;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    Ok(())
}

async fn write_event(stream: &mut TcpStream, event: &ServerEvent) -> Result<()> {
    let mut line = event
        .to_json()
        .map_err(|e| DrumlineError::ServerConnection {
            message: format!("Failed to encode event: {}", e),
        })?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .await
        .map_err(|e| DrumlineError::ServerConnection {
            message: format!("Failed to write event: {}", e),
        })
}
