//! TCP connection handler
//!
//! Each connection runs three tasks:
//! - read task: reads newline-delimited lines, decodes them and queues commands
//! - handle task: drains the command queue through the ChatServer in order
//! - write task: flushes the session's outbound lines to the socket
//!
//! Closing the session wakes the read task; the read task dropping its
//! queue sender lets the handle task finish after draining.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::codec::{self, ClientCommand, Command};
use crate::error::AppError;
use crate::server::ChatServer;
use crate::session::OUTBOUND_BUFFER;

/// Handle a new TCP connection
///
/// Registers a session, runs it until the stream ends or the client
/// disconnects, then tears it down.
pub async fn handle_connection(stream: TcpStream, server: Arc<ChatServer>) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr()?;
    debug!("New TCP connection from {}", peer_addr);

    let (reader, mut writer) = stream.into_split();

    // Create channel for server -> client lines
    let (line_tx, mut line_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    // Spawn write task (outbound lines -> socket)
    let write_task = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            let mut bytes = line.into_bytes();
            bytes.push(b'\n');
            if let Err(e) = writer.write_all(&bytes).await {
                debug!("Socket write failed for {}: {}", peer_addr, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
        debug!("Write task ended for {}", peer_addr);
    });

    let session = server.open_session(peer_addr, line_tx).await;
    let session_id = session.id();
    info!("Session {} connected from {}", session_id, peer_addr);

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();

    // Spawn read task (socket -> command queue)
    let read_session = session.clone();
    let read_task = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        loop {
            tokio::select! {
                _ = read_session.closed() => {
                    debug!("Session {} closed, ending read task", session_id);
                    break;
                }
                result = lines.next_line() => match result {
                    Ok(Some(line)) => {
                        let Some(cmd) = codec::decode_request(&line) else {
                            continue;
                        };
                        if cmd_tx.send(cmd).is_err() {
                            debug!("Handle task gone, ending read task for {}", session_id);
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Session {} reached EOF", session_id);
                        break;
                    }
                    Err(e) => {
                        debug!("Read error for {}: {}", session_id, e);
                        break;
                    }
                },
            }
        }
        debug!("Read task ended for {}", session_id);
    });

    // Spawn handle task (command queue -> protocol)
    let handle_server = server.clone();
    let handle_session = session.clone();
    let handle_task = tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_session.is_closed() {
                break;
            }
            debug!("Session {} sent /{}", handle_session.id(), cmd.verb);
            handle_server
                .handle_command(&handle_session, ClientCommand::from(cmd))
                .await;
        }
        debug!("Handle task ended for {}", handle_session.id());
    });

    let _ = read_task.await;
    let _ = handle_task.await;

    // No-op if the client already sent /disconnect
    server.close(&session, true).await;
    let _ = write_task.await;

    info!("Session {} disconnected", session_id);

    Ok(())
}
