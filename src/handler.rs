//! TCP connection handler
//!
//! Handles one client connection: registers it with the ChatServer actor,
//! then pumps bytes in both directions. The read task feeds socket bytes
//! through the line decoder and forwards typed events to the actor; the
//! write task drains the session's bounded outbound queue onto the socket.
//! Neither task touches shared state.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::codec::{encode, LineDecoder};
use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Per-session outbound queue capacity.
///
/// A peer that lets this many messages pile up unread has exhausted its
/// backpressure allowance and is disconnected instead of stalling the
/// dispatch loop.
pub const OUTBOUND_QUEUE_SIZE: usize = 64;

/// Socket read buffer size
const READ_BUFFER_SIZE: usize = 4096;

/// Handle a new TCP connection
///
/// Registers with the ChatServer (which assigns the session id), sets up
/// the read and write tasks, and reports `Disconnect` when either side of
/// the connection ends.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("new TCP connection from {}", peer_addr);

    let (read_half, write_half) = stream.into_split();

    // Channel for server -> client messages; the sender becomes part of
    // the session and is dropped by the actor when the session ends.
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_SIZE);

    // Register with the ChatServer, which mints the session id
    let (id_tx, id_rx) = oneshot::channel();
    if cmd_tx
        .send(ServerCommand::Connect {
            sender: msg_tx,
            reply: id_tx,
        })
        .await
        .is_err()
    {
        error!("failed to register connection from {} - server closed", peer_addr);
        return Err(AppError::ChannelClosed);
    }
    let client_id = id_rx.await.map_err(|_| AppError::ChannelClosed)?;
    info!("client {} connected from {}", client_id, peer_addr);

    // Spawn read task (socket -> decoder -> ServerCommand)
    let cmd_tx_read = cmd_tx.clone();
    let mut read_task = tokio::spawn(async move {
        if let Err(e) = read_loop(read_half, client_id, cmd_tx_read).await {
            warn!("client {}: connection dropped: {}", client_id, e);
        }
    });

    // Spawn write task (outbound queue -> socket)
    let mut write_task = tokio::spawn(write_loop(write_half, msg_rx));

    // Wait for either task to complete, then stop the other: after /bye
    // the write side finishes first, after EOF the read side does.
    tokio::select! {
        _ = &mut read_task => {
            debug!("read task completed for {}", client_id);
        }
        _ = &mut write_task => {
            debug!("write task completed for {}", client_id);
        }
    }
    read_task.abort();
    write_task.abort();

    // Idempotent: a no-op if the actor already removed the session
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("client {} connection closed", client_id);

    Ok(())
}

/// Read socket bytes, reassemble lines, decode, and forward to the actor.
///
/// Returns on orderly close; any I/O or framing fault is an error and ends
/// the connection. Malformed command lines are not fatal: they are routed
/// to the actor so the ERROR reply stays ordered with everything else the
/// client has in flight.
async fn read_loop(
    mut read_half: OwnedReadHalf,
    client_id: ClientId,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let mut decoder = LineDecoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = read_half.read(&mut buf).await?;
        if n == 0 {
            debug!("client {} closed the connection", client_id);
            return Ok(());
        }
        decoder.feed(&buf[..n]);

        while let Some(line) = decoder.next_line()? {
            let cmd = match ClientMessage::parse(&line) {
                Ok(message) => ServerCommand::Request { client_id, message },
                Err(e) => {
                    warn!("client {}: {}", client_id, e);
                    ServerCommand::Malformed { client_id }
                }
            };
            if cmd_tx.send(cmd).await.is_err() {
                debug!("server closed, ending read task for {}", client_id);
                return Err(AppError::ChannelClosed);
            }
        }
    }
}

/// Drain the outbound queue onto the socket.
///
/// Ends when the actor drops the session's sender (after BYE) or the
/// socket rejects a write; either way the socket is shut down.
async fn write_loop(mut write_half: OwnedWriteHalf, mut msg_rx: mpsc::Receiver<ServerMessage>) {
    while let Some(msg) = msg_rx.recv().await {
        if write_half.write_all(encode(&msg).as_bytes()).await.is_err() {
            debug!("socket write failed, ending write task");
            break;
        }
    }
    debug!("write task ended");

    let _ = write_half.shutdown().await;
}
