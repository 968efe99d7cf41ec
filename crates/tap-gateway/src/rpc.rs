//! Stdio tool server: NDJSON requests in, NDJSON responses out.
//!
//! Each request line is a [`ClientToServer`]; each response line a
//! [`ServerToClient`]. Tool calls run concurrently, so a slow connect does
//! not hold up a `live_list`; responses carry the request id and may arrive
//! out of order. Lifecycle events from the gateway bus are interleaved as
//! `notification` lines.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tap_types::rpc::{ClientToServer, ServerToClient};
use tap_types::tool::ToolCall;

use crate::Gateway;

const OUTBOX_CAPACITY: usize = 256;

/// Serve requests from `reader` until EOF or a read error, then shut the
/// gateway down.
pub async fn serve<R, W>(gateway: Arc<Gateway>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel::<ServerToClient>(OUTBOX_CAPACITY);
    let writer_task = tokio::spawn(write_loop(writer, out_rx));

    let notifier = {
        let mut events = gateway.subscribe_events();
        let out = out_tx.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if out.send(ServerToClient::Notification { event }).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Dropped {n} lifecycle notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let mut lines = reader.lines();
    let mut in_flight = Vec::new();
    let mut read_error = None;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Client closed input; shutting down");
                break;
            }
            Err(e) => {
                warn!("Failed to read request: {e}; shutting down");
                read_error = Some(e);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: ClientToServer = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                let _ = out_tx
                    .send(ServerToClient::Error {
                        id: None,
                        message: format!("Failed to parse request: {e}"),
                    })
                    .await;
                continue;
            }
        };

        match request {
            ClientToServer::ListTools { id } => {
                let tools = gateway.tool_definitions();
                let _ = out_tx.send(ServerToClient::Tools { id, tools }).await;
            }
            ClientToServer::Call { id, tool, input } => {
                debug!("Tool call {id}: {tool}");
                let gateway = Arc::clone(&gateway);
                let out = out_tx.clone();
                in_flight.retain(|h: &tokio::task::JoinHandle<()>| !h.is_finished());
                in_flight.push(tokio::spawn(async move {
                    let call = ToolCall {
                        id: id.clone(),
                        name: tool,
                        input,
                    };
                    let result = gateway.execute(&call).await;
                    let _ = out.send(ServerToClient::Result { id, result }).await;
                }));
            }
        }
    }

    for handle in in_flight {
        let _ = handle.await;
    }
    gateway.shutdown().await;
    notifier.abort();
    let _ = notifier.await;
    drop(out_tx);
    let written = writer_task.await.context("Writer task panicked")?;

    if let Some(e) = read_error {
        return Err::<(), _>(e).context("Failed to read request");
    }
    written
}

async fn write_loop<W>(mut writer: W, mut outbox: mpsc::Receiver<ServerToClient>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = outbox.recv().await {
        let json = serde_json::to_string(&msg).context("Failed to serialize response")?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
