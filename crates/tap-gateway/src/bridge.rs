//! Connector bridge: an [`EventSource`] backed by a child process.
//!
//! The platform protocol lives in an external connector executable. For each
//! subscription the gateway spawns `<command> <args..> <key>` and reads NDJSON
//! [`BridgeMessage`] lines from its stdout: first a `handshake`, then `event`
//! lines until the process exits. Options are passed as environment
//! variables. Closing the connection kills the child.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use tap_types::config::SourceConfig;
use tap_types::source::{BridgeMessage, Handshake, SourceEvent};

use crate::source::{ConnectOptions, EventSource, LiveConnection, SourceHandle, EVENT_CHANNEL_CAPACITY};

type LineReader = Lines<BufReader<ChildStdout>>;

pub struct BridgeSource {
    command: Option<String>,
    args: Vec<String>,
}

impl BridgeSource {
    pub fn new(cfg: &SourceConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            args: cfg.args.clone(),
        }
    }

    fn command(&self, key: &str, options: &ConnectOptions) -> Result<Command> {
        let program = self.command.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No event source configured. Set source.command in the config file.")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .arg(key)
            .env("LIVETAP_FETCH_ROOM_INFO", options.fetch_room_info.to_string())
            .env(
                "LIVETAP_PROCESS_INITIAL_DATA",
                options.process_initial_data.to_string(),
            )
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        if let Some(token) = &options.session_id {
            cmd.env("LIVETAP_SESSION_ID", token);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl EventSource for BridgeSource {
    async fn open(&self, key: &str, options: &ConnectOptions) -> Result<LiveConnection> {
        let mut child = self
            .command(key, options)?
            .spawn()
            .with_context(|| format!("Failed to spawn connector bridge for {key}"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Connector bridge stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();

        let handshake = read_handshake(&mut lines)
            .await
            .with_context(|| format!("Connector bridge handshake for {key} failed"))?;
        info!("Bridge for {key} spawned (pid: {:?})", child.id());

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, mut close_rx) = oneshot::channel::<()>();
        let key_owned = key.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = forward_events(&mut lines, &tx, &key_owned) => {
                    let _ = tx.send(SourceEvent::Disconnected).await;
                }
                // Fires on an explicit close and when the handle is dropped.
                _ = &mut close_rx => {}
            }
            if let Err(e) = child.start_kill() {
                debug!("Bridge for {key_owned} already exited: {e}");
            }
            let _ = child.wait().await;
            debug!("Bridge for {key_owned} reaped");
        });

        let handle = SourceHandle::new(move || {
            let _ = close_tx.send(());
        });

        Ok(LiveConnection {
            handshake,
            events: rx,
            handle,
        })
    }
}

/// Read lines until the handshake. Events before it are ignored; an error or
/// disconnect before it fails the connect.
async fn read_handshake(lines: &mut LineReader) -> Result<Handshake> {
    loop {
        let line = lines
            .next_line()
            .await
            .context("Failed to read from connector bridge")?
            .ok_or_else(|| anyhow::anyhow!("Connector bridge exited before handshake"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let msg: BridgeMessage = serde_json::from_str(trimmed)
            .with_context(|| format!("Failed to parse bridge message: {trimmed}"))?;
        match msg {
            BridgeMessage::Handshake(handshake) => return Ok(handshake),
            BridgeMessage::Event {
                event: SourceEvent::Error { message },
            } => anyhow::bail!(message),
            BridgeMessage::Event {
                event: SourceEvent::Disconnected,
            } => anyhow::bail!("Connector bridge disconnected before handshake"),
            BridgeMessage::Event { .. } => continue,
        }
    }
}

/// Forward event lines until EOF or until the receiver goes away.
async fn forward_events(lines: &mut LineReader, tx: &mpsc::Sender<SourceEvent>, key: &str) {
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read from bridge for {key}: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<BridgeMessage>(trimmed) {
            Ok(BridgeMessage::Event { event }) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(BridgeMessage::Handshake(_)) => {
                debug!("Ignoring repeated handshake from bridge for {key}");
            }
            Err(e) => warn!("Skipping malformed bridge line for {key}: {e}"),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn scripted(script: &str) -> BridgeSource {
        BridgeSource::new(&SourceConfig {
            command: Some("sh".into()),
            args: vec!["-c".into(), script.into(), "bridge".into()],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn reads_handshake_then_events() {
        let source = scripted(
            r#"echo '{"type":"handshake","room_id":"r1","viewer_count":4,"stream_endpoint":"http://x/live.flv"}'
echo '{"type":"event","event":{"type":"chat","unique_id":"'"$1"'","comment":"hi"}}'"#,
        );
        let mut conn = source
            .open("@host", &ConnectOptions::default())
            .await
            .unwrap();
        assert_eq!(conn.handshake.room_id, "r1");
        assert_eq!(conn.handshake.viewer_count, 4);
        assert_eq!(
            conn.handshake.stream_endpoint.as_deref(),
            Some("http://x/live.flv")
        );

        match conn.events.recv().await.unwrap() {
            SourceEvent::Chat { user, comment } => {
                assert_eq!(user.unique_id, "@host");
                assert_eq!(comment, "hi");
            }
            other => panic!("unexpected {other:?}"),
        }
        // The script exits, which surfaces as a disconnect.
        assert_eq!(conn.events.recv().await.unwrap(), SourceEvent::Disconnected);
    }

    #[tokio::test]
    async fn error_before_handshake_fails_open() {
        let source = scripted(r#"echo '{"type":"event","event":{"type":"error","message":"user is offline"}}'"#);
        let err = source
            .open("@host", &ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("user is offline"));
    }

    #[tokio::test]
    async fn missing_command_fails_open() {
        let source = BridgeSource::new(&SourceConfig::default());
        assert!(source
            .open("@host", &ConnectOptions::default())
            .await
            .is_err());
    }
}
