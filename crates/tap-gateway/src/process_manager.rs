//! Process manager: fire-and-forget playback and recording children.
//!
//! Output is discarded; callers only ever see the pid. Each child has a
//! waiter task that owns it, so a kill request is sent to that task instead
//! of locking the child.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use tap_types::config::MediaConfig;
use tap_types::process::{ProcessInfo, ProcessPurpose};

/// How long to keep finished processes before cleanup (30 min).
const CLEANUP_AFTER_SECS: i64 = 1800;

struct ManagedProcess {
    purpose: ProcessPurpose,
    command: String,
    started_at: chrono::DateTime<Utc>,
    is_running: Arc<AtomicBool>,
    kill: Option<oneshot::Sender<()>>,
}

#[derive(Clone)]
pub struct ProcessManager {
    media: MediaConfig,
    processes: Arc<Mutex<HashMap<u32, ManagedProcess>>>,
}

impl ProcessManager {
    pub fn new(media: MediaConfig) -> Self {
        Self {
            media,
            processes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Play a stream with the configured player; exits when the stream ends.
    pub async fn play(&self, url: &str) -> Result<u32> {
        let player = self.media.player.clone();
        self.spawn(ProcessPurpose::Playback, &player, &["-autoexit", url])
            .await
    }

    /// Record a stream to `filename` without re-encoding.
    pub async fn record(&self, url: &str, filename: &str) -> Result<u32> {
        let recorder = self.media.recorder.clone();
        self.spawn(
            ProcessPurpose::Recording,
            &recorder,
            &["-i", url, "-c", "copy", filename],
        )
        .await
    }

    /// Spawn a detached child with all stdio discarded.
    pub async fn spawn(&self, purpose: ProcessPurpose, program: &str, args: &[&str]) -> Result<u32> {
        self.cleanup().await;

        let mut child = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {purpose}: {program}"))?;

        let pid = child
            .id()
            .ok_or_else(|| anyhow::anyhow!("{program} exited before its pid could be read"))?;

        let is_running = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        {
            let running = Arc::clone(&is_running);
            tokio::spawn(async move {
                tokio::select! {
                    _ = child.wait() => {}
                    Ok(()) = kill_rx => {
                        if let Err(e) = child.start_kill() {
                            warn!("Failed to kill process {pid}: {e}");
                        }
                        let _ = child.wait().await;
                    }
                }
                running.store(false, Ordering::SeqCst);
            });
        }

        let command = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        info!("Process spawned: pid={pid}, purpose={purpose}, cmd={command}");

        self.track(
            pid,
            ManagedProcess {
                purpose,
                command,
                started_at: Utc::now(),
                is_running,
                kill: Some(kill_tx),
            },
        )
        .await;
        Ok(pid)
    }

    /// Record a freshly spawned child. A pid the OS handed out again replaces
    /// the finished process that held it.
    async fn track(&self, pid: u32, process: ManagedProcess) {
        let mut procs = self.processes.lock().await;
        if let Some(previous) = procs.insert(pid, process) {
            warn!(
                "pid {pid} reused; dropping record of {} process `{}` (running: {})",
                previous.purpose,
                previous.command,
                previous.is_running.load(Ordering::SeqCst)
            );
        }
    }

    /// Kill a managed process.
    pub async fn terminate(&self, pid: u32) -> Result<()> {
        let mut procs = self.processes.lock().await;
        let proc = procs
            .get_mut(&pid)
            .ok_or_else(|| anyhow::anyhow!("No managed process with pid {pid}"))?;

        if !proc.is_running.load(Ordering::SeqCst) {
            anyhow::bail!("Process {pid} has already exited");
        }
        let kill = proc
            .kill
            .take()
            .ok_or_else(|| anyhow::anyhow!("Process {pid} is already being stopped"))?;
        // The waiter task is gone only if the child already exited.
        let _ = kill.send(());
        info!("Process stopped: pid={pid}");
        Ok(())
    }

    /// List all managed processes.
    pub async fn list(&self) -> Vec<ProcessInfo> {
        let procs = self.processes.lock().await;
        let mut result: Vec<_> = procs
            .iter()
            .map(|(pid, proc)| ProcessInfo {
                pid: *pid,
                purpose: proc.purpose,
                command: proc.command.clone(),
                is_running: proc.is_running.load(Ordering::SeqCst),
                started_at: proc.started_at.to_rfc3339(),
            })
            .collect();
        result.sort_by_key(|p| p.pid);
        result
    }

    /// Forget finished processes older than CLEANUP_AFTER_SECS.
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let mut procs = self.processes.lock().await;
        let before = procs.len();
        procs.retain(|_, p| {
            p.is_running.load(Ordering::SeqCst)
                || now.signed_duration_since(p.started_at).num_seconds() <= CLEANUP_AFTER_SECS
        });
        let removed = before - procs.len();
        if removed > 0 {
            info!("Cleaned up {removed} finished processes");
        }
    }

    /// Kill everything still running.
    pub async fn terminate_all(&self) {
        let mut procs = self.processes.lock().await;
        for (pid, proc) in procs.iter_mut() {
            if let Some(kill) = proc.kill.take() {
                let _ = kill.send(());
                info!("Process stopped: pid={pid}");
            }
        }
    }
}
