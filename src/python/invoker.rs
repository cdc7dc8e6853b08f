use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio_util::sync::CancellationToken;

use super::{output, ProcessError};

/// Limits applied to every script run.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Interpreter binary, e.g. `python`.
    pub interpreter: String,
    /// Wall-clock limit for one run, measured from spawn.
    pub timeout: Duration,
    /// Cap on buffered stdout (and stderr) per run.
    pub max_output_bytes: usize,
    /// Scripts allowed to run at the same time.
    pub max_concurrency: usize,
    /// Callers allowed to wait for a slot before new ones are rejected.
    pub max_queue: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            timeout: Duration::from_secs(300),
            max_output_bytes: 4 * 1024 * 1024,
            max_concurrency: 4,
            max_queue: 32,
        }
    }
}

/// Counters exported on `/metrics`.
#[derive(Debug, Default)]
pub struct InvokerStats {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    rejected: AtomicU64,
    in_flight: AtomicUsize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvokerStatsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
    pub in_flight: usize,
    pub queued: usize,
}

struct Inner {
    config: InvokerConfig,
    permits: Semaphore,
    waiting: AtomicUsize,
    stats: InvokerStats,
    shutdown: CancellationToken,
}

/// Runs external scripts with bounded concurrency, a timeout and an output cap.
///
/// Cloning is cheap; all clones share the same pool and counters.
#[derive(Clone)]
pub struct ProcessInvoker {
    inner: Arc<Inner>,
}

struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

enum Finish {
    Exited(std::io::Result<(Captured, Captured, ExitStatus)>),
    TimedOut,
    Cancelled,
}

// Decrementa o contador no drop.
struct CounterGuard<'a>(&'a AtomicUsize);

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProcessInvoker {
    pub fn new(config: InvokerConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrency.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                permits,
                waiting: AtomicUsize::new(0),
                stats: InvokerStats::default(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Runs `script` with `args` and returns its stdout as JSON.
    pub async fn run_json(&self, script: &Path, args: &[String]) -> Result<Value, ProcessError> {
        self.execute(script, args, None).await
    }

    /// Like [`run_json`](Self::run_json), but also stops when `cancel` fires.
    pub async fn run_json_with_cancel(
        &self,
        script: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Value, ProcessError> {
        self.execute(script, args, Some(cancel)).await
    }

    /// Cancels every queued and running script and refuses new ones.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.permits.close();
    }

    pub fn stats(&self) -> InvokerStatsSnapshot {
        let stats = &self.inner.stats;
        InvokerStatsSnapshot {
            started: stats.started.load(Ordering::Relaxed),
            succeeded: stats.succeeded.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            timed_out: stats.timed_out.load(Ordering::Relaxed),
            rejected: stats.rejected.load(Ordering::Relaxed),
            in_flight: stats.in_flight.load(Ordering::SeqCst),
            queued: self.inner.waiting.load(Ordering::SeqCst),
        }
    }

    async fn execute(
        &self,
        script: &Path,
        args: &[String],
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ProcessError> {
        let _permit = self.acquire(cancel).await?;

        let script = absolute(script)?;
        let workdir = script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let config = &self.inner.config;
        let stats = &self.inner.stats;

        log::debug!("🐍 Spawning {} {} ({} args)", config.interpreter, script.display(), args.len());

        let mut child = Command::new(&config.interpreter)
            .arg(&script)
            .args(args)
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: config.interpreter.clone(),
                source,
            })?;

        stats.started.fetch_add(1, Ordering::Relaxed);
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        let _in_flight = CounterGuard(&stats.in_flight);
        let started_at = Instant::now();

        let stdout = child.stdout.take().ok_or_else(|| {
            ProcessError::Io(std::io::Error::other("child stdout was not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ProcessError::Io(std::io::Error::other("child stderr was not captured"))
        })?;

        let finish = {
            let limit = config.max_output_bytes;
            let run = async {
                tokio::try_join!(collect(stdout, limit), collect(stderr, limit), child.wait())
            };
            tokio::select! {
                res = tokio::time::timeout(config.timeout, run) => match res {
                    Ok(exited) => Finish::Exited(exited),
                    Err(_) => Finish::TimedOut,
                },
                _ = self.cancelled(cancel) => Finish::Cancelled,
            }
        };

        let (out, err, status) = match finish {
            Finish::Exited(Ok(exited)) => exited,
            Finish::Exited(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
            Finish::TimedOut => {
                reap(&mut child).await;
                stats.timed_out.fetch_add(1, Ordering::Relaxed);
                stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("⏱️  {} timed out after {:?}", script.display(), config.timeout);
                return Err(ProcessError::TimedOut(config.timeout));
            }
            Finish::Cancelled => {
                reap(&mut child).await;
                stats.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("🛑 {} cancelled", script.display());
                return Err(ProcessError::Cancelled);
            }
        };

        log::debug!("🐍 {} finished in {:?} ({})", script.display(), started_at.elapsed(), status);

        if !status.success() {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            let stderr = String::from_utf8_lossy(&err.bytes).trim().to_string();
            log::warn!("❌ {} exited with {:?}: {}", script.display(), status.code(), stderr);
            return Err(ProcessError::Failed { code: status.code(), stderr });
        }

        if out.truncated {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            return Err(ProcessError::OutputTooLarge { limit: config.max_output_bytes });
        }

        let result = output::parse_stdout(&String::from_utf8_lossy(&out.bytes));
        match &result {
            Ok(_) => stats.succeeded.fetch_add(1, Ordering::Relaxed),
            Err(_) => stats.failed.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    async fn acquire(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<SemaphorePermit<'_>, ProcessError> {
        match self.inner.permits.try_acquire() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(ProcessError::PoolClosed),
            Err(TryAcquireError::NoPermits) => {}
        }

        let queued = self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let _slot = CounterGuard(&self.inner.waiting);
        if queued >= self.inner.config.max_queue {
            self.inner.stats.rejected.fetch_add(1, Ordering::Relaxed);
            log::warn!("🚦 Script pool saturated ({} waiting)", queued);
            return Err(ProcessError::Saturated { queued });
        }

        tokio::select! {
            permit = self.inner.permits.acquire() => permit.map_err(|_| ProcessError::PoolClosed),
            _ = self.cancelled(cancel) => Err(ProcessError::Cancelled),
        }
    }

    async fn cancelled(&self, extra: Option<&CancellationToken>) {
        match extra {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {}
                _ = self.inner.shutdown.cancelled() => {}
            },
            None => self.inner.shutdown.cancelled().await,
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ProcessError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn reap(child: &mut tokio::process::Child) {
    if let Err(e) = child.start_kill() {
        log::debug!("kill failed (process already gone?): {}", e);
    }
    let _ = child.wait().await;
}

// Lê até EOF guardando no máximo `limit` bytes. O resto é descartado para o
// processo filho nunca travar com o pipe cheio.
async fn collect<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> std::io::Result<Captured> {
    let mut bytes = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(bytes.len());
        if n > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
        } else {
            bytes.extend_from_slice(&chunk[..n]);
        }
    }
    Ok(Captured { bytes, truncated })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn sh_invoker(config: InvokerConfig) -> ProcessInvoker {
        ProcessInvoker::new(InvokerConfig {
            interpreter: "sh".to_string(),
            ..config
        })
    }

    #[tokio::test]
    async fn test_parses_json_stdout() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.py", "printf '{\"arg\": \"%s\"}\\n' \"$1\"\n");
        let invoker = sh_invoker(InvokerConfig::default());

        let value = invoker.run_json(&path, &["hello".to_string()]).await.unwrap();

        assert_eq!(value, json!({"arg": "hello"}));
        assert_eq!(invoker.stats().succeeded, 1);
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "echo.py", "printf '%s' \"$1\"\n");
        let invoker = sh_invoker(InvokerConfig::default());
        let hostile = "$(touch pwned); `id` | cat".to_string();

        let value = invoker.run_json(&path, &[hostile.clone()]).await.unwrap();

        assert_eq!(value, json!({"output": hostile}));
        assert!(!dir.path().join("pwned").exists());
    }

    #[tokio::test]
    async fn test_runs_in_script_directory() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "where.py", "pwd\n");
        let invoker = sh_invoker(InvokerConfig::default());

        let value = invoker.run_json(&path, &[]).await.unwrap();

        let reported = PathBuf::from(value["output"].as_str().unwrap());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "fail.py", "echo 'model unavailable' >&2\nexit 3\n");
        let invoker = sh_invoker(InvokerConfig::default());

        let err = invoker.run_json(&path, &[]).await.unwrap_err();

        match err {
            ProcessError::Failed { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "model unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(invoker.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "slow.py", "sleep 5\necho '{}'\n");
        let invoker = sh_invoker(InvokerConfig {
            timeout: Duration::from_millis(200),
            ..InvokerConfig::default()
        });

        let started = Instant::now();
        let err = invoker.run_json(&path, &[]).await.unwrap_err();

        assert!(matches!(err, ProcessError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
        let stats = invoker.stats();
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_stdout_over_limit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "chatty.py", "i=0\nwhile [ $i -lt 200 ]; do echo 0123456789; i=$((i+1)); done\n");
        let invoker = sh_invoker(InvokerConfig {
            max_output_bytes: 256,
            ..InvokerConfig::default()
        });

        let err = invoker.run_json(&path, &[]).await.unwrap_err();

        assert!(matches!(err, ProcessError::OutputTooLarge { limit: 256 }));
    }

    #[tokio::test]
    async fn test_cancellation_stops_running_script() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "slow.py", "sleep 5\n");
        let invoker = sh_invoker(InvokerConfig::default());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let err = invoker.run_json_with_cancel(&path, &[], &token).await.unwrap_err();

        assert!(matches!(err, ProcessError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(invoker.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_full_pool_with_no_queue_rejects() {
        let dir = TempDir::new().unwrap();
        let slow = script(&dir, "slow.py", "sleep 2\necho '{}'\n");
        let fast = script(&dir, "fast.py", "echo '{}'\n");
        let invoker = sh_invoker(InvokerConfig {
            max_concurrency: 1,
            max_queue: 0,
            ..InvokerConfig::default()
        });

        let background = invoker.clone();
        let running = tokio::spawn(async move { background.run_json(&slow, &[]).await });
        while invoker.stats().in_flight == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let err = invoker.run_json(&fast, &[]).await.unwrap_err();
        assert!(matches!(err, ProcessError::Saturated { .. }));
        assert_eq!(invoker.stats().rejected, 1);

        assert!(running.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_queued_callers_run_one_at_a_time() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "nap.py", "sleep 0.3\necho '{\"done\": true}'\n");
        let invoker = sh_invoker(InvokerConfig {
            max_concurrency: 1,
            max_queue: 4,
            ..InvokerConfig::default()
        });

        let started = Instant::now();
        let (a, b) = tokio::join!(invoker.run_json(&path, &[]), invoker.run_json(&path, &[]));

        assert!(a.is_ok() && b.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_runs() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.py", "echo '{}'\n");
        let invoker = sh_invoker(InvokerConfig::default());

        invoker.shutdown();

        let err = invoker.run_json(&path, &[]).await.unwrap_err();
        assert!(matches!(err, ProcessError::PoolClosed));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "ok.py", "echo '{}'\n");
        let invoker = ProcessInvoker::new(InvokerConfig {
            interpreter: "definitely-not-an-interpreter-xyz".to_string(),
            ..InvokerConfig::default()
        });

        let err = invoker.run_json(&path, &[]).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
