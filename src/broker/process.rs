//! Subprocess lifecycle: spawn without a shell, drain both pipes
//! concurrently, and enforce a wall-clock deadline.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::commands::SpawnSpec;

/// Bytes kept past the output limit so a secret straddling the cut point is
/// still whole when redaction runs.
pub const CAPTURE_MARGIN: usize = 4 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// One stream, capped at the capture limit.
#[derive(Debug, Default)]
pub struct CapturedStream {
    pub text: String,
    /// The child wrote more than the capture limit; the rest was discarded.
    pub overflowed: bool,
}

/// Raw result of one process run, before redaction and truncation.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    fn timed_out() -> Self {
        Self {
            stdout: CapturedStream::default(),
            stderr: CapturedStream::default(),
            exit_code: None,
            timed_out: true,
        }
    }
}

/// Run `spec` to completion or until `timeout` elapses, keeping at most
/// `capture_limit` bytes of each stream.
///
/// stdin is closed. Pipes are drained to EOF even past the limit so the child
/// never blocks on a full pipe. On timeout the child is killed and reaped, and
/// any reader still blocked on a pipe (held open by a grandchild) is aborted.
/// Dropping this future mid-flight does the same.
pub async fn run(
    spec: &SpawnSpec,
    timeout: Duration,
    capture_limit: usize,
) -> io::Result<ProcessOutput> {
    let deadline = Instant::now() + timeout;

    let mut child = Command::new(&spec.executable)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr not captured"))?;
    let mut stdout_task = ReaderTask(tokio::spawn(read_stream(stdout, capture_limit)));
    let mut stderr_task = ReaderTask(tokio::spawn(read_stream(stderr, capture_limit)));

    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = tokio::time::sleep_until(deadline) => None,
    };

    let Some(status) = status else {
        log::debug!("process {} exceeded deadline, killing", spec.executable);
        // Already-exited children make start_kill fail; nothing to do then.
        let _ = child.start_kill();
        let _ = child.wait().await;
        return Ok(ProcessOutput::timed_out());
    };

    let drained = tokio::time::timeout_at(deadline, async {
        let out = join_reader(&mut stdout_task).await?;
        let err = join_reader(&mut stderr_task).await?;
        Ok::<_, io::Error>((out, err))
    })
    .await;

    match drained {
        Ok(result) => {
            let (stdout, stderr) = result?;
            Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code: status.code(),
                timed_out: false,
            })
        }
        Err(_) => Ok(ProcessOutput::timed_out()),
    }
}

async fn read_stream<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> io::Result<CapturedStream> {
    let mut kept = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut overflowed = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let keep = n.min(limit.saturating_sub(kept.len()));
        kept.extend_from_slice(&chunk[..keep]);
        overflowed |= keep < n;
    }
    Ok(CapturedStream {
        text: String::from_utf8_lossy(&kept).into_owned(),
        overflowed,
    })
}

/// Pipe reader that is aborted when dropped. Aborting drops the read end, so
/// a grandchild still writing to it gets EPIPE instead of running on.
struct ReaderTask(JoinHandle<io::Result<CapturedStream>>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn join_reader(task: &mut ReaderTask) -> io::Result<CapturedStream> {
    (&mut task.0).await.map_err(io::Error::other)?
}
