use std::fmt::{Display, Formatter};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

const POLL: Duration = Duration::from_millis(50);

/// Output fragments git prints when `commit` has nothing staged.
const NOTHING_TO_COMMIT: &[&str] = &[
    "nothing to commit",
    "nothing added to commit",
    "no changes added to commit",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    fn from_output(output: &Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            timed_out: false,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

pub trait CommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        deadline: Option<Instant>,
    ) -> io::Result<CommandResult>;
}

/// Runs commands as real child processes with stdin closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        deadline: Option<Instant>,
    ) -> io::Result<CommandResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd).stdin(Stdio::null());

        let Some(deadline) = deadline else {
            return Ok(CommandResult::from_output(&cmd.output()?));
        };
        if Instant::now() >= deadline {
            return Ok(CommandResult { timed_out: true, ..Default::default() });
        }

        let mut child = cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
        let (done_tx, done_rx) = mpsc::channel();
        let out = drain(child.stdout.take(), done_tx.clone());
        let err = drain(child.stderr.take(), done_tx);

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            thread::sleep(POLL);
        };

        // A grandchild (ssh) may keep the pipes open after git exits, so
        // reaching EOF is bounded by the same deadline.
        let mut open = 2;
        while status.is_some() && open > 0 {
            match done_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(()) => open -= 1,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => open = 0,
            }
        }

        let timed_out = status.is_none() || open > 0;
        Ok(CommandResult {
            success: !timed_out && status.is_some_and(|s| s.success()),
            code: status.and_then(|s| s.code()),
            timed_out,
            stdout: snapshot(&out),
            stderr: snapshot(&err),
        })
    }
}

type Captured = Arc<Mutex<Vec<u8>>>;

/// Copy a pipe into a shared buffer chunk by chunk, so whatever arrived
/// before a deadline is still readable. Signals `done` at EOF.
fn drain<R: Read + Send + 'static>(pipe: Option<R>, done: Sender<()>) -> Captured {
    let buf = Captured::default();
    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        if let Some(mut p) = pipe {
            let mut chunk = [0u8; 4096];
            while let Ok(n) = p.read(&mut chunk) {
                if n == 0 {
                    break;
                }
                if let Ok(mut b) = sink.lock() {
                    b.extend_from_slice(&chunk[..n]);
                }
            }
        }
        let _ = done.send(());
    });
    buf
}

fn snapshot(buf: &Captured) -> String {
    buf.lock().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A git invocation that did not succeed. `diagnostics` is the tool's own
/// text: stderr, or stdout when stderr is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFailure {
    pub command: String,
    pub code: Option<i32>,
    pub timed_out: bool,
    pub diagnostics: String,
}

impl Display for GitFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.timed_out, self.code) {
            (true, _) => write!(f, "`{}` killed after the deadline passed", self.command)?,
            (false, Some(code)) => write!(f, "`{}` exited with code {code}", self.command)?,
            (false, None) => write!(f, "`{}` did not exit normally", self.command)?,
        }
        let diag = self.diagnostics.trim_end();
        if !diag.is_empty() {
            write!(f, ":\n{diag}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success(GitOutput),
    BenignNoOp(GitOutput),
    Failure(GitFailure),
}

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    program: String,
    executor: E,
    deadline: Option<Instant>,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self::with_executor(repo_path, program, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, program: impl Into<String>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), program: program.into(), executor, deadline: None }
    }

    /// Every later invocation is killed once `deadline` passes.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Stage additions, changes and deletions under the worker's directory only.
    pub fn stage_all(&self) -> StepOutcome {
        self.run(vec!["add".into(), "-A".into(), "--".into(), ".".into()])
    }

    pub fn commit(&self, message: &str) -> StepOutcome {
        let failure = match self.run(vec!["commit".into(), "-m".into(), message.into()]) {
            StepOutcome::Failure(failure) => failure,
            done => return done,
        };
        if failure.timed_out {
            return StepOutcome::Failure(failure);
        }

        let lower = failure.diagnostics.to_lowercase();
        let benign = NOTHING_TO_COMMIT.iter().any(|m| lower.contains(m)) || self.worktree_clean();
        if benign {
            StepOutcome::BenignNoOp(GitOutput { stdout: failure.diagnostics, stderr: String::new() })
        } else {
            StepOutcome::Failure(failure)
        }
    }

    pub fn push(&self, remote: Option<&str>, branch: Option<&str>) -> StepOutcome {
        let mut args = vec!["push".to_string()];
        match (remote, branch) {
            (Some(r), b) => {
                args.push(r.to_string());
                args.extend(b.map(str::to_string));
            }
            (None, Some(b)) => {
                args.push("origin".into());
                args.push(b.to_string());
            }
            (None, None) => {}
        }
        self.run(args)
    }

    pub fn status_porcelain(&self) -> StepOutcome {
        self.run(vec!["status".into(), "--porcelain".into(), "--".into(), ".".into()])
    }

    fn worktree_clean(&self) -> bool {
        matches!(self.status_porcelain(), StepOutcome::Success(out) if out.stdout.trim().is_empty())
    }

    fn run(&self, args: Vec<String>) -> StepOutcome {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(%command, cwd = %self.repo_path.display(), "running");

        let result = match self.executor.execute(&self.program, &args, &self.repo_path, self.deadline) {
            Ok(result) => result,
            Err(e) => {
                return StepOutcome::Failure(GitFailure {
                    command,
                    code: None,
                    timed_out: false,
                    diagnostics: format!("failed to run {}: {e}", self.program),
                });
            }
        };
        debug!(%command, code = ?result.code, stdout = %result.stdout.trim_end(), stderr = %result.stderr.trim_end(), "finished");

        if result.success {
            return StepOutcome::Success(GitOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let diagnostics = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };
        StepOutcome::Failure(GitFailure { command, code: result.code, timed_out: result.timed_out, diagnostics })
    }
}
