use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ProcessError;

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    /// Shell-quoted rendering of the command line, for logs only.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        shell_words::join(&parts)
    }
}

/// Handle to a spawned background process.
///
/// Handles are owned by whoever launched the process; termination happens
/// only through `terminate`, which is best-effort and idempotent.
#[async_trait]
pub trait ProcessHandle: Send + std::fmt::Debug {
    /// OS process id, if the process has not been reaped yet.
    fn id(&self) -> Option<u32>;

    /// Whether the process is still running.
    fn is_running(&mut self) -> bool;

    /// Forcefully terminate the process. Calling this on an already
    /// terminated process is a no-op; failures are logged, never returned.
    async fn terminate(&mut self);
}

/// Spawns detached background processes.
///
/// The spawned process inherits the parent's stdout/stderr so its output is
/// visible for diagnostics; nothing is captured or parsed. Spawn failures
/// surface synchronously, there is no retry.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(&self, command: ProcessCommand) -> Result<Box<dyn ProcessHandle>, ProcessError>;
}

pub struct TokioProcessSpawner;

#[async_trait]
impl ProcessSpawner for TokioProcessSpawner {
    async fn spawn(&self, command: ProcessCommand) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        tracing::debug!("Spawning background process: {}", command.display());

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdout(std::process::Stdio::inherit());
        cmd.stderr(std::process::Stdio::inherit());
        // Backstop only: orderly teardown goes through ProcessHandle::terminate.
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::CommandNotFound(command.program.clone())
            } else {
                ProcessError::SpawnFailed {
                    command: command.display(),
                    source: e,
                }
            }
        })?;

        tracing::debug!(
            "Spawned {} (pid {:?})",
            command.program,
            child.id()
        );

        Ok(Box::new(TokioChildHandle {
            program: command.program,
            child,
        }))
    }
}

#[derive(Debug)]
struct TokioChildHandle {
    program: String,
    child: tokio::process::Child,
}

#[async_trait]
impl ProcessHandle for TokioChildHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("{} already exited with {status}", self.program);
            }
            _ => {
                if let Err(e) = self.child.kill().await {
                    tracing::warn!("Failed to kill {}: {e}", self.program);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleep_command() -> ProcessCommand {
        ProcessCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
        }
    }

    #[test]
    fn display_quotes_arguments() {
        let cmd = ProcessCommand {
            program: "dask-worker".to_string(),
            args: vec!["localhost:8787".to_string(), "--name".to_string(), "a b".to_string()],
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
        };
        assert_eq!(cmd.display(), "dask-worker localhost:8787 --name 'a b'");
    }

    #[tokio::test]
    async fn spawn_and_terminate() {
        let mut handle = TokioProcessSpawner.spawn(sleep_command()).await.unwrap();
        assert!(handle.is_running());
        handle.terminate().await;
        // Idempotent: a second terminate must not fail.
        handle.terminate().await;
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn spawn_nonexistent_command() {
        let mut cmd = sleep_command();
        cmd.program = "definitely_not_a_real_command_xyz123".to_string();
        let result = TokioProcessSpawner.spawn(cmd).await;
        match result {
            Err(ProcessError::CommandNotFound(program)) => {
                assert_eq!(program, "definitely_not_a_real_command_xyz123");
            }
            other => panic!("Expected CommandNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminate_after_natural_exit() {
        let cmd = ProcessCommand {
            program: "true".to_string(),
            args: vec![],
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
        };
        let mut handle = TokioProcessSpawner.spawn(cmd).await.unwrap();
        // Give the process time to exit on its own.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.terminate().await;
        assert!(!handle.is_running());
    }
}
