use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessOutput, ProcessRunner};
use super::spawner::{ProcessCommand, ProcessHandle, ProcessSpawner};

/// Shared, ordered record of `terminate` calls across every handle produced
/// by one [`MockProcessSpawner`]. Entries are the spawned program names, in
/// call order, so tests can assert teardown ordering across processes.
#[derive(Clone, Default, Debug)]
pub struct TerminationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TerminationLog {
    pub fn record(&self, label: &str) {
        self.entries.lock().unwrap().push(label.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

struct FailureRule {
    program: String,
    args_matcher: Option<ArgsMatcher>,
}

struct ExitedRule {
    program: String,
}

#[derive(Clone)]
pub struct MockProcessSpawner {
    spawn_calls: Arc<Mutex<Vec<ProcessCommand>>>,
    failures: Arc<Mutex<Vec<FailureRule>>>,
    exited: Arc<Mutex<Vec<ExitedRule>>>,
    terminations: TerminationLog,
}

impl MockProcessSpawner {
    pub fn new() -> Self {
        Self {
            spawn_calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
            exited: Arc::new(Mutex::new(Vec::new())),
            terminations: TerminationLog::default(),
        }
    }

    /// Every spawn of `program` fails with a spawn error.
    pub fn fail_spawn(&self, program: &str) {
        self.failures.lock().unwrap().push(FailureRule {
            program: program.to_string(),
            args_matcher: None,
        });
    }

    /// Spawns of `program` whose argument list satisfies `matcher` fail.
    pub fn fail_spawn_when<F>(&self, program: &str, matcher: F)
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.failures.lock().unwrap().push(FailureRule {
            program: program.to_string(),
            args_matcher: Some(Box::new(matcher)),
        });
    }

    /// Handles for `program` report the process as already exited.
    pub fn exit_immediately(&self, program: &str) {
        self.exited.lock().unwrap().push(ExitedRule {
            program: program.to_string(),
        });
    }

    pub fn spawn_calls(&self) -> Vec<ProcessCommand> {
        self.spawn_calls.lock().unwrap().clone()
    }

    pub fn spawn_count(&self, program: &str) -> usize {
        self.spawn_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.program == program)
            .count()
    }

    pub fn terminations(&self) -> Vec<String> {
        self.terminations.entries()
    }

    fn should_fail(&self, command: &ProcessCommand) -> bool {
        self.failures.lock().unwrap().iter().any(|rule| {
            rule.program == command.program
                && rule
                    .args_matcher
                    .as_ref()
                    .map_or(true, |matcher| matcher(&command.args))
        })
    }

    fn starts_exited(&self, command: &ProcessCommand) -> bool {
        self.exited
            .lock()
            .unwrap()
            .iter()
            .any(|rule| rule.program == command.program)
    }
}

impl Default for MockProcessSpawner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSpawner for MockProcessSpawner {
    async fn spawn(&self, command: ProcessCommand) -> Result<Box<dyn ProcessHandle>, ProcessError> {
        self.spawn_calls.lock().unwrap().push(command.clone());

        if self.should_fail(&command) {
            return Err(ProcessError::SpawnFailed {
                command: command.display(),
                source: std::io::Error::other("mock spawn failure"),
            });
        }

        let pid = self.spawn_calls.lock().unwrap().len() as u32;
        Ok(Box::new(MockHandle {
            program: command.program.clone(),
            pid,
            running: !self.starts_exited(&command),
            log: self.terminations.clone(),
        }))
    }
}

#[derive(Debug)]
struct MockHandle {
    program: String,
    pid: u32,
    running: bool,
    log: TerminationLog,
}

#[async_trait]
impl ProcessHandle for MockHandle {
    fn id(&self) -> Option<u32> {
        self.running.then_some(self.pid)
    }

    fn is_running(&mut self) -> bool {
        self.running
    }

    async fn terminate(&mut self) {
        self.log.record(&self.program);
        self.running = false;
    }
}

struct RunExpectation {
    program: String,
    args_matcher: Option<ArgsMatcher>,
    response: ProcessOutput,
}

#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<RunExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

pub struct MockRunConfig {
    runner: MockProcessRunner,
    expectation: RunExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&self, program: &str) -> MockRunConfig {
        MockRunConfig {
            runner: self.clone(),
            expectation: RunExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                },
            },
        }
    }

    pub fn call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let expectations = self.expectations.lock().unwrap();
        for expectation in expectations.iter() {
            if expectation.program != command.program {
                continue;
            }
            if let Some(ref matcher) = expectation.args_matcher {
                if !matcher(&command.args) {
                    continue;
                }
            }
            return Ok(expectation.response.clone());
        }

        Err(ProcessError::MockExpectationNotMet(format!(
            "No expectation found for command: {}",
            command.display()
        )))
    }
}

impl MockRunConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.response.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.response.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}
