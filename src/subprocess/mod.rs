pub mod builder;
pub mod error;
pub mod mock;
pub mod runner;
pub mod spawner;

pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::{MockProcessRunner, MockProcessSpawner, TerminationLog};
pub use runner::{ExitStatus, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use spawner::{ProcessCommand, ProcessHandle, ProcessSpawner, TokioProcessSpawner};

use std::sync::Arc;

/// Facade bundling the two subprocess seams: detached spawning for the
/// supervised cluster processes, and run-to-completion execution for the
/// client shim.
#[derive(Clone)]
pub struct SubprocessManager {
    spawner: Arc<dyn ProcessSpawner>,
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(spawner: Arc<dyn ProcessSpawner>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { spawner, runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessSpawner), Arc::new(TokioProcessRunner))
    }

    /// Fully mocked manager plus handles to drive the mocks from tests.
    pub fn mock() -> (Self, MockProcessSpawner, MockProcessRunner) {
        let spawner = MockProcessSpawner::new();
        let runner = MockProcessRunner::new();
        let manager = Self::new(
            Arc::new(spawner.clone()) as Arc<dyn ProcessSpawner>,
            Arc::new(runner.clone()) as Arc<dyn ProcessRunner>,
        );
        (manager, spawner, runner)
    }

    pub fn spawner(&self) -> Arc<dyn ProcessSpawner> {
        Arc::clone(&self.spawner)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }
}
