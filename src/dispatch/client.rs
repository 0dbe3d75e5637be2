//! Client fan-out to the workers.
//!
//! The distributed execution substrate is Dask's own client channel; this
//! module only hands it a job. The production dispatcher shells out to a
//! short `python -c` snippet that connects to the scheduler and runs the
//! registered callable once per worker.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::dispatch::registry::JobSpec;
use crate::error::{Error, Result};
use crate::subprocess::{ProcessCommandBuilder, ProcessRunner};

#[async_trait]
pub trait WorkDispatcher: Send + Sync {
    /// Run `job` once on every worker connected to `scheduler_addr`,
    /// passing the worker count and, when present, the rendezvous address.
    async fn run_on_workers(
        &self,
        scheduler_addr: &str,
        job: &JobSpec,
        n_workers: usize,
        rendezvous_addr: Option<&str>,
    ) -> Result<()>;
}

pub struct PythonClientDispatcher {
    runner: Arc<dyn ProcessRunner>,
    timeout: Option<Duration>,
}

impl PythonClientDispatcher {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn client_snippet(
        scheduler_addr: &str,
        job: &JobSpec,
        n_workers: usize,
        rendezvous_addr: Option<&str>,
    ) -> String {
        let extra = match rendezvous_addr {
            Some(addr) => format!(", {addr:?}"),
            None => String::new(),
        };
        format!(
            "import importlib\n\
             from dask.distributed import Client\n\
             mod = importlib.import_module({module:?})\n\
             client = Client({addr:?})\n\
             client.run(mod.{callable}, {n_workers}{extra})\n",
            module = job.module,
            addr = scheduler_addr,
            callable = job.callable,
            n_workers = n_workers,
        )
    }
}

#[async_trait]
impl WorkDispatcher for PythonClientDispatcher {
    async fn run_on_workers(
        &self,
        scheduler_addr: &str,
        job: &JobSpec,
        n_workers: usize,
        rendezvous_addr: Option<&str>,
    ) -> Result<()> {
        let snippet = Self::client_snippet(scheduler_addr, job, n_workers, rendezvous_addr);
        debug!("Dispatching '{}' via client snippet:\n{snippet}", job.name);

        let mut builder = ProcessCommandBuilder::new("python")
            .arg("-c")
            .arg(&snippet);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let output = self
            .runner
            .run(builder.build())
            .await
            .map_err(|e| Error::Dispatch(e.to_string()))?;

        if !output.status.success() {
            return Err(Error::Dispatch(format!(
                "client exited with {:?}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        if !output.stdout.is_empty() {
            info!("Client output:\n{}", output.stdout.trim_end());
        }
        info!("Dispatched '{}' to {n_workers} workers", job.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;

    fn hello_job() -> JobSpec {
        JobSpec::new("hello", "hello", "run")
    }

    #[test]
    fn snippet_connects_and_fans_out() {
        let snippet =
            PythonClientDispatcher::client_snippet("localhost:8787", &hello_job(), 4, None);
        assert!(snippet.contains("importlib.import_module(\"hello\")"));
        assert!(snippet.contains("Client(\"localhost:8787\")"));
        assert!(snippet.contains("client.run(mod.run, 4)"));
    }

    #[test]
    fn snippet_passes_rendezvous_address() {
        let snippet = PythonClientDispatcher::client_snippet(
            "localhost:8787",
            &hello_job(),
            2,
            Some("10.0.0.5:9999"),
        );
        assert!(snippet.contains("client.run(mod.run, 2, \"10.0.0.5:9999\")"));
    }

    #[tokio::test]
    async fn dispatch_runs_python_client() {
        let runner = MockProcessRunner::new();
        runner
            .expect_command("python")
            .with_args(|args| args.iter().any(|a| a.contains("import_module(\"hello\")")))
            .returns_stdout("Hello World!\n")
            .finish();

        let dispatcher = PythonClientDispatcher::new(Arc::new(runner.clone()));
        dispatcher
            .run_on_workers("localhost:8787", &hello_job(), 4, None)
            .await
            .unwrap();

        let calls = runner.call_history();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "python");
        assert_eq!(calls[0].args[0], "-c");
    }

    #[tokio::test]
    async fn dispatch_failure_carries_stderr() {
        let runner = MockProcessRunner::new();
        runner
            .expect_command("python")
            .returns_exit_code(1)
            .returns_stderr("Traceback: no scheduler")
            .finish();

        let dispatcher = PythonClientDispatcher::new(Arc::new(runner));
        let err = dispatcher
            .run_on_workers("localhost:8787", &hello_job(), 4, None)
            .await
            .unwrap_err();
        match err {
            Error::Dispatch(msg) => assert!(msg.contains("no scheduler")),
            other => panic!("Expected Dispatch error, got {other}"),
        }
    }
}
