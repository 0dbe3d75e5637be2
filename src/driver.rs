//! Top-level orchestration: validate, launch, dispatch, tear down.
//!
//! The environment is always released on the way out: the dispatch result is
//! captured, `shutdown` runs unconditionally, and only then does the result
//! propagate. Configuration problems (including an unknown work module) are
//! caught before any process is launched.

use crate::cluster::ClusterEnv;
use crate::config::LaunchConfig;
use crate::dispatch::{JobRegistry, PythonClientDispatcher, WorkDispatcher};
use crate::error::{Error, Result};
use crate::subprocess::SubprocessManager;

pub async fn run(
    config: &LaunchConfig,
    subprocess: &SubprocessManager,
    registry: &JobRegistry,
) -> Result<()> {
    config.validate()?;
    let module = config
        .module
        .as_deref()
        .ok_or_else(|| Error::Config("a work module must be specified (--module)".into()))?;
    let job = registry.resolve(module)?.clone();

    let env = ClusterEnv::launch(config, subprocess).await?;

    let dispatcher =
        PythonClientDispatcher::new(subprocess.runner()).with_timeout(config.dispatch_timeout);
    let result = dispatcher
        .run_on_workers(
            &config.scheduler_addr(),
            &job,
            config.n_workers,
            env.rendezvous_address(),
        )
        .await;

    env.shutdown().await;
    result
}
