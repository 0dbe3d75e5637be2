//! The cluster environment: launch, supervise, tear down.
//!
//! Startup order is scheduler, then workers, then the optional rendezvous
//! server; teardown is the reverse. Workers hold live connections to the
//! scheduler, so the scheduler must outlive them, and workers may block on a
//! rendezvous handshake, so the rendezvous server goes down first.
//!
//! Startup is transactional: if any step fails, everything already started
//! is torn down before the error propagates. Teardown runs exactly once
//! (`shutdown` consumes the environment) and never fails; problems along the
//! way are logged warnings.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cluster::commands;
use crate::cluster::readiness;
use crate::cluster::rendezvous::RendezvousToken;
use crate::config::LaunchConfig;
use crate::error::{Error, Result};
use crate::subprocess::{ProcessError, ProcessHandle, SubprocessManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Scheduler,
    Worker(usize),
    Rendezvous,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Scheduler => write!(f, "scheduler"),
            Role::Worker(index) => write!(f, "worker {index}"),
            Role::Rendezvous => write!(f, "rendezvous server"),
        }
    }
}

/// One spawned cluster process. Owned exclusively by the environment and
/// terminated only by its teardown path.
#[derive(Debug)]
pub struct ManagedProcess {
    role: Role,
    handle: Box<dyn ProcessHandle>,
}

impl ManagedProcess {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_running(&mut self) -> bool {
        self.handle.is_running()
    }

    async fn terminate(&mut self) {
        debug!("Terminating {} (pid {:?})", self.role, self.handle.id());
        self.handle.terminate().await;
    }
}

/// Rendezvous process together with its coordination file and the address
/// discovered from it. Bundling them keeps the invariant that the address
/// exists iff the process exists.
#[derive(Debug)]
struct Rendezvous {
    process: ManagedProcess,
    token: RendezvousToken,
    address: String,
}

#[derive(Debug)]
struct EnvParts {
    scheduler: ManagedProcess,
    workers: Vec<ManagedProcess>,
    rendezvous: Option<Rendezvous>,
}

/// A running single-node cluster.
///
/// Built by [`ClusterEnv::launch`], released by [`ClusterEnv::shutdown`].
/// `shutdown` consumes the value, so teardown cannot run twice; dropping an
/// environment without shutting it down logs a warning and falls back to the
/// spawner's kill-on-drop backstop.
#[derive(Debug)]
pub struct ClusterEnv {
    parts: Option<EnvParts>,
    settle: Duration,
}

/// Startup accumulator. Whatever has been started so far is reclaimed by
/// the rollback path when a later step fails. The rendezvous pieces are
/// tracked separately because a failure can land between spawning the
/// server and discovering its address.
#[derive(Default)]
struct PartialEnv {
    scheduler: Option<ManagedProcess>,
    workers: Vec<ManagedProcess>,
    rendezvous_process: Option<ManagedProcess>,
    token: Option<RendezvousToken>,
    address: Option<String>,
}

impl ClusterEnv {
    /// Launch the scheduler, `n_workers` workers, and (if enabled) the
    /// rendezvous server, probing readiness between phases.
    pub async fn launch(config: &LaunchConfig, subprocess: &SubprocessManager) -> Result<Self> {
        config.validate()?;

        let mut partial = PartialEnv::default();
        if let Err(e) = launch_into(&mut partial, config, subprocess).await {
            warn!("Startup failed, reclaiming already-started processes: {e}");
            teardown(
                partial.rendezvous_process,
                partial.token,
                partial.workers,
                partial.scheduler,
                config.settle,
            )
            .await;
            return Err(e);
        }

        let scheduler = partial.scheduler.ok_or_else(|| Error::Launch {
            role: Role::Scheduler.to_string(),
            source: ProcessError::Io(std::io::Error::other("scheduler missing after startup")),
        })?;
        let rendezvous = match (partial.rendezvous_process, partial.token, partial.address) {
            (Some(process), Some(token), Some(address)) => Some(Rendezvous {
                process,
                token,
                address,
            }),
            _ => None,
        };

        info!(
            "Cluster up: scheduler at {}, {} workers{}",
            config.scheduler_addr(),
            partial.workers.len(),
            if rendezvous.is_some() {
                ", rendezvous server"
            } else {
                ""
            }
        );

        Ok(Self {
            parts: Some(EnvParts {
                scheduler,
                workers: partial.workers,
                rendezvous,
            }),
            settle: config.settle,
        })
    }

    /// Address written by the rendezvous server, when one was launched.
    pub fn rendezvous_address(&self) -> Option<&str> {
        self.parts
            .as_ref()
            .and_then(|parts| parts.rendezvous.as_ref())
            .map(|r| r.address.as_str())
    }

    pub fn worker_count(&self) -> usize {
        self.parts.as_ref().map_or(0, |parts| parts.workers.len())
    }

    /// Tear the cluster down: rendezvous server first, then every worker,
    /// then the scheduler, with a settling pause between steps. Consumes the
    /// environment; teardown problems are logged, never returned.
    pub async fn shutdown(mut self) {
        if let Some(parts) = self.parts.take() {
            info!("Cleaning up workers and scheduler...");
            let (rendezvous_process, token) = match parts.rendezvous {
                Some(r) => (Some(r.process), Some(r.token)),
                None => (None, None),
            };
            teardown(
                rendezvous_process,
                token,
                parts.workers,
                Some(parts.scheduler),
                self.settle,
            )
            .await;
        }
    }
}

impl Drop for ClusterEnv {
    fn drop(&mut self) {
        if self.parts.is_some() {
            warn!(
                "Cluster environment dropped without shutdown; \
                 processes will be killed without ordered teardown"
            );
        }
    }
}

async fn launch_into(
    partial: &mut PartialEnv,
    config: &LaunchConfig,
    subprocess: &SubprocessManager,
) -> Result<()> {
    let spawner = subprocess.spawner();

    info!("Launching dask scheduler...");
    let handle = spawner
        .spawn(commands::scheduler_command(config))
        .await
        .map_err(|source| Error::Launch {
            role: Role::Scheduler.to_string(),
            source,
        })?;
    partial.scheduler = Some(ManagedProcess {
        role: Role::Scheduler,
        handle,
    });

    // Workers register with the scheduler as soon as they start; the listen
    // socket must be up first.
    let addr = config.scheduler_addr();
    if !readiness::wait_for_tcp(&addr, config.ready_timeout, config.poll_interval).await {
        return Err(Error::NotReady {
            role: Role::Scheduler.to_string(),
            timeout: config.ready_timeout,
        });
    }

    info!("Launching {} dask workers...", config.n_workers);
    for index in 0..config.n_workers {
        let handle = spawner
            .spawn(commands::worker_command(config, index))
            .await
            .map_err(|source| Error::Launch {
                role: Role::Worker(index).to_string(),
                source,
            })?;
        partial.workers.push(ManagedProcess {
            role: Role::Worker(index),
            handle,
        });
    }

    if config.rendezvous {
        let run_id = Uuid::new_v4().to_string();
        let token = RendezvousToken::new(config.token_path(&run_id));

        info!("Launching ompi-server...");
        let handle = spawner
            .spawn(commands::rendezvous_command(token.path()))
            .await
            .map_err(|source| Error::Launch {
                role: Role::Rendezvous.to_string(),
                source,
            })?;
        partial.rendezvous_process = Some(ManagedProcess {
            role: Role::Rendezvous,
            handle,
        });
        partial.token = Some(token.clone());

        // The server writes its address into the coordination file; wait for
        // that write before reading. A server that never writes is a
        // discovery failure, reclaimed like any other startup failure.
        let file_ready =
            readiness::wait_for_file(token.path(), config.ready_timeout, config.poll_interval)
                .await;
        if !file_ready {
            return Err(Error::RendezvousDiscovery(format!(
                "coordination file {} not written within {:?}",
                token.path().display(),
                config.ready_timeout
            )));
        }

        let address = token.read_address().await?;
        debug!("Rendezvous server at {address}");
        partial.address = Some(address);
    }

    // Short stabilization pause, then make sure nothing died during startup.
    tokio::time::sleep(config.settle).await;
    verify_alive(partial)
}

fn verify_alive(partial: &mut PartialEnv) -> Result<()> {
    let all = partial
        .scheduler
        .iter_mut()
        .chain(partial.workers.iter_mut())
        .chain(partial.rendezvous_process.iter_mut());

    for process in all {
        if !process.is_running() {
            return Err(Error::Launch {
                role: process.role().to_string(),
                source: ProcessError::Io(std::io::Error::other(
                    "process exited during startup",
                )),
            });
        }
    }
    Ok(())
}

/// Shared teardown path for both orderly shutdown and startup rollback.
/// Order: rendezvous server, coordination file, workers, scheduler.
async fn teardown(
    rendezvous_process: Option<ManagedProcess>,
    token: Option<RendezvousToken>,
    mut workers: Vec<ManagedProcess>,
    scheduler: Option<ManagedProcess>,
    settle: Duration,
) {
    let had_rendezvous = rendezvous_process.is_some() || token.is_some();
    if let Some(mut process) = rendezvous_process {
        process.terminate().await;
    }
    if let Some(token) = token {
        token.remove().await;
    }
    if had_rendezvous {
        tokio::time::sleep(settle).await;
    }

    for worker in workers.iter_mut() {
        worker.terminate().await;
    }
    if !workers.is_empty() {
        tokio::time::sleep(settle).await;
    }

    if let Some(mut scheduler) = scheduler {
        scheduler.terminate().await;
    }
}
