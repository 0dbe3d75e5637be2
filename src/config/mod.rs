//! Launch configuration.
//!
//! Defaults mirror the CLI surface: scheduler on `localhost:8787`, dashboard
//! on 8888, eight workers, rendezvous disabled. A TOML file can provide a
//! base configuration; CLI flags override individual fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_SCHED_PORT: u16 = 8787;
pub const DEFAULT_DASHBOARD_PORT: u16 = 8888;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_SCHED_HOST: &str = "localhost";

/// Base name of the coordination file written by the rendezvous server.
/// The default token path appends a per-run unique suffix so concurrent
/// runs sharing a working directory cannot clobber each other.
pub const RENDEZVOUS_URI_BASE: &str = "ompi.server.uri";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// Scheduler host or IP handed to workers and the client.
    pub sched_host: String,

    /// Scheduler listen port.
    pub sched_port: u16,

    /// Port for the bokeh dashboard.
    pub dashboard_port: u16,

    /// Number of worker processes to launch.
    pub n_workers: usize,

    /// Name of the registered work module to dispatch. Mandatory for
    /// dispatch; validated before any process is launched.
    pub module: Option<String>,

    /// Launch an ompi-server rendezvous alongside the cluster.
    pub rendezvous: bool,

    /// Override for the coordination file path.
    pub rendezvous_uri: Option<PathBuf>,

    /// Pause between teardown steps, and final stabilization pause at the
    /// end of startup.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,

    /// Upper bound on each readiness probe.
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,

    /// Initial probe backoff step; doubles up to a fixed cap.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Upper bound on the client dispatch call.
    #[serde(with = "humantime_serde")]
    pub dispatch_timeout: Option<Duration>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            sched_host: DEFAULT_SCHED_HOST.to_string(),
            sched_port: DEFAULT_SCHED_PORT,
            dashboard_port: DEFAULT_DASHBOARD_PORT,
            n_workers: DEFAULT_WORKERS,
            module: None,
            rendezvous: false,
            rendezvous_uri: None,
            settle: Duration::from_secs(2),
            ready_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            dispatch_timeout: None,
        }
    }
}

impl LaunchConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LaunchConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sched_port == 0 {
            return Err(Error::Config("scheduler port must be non-zero".into()));
        }
        if self.dashboard_port == 0 {
            return Err(Error::Config("dashboard port must be non-zero".into()));
        }
        if self.ready_timeout.is_zero() {
            return Err(Error::Config("ready_timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// `host:port` address of the scheduler.
    pub fn scheduler_addr(&self) -> String {
        format!("{}:{}", self.sched_host, self.sched_port)
    }

    /// Coordination file path for this run. Unless overridden, the name is
    /// unique per run.
    pub fn token_path(&self, run_id: &str) -> PathBuf {
        match &self.rendezvous_uri {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("{RENDEZVOUS_URI_BASE}.{run_id}")),
        }
    }
}
