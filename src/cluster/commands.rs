//! Command lines for the cluster processes.
//!
//! These are interop-sensitive: the flags must match what the real
//! `dask-scheduler`, `dask-worker`, and `ompi-server` binaries accept.

use std::path::Path;

use crate::config::LaunchConfig;
use crate::subprocess::{ProcessCommand, ProcessCommandBuilder};

pub const SCHEDULER_PROGRAM: &str = "dask-scheduler";
pub const WORKER_PROGRAM: &str = "dask-worker";
pub const RENDEZVOUS_PROGRAM: &str = "ompi-server";

pub fn scheduler_command(config: &LaunchConfig) -> ProcessCommand {
    ProcessCommandBuilder::new(SCHEDULER_PROGRAM)
        .arg("--port")
        .arg(config.sched_port.to_string())
        .arg("--bokeh")
        .arg("--bokeh-port")
        .arg(config.dashboard_port.to_string())
        .build()
}

/// Each worker is pinned to a single process and thread with an automatic
/// memory limit, and named by its ordinal index.
pub fn worker_command(config: &LaunchConfig, index: usize) -> ProcessCommand {
    ProcessCommandBuilder::new(WORKER_PROGRAM)
        .arg(config.scheduler_addr())
        .arg("--memory-limit=auto")
        .arg("--nprocs=1")
        .arg("--nthreads=1")
        .arg("--bokeh-port")
        .arg(config.dashboard_port.to_string())
        .arg("--name")
        .arg(index.to_string())
        .build()
}

pub fn rendezvous_command(token_path: &Path) -> ProcessCommand {
    ProcessCommandBuilder::new(RENDEZVOUS_PROGRAM)
        .arg("--no-daemonize")
        .arg("-r")
        .arg(token_path.to_string_lossy())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn scheduler_flags() {
        let cmd = scheduler_command(&LaunchConfig::default());
        assert_eq!(cmd.program, "dask-scheduler");
        assert_eq!(
            cmd.args,
            vec!["--port", "8787", "--bokeh", "--bokeh-port", "8888"]
        );
    }

    #[test]
    fn worker_flags_carry_ordinal_name() {
        let cmd = worker_command(&LaunchConfig::default(), 3);
        assert_eq!(cmd.program, "dask-worker");
        assert_eq!(cmd.args[0], "localhost:8787");
        assert!(cmd.args.contains(&"--memory-limit=auto".to_string()));
        assert!(cmd.args.contains(&"--nprocs=1".to_string()));
        assert!(cmd.args.contains(&"--nthreads=1".to_string()));
        let name_pos = cmd.args.iter().position(|a| a == "--name").unwrap();
        assert_eq!(cmd.args[name_pos + 1], "3");
    }

    #[test]
    fn rendezvous_flags() {
        let cmd = rendezvous_command(&PathBuf::from("ompi.server.uri.test"));
        assert_eq!(cmd.program, "ompi-server");
        assert_eq!(cmd.args, vec!["--no-daemonize", "-r", "ompi.server.uri.test"]);
    }
}
