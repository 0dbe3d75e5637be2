use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use dasklaunch::config::LaunchConfig;
use dasklaunch::dispatch::JobRegistry;
use dasklaunch::subprocess::SubprocessManager;

/// Launch a single-node Dask cluster and fan a work module out to its workers
#[derive(Parser)]
#[command(name = "dasklaunch")]
#[command(about = "Dask cluster launcher", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Name of the registered work module to execute
    #[arg(short, long)]
    module: Option<String>,

    /// Number of dask workers to launch
    #[arg(short = 'n', long)]
    n_workers: Option<usize>,

    /// Scheduler host or IP handed to workers
    #[arg(long)]
    sched_host: Option<String>,

    /// Port for the dask scheduler
    #[arg(long)]
    sched_port: Option<u16>,

    /// Port for the bokeh dashboard
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Launch an ompi-server rendezvous alongside the cluster
    #[arg(short, long)]
    rendezvous: bool,

    /// Override for the coordination file path
    #[arg(long)]
    rendezvous_uri: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<LaunchConfig> {
        let mut config = match &self.config {
            Some(path) => LaunchConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => LaunchConfig::default(),
        };

        if let Some(module) = self.module {
            config.module = Some(module);
        }
        if let Some(n_workers) = self.n_workers {
            config.n_workers = n_workers;
        }
        if let Some(sched_host) = self.sched_host {
            config.sched_host = sched_host;
        }
        if let Some(sched_port) = self.sched_port {
            config.sched_port = sched_port;
        }
        if let Some(dashboard_port) = self.dashboard_port {
            config.dashboard_port = dashboard_port;
        }
        if self.rendezvous {
            config.rendezvous = true;
        }
        if let Some(rendezvous_uri) = self.rendezvous_uri {
            config.rendezvous_uri = Some(rendezvous_uri);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    let result = run(cli).await;
    if let Err(e) = result {
        error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    let registry = JobRegistry::with_defaults();
    let subprocess = SubprocessManager::production();
    dasklaunch::driver::run(&config, &subprocess, &registry).await?;
    Ok(())
}
