//! # dasklaunch
//!
//! Launch a single-node Dask cluster and fan a work module out to its workers.
//!
//! ```bash
//! dasklaunch --module hello -n 4 --rendezvous
//! ```
//!
//! ## Modules
//!
//! - `cluster` - Cluster environment lifecycle: ordered startup, readiness
//!   probing, and leak-free teardown of the scheduler, workers, and the
//!   optional rendezvous server
//! - `config` - Launch configuration with CLI and TOML file sources
//! - `dispatch` - Work-module registry and the client fan-out to workers
//! - `driver` - Top-level launch/dispatch/teardown orchestration
//! - `subprocess` - Unified subprocess abstraction layer for testing

pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod subprocess;

pub use error::{Error, Result};
