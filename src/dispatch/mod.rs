//! Work-module dispatch.
//!
//! The registry resolves a module name to a concrete job before anything is
//! launched; the dispatcher fans the job out to every worker through the
//! Dask client channel.

pub mod client;
pub mod registry;

pub use client::{PythonClientDispatcher, WorkDispatcher};
pub use registry::{JobRegistry, JobSpec};
