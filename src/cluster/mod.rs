//! Cluster environment lifecycle.
//!
//! Ordered startup of scheduler, workers, and the optional rendezvous
//! server; readiness probing between phases; strictly ordered teardown that
//! reclaims every spawned process and the coordination file.

pub mod commands;
pub mod env;
pub mod readiness;
pub mod rendezvous;

pub use env::{ClusterEnv, ManagedProcess, Role};
pub use rendezvous::RendezvousToken;
