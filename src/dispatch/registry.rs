//! Registered work modules.
//!
//! Jobs are looked up by name before any process is launched, so an unknown
//! module is a configuration error with zero side effects. This replaces
//! importing arbitrary user-named modules at dispatch time.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A dispatchable unit of work: a Python module and the callable inside it
/// that every worker runs once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub module: String,
    pub callable: String,
}

impl JobSpec {
    pub fn new(name: &str, module: &str, callable: &str) -> Self {
        Self {
            name: name.to_string(),
            module: module.to_string(),
            callable: callable.to_string(),
        }
    }
}

pub struct JobRegistry {
    jobs: BTreeMap<String, JobSpec>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
        }
    }

    /// Registry with the bundled demo jobs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JobSpec::new("hello", "hello", "run"));
        registry.register(JobSpec::new("hello-mpi", "hello_mpi", "run"));
        registry
    }

    pub fn register(&mut self, job: JobSpec) {
        self.jobs.insert(job.name.clone(), job);
    }

    pub fn resolve(&self, name: &str) -> Result<&JobSpec> {
        self.jobs.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
            Error::Config(format!(
                "unknown work module '{name}' (registered: {})",
                known.join(", ")
            ))
        })
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_jobs() {
        let registry = JobRegistry::with_defaults();
        let job = registry.resolve("hello").unwrap();
        assert_eq!(job.module, "hello");
        assert_eq!(job.callable, "run");

        let mpi = registry.resolve("hello-mpi").unwrap();
        assert_eq!(mpi.module, "hello_mpi");
    }

    #[test]
    fn unknown_job_is_a_config_error() {
        let registry = JobRegistry::with_defaults();
        let err = registry.resolve("nope").unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("nope"));
                assert!(msg.contains("hello"));
            }
            other => panic!("Expected Config error, got {other}"),
        }
    }

    #[test]
    fn custom_registration() {
        let mut registry = JobRegistry::new();
        assert!(registry.resolve("bench").is_err());
        registry.register(JobSpec::new("bench", "bench_suite", "main"));
        assert_eq!(
            registry.resolve("bench").unwrap(),
            &JobSpec::new("bench", "bench_suite", "main")
        );
    }
}
