//! The coordination file handoff.
//!
//! The rendezvous server writes its connection address as a single line into
//! a well-known file. The lifecycle manager reads that file exactly once
//! after the file-readiness probe, and deletes it during teardown.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RendezvousToken {
    path: PathBuf,
}

impl RendezvousToken {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the rendezvous address from the coordination file.
    ///
    /// Exactly one trailing newline is removed; the rest of the content is
    /// returned verbatim. An absent or empty file is a discovery failure.
    pub async fn read_address(&self) -> Result<String> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::RendezvousDiscovery(format!(
                "cannot read coordination file {}: {e}",
                self.path.display()
            ))
        })?;

        let address = match contents.strip_suffix('\n') {
            Some(stripped) => stripped.to_string(),
            None => contents,
        };

        if address.is_empty() {
            return Err(Error::RendezvousDiscovery(format!(
                "coordination file {} is empty",
                self.path.display()
            )));
        }
        Ok(address)
    }

    /// Delete the coordination file. An already-missing file is tolerated.
    pub async fn remove(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("Removed coordination file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Coordination file {} already removed",
                    self.path.display()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to remove coordination file {}: {e}",
                    self.path.display()
                );
            }
        }
    }
}
