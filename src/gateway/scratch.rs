use parking_lot::Mutex;
use std::path::PathBuf;
use uuid::Uuid;

use crate::gateway::error::GatewayError;

/// Scoped owner of the temporary files backing one request's in-memory
/// payloads.
///
/// Every acquired path is removed exactly once: `release_all` covers the
/// normal return and error paths, and `Drop` is the backstop for requests
/// cancelled mid-pipeline (the future is dropped, the files still go).
/// Names are uuid-based, so concurrent requests never contend over the
/// same scratch root.
pub struct ScratchSpace {
    root: PathBuf,
    files: Mutex<Vec<PathBuf>>,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Reserve a fresh uniquely-named path under the scratch root. The path
    /// is tracked for release from this point on, whether or not anything
    /// gets written to it.
    pub fn acquire(&self, suffix: &str) -> PathBuf {
        let path = self.root.join(format!("{}{}", Uuid::new_v4(), suffix));
        self.files.lock().push(path.clone());
        path
    }

    /// Acquire a path and write `bytes` to it.
    pub async fn materialize(&self, suffix: &str, bytes: Vec<u8>) -> Result<PathBuf, GatewayError> {
        let path = self.acquire(suffix);
        tokio::fs::write(&path, bytes).await.map_err(|err| {
            GatewayError::Internal(format!(
                "failed to write scratch file {}: {}",
                path.display(),
                err
            ))
        })?;
        Ok(path)
    }

    /// Number of files currently tracked for release.
    pub fn tracked(&self) -> usize {
        self.files.lock().len()
    }

    /// Remove every tracked file. Idempotent, and deletion failures are
    /// logged instead of propagated so cleanup can never mask the request
    /// outcome.
    pub async fn release_all(&self) {
        let files: Vec<PathBuf> = self.files.lock().drain(..).collect();
        for path in files {
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove scratch file {}: {}", path.display(), err);
                }
            }
        }
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        // Synchronous fallback: runs when a request is aborted before
        // release_all, e.g. on transport disconnect.
        for path in self.files.get_mut().drain(..) {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove scratch file {}: {}", path.display(), err);
                }
            }
        }
    }
}
