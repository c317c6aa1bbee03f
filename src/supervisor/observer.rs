//! Per-instance exit observation and cleanup.

use std::fs::File;
use std::sync::Arc;

use tokio::process::Child;

use super::registry::InstanceRegistry;

/// Wait for one server process to exit, then deregister it and close its
/// log file.
///
/// Spawned as a detached task at launch; each launch produces exactly one
/// observer, and the observer is the only place registry rows are removed.
/// This holds whether the process exited on its own or was killed through
/// `stop_instance`, so there is a single writer for removal.
pub(crate) async fn observe_process(
    mut child: Child,
    pid: u32,
    logfile: File,
    registry: Arc<InstanceRegistry>,
) {
    match child.wait().await {
        Ok(status) if !status.success() => {
            tracing::error!("Instance with pid {} exited abnormally: {}", pid, status);
        }
        Ok(status) => {
            tracing::info!("Instance with pid {} exited with {}", pid, status);
        }
        Err(e) => {
            tracing::error!("Error waiting for instance with pid {}: {}", pid, e);
        }
    }

    match registry.remove(pid) {
        Ok(Some(instance)) => {
            tracing::info!("Instance '{}' removed (pid: {})", instance.name, pid);
        }
        Ok(None) => {
            tracing::warn!("No registered instance for exited pid {}", pid);
        }
        Err(e) => {
            tracing::error!("Failed to deregister instance with pid {}: {}", pid, e);
        }
    }

    // All writers are gone once the process has exited; flush and let the
    // drop close the handle.
    if let Err(e) = logfile.sync_all() {
        tracing::error!("Error closing log file for pid {}: {}", pid, e);
    }
}
