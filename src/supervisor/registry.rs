//! In-memory registry of running server instances. Single source of truth
//! for what is alive right now: rows are appended after a successful OS
//! process start and removed only by the instance's exit observer.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::error::SupervisorError;

/// Bookkeeping row for one running server process.
///
/// The OS process handle and the open log file handle are not stored here;
/// they are owned by the instance's exit observer task, which waits on the
/// process and closes the log file when it goes away.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    pub pid: u32,
    pub name: String,
    pub configuration_id: i64,
    /// Unix timestamp (seconds) of registration.
    pub started_at: u64,
}

impl Instance {
    pub fn new(pid: u32, name: &str, configuration_id: i64) -> Self {
        Self {
            pid,
            name: name.to_string(),
            configuration_id,
            started_at: current_timestamp(),
        }
    }
}

/// Mutex-guarded, ordered set of running instances.
///
/// The lock covers only the short registry mutations (append, lookup,
/// compaction-removal), never process control or file I/O.
pub struct InstanceRegistry {
    instances: Mutex<Vec<Instance>>,
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self {
            instances: Mutex::new(Vec::new()),
        }
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Instance>>, SupervisorError> {
        self.instances.lock().map_err(|e| {
            tracing::error!("InstanceRegistry lock poisoned: {}", e);
            SupervisorError::LockPoisoned
        })
    }

    /// Append a freshly started instance.
    pub fn register(&self, instance: Instance) -> Result<(), SupervisorError> {
        let mut instances = self.lock()?;
        tracing::info!(
            "Now tracking instance '{}' with pid: {}",
            instance.name,
            instance.pid
        );
        instances.push(instance);
        Ok(())
    }

    /// Remove the row with the given pid, returning it. `None` when no such
    /// row exists.
    pub fn remove(&self, pid: u32) -> Result<Option<Instance>, SupervisorError> {
        let mut instances = self.lock()?;
        match instances.iter().position(|i| i.pid == pid) {
            Some(pos) => Ok(Some(instances.remove(pos))),
            None => Ok(None),
        }
    }

    /// Whether a row with the given pid is registered.
    pub fn contains(&self, pid: u32) -> Result<bool, SupervisorError> {
        let instances = self.lock()?;
        Ok(instances.iter().any(|i| i.pid == pid))
    }

    /// Snapshot of all rows at the moment of the call. Safe to enumerate
    /// while starts and exits mutate the registry concurrently.
    pub fn snapshot(&self) -> Vec<Instance> {
        match self.lock() {
            Ok(instances) => instances.clone(),
            Err(_) => Vec::new(),
        }
    }
}

/// Force-kill a process by pid. Cross-platform.
pub(crate) fn force_kill(pid: u32) -> Result<(), SupervisorError> {
    tracing::info!("Sending KILL signal to pid {}", pid);

    #[cfg(target_os = "windows")]
    {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
        use winapi::um::winnt::PROCESS_TERMINATE;

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if handle.is_null() {
                return Err(SupervisorError::TerminationFailed {
                    reason: format!("failed to open process {}", pid),
                });
            }

            let result = TerminateProcess(handle, 1);
            CloseHandle(handle);

            if result == 0 {
                return Err(SupervisorError::TerminationFailed {
                    reason: "TerminateProcess failed".to_string(),
                });
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            return Err(SupervisorError::TerminationFailed {
                reason: format!("failed to send signal: {}", e),
            });
        }
    }

    Ok(())
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
