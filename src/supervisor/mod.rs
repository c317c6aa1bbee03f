//! Instance supervision: start, stop, and enumerate dedicated-server
//! processes on this host.

pub mod error;
pub mod registry;

mod observer;
mod script;

use std::fs::{self, File};
use std::io;
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::configuration::{ConfigurationMaterializer, ConfigurationStore};
use error::SupervisorError;
use registry::{Instance, InstanceRegistry};

/// Orchestrates the life cycle of server instances.
///
/// Owns the registry of running processes; configuration resolution and
/// materialization are delegated to the injected collaborators.
pub struct Supervisor {
    settings: Settings,
    store: Arc<dyn ConfigurationStore>,
    materializer: Arc<dyn ConfigurationMaterializer>,
    registry: Arc<InstanceRegistry>,
}

impl Supervisor {
    pub fn new(
        settings: Settings,
        store: Arc<dyn ConfigurationStore>,
        materializer: Arc<dyn ConfigurationMaterializer>,
    ) -> Self {
        Self {
            settings,
            store,
            materializer,
            registry: Arc::new(InstanceRegistry::new()),
        }
    }

    /// Snapshot of all currently running instances.
    pub fn get_all_instances(&self) -> Vec<Instance> {
        self.registry.snapshot()
    }

    /// Start a new server instance from the given configuration.
    ///
    /// Sequencing: validate, ensure the log folder, load and materialize
    /// the configuration, create the per-run log file, run the pre-start
    /// hook, spawn the server, run the post-start hook, register, then
    /// spawn the exit observer. Each stage failure aborts with its own
    /// error kind; files created by earlier stages are left behind.
    ///
    /// The instance becomes visible via [`get_all_instances`] the moment
    /// registration completes, strictly after the OS process started.
    ///
    /// [`get_all_instances`]: Supervisor::get_all_instances
    pub async fn start_instance(
        &self,
        name: &str,
        configuration: i64,
        script_before: &str,
        script_after: &str,
    ) -> Result<(), SupervisorError> {
        let name = name.trim();
        let script_before = script_before.trim();
        let script_after = script_after.trim();

        if name.is_empty() {
            return Err(SupervisorError::InvalidArgument);
        }

        // create log dir
        if let Err(e) = fs::create_dir_all(&self.settings.log_dir) {
            tracing::error!("Error creating server log folder: {}", e);
            return Err(SupervisorError::Directory(e));
        }

        // read config
        let config = self.store.load(configuration).map_err(|e| {
            tracing::error!("Error reading configuration to start instance: {}", e);
            SupervisorError::ConfigurationRead(e)
        })?;

        // write config
        let materialized = self.materializer.write(&config).map_err(|e| {
            tracing::error!("Error writing configuration to start instance: {}", e);
            SupervisorError::ConfigurationWrite(e)
        })?;

        // create log file
        let log_name = log_file_name(Local::now(), config.id, name);
        let logfile = File::create(self.settings.log_dir.join(&log_name)).map_err(|e| {
            tracing::error!("Error creating log file: {}", e);
            SupervisorError::LogFile(e)
        })?;

        // run script before server start (without process id)
        if !script_before.is_empty() {
            script::run_script(script_before, 0, &logfile);
        }

        let (stdout, stderr) = match (logfile.try_clone(), logfile.try_clone()) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Error duplicating log file handle: {}", e);
                return Err(SupervisorError::LogFile(e));
            }
        };

        // run the server from its install folder so it can resolve data
        // files relative to the executable
        let mut cmd = crate::utils::detached_command(
            self.settings.server_folder.join(&self.settings.server_executable),
        );
        cmd.arg("-c")
            .arg(&materialized.config_path)
            .arg("-r")
            .arg(&materialized.roster_path)
            .current_dir(&self.settings.server_folder)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(false);

        let child = cmd.spawn().map_err(|e| {
            tracing::error!("Error starting instance: {}", e);
            SupervisorError::ProcessStart(e)
        })?;

        let pid = match child.id() {
            Some(pid) => pid,
            None => {
                tracing::error!("Spawned server process has no pid");
                return Err(SupervisorError::ProcessStart(io::Error::new(
                    io::ErrorKind::Other,
                    "spawned process has no pid",
                )));
            }
        };

        // run script after server start (with process id)
        if !script_after.is_empty() {
            script::run_script(script_after, pid, &logfile);
        }

        // add instance to the list of running instances; the observer
        // removes it again once the OS reports the process gone
        self.registry.register(Instance::new(pid, name, config.id))?;
        tokio::spawn(observer::observe_process(
            child,
            pid,
            logfile,
            self.registry.clone(),
        ));

        Ok(())
    }

    /// Force-terminate a running instance.
    ///
    /// Best-effort: delivers the kill signal and returns. The registry row
    /// is not removed here; the exit observer deregisters the instance
    /// once the OS actually reports it gone, so callers should poll
    /// [`get_all_instances`] to confirm disappearance.
    ///
    /// [`get_all_instances`]: Supervisor::get_all_instances
    pub fn stop_instance(&self, pid: u32) -> Result<(), SupervisorError> {
        if !self.registry.contains(pid)? {
            return Err(SupervisorError::NotFound { pid });
        }

        // instance is removed from the registry by its exit observer
        registry::force_kill(pid)
    }
}

/// Compose the per-run log file name:
/// `<YYYYMMDD_HHMMSS>_<configuration id>_<instance name>.log`
fn log_file_name(now: DateTime<Local>, configuration_id: i64, name: &str) -> String {
    format!(
        "{}_{}_{}.log",
        now.format("%Y%m%d_%H%M%S"),
        configuration_id,
        name
    )
}
