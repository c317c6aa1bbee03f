use std::path::PathBuf;

use serde::Deserialize;

/// Host-level settings the supervisor consumes: where the server binary
/// lives and where per-run logs go.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory per-run log files are written to.
    pub log_dir: PathBuf,
    /// Install folder of the server executable; also the working directory
    /// of every launched instance.
    pub server_folder: PathBuf,
    /// Executable name inside `server_folder`.
    pub server_executable: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            server_folder: PathBuf::from("./server"),
            server_executable: default_executable(),
        }
    }
}

#[cfg(target_os = "windows")]
fn default_executable() -> String {
    "server.exe".to_string()
}

#[cfg(not(target_os = "windows"))]
fn default_executable() -> String {
    "server".to_string()
}

#[derive(Deserialize, Debug, Default)]
struct FileSettings {
    server: Option<ServerSection>,
    logs: Option<LogsSection>,
}

#[derive(Deserialize, Debug)]
struct ServerSection {
    folder: Option<PathBuf>,
    executable: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LogsSection {
    dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `config/global.toml`, falling back to defaults
    /// for anything absent, then apply `GRID_*` environment overrides.
    pub fn load() -> Self {
        let s = std::fs::read_to_string("config/global.toml").unwrap_or_default();
        let file: FileSettings = toml::from_str(&s).unwrap_or_default();
        let mut settings = Self::merge(file);

        if let Ok(dir) = std::env::var("GRID_LOG_DIR") {
            settings.log_dir = PathBuf::from(dir);
        }
        if let Ok(folder) = std::env::var("GRID_SERVER_FOLDER") {
            settings.server_folder = PathBuf::from(folder);
        }
        if let Ok(executable) = std::env::var("GRID_SERVER_EXECUTABLE") {
            settings.server_executable = executable;
        }

        settings
    }

    fn merge(file: FileSettings) -> Self {
        let defaults = Self::default();
        let server = file.server;
        Self {
            log_dir: file
                .logs
                .and_then(|l| l.dir)
                .unwrap_or(defaults.log_dir),
            server_folder: server
                .as_ref()
                .and_then(|s| s.folder.clone())
                .unwrap_or(defaults.server_folder),
            server_executable: server
                .and_then(|s| s.executable)
                .unwrap_or(defaults.server_executable),
        }
    }
}
