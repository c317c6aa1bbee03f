//! Fire-and-forget hook scripts run around server start.

use std::fs::File;
use std::path::Path;
use std::process::Stdio;

/// Start a hook script without waiting for it to finish.
///
/// The script receives the server process id as its only argument (`"0"`
/// when invoked before the server exists) and runs from its own directory,
/// with stdout and stderr appended to the instance log file. Hook scripts
/// are operator conveniences: every failure is logged and swallowed, and
/// must not abort the start sequence.
pub(crate) fn run_script(script_path: &str, process_id: u32, logfile: &File) {
    let (stdout, stderr) = match (logfile.try_clone(), logfile.try_clone()) {
        (Ok(out), Ok(err)) => (out, err),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(
                "Error duplicating log handle for script '{}': {}",
                script_path,
                e
            );
            return;
        }
    };

    let script = Path::new(script_path);
    let mut cmd = crate::utils::detached_command(script);
    cmd.arg(process_id.to_string())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    if let Some(dir) = script.parent().filter(|p| !p.as_os_str().is_empty()) {
        cmd.current_dir(dir);
    }

    match cmd.spawn() {
        Ok(mut child) => {
            tracing::debug!("Run script '{}' (process_id: {})", script_path, process_id);
            let script_path = script_path.to_string();
            tokio::spawn(async move {
                match child.wait().await {
                    Ok(status) if !status.success() => {
                        tracing::warn!("Script '{}' exited with {}", script_path, status);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Failed to wait for script '{}': {}", script_path, e);
                    }
                }
            });
        }
        Err(e) => {
            tracing::error!(
                "Error starting script '{}' (process_id: {}): {}",
                script_path,
                process_id,
                e
            );
        }
    }
}
