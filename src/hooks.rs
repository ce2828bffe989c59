//! Post-generation hooks.
//!
//! Every regular file in the source's `hooks/` directory is run once, in file
//! name order, after the destination has been written. A hook receives the
//! destination's absolute path as its only argument and the merged values as
//! JSON on stdin.

use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Lists the hooks to run, in execution order.
///
/// Directories and hidden files are skipped. A missing `hooks_root` yields no
/// hooks.
pub fn get_hook_files<P: AsRef<Path>>(hooks_root: P) -> Result<Vec<PathBuf>> {
    let hooks_root = hooks_root.as_ref();
    if !hooks_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut hooks = Vec::new();
    for entry in std::fs::read_dir(hooks_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        hooks.push(entry.path());
    }
    hooks.sort();
    Ok(hooks)
}

fn hook_name(hook: &Path) -> String {
    hook.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Fails when the hook has no execute permission at all.
#[cfg(unix)]
fn ensure_executable(hook: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(hook)?.permissions().mode();
    if mode & 0o111 == 0 {
        return Err(Error::HookExecutionError {
            hook: hook_name(hook),
            reason: "file is not executable".to_string(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_hook: &Path) -> Result<()> {
    Ok(())
}

/// Runs a single hook and logs its output line by line.
///
/// # Errors
/// * `Error::HookExecutionError` if the hook is not executable, cannot be
///   started or exits unsuccessfully
pub fn run_hook<P: AsRef<Path>>(
    hook: P,
    destination: &Path,
    values: &serde_json::Value,
) -> Result<()> {
    let hook = hook.as_ref();
    let name = hook_name(hook);
    let hook_error = |reason: String| Error::HookExecutionError {
        hook: name.clone(),
        reason,
    };

    ensure_executable(hook)?;
    info!("Running hook '{name}'.");

    let mut child = Command::new(hook)
        .arg(destination)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| hook_error(format!("cannot start: {e}")))?;

    // Hooks may fill their output pipes before reading stdin.
    let writer = child.stdin.take().map(|mut stdin| {
        let payload = values.to_string();
        std::thread::spawn(move || stdin.write_all(payload.as_bytes()))
    });

    let output = child
        .wait_with_output()
        .map_err(|e| hook_error(e.to_string()))?;

    if let Some(Ok(Err(e))) = writer.map(|handle| handle.join()) {
        // Hooks are free to exit without draining stdin.
        if e.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(hook_error(format!("cannot write values: {e}")));
        }
    }

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        info!("{name}: {line}");
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        warn!("{name}: {line}");
    }

    if !output.status.success() {
        return Err(hook_error(format!("exited with {}", output.status)));
    }
    Ok(())
}

/// Runs every hook under `hooks_root` against the destination.
pub fn run_hooks<P: AsRef<Path>>(
    hooks_root: P,
    destination: &Path,
    values: &serde_json::Value,
) -> Result<()> {
    let hooks = get_hook_files(&hooks_root)?;
    if hooks.is_empty() {
        debug!("No hooks in {}", hooks_root.as_ref().display());
    }
    for hook in hooks {
        run_hook(&hook, destination, values)?;
    }
    Ok(())
}
