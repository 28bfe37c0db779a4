//! Post-install version check.
use std::path::PathBuf;

use crate::error::VerifyError;
use crate::exec::{Executor, command_line};

/// Locate `program` in `extra` directories (a fragment's PATH prepends)
/// without consulting the process `PATH`.
#[must_use]
pub fn locate_in(program: &str, extra: &[PathBuf]) -> Option<PathBuf> {
    if extra.is_empty() {
        return None;
    }
    let paths = std::env::join_paths(extra).ok()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    which::which_in(program, Some(paths), cwd).ok()
}

/// Whether `program` is reachable on `PATH` or in `extra`.
#[must_use]
pub fn is_present(executor: &dyn Executor, program: &str, extra: &[PathBuf]) -> bool {
    locate_in(program, extra).is_some() || executor.which(program)
}

/// Run `command` (e.g. `terraform version`) and return the first line of
/// its output.
///
/// The program is searched in `extra` first, then on the process `PATH`.
///
/// # Errors
///
/// Returns [`VerifyError::NotFound`] when the program cannot be located and
/// [`VerifyError::Failed`] when it cannot run or exits non-zero.
pub fn verify(executor: &dyn Executor, command: &str, extra: &[PathBuf]) -> Result<String, VerifyError> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(VerifyError::NotFound {
            program: String::new(),
        });
    };
    let args: Vec<&str> = parts.collect();

    let resolved = match locate_in(program, extra) {
        Some(path) => path.display().to_string(),
        None if executor.which(program) => program.to_string(),
        None => {
            return Err(VerifyError::NotFound {
                program: program.to_string(),
            });
        }
    };

    let failed = |exit_code| VerifyError::Failed {
        command: command_line(program, &args),
        exit_code,
    };
    let result = executor
        .run_unchecked(&resolved, &args)
        .map_err(|_| failed(-1))?;
    if !result.success {
        return Err(failed(result.code.unwrap_or(-1)));
    }
    Ok(result.first_line().unwrap_or_default().to_string())
}

/// Human-readable search order for log messages.
#[must_use]
pub fn describe_search(extra: &[PathBuf]) -> String {
    if extra.is_empty() {
        "PATH".to_string()
    } else {
        let dirs: Vec<String> = extra.iter().map(|p| p.display().to_string()).collect();
        format!("{} then PATH", dirs.join(":"))
    }
}
