//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are also written to a persistent log file at
/// `$XDG_CACHE_HOME/provision/<command>.log` (default
/// `~/.cache/provision/<command>.log`) with ANSI codes stripped.
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// The log file itself is created by
    /// [`init_subscriber`](super::subscriber::init_subscriber); this only
    /// remembers its path for the summary.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded task entries.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "provision::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only when verbose, always in the file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "provision::dry_run", "{msg}");
    }

    /// Record a task result for the summary.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Tools whose task failed, in the order they ran.
    #[must_use]
    pub fn failed_tools(&self) -> Vec<String> {
        self.task_entries()
            .into_iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .map(|t| t.name)
            .collect()
    }

    /// Count the number of failed tasks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed_tools().len()
    }

    /// Print one line per tool, then the totals and the log location.
    pub fn print_summary(&self) {
        let entries = self.task_entries();
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for entry in &entries {
            let detail = entry
                .message
                .as_deref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!(
                "{}{} {}{detail}{RESET}",
                entry.status.color(),
                entry.status.glyph(),
                entry.name
            ));
        }

        println!();
        self.info(&totals(&entries));
        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}{RESET}", path.display()));
        }
    }
}

const RESET: &str = "\x1b[0m";

/// `3 tools: 2 ok, 1 failed`, omitting empty categories.
fn totals(entries: &[TaskEntry]) -> String {
    let parts: Vec<String> = TaskStatus::ALL
        .iter()
        .filter_map(|&status| {
            let n = entries.iter().filter(|e| e.status == status).count();
            (n > 0).then(|| format!("{}{n} {}{RESET}", status.color(), status.label()))
        })
        .collect();
    let noun = if entries.len() == 1 { "tool" } else { "tools" };
    format!("{} {noun}: {}", entries.len(), parts.join(", "))
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.record_task(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use crate::logging::utils::strip_ansi;
    use std::fs;

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.task_entries().is_empty(), "expected empty task list");
    }

    #[test]
    fn record_task_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("docker", TaskStatus::Skipped, Some("already installed"));
        let tasks = log.task_entries();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "docker");
        assert_eq!(tasks[0].message, Some("already installed".to_string()));
    }

    #[test]
    fn failure_count_ignores_warnings() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record_task("a", TaskStatus::Ok, None);
        log.record_task("b", TaskStatus::Warn, Some("verify failed"));
        log.record_task("c", TaskStatus::Failed, Some("error 1"));
        log.record_task("d", TaskStatus::Failed, Some("error 2"));
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn failed_tools_keep_run_order() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("kubectl", TaskStatus::Failed, Some("unknown tool 'kubectl'"));
        log.record_task("java", TaskStatus::Ok, None);
        log.record_task("docker", TaskStatus::Failed, None);
        assert_eq!(log.failed_tools(), ["kubectl", "docker"]);
    }

    #[test]
    fn totals_omit_empty_categories() {
        let entry = |name: &str, status| TaskEntry {
            name: name.to_string(),
            status,
            message: None,
        };
        let line = totals(&[
            entry("java", TaskStatus::Ok),
            entry("docker", TaskStatus::Failed),
            entry("rust", TaskStatus::Ok),
        ]);
        assert_eq!(strip_ansi(&line), "3 tools: 2 ok, 1 failed");
        assert_eq!(
            strip_ansi(&totals(&[entry("maven", TaskStatus::DryRun)])),
            "1 tool: 1 dry-run"
        );
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record_task("via-trait", TaskStatus::Ok, None);
        assert_eq!(log.task_entries().len(), 1);
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should exist once the layer is set up");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn stage_and_dry_run_are_tagged_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Installing terraform");
        log.dry_run("would run: apt-get install -y terraform");
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("==> Installing terraform"));
        assert!(contents.contains("[dry run] would run: apt-get install -y terraform"));
    }

    #[test]
    fn warn_and_error_are_tagged_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("refresh failed");
        log.error("install failed");
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[warn] refresh failed"));
        assert!(contents.contains("[error] install failed"));
    }

    #[test]
    fn summary_strips_ansi_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("maven", TaskStatus::Ok, None);
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("✓ maven"));
        assert!(!contents.contains("\x1b["), "ANSI codes must be stripped");
    }
}
