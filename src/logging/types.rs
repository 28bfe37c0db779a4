//! Core logging types: task entries, status, and the [`Log`] trait.

/// Per-tool result for summary reporting.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Tool (or task) name.
    pub name: String,
    /// Final status.
    pub status: TaskStatus,
    /// Optional detail message (skip reason, warning, or error description).
    pub message: Option<String>,
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully.
    Ok,
    /// Task completed but recorded non-fatal warnings.
    Warn,
    /// Task was skipped (tool already present, nothing to do).
    Skipped,
    /// Task ran in dry-run mode; no changes were applied.
    DryRun,
    /// Task encountered an error and could not complete.
    Failed,
}

impl TaskStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 5] = [Self::Ok, Self::Warn, Self::Skipped, Self::DryRun, Self::Failed];

    /// Summary marker.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Warn => "!",
            Self::Skipped => "○",
            Self::DryRun => "~",
            Self::Failed => "✗",
        }
    }

    /// ANSI color for the summary line.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Ok => "\x1b[32m",
            Self::Warn => "\x1b[33m",
            Self::Skipped => "\x1b[2m",
            Self::DryRun => "\x1b[37m",
            Self::Failed => "\x1b[31m",
        }
    }

    /// Word used in the totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "with warnings",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }
}

/// Abstraction over logging backends.
///
/// Task code logs through `&dyn Log` so tests can substitute a recorder.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
