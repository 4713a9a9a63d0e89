use thiserror::Error;

/// Rejected schedule input. These fail fast at the editor boundary; nothing
/// downstream of a constructed schedule can produce them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("day of week must be 0-6 (0 = Sunday), got {0}")]
    InvalidDay(u8),

    #[error("time of day must be zero-padded HH:MM, got '{0}'")]
    InvalidTime(String),

    #[error("interval step must be at least one minute")]
    InvalidStep,

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
}
