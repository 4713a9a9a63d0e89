mod compiler;
mod types;

pub use compiler::{compile, compile_joined, expand_interval, validate_cron_field};
pub use types::{Day, ScheduleMap, TimeOfDay};
