use croner::Cron;

use crate::error::ScheduleError;
use crate::schedule::types::{Day, ScheduleMap, TimeOfDay};

/// Compile a weekly calendar into 5-field cron expressions, one per
/// (day, time) pair: `"<MM> <HH> * * <D>"`.
///
/// The two-character halves of each time are emitted verbatim, so `08:00` on
/// Monday becomes `"00 08 * * 1"`. A pure function of the map; compiling the
/// same calendar twice yields the same sequence in the same order.
pub fn compile(schedule: &ScheduleMap) -> Vec<String> {
    let mut crons = Vec::with_capacity(schedule.total_slots());
    for (day, times) in schedule.iter() {
        for time in times {
            crons.push(format!("{} {} * * {}", time.mm(), time.hh(), day));
        }
    }
    crons
}

/// Join the compiled expressions into the single `cron` string stored on a
/// monitored API. Parsing a free-form cron string back into a calendar is
/// deliberately unsupported; the string is richer than the calendar editor.
pub fn compile_joined(schedule: &ScheduleMap) -> String {
    compile(schedule).join(";")
}

/// Expand an interval description into a calendar: every `step_minutes` from
/// `start` to `end` inclusive, the same time list on every requested day.
///
/// A start past the end produces the requested days with empty lists, not an
/// error. A step of zero is rejected up front rather than looping forever.
pub fn expand_interval(
    start: &TimeOfDay,
    end: &TimeOfDay,
    step_minutes: u32,
    days: &[Day],
) -> Result<ScheduleMap, ScheduleError> {
    if step_minutes == 0 {
        return Err(ScheduleError::InvalidStep);
    }

    let end_minutes = end.minutes_since_midnight();
    let mut times = Vec::new();
    let mut cursor = start.minutes_since_midnight();
    while cursor <= end_minutes {
        // A slot at or past hour 24 is dropped, never wrapped to the next day.
        if let Some(time) = TimeOfDay::from_minutes(cursor) {
            times.push(time);
        }
        cursor += step_minutes;
    }

    let mut schedule = ScheduleMap::new();
    for &day in days {
        schedule.set_day(day, times.clone());
    }
    Ok(schedule)
}

/// Validate a hand-typed cron field: one or more `;`-joined expressions.
pub fn validate_cron_field(field: &str) -> Result<(), ScheduleError> {
    for expr in field.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        Cron::new(expr)
            .parse()
            .map_err(|e| ScheduleError::InvalidCron {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}
