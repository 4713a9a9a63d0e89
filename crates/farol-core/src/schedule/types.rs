use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Day of week, 0 = Sunday through 6 = Saturday.
///
/// Serializes as the bare integer, so schedule maps keep the
/// `{"1": ["08:00"]}` wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Day(u8);

impl Day {
    /// All seven days, Sunday first.
    pub const ALL: [Day; 7] = [Day(0), Day(1), Day(2), Day(3), Day(4), Day(5), Day(6)];

    /// Monday through Friday.
    pub const WEEKDAYS: [Day; 5] = [Day(1), Day(2), Day(3), Day(4), Day(5)];

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "Domingo",
            1 => "Segunda",
            2 => "Terça",
            3 => "Quarta",
            4 => "Quinta",
            5 => "Sexta",
            _ => "Sábado",
        }
    }
}

impl TryFrom<u8> for Day {
    type Error = ScheduleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 6 {
            Ok(Day(value))
        } else {
            Err(ScheduleError::InvalidDay(value))
        }
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> u8 {
        day.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time of day as a zero-padded `HH:MM` 24-hour string, naive local clock.
///
/// `Ord` is lexicographic, which for the zero-padded form is also
/// chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(String);

impl TimeOfDay {
    /// The literal `HH` half, used verbatim by the cron compiler.
    pub fn hh(&self) -> &str {
        &self.0[..2]
    }

    /// The literal `MM` half, used verbatim by the cron compiler.
    pub fn mm(&self) -> &str {
        &self.0[3..]
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        let hour: u32 = self.hh().parse().unwrap_or(0);
        let minute: u32 = self.mm().parse().unwrap_or(0);
        hour * 60 + minute
    }

    /// Build from minutes since midnight. A value landing at or past hour 24
    /// yields `None`; it is dropped rather than wrapped to the next day.
    pub fn from_minutes(total: u32) -> Option<TimeOfDay> {
        let hour = total / 60;
        if hour >= 24 {
            return None;
        }
        Some(Self::from_parts(hour, total % 60))
    }

    // Callers must pass an in-range hour and minute.
    pub(crate) fn from_parts(hour: u32, minute: u32) -> TimeOfDay {
        debug_assert!(hour < 24 && minute < 60);
        TimeOfDay(format!("{hour:02}:{minute:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_hhmm(s) {
            Ok(TimeOfDay(s.to_string()))
        } else {
            Err(ScheduleError::InvalidTime(s.to_string()))
        }
    }
}

fn is_valid_hhmm(s: &str) -> bool {
    let Some((hh, mm)) = s.split_once(':') else {
        return false;
    };
    if hh.len() != 2 || mm.len() != 2 {
        return false;
    }
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (Ok(hour), Ok(minute)) = (hh.parse::<u32>(), mm.parse::<u32>()) else {
        return false;
    };
    hour <= 23 && minute <= 59
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> String {
        time.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weekly calendar: day of week mapped to an ordered list of times.
///
/// Days absent from the map have no scheduled runs. A day may carry an empty
/// list (an interval expansion whose window is empty still names its days).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleMap(BTreeMap<Day, Vec<TimeOfDay>>);

impl ScheduleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot, keeping the day's list sorted. Adding an existing slot is
    /// a no-op; returns whether the slot was inserted.
    pub fn insert_slot(&mut self, day: Day, time: TimeOfDay) -> bool {
        let times = self.0.entry(day).or_default();
        if times.contains(&time) {
            return false;
        }
        times.push(time);
        times.sort();
        true
    }

    /// Remove a slot; the day itself is dropped once its list empties.
    /// Returns whether the slot was present.
    pub fn remove_slot(&mut self, day: Day, time: &TimeOfDay) -> bool {
        let Some(times) = self.0.get_mut(&day) else {
            return false;
        };
        let before = times.len();
        times.retain(|t| t != time);
        let removed = times.len() < before;
        if times.is_empty() {
            self.0.remove(&day);
        }
        removed
    }

    /// Assign a day's full list wholesale, replacing whatever was there.
    pub fn set_day(&mut self, day: Day, times: Vec<TimeOfDay>) {
        self.0.insert(day, times);
    }

    /// Overlay another calendar day-wise: days present in `other` replace
    /// this map's lists, days absent from `other` are kept.
    pub fn merge(&mut self, other: ScheduleMap) {
        for (day, times) in other.0 {
            self.0.insert(day, times);
        }
    }

    pub fn times(&self, day: Day) -> &[TimeOfDay] {
        self.0.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Day, &[TimeOfDay])> {
        self.0.iter().map(|(day, times)| (*day, times.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_slots(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
