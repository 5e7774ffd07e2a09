//! Time-of-day arithmetic for lab time slots and meeting schedules.
//!
//! Times are wall-clock minutes since midnight. Intervals are half-open,
//! `[start, end)`, so back-to-back intervals never overlap.

use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid time of day `{0}`, expected HH:MM")]
    InvalidTime(String),

    #[error("start time {start} must be before end time {end}")]
    EmptyInterval { start: TimeOfDay, end: TimeOfDay },

    #[error("slot length must be at least one minute")]
    ZeroStep,
}

/// A wall-clock time with minute precision.
///
/// Parses `HH:MM` and also tolerates `HH:MM:SS` (seconds are dropped), always
/// renders as zero-padded `HH:MM` so the textual form sorts like the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    pub const fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }

    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    pub const fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Returns `None` when the result would spill past midnight.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = u32::from(self.0).checked_add(minutes)?;
        (total < u32::from(MINUTES_PER_DAY)).then(|| Self(total as u16))
    }

    /// Like [`checked_add_minutes`](Self::checked_add_minutes) but allows landing
    /// exactly on midnight, which is a valid exclusive end.
    fn add_minutes_to_end(self, minutes: u32) -> Option<u32> {
        let total = u32::from(self.0).checked_add(minutes)?;
        (total <= u32::from(MINUTES_PER_DAY)).then_some(total)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTime(s.to_string());
        let trimmed = s.trim();

        let mut parts = trimmed.split(':');
        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        let second = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let parse = |part: &str, widths: std::ops::RangeInclusive<usize>, max: u16| {
            if !widths.contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u16 = part.parse().map_err(|_| invalid())?;
            if value >= max {
                return Err(invalid());
            }
            Ok(value)
        };

        let hour = parse(hour, 1..=2, 24)?;
        let minute = parse(minute, 2..=2, 60)?;
        if let Some(second) = second {
            parse(second, 2..=2, 60)?;
        }

        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl From<TimeOfDay> for NaiveTime {
    fn from(time: TimeOfDay) -> Self {
        // always in range: minutes are < 24 * 60
        NaiveTime::from_num_seconds_from_midnight_opt(u32::from(time.0) * 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-open `[start_time, end_time)` range within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl Interval {
    pub fn new(start_time: TimeOfDay, end_time: TimeOfDay) -> Result<Self, Error> {
        if start_time >= end_time {
            return Err(Error::EmptyInterval {
                start: start_time,
                end: end_time,
            });
        }

        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end_time.minutes() - self.start_time.minutes()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_time, self.end_time)
    }
}

/// Partitions `window` into consecutive slots of `step_minutes`.
///
/// A trailing remainder shorter than one step is not offered.
pub fn slot_grid(window: Interval, step_minutes: u32) -> Result<Vec<Interval>, Error> {
    if step_minutes == 0 {
        return Err(Error::ZeroStep);
    }

    let mut slots = Vec::new();
    let mut cursor = window.start_time;
    while let Some(end) = cursor.add_minutes_to_end(step_minutes) {
        if end > u32::from(window.end_time.minutes()) {
            break;
        }
        let Some(end_time) = cursor.checked_add_minutes(step_minutes) else {
            break;
        };
        slots.push(Interval {
            start_time: cursor,
            end_time,
        });
        cursor = end_time;
    }

    Ok(slots)
}

/// Slots of the grid that overlap none of the `busy` intervals.
pub fn free_slots(
    window: Interval,
    step_minutes: u32,
    busy: &[Interval],
) -> Result<Vec<Interval>, Error> {
    Ok(slot_grid(window, step_minutes)?
        .into_iter()
        .filter(|slot| !busy.iter().any(|taken| taken.overlaps(slot)))
        .collect())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn iv(start: &str, end: &str) -> Interval {
        Interval::new(t(start), t(end)).unwrap()
    }

    fn render(slots: &[Interval]) -> String {
        slots
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parses_and_normalises_clock_strings() {
        assert_eq!(t("09:00").to_string(), "09:00");
        assert_eq!(t("9:05").to_string(), "09:05");
        assert_eq!(t("14:30:00").to_string(), "14:30");
        assert_eq!(t("14:30:59").to_string(), "14:30");
        assert_eq!(t("23:59"), TimeOfDay::from_hm(23, 59).unwrap());
    }

    #[test]
    fn rejects_malformed_clock_strings() {
        for raw in ["", "24:00", "12:60", "12", "12:5", "ab:cd", "12:00:00:00", "-1:00", "12:00:61"] {
            assert!(raw.parse::<TimeOfDay>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn naive_time_conversion_drops_seconds() {
        let time = NaiveTime::from_hms_opt(10, 15, 42).unwrap();
        let of_day = TimeOfDay::from(time);
        assert_eq!(of_day.to_string(), "10:15");
        assert_eq!(NaiveTime::from(of_day), NaiveTime::from_hms_opt(10, 15, 0).unwrap());
    }

    #[test]
    fn serde_uses_hh_mm() {
        let slot = iv("08:00", "09:30");
        assert_eq!(
            serde_json::to_string(&slot).unwrap(),
            r#"{"startTime":"08:00","endTime":"09:30"}"#
        );
        let parsed: TimeOfDay = serde_json::from_str(r#""08:00:00""#).unwrap();
        assert_eq!(parsed, t("08:00"));
    }

    #[test]
    fn empty_intervals_are_rejected() {
        assert!(matches!(
            Interval::new(t("10:00"), t("10:00")),
            Err(Error::EmptyInterval { .. })
        ));
        assert!(Interval::new(t("11:00"), t("10:00")).is_err());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!iv("10:00", "11:00").overlaps(&iv("11:00", "12:00")));
        assert!(!iv("11:00", "12:00").overlaps(&iv("10:00", "11:00")));
        assert!(iv("10:00", "11:00").overlaps(&iv("10:30", "11:30")));
        assert!(iv("10:00", "12:00").overlaps(&iv("10:30", "11:00")));
    }

    #[test]
    fn grid_covers_the_working_day() {
        let grid = slot_grid(iv("09:00", "17:00"), 30).unwrap();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid[0], iv("09:00", "09:30"));
        assert_eq!(grid[15], iv("16:30", "17:00"));
    }

    #[test]
    fn grid_drops_partial_trailing_slot() {
        let grid = slot_grid(iv("09:00", "10:45"), 30).unwrap();
        assert_eq!(render(&grid), "09:00-09:30\n09:30-10:00\n10:00-10:30");
    }

    #[test]
    fn zero_step_is_an_error() {
        assert_eq!(slot_grid(iv("09:00", "10:00"), 0), Err(Error::ZeroStep));
    }

    #[test]
    fn oversized_step_yields_no_slots() {
        assert_eq!(slot_grid(iv("09:00", "17:00"), u32::MAX), Ok(vec![]));
        assert_eq!(slot_grid(iv("09:00", "17:00"), 8 * 60 + 1), Ok(vec![]));
        assert_eq!(t("23:00").checked_add_minutes(u32::MAX), None);
    }

    #[test]
    fn free_slots_skip_busy_time() {
        let busy = [iv("10:00", "11:00"), iv("12:15", "12:45")];
        let free = free_slots(iv("09:00", "13:00"), 30, &busy).unwrap();

        insta::assert_snapshot!(render(&free), @r"
        09:00-09:30
        09:30-10:00
        11:00-11:30
        11:30-12:00
        ");
    }

    fn time_strategy() -> impl Strategy<Value = TimeOfDay> {
        (0u16..MINUTES_PER_DAY).prop_map(TimeOfDay)
    }

    fn interval_strategy() -> impl Strategy<Value = Interval> {
        (0u16..MINUTES_PER_DAY - 1)
            .prop_flat_map(|start| (Just(start), start + 1..MINUTES_PER_DAY))
            .prop_map(|(start, end)| Interval::new(TimeOfDay(start), TimeOfDay(end)).unwrap())
    }

    proptest! {
        #[test]
        fn display_round_trips(time in time_strategy()) {
            prop_assert_eq!(time.to_string().parse::<TimeOfDay>().unwrap(), time);
        }

        #[test]
        fn overlap_is_symmetric(a in interval_strategy(), b in interval_strategy()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn free_slots_never_touch_busy_time(
            busy in proptest::collection::vec(interval_strategy(), 0..6),
            step in 5u32..120,
        ) {
            let window = Interval::new(TimeOfDay(8 * 60), TimeOfDay(18 * 60)).unwrap();
            let free = free_slots(window, step, &busy).unwrap();

            for slot in &free {
                prop_assert_eq!(u32::from(slot.duration_minutes()), step);
                prop_assert!(busy.iter().all(|taken| !taken.overlaps(slot)));
            }
            for pair in free.windows(2) {
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
        }
    }
}
