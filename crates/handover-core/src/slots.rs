//! Appointment slot grid.
//!
//! Slots start at `day_start` and repeat every `slot_minutes` while the
//! whole slot still ends by `day_end`. Non-working days have no slots.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use handover_common::{HandoverError, Result};
use handover_config::{BookingConfig, ConfigError};

#[derive(Debug, Clone, PartialEq)]
pub struct SlotGrid {
    day_start: NaiveTime,
    day_end: NaiveTime,
    slot: Duration,
    working_days: Vec<Weekday>,
    min_notice_days: i64,
    max_advance_days: i64,
}

impl SlotGrid {
    pub fn from_config(config: &BookingConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            day_start: config.day_start_time()?,
            day_end: config.day_end_time()?,
            slot: Duration::minutes(i64::from(config.slot_minutes)),
            working_days: config.weekdays()?,
            min_notice_days: config.min_notice_days,
            max_advance_days: config.max_advance_days,
        })
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    /// Every slot start on `date`.
    pub fn slots(&self, date: NaiveDate) -> Vec<NaiveTime> {
        if !self.is_working_day(date) || self.slot <= Duration::zero() {
            return Vec::new();
        }
        let mut slots = Vec::new();
        let mut start = self.day_start;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(self.slot);
            if wrapped != 0 || end > self.day_end {
                break;
            }
            slots.push(start);
            start = end;
        }
        slots
    }

    pub fn is_on_grid(&self, date: NaiveDate, slot: NaiveTime) -> bool {
        self.slots(date).contains(&slot)
    }

    /// Grid slots on `date` not present in `taken`.
    pub fn available(&self, date: NaiveDate, taken: &[NaiveTime]) -> Vec<NaiveTime> {
        self.slots(date).into_iter().filter(|s| !taken.contains(s)).collect()
    }

    /// `None` when the offset runs past the calendar.
    pub fn earliest(&self, today: NaiveDate) -> Option<NaiveDate> {
        offset_days(today, self.min_notice_days)
    }

    pub fn latest(&self, today: NaiveDate) -> Option<NaiveDate> {
        offset_days(today, self.max_advance_days)
    }

    /// Reject slots that are off the grid or outside the booking window.
    pub fn validate(&self, date: NaiveDate, slot: NaiveTime, today: NaiveDate) -> Result<()> {
        if !self.is_on_grid(date, slot) {
            return Err(HandoverError::Validation(format!(
                "{} {} is not a bookable slot",
                date,
                slot.format("%H:%M")
            )));
        }
        let (earliest, latest) = match (self.earliest(today), self.latest(today)) {
            (Some(earliest), Some(latest)) => (earliest, latest),
            _ => {
                return Err(HandoverError::Validation(
                    "booking window is outside the supported calendar".to_string(),
                ))
            }
        };
        if date < earliest || date > latest {
            return Err(HandoverError::Validation(format!(
                "bookings must be between {} and {}",
                earliest, latest
            )));
        }
        Ok(())
    }
}

fn offset_days(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|d| today.checked_add_signed(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(start: &str, end: &str, minutes: u32) -> SlotGrid {
        SlotGrid::from_config(&BookingConfig {
            day_start: start.to_string(),
            day_end: end.to_string(),
            slot_minutes: minutes,
            ..BookingConfig::default()
        })
        .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2030-03-04 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
    }

    #[test]
    fn test_default_grid() {
        let slots = grid("09:00", "17:00", 60).slots(monday());
        assert_eq!(slots.len(), 8);
        assert_eq!(slots.first(), Some(&t(9, 0)));
        assert_eq!(slots.last(), Some(&t(16, 0)));
    }

    #[test]
    fn test_partial_last_slot_is_dropped() {
        let slots = grid("09:00", "10:40", 30).slots(monday());
        assert_eq!(slots, vec![t(9, 0), t(9, 30), t(10, 0)]);
    }

    #[test]
    fn test_weekend_has_no_slots() {
        let saturday = NaiveDate::from_ymd_opt(2030, 3, 9).unwrap();
        assert!(grid("09:00", "17:00", 60).slots(saturday).is_empty());
    }

    #[test]
    fn test_late_day_does_not_wrap_midnight() {
        let slots = grid("22:00", "23:59", 60).slots(monday());
        assert_eq!(slots, vec![t(22, 0)]);
    }

    #[test]
    fn test_available_excludes_taken() {
        let g = grid("09:00", "12:00", 60);
        assert_eq!(g.available(monday(), &[t(10, 0)]), vec![t(9, 0), t(11, 0)]);
    }

    #[test]
    fn test_validate_window() {
        let g = grid("09:00", "17:00", 60);
        let today = monday() - Duration::days(7);
        assert!(g.validate(monday(), t(9, 0), today).is_ok());
        // off grid
        assert!(g.validate(monday(), t(9, 30), today).is_err());
        // same-day booking violates the default one day notice
        assert!(g.validate(monday(), t(9, 0), monday()).is_err());
        // too far ahead
        let far = monday() - Duration::days(61);
        assert!(matches!(g.validate(monday(), t(9, 0), far), Err(HandoverError::Validation(_))));
    }

    #[test]
    fn test_oversized_window_is_a_validation_error() {
        let g = SlotGrid::from_config(&BookingConfig {
            max_advance_days: 1_000_000_000,
            ..BookingConfig::default()
        })
        .unwrap();
        let today = monday() - Duration::days(7);
        assert_eq!(g.latest(today), None);
        assert!(matches!(g.validate(monday(), t(9, 0), today), Err(HandoverError::Validation(_))));
    }
}
