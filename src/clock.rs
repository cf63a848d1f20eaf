//! 工作日时钟
//!
//! 一天不在午夜切换，而在 rollover_hour（默认 4 点）切换：凌晨的活动仍算前一天。

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike};

pub const DEFAULT_ROLLOVER_HOUR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingDay {
    rollover_hour: u32,
}

impl Default for WorkingDay {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLOVER_HOUR)
    }
}

impl WorkingDay {
    /// rollover_hour 超出 0–23 时截断到 23
    pub fn new(rollover_hour: u32) -> Self {
        Self {
            rollover_hour: rollover_hour.min(23),
        }
    }

    pub fn rollover_hour(&self) -> u32 {
        self.rollover_hour
    }

    /// 给定时刻所属的工作日
    pub fn date_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> NaiveDate {
        let date = at.date_naive();
        if at.hour() < self.rollover_hour {
            date - Duration::days(1)
        } else {
            date
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.date_at(&Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn before_rollover_counts_as_previous_day() {
        let clock = WorkingDay::new(4);
        let late = Utc.with_ymd_and_hms(2025, 3, 10, 2, 30, 0).unwrap();
        assert_eq!(clock.date_at(&late), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());

        let morning = Utc.with_ymd_and_hms(2025, 3, 10, 4, 0, 0).unwrap();
        assert_eq!(clock.date_at(&morning), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn midnight_rollover_is_plain_calendar_day() {
        let clock = WorkingDay::new(0);
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(clock.date_at(&t), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn out_of_range_hour_is_clamped() {
        assert_eq!(WorkingDay::new(99).rollover_hour(), 23);
    }
}
