//! 规则判定：某个日期是否应由循环规则生成任务
//!
//! 检查顺序固定（active → start → end → 频率），第一个不满足的检查给出原因。

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::store::{Frequency, RecurringPattern};

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// 判定结果；reason 在任何分支都有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub due: bool,
    pub reason: String,
}

impl Decision {
    fn due(reason: impl Into<String>) -> Self {
        Self {
            due: true,
            reason: reason.into(),
        }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self {
            due: false,
            reason: reason.into(),
        }
    }
}

/// 某年某月的天数
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// (target.year - start.year) * 12 + (target.month - start.month)
pub fn months_between(start: NaiveDate, target: NaiveDate) -> i64 {
    (target.year() as i64 - start.year() as i64) * 12 + (target.month() as i64 - start.month() as i64)
}

pub fn should_generate(pattern: &RecurringPattern, date: NaiveDate) -> Decision {
    let rule = &pattern.rule;
    if !pattern.active {
        return Decision::skip("Pattern is not active");
    }
    if date < rule.start_date {
        return Decision::skip(format!(
            "{date} is before start date {}",
            rule.start_date
        ));
    }
    if let Some(end) = rule.end_date {
        if date > end {
            return Decision::skip(format!("{date} is after end date {end}"));
        }
    }

    let interval = i64::from(rule.interval.max(1));
    match rule.frequency {
        Frequency::Daily => {
            let elapsed = (date - rule.start_date).num_days();
            if elapsed % interval == 0 {
                Decision::due(format!("Daily pattern matches (every {interval} day(s))"))
            } else {
                Decision::skip(format!(
                    "Not on daily interval ({elapsed} day(s) since start, every {interval})"
                ))
            }
        }
        Frequency::Weekly => {
            if rule.days_of_week.is_empty() {
                return Decision::skip("No days of week configured");
            }
            let weekday = date.weekday().num_days_from_monday();
            let name = WEEKDAY_NAMES[weekday as usize];
            if !rule.days_of_week.iter().any(|d| u32::from(*d) == weekday) {
                return Decision::skip(format!("{name} is not a scheduled day"));
            }
            let start_weekday = rule.start_date.weekday().num_days_from_monday();
            let days_until = (weekday + 7 - start_weekday) % 7;
            let first = rule.start_date + chrono::Duration::days(i64::from(days_until));
            if date < first {
                return Decision::skip(format!("Before first {name} occurrence on {first}"));
            }
            let weeks = (date - first).num_days() / 7;
            if weeks % interval == 0 {
                Decision::due(format!("Weekly pattern matches ({name})"))
            } else {
                Decision::skip(format!(
                    "Not on weekly interval (week {weeks} since first {name}, every {interval})"
                ))
            }
        }
        Frequency::Monthly => {
            let Some(day_of_month) = rule.day_of_month else {
                return Decision::skip("No day of month configured");
            };
            let effective = day_of_month.min(days_in_month(date.year(), date.month()));
            if date.day() != effective {
                return Decision::skip(format!(
                    "Day {} does not match day of month {effective}",
                    date.day()
                ));
            }
            let months = months_between(rule.start_date, date);
            if months.rem_euclid(interval) == 0 {
                Decision::due(format!("Monthly pattern matches (day {effective})"))
            } else {
                Decision::skip(format!(
                    "Not on monthly interval ({months} month(s) since start, every {interval})"
                ))
            }
        }
        Frequency::Yearly => {
            let (Some(month), Some(day_of_month)) = (rule.month, rule.day_of_month) else {
                return Decision::skip("No month or day of month configured");
            };
            let effective = day_of_month.min(days_in_month(date.year(), month));
            if date.month() != month || date.day() != effective {
                return Decision::skip(format!(
                    "{date} does not match yearly date {month}/{effective}"
                ));
            }
            let years = i64::from(date.year() - rule.start_date.year());
            if years.rem_euclid(interval) == 0 {
                Decision::due(format!("Yearly pattern matches ({month}/{effective})"))
            } else {
                Decision::skip(format!(
                    "Not on yearly interval ({years} year(s) since start, every {interval})"
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PatternRule;
    use chrono::Utc;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pattern(rule: PatternRule) -> RecurringPattern {
        RecurringPattern {
            id: 1,
            owner: 1,
            rule,
            active: true,
            last_generated_date: None,
            created_at: Utc::now(),
        }
    }

    fn weekly(start: NaiveDate, days: Vec<u8>, interval: u32) -> RecurringPattern {
        let mut rule = PatternRule::daily("Gym", start);
        rule.frequency = Frequency::Weekly;
        rule.days_of_week = days;
        rule.interval = interval;
        pattern(rule)
    }

    fn monthly(start: NaiveDate, day: u32) -> RecurringPattern {
        let mut rule = PatternRule::daily("Rent", start);
        rule.frequency = Frequency::Monthly;
        rule.day_of_month = Some(day);
        pattern(rule)
    }

    #[test]
    fn checks_run_in_order() {
        let mut p = pattern(PatternRule::daily("x", d(2025, 1, 10)));
        p.rule.end_date = Some(d(2025, 1, 20));
        p.active = false;
        assert!(should_generate(&p, d(2025, 1, 5)).reason.contains("not active"));
        p.active = true;
        assert!(should_generate(&p, d(2025, 1, 5)).reason.contains("before start date"));
        assert!(should_generate(&p, d(2025, 1, 21)).reason.contains("after end date"));
        assert!(should_generate(&p, d(2025, 1, 20)).due);
    }

    #[test]
    fn mon_wed_fri_example() {
        let p = weekly(d(2025, 1, 6), vec![0, 2, 4], 1);
        assert!(should_generate(&p, d(2025, 1, 6)).due);
        assert!(!should_generate(&p, d(2025, 1, 7)).due);
        assert!(should_generate(&p, d(2025, 1, 8)).due);
        assert!(should_generate(&p, d(2025, 1, 13)).due);
    }

    #[test]
    fn biweekly_counts_from_first_occurrence() {
        // 周三开始、只在周一：第一次是 1/13
        let p = weekly(d(2025, 1, 8), vec![0], 2);
        assert!(should_generate(&p, d(2025, 1, 13)).due);
        assert!(!should_generate(&p, d(2025, 1, 20)).due);
        assert!(should_generate(&p, d(2025, 1, 27)).due);
    }

    #[test]
    fn weekly_without_days_says_so() {
        let p = weekly(d(2025, 1, 6), vec![], 1);
        assert_eq!(should_generate(&p, d(2025, 1, 6)).reason, "No days of week configured");
    }

    #[test]
    fn monthly_clamps_short_months() {
        let p = monthly(d(2025, 1, 31), 31);
        assert!(should_generate(&p, d(2025, 2, 28)).due);
        assert!(should_generate(&p, d(2025, 4, 30)).due);
        assert!(!should_generate(&p, d(2025, 4, 29)).due);

        let leap = monthly(d(2024, 1, 31), 31);
        assert!(should_generate(&leap, d(2024, 2, 29)).due);
        assert!(!should_generate(&leap, d(2024, 2, 28)).due);
    }

    #[test]
    fn monthly_interval_uses_calendar_months() {
        let mut p = monthly(d(2025, 1, 15), 15);
        p.rule.interval = 3;
        assert!(should_generate(&p, d(2025, 4, 15)).due);
        assert!(!should_generate(&p, d(2025, 3, 15)).due);
    }

    #[test]
    fn monthly_without_day_says_so() {
        let mut p = monthly(d(2025, 1, 1), 1);
        p.rule.day_of_month = None;
        assert!(should_generate(&p, d(2025, 1, 1)).reason.contains("No day of month configured"));
    }

    #[test]
    fn leap_day_yearly_falls_back_to_feb_28() {
        let mut rule = PatternRule::daily("Birthday", d(2024, 2, 29));
        rule.frequency = Frequency::Yearly;
        rule.month = Some(2);
        rule.day_of_month = Some(29);
        let p = pattern(rule);
        assert!(should_generate(&p, d(2024, 2, 29)).due);
        assert!(should_generate(&p, d(2025, 2, 28)).due);
        assert!(!should_generate(&p, d(2025, 3, 1)).due);
        assert!(should_generate(&p, d(2028, 2, 29)).due);
        assert!(!should_generate(&p, d(2028, 2, 28)).due);
    }

    #[test]
    fn days_in_month_handles_december() {
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
    }

    proptest! {
        #[test]
        fn daily_fires_on_interval_multiples(
            start_offset in 0i64..3650,
            interval in 1u32..30,
            delta in -60i64..400,
        ) {
            let start = d(2020, 1, 1) + chrono::Duration::days(start_offset);
            let mut rule = PatternRule::daily("x", start);
            rule.interval = interval;
            let p = pattern(rule);
            let date = start + chrono::Duration::days(delta);
            let expected = delta >= 0 && delta % i64::from(interval) == 0;
            prop_assert_eq!(should_generate(&p, date).due, expected);
        }

        #[test]
        fn daily_respects_end_date(delta in 0i64..100, span in 0i64..50) {
            let start = d(2025, 1, 1);
            let mut rule = PatternRule::daily("x", start);
            rule.end_date = Some(start + chrono::Duration::days(span));
            let p = pattern(rule);
            prop_assert_eq!(should_generate(&p, start + chrono::Duration::days(delta)).due, delta <= span);
        }

        #[test]
        fn weekly_fires_on_listed_days_at_interval(
            start_offset in 0i64..3650,
            mask in 1u8..128,
            interval in 1u32..5,
            delta in 0i64..200,
        ) {
            let start = d(2020, 1, 1) + chrono::Duration::days(start_offset);
            let days: Vec<u8> = (0..7).filter(|i| mask & (1 << i) != 0).collect();
            let p = weekly(start, days.clone(), interval);
            let date = start + chrono::Duration::days(delta);

            let wd = date.weekday().num_days_from_monday();
            let listed = days.contains(&(wd as u8));
            let start_wd = start.weekday().num_days_from_monday();
            let first = start + chrono::Duration::days(i64::from((wd + 7 - start_wd) % 7));
            let on_interval = ((date - first).num_days() / 7) % i64::from(interval) == 0;
            prop_assert_eq!(should_generate(&p, date).due, listed && on_interval);
        }
    }
}
