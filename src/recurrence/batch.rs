//! 批量生成驱动：活跃规则 × 日期区间
//!
//! 由外部定时任务或 CLI 触发，本身不关心调用时机。

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::core::StoreError;
use crate::recurrence::generate::{evaluate_with, Outcome};
use crate::store::{PatternId, RecurringPattern, TaskStore, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// 起始日期（通常为当前工作日）
    pub start: NaiveDate,
    /// 额外向后覆盖的天数；0 表示只处理 start 当天
    pub days_ahead: u32,
    pub owner: Option<UserId>,
    pub dry_run: bool,
}

impl BatchRequest {
    pub fn for_date(start: NaiveDate) -> Self {
        Self {
            start,
            days_ahead: 0,
            owner: None,
            dry_run: false,
        }
    }

    /// start ..= start + days_ahead，超出可表示范围的日期被截掉
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..=i64::from(self.days_ahead))
            .map_while(|offset| self.start.checked_add_signed(Duration::days(offset)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub date: NaiveDate,
    pub pattern_id: PatternId,
    pub owner: UserId,
    pub title: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl BatchEntry {
    pub fn is_not_due(&self) -> bool {
        matches!(self.outcome, Outcome::NotDue { .. })
    }

    /// 单行报告，如 "created: Gym (ID: 12)" / "not due: Gym (Tuesday is not a scheduled day)"
    pub fn describe(&self, dry_run: bool) -> String {
        match &self.outcome {
            Outcome::Created { task } if dry_run => {
                format!("would create: {} (pattern {})", task.title, self.pattern_id)
            }
            Outcome::Created { task } => format!("created: {} (ID: {})", task.title, task.id),
            Outcome::SkippedDuplicate { existing_id } => {
                format!("already exists: {} (ID: {existing_id})", self.title)
            }
            Outcome::SkippedFrog { existing_id } => {
                format!("skipped, frog already set (ID: {existing_id}): {}", self.title)
            }
            Outcome::NotDue { reason } => format!("not due: {} ({reason})", self.title),
            Outcome::Failed { error } => format!("failed: {} ({error})", self.title),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub dry_run: bool,
    pub patterns: usize,
    pub entries: Vec<BatchEntry>,
    pub created: usize,
    pub skipped_duplicate: usize,
    pub skipped_frog: usize,
    pub not_due: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, entry: BatchEntry) {
        match entry.outcome {
            Outcome::Created { .. } => self.created += 1,
            Outcome::SkippedDuplicate { .. } => self.skipped_duplicate += 1,
            Outcome::SkippedFrog { .. } => self.skipped_frog += 1,
            Outcome::NotDue { .. } => self.not_due += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(entry);
    }

    pub fn skipped(&self) -> usize {
        self.skipped_duplicate + self.skipped_frog + self.not_due
    }

    pub fn entries_for(&self, date: NaiveDate) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(move |e| e.date == date)
    }
}

/// 逐日期、逐规则求值并记入报告；单条失败记为 Failed 并继续
fn fill_report(
    report: &mut BatchReport,
    request: &BatchRequest,
    patterns: &[RecurringPattern],
    mut evaluate: impl FnMut(&RecurringPattern, NaiveDate) -> Result<Outcome, StoreError>,
) {
    for date in request.dates() {
        for pattern in patterns {
            let outcome = evaluate(pattern, date).unwrap_or_else(|e| {
                tracing::error!(pattern_id = pattern.id, %date, error = %e, "generation failed");
                Outcome::Failed {
                    error: e.to_string(),
                }
            });
            report.record(BatchEntry {
                date,
                pattern_id: pattern.id,
                owner: pattern.owner,
                title: pattern.rule.title.clone(),
                outcome,
            });
        }
    }
}

/// 对每个日期、每条活跃规则执行判定与生成。单条失败记入报告并继续
pub fn run_batch(store: &TaskStore, request: &BatchRequest) -> Result<BatchReport, StoreError> {
    let patterns = store.list_active_patterns(request.owner)?;
    tracing::info!(
        start = %request.start,
        days_ahead = request.days_ahead,
        owner = ?request.owner,
        dry_run = request.dry_run,
        patterns = patterns.len(),
        "recurrence batch started"
    );

    let mut report = BatchReport {
        dry_run: request.dry_run,
        patterns: patterns.len(),
        ..Default::default()
    };
    if request.dry_run {
        // 整个批次一个回滚事务：前面演算出的 frog / 任务对后面的条目可见
        store.simulate(|sim| {
            fill_report(&mut report, request, &patterns, |pattern, date| {
                evaluate_with(pattern, date, true, || sim.materialize(pattern, date))
            });
            Ok(())
        })?;
    } else {
        fill_report(&mut report, request, &patterns, |pattern, date| {
            evaluate_with(pattern, date, false, || store.materialize(pattern, date))
        });
    }

    tracing::info!(
        created = report.created,
        skipped = report.skipped(),
        failed = report.failed,
        dry_run = report.dry_run,
        "recurrence batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PatternRule, StatusFilter};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn covers_start_plus_days_ahead() {
        let req = BatchRequest {
            days_ahead: 2,
            ..BatchRequest::for_date(d(2025, 1, 30))
        };
        let dates: Vec<NaiveDate> = req.dates().collect();
        assert_eq!(dates, vec![d(2025, 1, 30), d(2025, 1, 31), d(2025, 2, 1)]);
    }

    #[test]
    fn dates_stop_at_the_last_representable_day() {
        let req = BatchRequest {
            days_ahead: u32::MAX,
            ..BatchRequest::for_date(NaiveDate::MAX - Duration::days(1))
        };
        let dates: Vec<NaiveDate> = req.dates().collect();
        assert_eq!(dates, vec![NaiveDate::MAX - Duration::days(1), NaiveDate::MAX]);
    }

    #[test]
    fn entries_describe_their_outcome() {
        let s = TaskStore::open_in_memory().unwrap();
        let mut rule = PatternRule::daily("Gym", d(2025, 1, 6));
        rule.frequency = crate::store::Frequency::Weekly;
        rule.days_of_week = vec![0];
        s.create_pattern(1, rule).unwrap();

        let req = BatchRequest {
            days_ahead: 1,
            ..BatchRequest::for_date(d(2025, 1, 6))
        };
        let report = run_batch(&s, &req).unwrap();
        let monday = report.entries_for(d(2025, 1, 6)).next().unwrap();
        assert!(monday.describe(false).starts_with("created: Gym (ID: "));
        let tuesday = report.entries_for(d(2025, 1, 7)).next().unwrap();
        assert!(tuesday.is_not_due());
        assert_eq!(tuesday.describe(false), "not due: Gym (Tuesday is not a scheduled day)");
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn counts_each_outcome() {
        let s = TaskStore::open_in_memory().unwrap();
        let mut every_other = PatternRule::daily("Run", d(2025, 1, 1));
        every_other.interval = 2;
        s.create_pattern(1, every_other).unwrap();
        s.create_pattern(1, PatternRule::daily("Read", d(2025, 1, 1))).unwrap();

        let req = BatchRequest {
            days_ahead: 1,
            ..BatchRequest::for_date(d(2025, 1, 1))
        };
        let report = run_batch(&s, &req).unwrap();
        assert_eq!(report.patterns, 2);
        assert_eq!(report.created, 3);
        assert_eq!(report.not_due, 1);
        assert_eq!(report.entries_for(d(2025, 1, 2)).count(), 2);

        let again = run_batch(&s, &req).unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.skipped_duplicate, 3);
        assert_eq!(s.list_tasks(1, d(2025, 1, 1), StatusFilter::All).unwrap().len(), 2);
    }
}
