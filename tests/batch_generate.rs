//! 批量生成驱动：多日区间、按用户过滤、dry-run、重复运行幂等、frog 跳过

use chrono::{Duration, NaiveDate};

use intentions::recurrence::{run_batch, BatchRequest, Outcome};
use intentions::store::{Frequency, NewTask, PatternRule, StatusFilter, TaskStore};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// 2025-02-03 是周一
fn seeded(store: &TaskStore) {
    let mut weekly = PatternRule::daily("Team sync", d(2025, 2, 3));
    weekly.frequency = Frequency::Weekly;
    weekly.days_of_week = vec![0, 2];
    store.create_pattern(1, weekly).unwrap();

    let mut deep_work = PatternRule::daily("Deep work", d(2025, 2, 3));
    deep_work.default_froggy = true;
    store.create_pattern(2, deep_work).unwrap();
    store
        .create_task(2, NewTask::new("Dentist", d(2025, 2, 4)).froggy(true))
        .unwrap();
}

fn week() -> BatchRequest {
    BatchRequest {
        days_ahead: 6,
        ..BatchRequest::for_date(d(2025, 2, 3))
    }
}

fn total_tasks(store: &TaskStore, owner: i64) -> usize {
    (0..7)
        .map(|i| {
            store
                .list_tasks(owner, d(2025, 2, 3) + Duration::days(i), StatusFilter::All)
                .unwrap()
                .len()
        })
        .sum()
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(dir.path().join("batch.db")).unwrap();
    seeded(&store);

    let report = run_batch(&store, &BatchRequest { dry_run: true, ..week() }).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.patterns, 2);
    assert_eq!(report.created, 2 + 6);
    assert_eq!(report.skipped_frog, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(total_tasks(&store, 1), 0);
    assert_eq!(total_tasks(&store, 2), 1);
    assert!(store.list_patterns(1, false).unwrap()[0].last_generated_date.is_none());
}

#[test]
fn week_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(dir.path().join("batch.db")).unwrap();
    seeded(&store);

    let first = run_batch(&store, &week()).unwrap();
    assert_eq!(first.created, 8);
    assert_eq!(first.skipped_frog, 1);
    assert_eq!(first.not_due, 5);
    let wednesday: Vec<_> = first.entries_for(d(2025, 2, 5)).collect();
    assert_eq!(wednesday.len(), 2);
    assert!(wednesday.iter().all(|e| matches!(e.outcome, Outcome::Created { .. })));

    let second = run_batch(&store, &week()).unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped_duplicate, 8);
    assert_eq!(total_tasks(&store, 1), 2);
    assert_eq!(total_tasks(&store, 2), 7);

    let frogs = store.find_frog(2, d(2025, 2, 4)).unwrap().unwrap();
    assert_eq!(frogs.title, "Dentist");
}

#[test]
fn owner_filter_limits_patterns() {
    let dir = tempfile::tempdir().unwrap();
    let store = TaskStore::open(dir.path().join("batch.db")).unwrap();
    seeded(&store);

    let report = run_batch(&store, &BatchRequest { owner: Some(1), ..week() }).unwrap();
    assert_eq!(report.patterns, 1);
    assert!(report.entries.iter().all(|e| e.owner == 1));
    assert_eq!(report.created, 2);
    assert_eq!(total_tasks(&store, 2), 1);
}

#[test]
fn paused_patterns_are_ignored() {
    let store = TaskStore::open_in_memory().unwrap();
    let pattern = store
        .create_pattern(1, PatternRule::daily("Journal", d(2025, 2, 3)))
        .unwrap();
    store.set_pattern_active(1, pattern.id, false).unwrap();

    let report = run_batch(&store, &BatchRequest::for_date(d(2025, 2, 3))).unwrap();
    assert_eq!(report.patterns, 0);
    assert!(report.entries.is_empty());
}

#[test]
fn dry_run_matches_a_real_run_for_competing_frogs() {
    let store = TaskStore::open_in_memory().unwrap();
    for title in ["Taxes", "Passport"] {
        let mut rule = PatternRule::daily(title, d(2025, 1, 6));
        rule.default_froggy = true;
        store.create_pattern(1, rule).unwrap();
    }
    let request = BatchRequest {
        days_ahead: 1,
        ..BatchRequest::for_date(d(2025, 1, 6))
    };

    let preview = run_batch(&store, &BatchRequest { dry_run: true, ..request.clone() }).unwrap();
    assert_eq!((preview.created, preview.skipped_frog), (2, 2));
    assert!(store.find_frog(1, d(2025, 1, 6)).unwrap().is_none());

    let real = run_batch(&store, &request).unwrap();
    assert_eq!(
        (preview.created, preview.skipped_frog),
        (real.created, real.skipped_frog)
    );
    let outcomes = |r: &intentions::recurrence::BatchReport| -> Vec<&'static str> {
        r.entries
            .iter()
            .map(|e| match e.outcome {
                Outcome::Created { .. } => "created",
                Outcome::SkippedFrog { .. } => "frog",
                _ => "other",
            })
            .collect()
    };
    assert_eq!(outcomes(&preview), outcomes(&real));
}
