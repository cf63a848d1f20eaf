//! 从循环规则物化任务（幂等）

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::StoreError;
use crate::recurrence::rule::{should_generate, Decision};
use crate::store::{Materialized, PatternId, RecurringPattern, Task, TaskId, TaskStore, UserId};

/// 单个 (pattern, date) 的生成结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created { task: Task },
    SkippedDuplicate { existing_id: TaskId },
    /// 规则默认 froggy，但当天已有 frog
    SkippedFrog { existing_id: TaskId },
    NotDue { reason: String },
    /// 批量驱动中单条失败，不影响其余条目
    Failed { error: String },
}

impl Outcome {
    pub fn created(&self) -> Option<&Task> {
        match self {
            Self::Created { task } => Some(task),
            _ => None,
        }
    }
}

/// 判定并物化；dry_run 时在回滚事务内演算
pub fn evaluate(
    store: &TaskStore,
    pattern: &RecurringPattern,
    date: NaiveDate,
    dry_run: bool,
) -> Result<Outcome, StoreError> {
    if dry_run {
        store.simulate(|sim| evaluate_with(pattern, date, true, || sim.materialize(pattern, date)))
    } else {
        evaluate_with(pattern, date, false, || store.materialize(pattern, date))
    }
}

/// 规则判定；到期时调用 materialize 并把结果映射为 Outcome
pub(crate) fn evaluate_with(
    pattern: &RecurringPattern,
    date: NaiveDate,
    dry_run: bool,
    materialize: impl FnOnce() -> Result<Materialized, StoreError>,
) -> Result<Outcome, StoreError> {
    let Decision { due, reason } = should_generate(pattern, date);
    if !due {
        return Ok(Outcome::NotDue { reason });
    }
    let outcome = match materialize()? {
        Materialized::Created(task) => {
            if !dry_run {
                tracing::info!(
                    pattern_id = pattern.id,
                    task_id = task.id,
                    %date,
                    "task generated from pattern"
                );
            }
            Outcome::Created { task }
        }
        Materialized::Duplicate(existing_id) => Outcome::SkippedDuplicate { existing_id },
        Materialized::FrogTaken(existing_id) => {
            tracing::info!(pattern_id = pattern.id, %date, existing_id, "frog already set, generation skipped");
            Outcome::SkippedFrog { existing_id }
        }
    };
    Ok(outcome)
}

/// 生成任务；未到期、重复或 frog 已占用时返回 None
pub fn generate(
    store: &TaskStore,
    pattern: &RecurringPattern,
    date: NaiveDate,
) -> Result<Option<Task>, StoreError> {
    match evaluate(store, pattern, date, false)? {
        Outcome::Created { task } => Ok(Some(task)),
        _ => Ok(None),
    }
}

/// 手动为单条规则生成指定日期的任务（按 owner 解析规则）
pub fn generate_for_date(
    store: &TaskStore,
    owner: UserId,
    pattern_id: PatternId,
    date: NaiveDate,
) -> Result<Outcome, StoreError> {
    let pattern = store.get_pattern(owner, pattern_id)?;
    evaluate(store, &pattern, date, false)
}
