//! RecurringPattern 的读写

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::{EntityKind, StoreError};
use crate::store::model::{Frequency, PatternId, PatternRule, RecurringPattern, TaskId, UserId};
use crate::store::tasks::fetch_owned;
use crate::store::TaskStore;

const PATTERN_COLUMNS: &str = "id, owner, title, frequency, interval, days_of_week, day_of_month, \
     month, start_date, end_date, active, default_sticky, default_froggy, \
     default_anxiety_inducing, last_generated_date, created_at";

/// 部分更新；None 表示不改。合并后整体重新校验
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternUpdate {
    pub title: Option<String>,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub days_of_week: Option<Vec<u8>>,
    pub day_of_month: Option<u32>,
    pub month: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub default_sticky: Option<bool>,
    pub default_froggy: Option<bool>,
    pub default_anxiety_inducing: Option<bool>,
}

impl PatternUpdate {
    /// 合并到 rule 上，返回变更描述
    fn merge_into(self, rule: &mut PatternRule) -> Vec<String> {
        let mut changes = Vec::new();
        if let Some(title) = self.title {
            let title = title.trim().to_string();
            if title != rule.title {
                changes.push(format!("title: '{}' -> '{}'", rule.title, title));
                rule.title = title;
            }
        }
        if let Some(frequency) = self.frequency {
            if frequency != rule.frequency {
                changes.push(format!(
                    "frequency: {} -> {}",
                    rule.frequency.as_str(),
                    frequency.as_str()
                ));
                rule.frequency = frequency;
            }
        }
        if let Some(interval) = self.interval {
            if interval != rule.interval {
                changes.push(format!("interval: {} -> {}", rule.interval, interval));
                rule.interval = interval;
            }
        }
        if let Some(start) = self.start_date {
            if start != rule.start_date {
                changes.push(format!("start_date: {} -> {}", rule.start_date, start));
                rule.start_date = start;
            }
        }
        if let Some(end) = self.end_date {
            if Some(end) != rule.end_date {
                let old = rule.end_date.map(|d| d.to_string());
                changes.push(format!("end_date: {} -> {}", old.as_deref().unwrap_or("None"), end));
                rule.end_date = Some(end);
            }
        }
        if let Some(mut days) = self.days_of_week {
            // 与存储形式一致（升序去重）后再比较
            days.sort_unstable();
            days.dedup();
            if days != rule.days_of_week {
                changes.push(format!("days_of_week: {:?} -> {:?}", rule.days_of_week, days));
                rule.days_of_week = days;
            }
        }
        if let Some(day) = self.day_of_month {
            if Some(day) != rule.day_of_month {
                changes.push(format!("day_of_month: {:?} -> {}", rule.day_of_month, day));
                rule.day_of_month = Some(day);
            }
        }
        if let Some(month) = self.month {
            if Some(month) != rule.month {
                changes.push(format!("month: {:?} -> {}", rule.month, month));
                rule.month = Some(month);
            }
        }
        for (name, new, slot) in [
            ("default_sticky", self.default_sticky, &mut rule.default_sticky),
            ("default_froggy", self.default_froggy, &mut rule.default_froggy),
            (
                "default_anxiety_inducing",
                self.default_anxiety_inducing,
                &mut rule.default_anxiety_inducing,
            ),
        ] {
            if let Some(value) = new {
                if value != *slot {
                    changes.push(format!("{name}: {} -> {value}", *slot));
                    *slot = value;
                }
            }
        }
        changes
    }
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<RecurringPattern> {
    let frequency: String = row.get(3)?;
    let frequency = Frequency::parse(&frequency)
        .ok_or_else(|| conversion_error(3, format!("unknown frequency '{frequency}'")))?;
    let days_json: Option<String> = row.get(5)?;
    let days_of_week = match days_json {
        Some(json) => serde_json::from_str::<Vec<u8>>(&json)
            .map_err(|e| conversion_error(5, format!("days_of_week: {e}")))?,
        None => Vec::new(),
    };
    Ok(RecurringPattern {
        id: row.get(0)?,
        owner: row.get(1)?,
        rule: PatternRule {
            title: row.get(2)?,
            frequency,
            interval: row.get(4)?,
            days_of_week,
            day_of_month: row.get(6)?,
            month: row.get(7)?,
            start_date: row.get(8)?,
            end_date: row.get(9)?,
            default_sticky: row.get(11)?,
            default_froggy: row.get(12)?,
            default_anxiety_inducing: row.get(13)?,
        },
        active: row.get(10)?,
        last_generated_date: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn days_to_json(days: &[u8]) -> Option<String> {
    if days.is_empty() {
        None
    } else {
        serde_json::to_string(days).ok()
    }
}

fn fetch_pattern(
    conn: &Connection,
    owner: UserId,
    id: PatternId,
) -> Result<RecurringPattern, StoreError> {
    conn.query_row(
        &format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE id = ?1 AND owner = ?2"),
        params![id, owner],
        pattern_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        kind: EntityKind::Pattern,
        id,
    })
}

fn insert_pattern(
    conn: &Connection,
    owner: UserId,
    rule: &PatternRule,
) -> Result<RecurringPattern, StoreError> {
    conn.execute(
        "INSERT INTO patterns (owner, title, frequency, interval, days_of_week, day_of_month, month,
                               start_date, end_date, active, default_sticky, default_froggy,
                               default_anxiety_inducing, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11, ?12, ?13)",
        params![
            owner,
            rule.title,
            rule.frequency.as_str(),
            rule.interval,
            days_to_json(&rule.days_of_week),
            rule.day_of_month,
            rule.month,
            rule.start_date,
            rule.end_date,
            rule.default_sticky,
            rule.default_froggy,
            rule.default_anxiety_inducing,
            Utc::now(),
        ],
    )?;
    fetch_pattern(conn, owner, conn.last_insert_rowid())
}

impl TaskStore {
    pub fn create_pattern(
        &self,
        owner: UserId,
        rule: PatternRule,
    ) -> Result<RecurringPattern, StoreError> {
        let rule = rule.validated()?;
        let pattern = self.write(|tx| insert_pattern(tx, owner, &rule))?;
        tracing::info!(
            owner,
            pattern_id = pattern.id,
            rule = %pattern.describe(),
            "recurring pattern created"
        );
        Ok(pattern)
    }

    pub fn get_pattern(&self, owner: UserId, id: PatternId) -> Result<RecurringPattern, StoreError> {
        self.read(|conn| fetch_pattern(conn, owner, id))
    }

    /// 按创建时间排序
    pub fn list_patterns(
        &self,
        owner: UserId,
        active_only: bool,
    ) -> Result<Vec<RecurringPattern>, StoreError> {
        let clause = if active_only { "AND active = 1" } else { "" };
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PATTERN_COLUMNS} FROM patterns WHERE owner = ?1 {clause}
                 ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map(params![owner], pattern_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// 批量生成用：所有用户（或指定用户）的活跃规则
    pub fn list_active_patterns(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<RecurringPattern>, StoreError> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PATTERN_COLUMNS} FROM patterns
                 WHERE active = 1 AND (?1 IS NULL OR owner = ?1)
                 ORDER BY owner, id"
            ))?;
            let rows = stmt.query_map(params![owner], pattern_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// 合并更新并重新校验；无变化时不写库
    pub fn update_pattern(
        &self,
        owner: UserId,
        id: PatternId,
        update: PatternUpdate,
    ) -> Result<(RecurringPattern, Vec<String>), StoreError> {
        let (pattern, changes) = self.write(|tx| {
            let mut pattern = fetch_pattern(tx, owner, id)?;
            let changes = update.merge_into(&mut pattern.rule);
            if changes.is_empty() {
                return Ok((pattern, changes));
            }
            pattern.rule = pattern.rule.validated()?;
            let r = &pattern.rule;
            tx.execute(
                "UPDATE patterns SET title = ?1, frequency = ?2, interval = ?3, days_of_week = ?4,
                                     day_of_month = ?5, month = ?6, start_date = ?7, end_date = ?8,
                                     default_sticky = ?9, default_froggy = ?10,
                                     default_anxiety_inducing = ?11
                 WHERE id = ?12 AND owner = ?13",
                params![
                    r.title,
                    r.frequency.as_str(),
                    r.interval,
                    days_to_json(&r.days_of_week),
                    r.day_of_month,
                    r.month,
                    r.start_date,
                    r.end_date,
                    r.default_sticky,
                    r.default_froggy,
                    r.default_anxiety_inducing,
                    id,
                    owner,
                ],
            )?;
            Ok((pattern, changes))
        })?;
        if !changes.is_empty() {
            tracing::info!(owner, pattern_id = id, changes = %changes.join(", "), "recurring pattern updated");
        }
        Ok((pattern, changes))
    }

    /// 暂停 / 恢复；返回 (规则, 是否实际改变)。重复操作不报错
    pub fn set_pattern_active(
        &self,
        owner: UserId,
        id: PatternId,
        active: bool,
    ) -> Result<(RecurringPattern, bool), StoreError> {
        let (pattern, changed) = self.write(|tx| {
            let mut pattern = fetch_pattern(tx, owner, id)?;
            if pattern.active == active {
                return Ok((pattern, false));
            }
            tx.execute(
                "UPDATE patterns SET active = ?1 WHERE id = ?2 AND owner = ?3",
                params![active, id, owner],
            )?;
            pattern.active = active;
            Ok((pattern, true))
        })?;
        tracing::info!(owner, pattern_id = id, active, changed, "recurring pattern state set");
        Ok((pattern, changed))
    }

    /// 删除规则；已生成的任务保留，pattern_id 由外键置空
    pub fn delete_pattern(
        &self,
        owner: UserId,
        id: PatternId,
    ) -> Result<RecurringPattern, StoreError> {
        let pattern = self.write(|tx| {
            let pattern = fetch_pattern(tx, owner, id)?;
            tx.execute(
                "DELETE FROM patterns WHERE id = ?1 AND owner = ?2",
                params![id, owner],
            )?;
            Ok(pattern)
        })?;
        tracing::info!(owner, pattern_id = id, "recurring pattern deleted");
        Ok(pattern)
    }

    /// 把单个任务升级为每日循环；已关联规则则直接返回该规则
    pub fn promote_to_pattern(
        &self,
        owner: UserId,
        task_id: TaskId,
    ) -> Result<(RecurringPattern, bool), StoreError> {
        self.write(|tx| {
            let task = fetch_owned(tx, owner, task_id)?;
            if let Some(pattern_id) = task.pattern_id {
                return Ok((fetch_pattern(tx, owner, pattern_id)?, false));
            }
            let rule = PatternRule::daily(task.title.clone(), task.date).validated()?;
            let pattern = insert_pattern(tx, owner, &rule)?;
            tx.execute(
                "UPDATE tasks SET pattern_id = ?1 WHERE id = ?2 AND owner = ?3",
                params![pattern.id, task_id, owner],
            )?;
            tracing::info!(owner, task_id, pattern_id = pattern.id, "task promoted to recurring");
            Ok((pattern, true))
        })
    }
}
