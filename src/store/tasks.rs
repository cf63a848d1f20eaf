//! Task 的读写
//!
//! 「每个 (owner, date) 至多一个 froggy」在以下路径上都要成立：单建、批量建、改标记、改日期、循环生成。
//! 所有这些写都走 `TaskStore::write`（IMMEDIATE 事务），检查与写入在同一事务内。

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::{EntityKind, StoreError};
use crate::store::model::{
    normalize_title, NewTask, RecurringPattern, StatusField, StatusFilter, Task, TaskId, UserId,
};
use crate::store::TaskStore;

/// 单次批量创建的上限
pub const MAX_BATCH_SIZE: usize = 20;

pub(crate) const TASK_COLUMNS: &str = "id, owner, title, date, created_at, sort_order, \
     completed, neverminded, sticky, froggy, anxiety_inducing, pattern_id";

/// 标题 / 日期编辑；None 表示不改
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
}

/// 从循环规则物化任务的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Created(Task),
    /// 同 (owner, date, title, pattern) 已存在
    Duplicate(TaskId),
    /// 规则默认 froggy，而当天已有 frog
    FrogTaken(TaskId),
}

pub(crate) fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        date: row.get(3)?,
        created_at: row.get(4)?,
        order: row.get(5)?,
        completed: row.get(6)?,
        neverminded: row.get(7)?,
        sticky: row.get(8)?,
        froggy: row.get(9)?,
        anxiety_inducing: row.get(10)?,
        pattern_id: row.get(11)?,
    })
}

/// 按 id + owner 取任务；不存在与不属于本人返回同一个 NotFound
pub(crate) fn fetch_owned(conn: &Connection, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner = ?2"),
        params![id, owner],
        task_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound {
        kind: EntityKind::Task,
        id,
    })
}

pub(crate) fn find_frog(
    conn: &Connection,
    owner: UserId,
    date: NaiveDate,
    exclude: Option<TaskId>,
) -> Result<Option<Task>, StoreError> {
    let frog = conn
        .query_row(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE owner = ?1 AND date = ?2 AND froggy = 1 AND id != ?3
                 LIMIT 1"
            ),
            params![owner, date, exclude.unwrap_or(-1)],
            task_from_row,
        )
        .optional()?;
    Ok(frog)
}

/// 写 froggy = true 之前调用；必须处于写事务中
fn ensure_no_frog(
    conn: &Connection,
    owner: UserId,
    date: NaiveDate,
    exclude: Option<TaskId>,
) -> Result<(), StoreError> {
    match find_frog(conn, owner, date, exclude)? {
        Some(existing) => {
            tracing::warn!(owner, %date, existing_id = existing.id, "frog conflict");
            Err(StoreError::FrogConflict {
                date,
                existing_id: existing.id,
                existing_title: existing.title,
            })
        }
        None => Ok(()),
    }
}

/// 唯一索引兜底：违反 idx_tasks_one_frog 时转成 FrogConflict
fn frog_violation(
    conn: &Connection,
    owner: UserId,
    date: NaiveDate,
    exclude: Option<TaskId>,
    err: rusqlite::Error,
) -> StoreError {
    let is_constraint = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    );
    if is_constraint {
        if let Ok(Some(existing)) = find_frog(conn, owner, date, exclude) {
            return StoreError::FrogConflict {
                date,
                existing_id: existing.id,
                existing_title: existing.title,
            };
        }
    }
    StoreError::Storage(err)
}

fn next_order(conn: &Connection, owner: UserId, date: NaiveDate) -> Result<i64, StoreError> {
    let order = conn.query_row(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE owner = ?1 AND date = ?2",
        params![owner, date],
        |row| row.get(0),
    )?;
    Ok(order)
}

fn insert_task(conn: &Connection, owner: UserId, new: &NewTask) -> Result<Task, StoreError> {
    let order = next_order(conn, owner, new.date)?;
    conn.execute(
        "INSERT INTO tasks (owner, title, date, created_at, sort_order, completed, neverminded,
                            sticky, froggy, anxiety_inducing, pattern_id)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7, ?8, ?9)",
        params![
            owner,
            new.title,
            new.date,
            Utc::now(),
            order,
            new.sticky,
            new.froggy,
            new.anxiety_inducing,
            new.pattern_id,
        ],
    )
    .map_err(|e| frog_violation(conn, owner, new.date, None, e))?;
    fetch_owned(conn, owner, conn.last_insert_rowid())
}

fn write_row(conn: &Connection, task: &Task) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE tasks SET title = ?1, date = ?2, sort_order = ?3, completed = ?4, neverminded = ?5,
                          sticky = ?6, froggy = ?7, anxiety_inducing = ?8
         WHERE id = ?9 AND owner = ?10",
        params![
            task.title,
            task.date,
            task.order,
            task.completed,
            task.neverminded,
            task.sticky,
            task.froggy,
            task.anxiety_inducing,
            task.id,
            task.owner,
        ],
    )
    .map_err(|e| frog_violation(conn, task.owner, task.date, Some(task.id), e))?;
    Ok(())
}

fn list_in(
    conn: &Connection,
    owner: UserId,
    date: NaiveDate,
    filter: StatusFilter,
) -> Result<Vec<Task>, StoreError> {
    let clause = match filter {
        StatusFilter::All => "",
        StatusFilter::Active => "AND completed = 0 AND neverminded = 0",
        StatusFilter::Completed => "AND completed = 1",
        StatusFilter::Neverminded => "AND neverminded = 1",
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 AND date = ?2 {clause}
         ORDER BY sort_order, created_at, id"
    ))?;
    let rows = stmt.query_map(params![owner, date], task_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn apply_flag(task: &mut Task, field: StatusField, value: bool) {
    match field {
        StatusField::Completed => {
            task.completed = value;
            if value {
                task.neverminded = false;
            }
        }
        StatusField::Neverminded => {
            task.neverminded = value;
            if value {
                task.completed = false;
            }
        }
        StatusField::Sticky => task.sticky = value,
        StatusField::Froggy => task.froggy = value,
        StatusField::AnxietyInducing => task.anxiety_inducing = value,
    }
}

impl TaskStore {
    pub fn create_task(&self, owner: UserId, mut new: NewTask) -> Result<Task, StoreError> {
        new.title = normalize_title(&new.title)?;
        let task = self.write(|tx| {
            if new.froggy {
                ensure_no_frog(tx, owner, new.date, None)?;
            }
            insert_task(tx, owner, &new)
        })?;
        tracing::info!(owner, task_id = task.id, date = %task.date, "task created");
        Ok(task)
    }

    /// 批量创建：全部校验通过后在同一事务内写入，任何一项失败都不落库
    pub fn create_tasks(&self, owner: UserId, items: Vec<NewTask>) -> Result<Vec<Task>, StoreError> {
        if items.is_empty() {
            return Err(StoreError::Validation(
                "tasks list is required and cannot be empty".to_string(),
            ));
        }
        if items.len() > MAX_BATCH_SIZE {
            return Err(StoreError::Validation(format!(
                "Cannot create more than {MAX_BATCH_SIZE} tasks at once"
            )));
        }
        let mut validated = Vec::with_capacity(items.len());
        for (idx, mut item) in items.into_iter().enumerate() {
            item.title = normalize_title(&item.title)
                .map_err(|e| StoreError::Validation(format!("Task #{}: {e}", idx + 1)))?;
            validated.push(item);
        }
        if validated.iter().filter(|t| t.froggy).count() > 1 {
            return Err(StoreError::Validation(
                "Cannot create multiple frogs in the same batch. Only one frog per day allowed."
                    .to_string(),
            ));
        }

        let created = self.write(|tx| {
            for item in validated.iter().filter(|t| t.froggy) {
                ensure_no_frog(tx, owner, item.date, None)?;
            }
            validated
                .iter()
                .map(|item| insert_task(tx, owner, item))
                .collect::<Result<Vec<_>, _>>()
        })?;
        tracing::info!(owner, count = created.len(), "batch created tasks");
        Ok(created)
    }

    pub fn get_task(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        self.read(|conn| fetch_owned(conn, owner, id))
    }

    /// 某日任务，按 order、created_at 排序
    pub fn list_tasks(
        &self,
        owner: UserId,
        date: NaiveDate,
        filter: StatusFilter,
    ) -> Result<Vec<Task>, StoreError> {
        self.read(|conn| list_in(conn, owner, date, filter))
    }

    pub fn find_frog(&self, owner: UserId, date: NaiveDate) -> Result<Option<Task>, StoreError> {
        self.read(|conn| find_frog(conn, owner, date, None))
    }

    /// 设置单个标记；completed 与 neverminded 置 true 时互相清除
    pub fn set_flag(
        &self,
        owner: UserId,
        id: TaskId,
        field: StatusField,
        value: bool,
    ) -> Result<Task, StoreError> {
        let task = self.write(|tx| {
            let mut task = fetch_owned(tx, owner, id)?;
            if field == StatusField::Froggy && value {
                ensure_no_frog(tx, owner, task.date, Some(id))?;
            }
            apply_flag(&mut task, field, value);
            write_row(tx, &task)?;
            Ok(task)
        })?;
        tracing::info!(owner, task_id = id, field = field.column(), value, "task flag updated");
        Ok(task)
    }

    pub fn mark_completed(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        self.set_flag(owner, id, StatusField::Completed, true)
    }

    pub fn mark_neverminded(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        self.set_flag(owner, id, StatusField::Neverminded, true)
    }

    pub fn toggle_completed(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        self.write(|tx| {
            let mut task = fetch_owned(tx, owner, id)?;
            let value = !task.completed;
            apply_flag(&mut task, StatusField::Completed, value);
            write_row(tx, &task)?;
            Ok(task)
        })
    }

    /// 改标题 / 日期；返回更新后的任务与变更描述（无变化时为空，不写库）
    pub fn edit_task(
        &self,
        owner: UserId,
        id: TaskId,
        edit: TaskEdit,
    ) -> Result<(Task, Vec<String>), StoreError> {
        let new_title = edit.title.as_deref().map(normalize_title).transpose()?;
        let (task, changes) = self.write(|tx| {
            let mut task = fetch_owned(tx, owner, id)?;
            let mut changes = Vec::new();
            if let Some(title) = new_title {
                if title != task.title {
                    changes.push(format!("title: '{}' -> '{}'", task.title, title));
                    task.title = title;
                }
            }
            if let Some(date) = edit.date {
                if date != task.date {
                    if task.froggy {
                        ensure_no_frog(tx, owner, date, Some(id))?;
                    }
                    changes.push(format!("date: {} -> {}", task.date, date));
                    task.order = next_order(tx, owner, date)?;
                    task.date = date;
                }
            }
            if !changes.is_empty() {
                write_row(tx, &task)?;
            }
            Ok((task, changes))
        })?;
        if !changes.is_empty() {
            tracing::info!(owner, task_id = id, changes = %changes.join(", "), "task edited");
        }
        Ok((task, changes))
    }

    /// 删除任务，返回被删除的记录
    pub fn delete_task(&self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        let task = self.write(|tx| {
            let task = fetch_owned(tx, owner, id)?;
            tx.execute("DELETE FROM tasks WHERE id = ?1 AND owner = ?2", params![id, owner])?;
            Ok(task)
        })?;
        tracing::info!(owner, task_id = id, "task deleted");
        Ok(task)
    }

    /// 按给定顺序重排某日任务：ids 必须恰好是该日全部任务的一个排列，否则整体拒绝
    pub fn reorder(
        &self,
        owner: UserId,
        date: NaiveDate,
        ids: &[TaskId],
    ) -> Result<Vec<Task>, StoreError> {
        if ids.is_empty() {
            return Err(StoreError::Validation(
                "task_ids list is required and cannot be empty".to_string(),
            ));
        }
        let tasks = self.write(|tx| {
            let existing: HashSet<TaskId> = list_in(tx, owner, date, StatusFilter::All)?
                .into_iter()
                .map(|t| t.id)
                .collect();
            let supplied: HashSet<TaskId> = ids.iter().copied().collect();
            if supplied.len() != ids.len() || supplied != existing {
                return Err(StoreError::ReorderMismatch {
                    date,
                    expected: existing.len(),
                    supplied: ids.len(),
                });
            }
            for (idx, id) in ids.iter().enumerate() {
                tx.execute(
                    "UPDATE tasks SET sort_order = ?1 WHERE id = ?2 AND owner = ?3",
                    params![idx as i64, id, owner],
                )?;
            }
            list_in(tx, owner, date, StatusFilter::All)
        })?;
        tracing::info!(owner, %date, count = ids.len(), "tasks reordered");
        Ok(tasks)
    }

    pub fn latest_task_date(&self, owner: UserId) -> Result<Option<NaiveDate>, StoreError> {
        self.read(|conn| {
            let date = conn.query_row(
                "SELECT MAX(date) FROM tasks WHERE owner = ?1",
                params![owner],
                |row| row.get::<_, Option<NaiveDate>>(0),
            )?;
            Ok(date)
        })
    }

    /// 把 from 当天 sticky 且未放弃的任务复制到 to；to 上已有同名 sticky 任务则跳过
    pub fn copy_sticky_forward(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        self.write(|tx| {
            let sources: Vec<Task> = list_in(tx, owner, from, StatusFilter::All)?
                .into_iter()
                .filter(|t| t.sticky && !t.neverminded)
                .collect();
            let mut created = Vec::new();
            for source in sources {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM tasks
                      WHERE owner = ?1 AND date = ?2 AND title = ?3 AND sticky = 1)",
                    params![owner, to, source.title],
                    |row| row.get(0),
                )?;
                if !exists {
                    let new = NewTask::new(source.title.clone(), to).sticky(true);
                    created.push(insert_task(tx, owner, &new)?);
                }
            }
            Ok(created)
        })
    }

    /// 从最近有任务的日期起逐日复制 sticky 任务直到 today（含多日空档）
    pub fn carry_forward_until(&self, owner: UserId, today: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let Some(mut current) = self.latest_task_date(owner)? else {
            return Ok(Vec::new());
        };
        let mut created = Vec::new();
        while current < today {
            let next = current + Duration::days(1);
            created.extend(self.copy_sticky_forward(owner, current, next)?);
            current = next;
        }
        if !created.is_empty() {
            tracing::info!(owner, %today, count = created.len(), "sticky tasks carried forward");
        }
        Ok(created)
    }

    /// 从循环规则物化一个任务（幂等），单独一个事务提交
    pub fn materialize(
        &self,
        pattern: &RecurringPattern,
        date: NaiveDate,
    ) -> Result<Materialized, StoreError> {
        self.write(|tx| materialize_in(tx, pattern, date))
    }

    /// dry-run 演算：f 内所有写共用一个事务，结束时整体回滚
    ///
    /// 前面条目的演算结果（如已生成的 frog）对后面条目可见，报告与真实提交一致。
    pub fn simulate<T>(
        &self,
        f: impl FnOnce(&Simulation<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.transact(false, |tx| f(&Simulation { conn: tx }))
    }
}

/// 回滚事务内的演算句柄
pub struct Simulation<'a> {
    conn: &'a Connection,
}

impl Simulation<'_> {
    /// 单条失败只回滚到该条之前，不影响已演算的条目
    pub fn materialize(
        &self,
        pattern: &RecurringPattern,
        date: NaiveDate,
    ) -> Result<Materialized, StoreError> {
        self.conn.execute_batch("SAVEPOINT materialize")?;
        match materialize_in(self.conn, pattern, date) {
            Ok(m) => {
                self.conn.execute_batch("RELEASE materialize")?;
                Ok(m)
            }
            Err(e) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch("ROLLBACK TO materialize; RELEASE materialize")
                {
                    tracing::error!(error = %rollback, "failed to roll back simulated entry");
                }
                Err(e)
            }
        }
    }
}

/// 去重 -> frog 检查 -> 插入，调用方负责事务
fn materialize_in(
    conn: &Connection,
    pattern: &RecurringPattern,
    date: NaiveDate,
) -> Result<Materialized, StoreError> {
    let owner = pattern.owner;
    let rule = &pattern.rule;
    let existing: Option<TaskId> = conn
        .query_row(
            "SELECT id FROM tasks
             WHERE owner = ?1 AND date = ?2 AND title = ?3 AND pattern_id = ?4
             LIMIT 1",
            params![owner, date, rule.title, pattern.id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(Materialized::Duplicate(id));
    }
    if rule.default_froggy {
        if let Some(frog) = find_frog(conn, owner, date, None)? {
            return Ok(Materialized::FrogTaken(frog.id));
        }
    }
    let new = NewTask {
        title: rule.title.clone(),
        date,
        sticky: rule.default_sticky,
        froggy: rule.default_froggy,
        anxiety_inducing: rule.default_anxiety_inducing,
        pattern_id: Some(pattern.id),
    };
    let task = insert_task(conn, owner, &new)?;
    conn.execute(
        "UPDATE patterns SET last_generated_date = ?1 WHERE id = ?2",
        params![date, pattern.id],
    )?;
    Ok(Materialized::Created(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn store() -> TaskStore {
        TaskStore::open_in_memory().unwrap()
    }

    #[test]
    fn second_frog_is_rejected() {
        let s = store();
        let first = s.create_task(1, NewTask::new("Taxes", d(2025, 1, 6)).froggy(true)).unwrap();
        let err = s
            .create_task(1, NewTask::new("Gym", d(2025, 1, 6)).froggy(true))
            .unwrap_err();
        match err {
            StoreError::FrogConflict { existing_id, .. } => assert_eq!(existing_id, first.id),
            other => panic!("expected FrogConflict, got {other:?}"),
        }
        // 其他用户、其他日期不受影响
        s.create_task(2, NewTask::new("Gym", d(2025, 1, 6)).froggy(true)).unwrap();
        s.create_task(1, NewTask::new("Gym", d(2025, 1, 7)).froggy(true)).unwrap();
        let frogs = s
            .list_tasks(1, d(2025, 1, 6), StatusFilter::All)
            .unwrap()
            .into_iter()
            .filter(|t| t.froggy)
            .count();
        assert_eq!(frogs, 1);
    }

    #[test]
    fn set_flag_froggy_checks_other_tasks_only() {
        let s = store();
        let a = s.create_task(1, NewTask::new("A", d(2025, 1, 6)).froggy(true)).unwrap();
        let b = s.create_task(1, NewTask::new("B", d(2025, 1, 6))).unwrap();
        // 对已是 frog 的任务重复设置不算冲突
        s.set_flag(1, a.id, StatusField::Froggy, true).unwrap();
        assert!(matches!(
            s.set_flag(1, b.id, StatusField::Froggy, true),
            Err(StoreError::FrogConflict { .. })
        ));
        s.set_flag(1, a.id, StatusField::Froggy, false).unwrap();
        assert!(s.set_flag(1, b.id, StatusField::Froggy, true).unwrap().froggy);
    }

    #[test]
    fn completed_and_neverminded_clear_each_other() {
        let s = store();
        let t = s.create_task(1, NewTask::new("A", d(2025, 1, 6))).unwrap();
        let t = s.mark_completed(1, t.id).unwrap();
        assert!(t.completed && !t.neverminded);
        let t = s.mark_neverminded(1, t.id).unwrap();
        assert!(!t.completed && t.neverminded);
        let t = s.toggle_completed(1, t.id).unwrap();
        assert!(t.completed && !t.neverminded);
        let t = s.toggle_completed(1, t.id).unwrap();
        assert!(!t.completed);
    }

    #[test]
    fn foreign_and_missing_ids_look_the_same() {
        let s = store();
        let t = s.create_task(1, NewTask::new("Mine", d(2025, 1, 6))).unwrap();
        let foreign = s.get_task(2, t.id).unwrap_err().to_string();
        let missing = s.get_task(2, 9999).unwrap_err().to_string();
        assert_eq!(foreign.replace(&t.id.to_string(), "N"), missing.replace("9999", "N"));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let s = store();
        s.create_task(1, NewTask::new("Existing frog", d(2025, 1, 6)).froggy(true)).unwrap();
        let items = vec![
            NewTask::new("One", d(2025, 1, 6)),
            NewTask::new("Two", d(2025, 1, 6)).froggy(true),
        ];
        assert!(matches!(s.create_tasks(1, items), Err(StoreError::FrogConflict { .. })));
        assert_eq!(s.list_tasks(1, d(2025, 1, 6), StatusFilter::All).unwrap().len(), 1);

        let two_frogs = vec![
            NewTask::new("One", d(2025, 1, 7)).froggy(true),
            NewTask::new("Two", d(2025, 1, 8)).froggy(true),
        ];
        assert!(matches!(s.create_tasks(1, two_frogs), Err(StoreError::Validation(_))));

        let bad_title = vec![NewTask::new("ok", d(2025, 1, 7)), NewTask::new("  ", d(2025, 1, 7))];
        let err = s.create_tasks(1, bad_title).unwrap_err().to_string();
        assert!(err.starts_with("Task #2"));
        assert!(s.list_tasks(1, d(2025, 1, 7), StatusFilter::All).unwrap().is_empty());

        let too_many = (0..21).map(|i| NewTask::new(format!("t{i}"), d(2025, 1, 9))).collect();
        assert!(s.create_tasks(1, too_many).is_err());
    }

    #[test]
    fn moving_frog_onto_frog_day_fails() {
        let s = store();
        s.create_task(1, NewTask::new("Mon frog", d(2025, 1, 6)).froggy(true)).unwrap();
        let tue = s.create_task(1, NewTask::new("Tue frog", d(2025, 1, 7)).froggy(true)).unwrap();
        let err = s
            .edit_task(1, tue.id, TaskEdit { title: None, date: Some(d(2025, 1, 6)) })
            .unwrap_err();
        assert!(matches!(err, StoreError::FrogConflict { .. }));
        assert_eq!(s.get_task(1, tue.id).unwrap().date, d(2025, 1, 7));
    }

    #[test]
    fn edit_reports_changes() {
        let s = store();
        let t = s.create_task(1, NewTask::new("Old", d(2025, 1, 6))).unwrap();
        let (_, none) = s
            .edit_task(1, t.id, TaskEdit { title: Some(" Old ".into()), date: Some(d(2025, 1, 6)) })
            .unwrap();
        assert!(none.is_empty());
        let (t, changes) = s
            .edit_task(1, t.id, TaskEdit { title: Some("New".into()), date: Some(d(2025, 1, 8)) })
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(t.title, "New");
        assert_eq!(t.date, d(2025, 1, 8));
    }

    #[test]
    fn reorder_assigns_indices() {
        let s = store();
        let date = d(2025, 1, 6);
        let ids: Vec<TaskId> = ["a", "b", "c"]
            .iter()
            .map(|t| s.create_task(1, NewTask::new(*t, date)).unwrap().id)
            .collect();
        let wanted = vec![ids[2], ids[0], ids[1]];
        let tasks = s.reorder(1, date, &wanted).unwrap();
        let got: Vec<(TaskId, i64)> = tasks.iter().map(|t| (t.id, t.order)).collect();
        assert_eq!(got, vec![(ids[2], 0), (ids[0], 1), (ids[1], 2)]);
    }

    #[test]
    fn reorder_mismatch_changes_nothing() {
        let s = store();
        let date = d(2025, 1, 6);
        let a = s.create_task(1, NewTask::new("a", date)).unwrap().id;
        let b = s.create_task(1, NewTask::new("b", date)).unwrap().id;
        let foreign = s.create_task(2, NewTask::new("x", date)).unwrap().id;
        for bad in [vec![b], vec![b, a, a], vec![b, foreign], vec![b, a, foreign]] {
            assert!(matches!(
                s.reorder(1, date, &bad),
                Err(StoreError::ReorderMismatch { .. })
            ));
        }
        let orders: Vec<i64> = s
            .list_tasks(1, date, StatusFilter::All)
            .unwrap()
            .iter()
            .map(|t| t.order)
            .collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn list_filters_by_status() {
        let s = store();
        let date = d(2025, 1, 6);
        let a = s.create_task(1, NewTask::new("a", date)).unwrap();
        let b = s.create_task(1, NewTask::new("b", date)).unwrap();
        s.create_task(1, NewTask::new("c", date)).unwrap();
        s.mark_completed(1, a.id).unwrap();
        s.mark_neverminded(1, b.id).unwrap();
        assert_eq!(s.list_tasks(1, date, StatusFilter::Active).unwrap().len(), 1);
        assert_eq!(s.list_tasks(1, date, StatusFilter::Completed).unwrap()[0].title, "a");
        assert_eq!(s.list_tasks(1, date, StatusFilter::Neverminded).unwrap()[0].title, "b");
        assert_eq!(s.list_tasks(1, date, StatusFilter::All).unwrap().len(), 3);
    }

    #[test]
    fn sticky_tasks_carry_forward_across_gaps() {
        let s = store();
        s.create_task(1, NewTask::new("Journal", d(2025, 1, 6)).sticky(true)).unwrap();
        let dropped = s.create_task(1, NewTask::new("Dropped", d(2025, 1, 6)).sticky(true)).unwrap();
        s.mark_neverminded(1, dropped.id).unwrap();
        s.create_task(1, NewTask::new("Plain", d(2025, 1, 6))).unwrap();

        let created = s.carry_forward_until(1, d(2025, 1, 9)).unwrap();
        assert_eq!(created.len(), 3);
        let on_9th = s.list_tasks(1, d(2025, 1, 9), StatusFilter::All).unwrap();
        assert_eq!(on_9th.len(), 1);
        assert_eq!(on_9th[0].title, "Journal");
        assert!(on_9th[0].sticky && !on_9th[0].completed);

        // 再次执行不重复
        assert!(s.copy_sticky_forward(1, d(2025, 1, 8), d(2025, 1, 9)).unwrap().is_empty());
    }
}
