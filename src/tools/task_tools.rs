//! 任务类工具：输入契约与执行函数

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::ToolError;
use crate::store::{
    NewTask, StatusField, StatusFilter, Task, TaskEdit, TaskId, TaskStatus, PatternId,
};
use crate::tools::request::{parse_date, resolve_date, ToolContext};

/// Create a single task.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTaskInput {
    /// Title of the task (max 500 characters)
    pub title: String,
    /// Date in YYYY-MM-DD format; defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// Carry forward to the next day while unresolved
    #[serde(default)]
    pub sticky: bool,
    /// Mark as the single most important task (frog) of the day
    #[serde(default)]
    pub froggy: bool,
    /// Mark as anxiety-inducing (charged)
    #[serde(default)]
    pub anxiety_inducing: bool,
}

/// One item of a batch.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchTaskItem {
    /// Title of the task
    pub title: String,
    /// Date in YYYY-MM-DD format; defaults to today
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub froggy: bool,
    #[serde(default)]
    pub anxiety_inducing: bool,
}

/// Create up to 20 tasks in one call.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTasksBatchInput {
    /// Tasks to create
    pub tasks: Vec<BatchTaskItem>,
}

/// Set one status flag.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTaskStatusInput {
    /// ID of the task
    pub task_id: TaskId,
    /// Which flag to set
    pub field: StatusField,
    /// New value of the flag
    pub value: bool,
}

/// Edit title and/or date.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTaskInput {
    /// ID of the task
    pub task_id: TaskId,
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New date in YYYY-MM-DD format
    #[serde(default)]
    pub date: Option<String>,
}

/// Identify a task.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TaskIdInput {
    /// ID of the task
    pub task_id: TaskId,
}

/// Reorder one date's tasks.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReorderTasksInput {
    /// Date in YYYY-MM-DD format; defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// Every task ID of that date, in the desired order
    pub task_ids: Vec<TaskId>,
}

/// List tasks of a date.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTasksInput {
    /// Date in YYYY-MM-DD format; defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// active, completed, neverminded or all (default)
    #[serde(default)]
    pub status_filter: StatusFilter,
}

/// 返回给调用方的任务视图
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub date: NaiveDate,
    pub status: TaskStatus,
    pub order: i64,
    pub sticky: bool,
    pub froggy: bool,
    pub anxiety_inducing: bool,
    pub pattern_id: Option<PatternId>,
}

impl From<&Task> for TaskView {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            date: t.date,
            status: t.status(),
            order: t.order,
            sticky: t.sticky,
            froggy: t.froggy,
            anxiety_inducing: t.anxiety_inducing,
            pattern_id: t.pattern_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskOutput {
    pub task: TaskView,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TaskListOutput {
    pub date: NaiveDate,
    pub count: usize,
    pub tasks: Vec<TaskView>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TaskChangesOutput {
    pub task: TaskView,
    pub changes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedTaskOutput {
    pub task_id: TaskId,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TaskDetailOutput {
    pub task: TaskView,
    pub created_at: DateTime<Utc>,
    /// 生成该任务的规则描述
    pub recurring: Option<String>,
}

pub(crate) fn create_task(ctx: &ToolContext<'_>, input: CreateTaskInput) -> Result<TaskOutput, ToolError> {
    let date = resolve_date("date", input.date.as_deref(), ctx.today)?;
    let new = NewTask::new(input.title, date)
        .sticky(input.sticky)
        .froggy(input.froggy)
        .anxiety_inducing(input.anxiety_inducing);
    let task = ctx.store.create_task(ctx.owner, new)?;
    Ok(TaskOutput {
        message: format!("Created task '{}' for {}", task.title, task.date),
        task: TaskView::from(&task),
    })
}

pub(crate) fn create_tasks_batch(
    ctx: &ToolContext<'_>,
    input: CreateTasksBatchInput,
) -> Result<TaskListOutput, ToolError> {
    let mut items = Vec::with_capacity(input.tasks.len());
    for (idx, item) in input.tasks.into_iter().enumerate() {
        let date = resolve_date("date", item.date.as_deref(), ctx.today)
            .map_err(|e| ToolError::InvalidInput(format!("Task #{}: {e}", idx + 1)))?;
        items.push(
            NewTask::new(item.title, date)
                .sticky(item.sticky)
                .froggy(item.froggy)
                .anxiety_inducing(item.anxiety_inducing),
        );
    }
    let created = ctx.store.create_tasks(ctx.owner, items)?;
    let date = created.first().map(|t| t.date).unwrap_or(ctx.today);
    Ok(TaskListOutput {
        date,
        count: created.len(),
        message: format!("Created {} task(s)", created.len()),
        tasks: created.iter().map(TaskView::from).collect(),
    })
}

pub(crate) fn update_task_status(
    ctx: &ToolContext<'_>,
    input: UpdateTaskStatusInput,
) -> Result<TaskOutput, ToolError> {
    let task = ctx
        .store
        .set_flag(ctx.owner, input.task_id, input.field, input.value)?;
    Ok(TaskOutput {
        message: format!(
            "Set {} = {} on '{}'",
            input.field.display_name(),
            input.value,
            task.title
        ),
        task: TaskView::from(&task),
    })
}

pub(crate) fn update_task(
    ctx: &ToolContext<'_>,
    input: UpdateTaskInput,
) -> Result<TaskChangesOutput, ToolError> {
    let date = input
        .date
        .as_deref()
        .map(|raw| parse_date("date", raw))
        .transpose()?;
    let edit = TaskEdit {
        title: input.title,
        date,
    };
    let (task, changes) = ctx.store.edit_task(ctx.owner, input.task_id, edit)?;
    let message = if changes.is_empty() {
        "No changes made - task already has the specified values".to_string()
    } else {
        format!("Successfully updated task: {}", changes.join(", "))
    };
    Ok(TaskChangesOutput {
        task: TaskView::from(&task),
        changes,
        message,
    })
}

pub(crate) fn delete_task(ctx: &ToolContext<'_>, input: TaskIdInput) -> Result<DeletedTaskOutput, ToolError> {
    let task = ctx.store.delete_task(ctx.owner, input.task_id)?;
    Ok(DeletedTaskOutput {
        task_id: task.id,
        message: format!("Deleted task '{}'", task.title),
        title: task.title,
    })
}

pub(crate) fn reorder_tasks(
    ctx: &ToolContext<'_>,
    input: ReorderTasksInput,
) -> Result<TaskListOutput, ToolError> {
    let date = resolve_date("date", input.date.as_deref(), ctx.today)?;
    let tasks = ctx.store.reorder(ctx.owner, date, &input.task_ids)?;
    Ok(TaskListOutput {
        date,
        count: tasks.len(),
        message: format!("Reordered {} task(s) for {date}", tasks.len()),
        tasks: tasks.iter().map(TaskView::from).collect(),
    })
}

pub(crate) fn list_tasks(ctx: &ToolContext<'_>, input: ListTasksInput) -> Result<TaskListOutput, ToolError> {
    let date = resolve_date("date", input.date.as_deref(), ctx.today)?;
    let tasks = ctx.store.list_tasks(ctx.owner, date, input.status_filter)?;
    Ok(TaskListOutput {
        date,
        count: tasks.len(),
        message: format!(
            "Found {} {} task(s) for {date}",
            tasks.len(),
            input.status_filter.as_str()
        ),
        tasks: tasks.iter().map(TaskView::from).collect(),
    })
}

pub(crate) fn get_task_details(
    ctx: &ToolContext<'_>,
    input: TaskIdInput,
) -> Result<TaskDetailOutput, ToolError> {
    let task = ctx.store.get_task(ctx.owner, input.task_id)?;
    let recurring = match task.pattern_id {
        Some(id) => ctx.store.get_pattern(ctx.owner, id).ok().map(|p| p.describe()),
        None => None,
    };
    Ok(TaskDetailOutput {
        task: TaskView::from(&task),
        created_at: task.created_at,
        recurring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ctx(store: &TaskStore) -> ToolContext<'_> {
        ToolContext {
            store,
            owner: 1,
            today: d(2025, 1, 6),
        }
    }

    #[test]
    fn date_defaults_to_today() {
        let s = TaskStore::open_in_memory().unwrap();
        let out = create_task(
            &ctx(&s),
            CreateTaskInput {
                title: "Call mom".into(),
                date: None,
                sticky: false,
                froggy: true,
                anxiety_inducing: false,
            },
        )
        .unwrap();
        assert_eq!(out.task.date, d(2025, 1, 6));
        assert!(out.task.froggy);
    }

    #[test]
    fn bad_batch_date_names_the_item() {
        let s = TaskStore::open_in_memory().unwrap();
        let input: CreateTasksBatchInput = serde_json::from_value(serde_json::json!({
            "tasks": [{"title": "a"}, {"title": "b", "date": "tomorrow"}]
        }))
        .unwrap();
        let err = create_tasks_batch(&ctx(&s), input).unwrap_err().to_string();
        assert_eq!(err, "Task #2: Invalid date format: tomorrow. Use YYYY-MM-DD.");
    }

    #[test]
    fn update_without_changes_says_so() {
        let s = TaskStore::open_in_memory().unwrap();
        let t = s.create_task(1, NewTask::new("Same", d(2025, 1, 6))).unwrap();
        let out = update_task(
            &ctx(&s),
            UpdateTaskInput {
                task_id: t.id,
                title: Some("Same".into()),
                date: None,
            },
        )
        .unwrap();
        assert!(out.changes.is_empty());
        assert!(out.message.starts_with("No changes made"));
    }

    #[test]
    fn details_include_recurrence() {
        let s = TaskStore::open_in_memory().unwrap();
        let t = s.create_task(1, NewTask::new("Stretch", d(2025, 1, 6))).unwrap();
        s.promote_to_pattern(1, t.id).unwrap();
        let out = get_task_details(&ctx(&s), TaskIdInput { task_id: t.id }).unwrap();
        assert_eq!(out.recurring.as_deref(), Some("daily"));
    }
}
