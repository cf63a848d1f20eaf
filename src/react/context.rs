//! 回合上下文：把用户当天的任务渲染成文本注入 system prompt

use chrono::NaiveDate;

use crate::core::StoreError;
use crate::store::{StatusFilter, Task, TaskStore, UserId};

/// 任务前缀标记，按优先级取第一个
fn marker(task: &Task) -> &'static str {
    if task.completed {
        "[COMPLETED] "
    } else if task.neverminded {
        "[NEVERMINDED] "
    } else if task.sticky {
        "[STICKY] "
    } else if task.froggy {
        "[FROG - Most Important] "
    } else if task.anxiety_inducing {
        "[CHARGED] "
    } else {
        ""
    }
}

pub fn render_tasks(date: NaiveDate, tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No current tasks.".to_string();
    }
    let mut lines = vec![format!("{}:", date.format("%Y-%m-%d (%A)"))];
    lines.extend(
        tasks
            .iter()
            .map(|t| format!("  - {}{} (ID: {})", marker(t), t.title, t.id)),
    );
    lines.join("\n")
}

pub fn build_task_context(store: &TaskStore, owner: UserId, date: NaiveDate) -> Result<String, StoreError> {
    let tasks = store.list_tasks(owner, date, StatusFilter::All)?;
    Ok(render_tasks(date, &tasks))
}

pub fn system_prompt(today: NaiveDate, task_context: &str) -> String {
    format!(
        "You are a helpful assistant for a daily task tracking application.\n\
         Today is {}.\n\n\
         The user's current tasks are:\n{task_context}\n\n\
         You can create, update, reorder and delete tasks and manage recurring patterns with the provided tools. \
         Only one task per day can be the frog (most important). \
         Help the user prioritize and break down their work. Be concise and actionable.",
        today.format("%Y-%m-%d (%A)")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewTask;

    #[test]
    fn empty_day_has_placeholder() {
        let s = TaskStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(build_task_context(&s, 1, date).unwrap(), "No current tasks.");
    }

    #[test]
    fn markers_follow_precedence() {
        let s = TaskStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let frog = s.create_task(1, NewTask::new("Taxes", date).froggy(true)).unwrap();
        let done = s.create_task(1, NewTask::new("Dishes", date).sticky(true)).unwrap();
        s.mark_completed(1, done.id).unwrap();
        s.create_task(1, NewTask::new("Dentist", date).anxiety_inducing(true)).unwrap();

        let ctx = build_task_context(&s, 1, date).unwrap();
        let lines: Vec<&str> = ctx.lines().collect();
        assert_eq!(lines[0], "2025-01-06 (Monday):");
        assert_eq!(lines[1], format!("  - [FROG - Most Important] Taxes (ID: {})", frog.id));
        assert!(lines[2].starts_with("  - [COMPLETED] Dishes"));
        assert!(lines[3].starts_with("  - [CHARGED] Dentist"));
    }
}
