//! 工具注册表
//!
//! 工具集合是封闭的：每个工具是 ToolName 的一个变体，对应一个强类型输入结构体与一个执行函数。
//! 这里提供名称解析、描述与参数 schema，供 provider 的 tools 列表使用。

use serde::Serialize;
use serde_json::Value;

use crate::tools::pattern_tools::{
    CreatePatternInput, ListPatternsInput, PatternIdInput, UpdatePatternInput,
};
use crate::tools::schema::parameters_for;
use crate::tools::task_tools::{
    CreateTaskInput, CreateTasksBatchInput, ListTasksInput, ReorderTasksInput, TaskIdInput,
    UpdateTaskInput, UpdateTaskStatusInput,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateTask,
    CreateTasksBatch,
    UpdateTaskStatus,
    UpdateTask,
    DeleteTask,
    ReorderTasks,
    ListTasks,
    GetTaskDetails,
    CreateRecurringPattern,
    ListRecurringPatterns,
    UpdateRecurringPattern,
    PauseRecurringPattern,
    ResumeRecurringPattern,
    DeleteRecurringPattern,
}

impl ToolName {
    pub const ALL: [ToolName; 14] = [
        Self::CreateTask,
        Self::CreateTasksBatch,
        Self::UpdateTaskStatus,
        Self::UpdateTask,
        Self::DeleteTask,
        Self::ReorderTasks,
        Self::ListTasks,
        Self::GetTaskDetails,
        Self::CreateRecurringPattern,
        Self::ListRecurringPatterns,
        Self::UpdateRecurringPattern,
        Self::PauseRecurringPattern,
        Self::ResumeRecurringPattern,
        Self::DeleteRecurringPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTask => "create_task",
            Self::CreateTasksBatch => "create_tasks_batch",
            Self::UpdateTaskStatus => "update_task_status",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::ReorderTasks => "reorder_tasks",
            Self::ListTasks => "list_tasks",
            Self::GetTaskDetails => "get_task_details",
            Self::CreateRecurringPattern => "create_recurring_pattern",
            Self::ListRecurringPatterns => "list_recurring_patterns",
            Self::UpdateRecurringPattern => "update_recurring_pattern",
            Self::PauseRecurringPattern => "pause_recurring_pattern",
            Self::ResumeRecurringPattern => "resume_recurring_pattern",
            Self::DeleteRecurringPattern => "delete_recurring_pattern",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// 当前所有工具都作用于某个用户的数据
    pub fn requires_actor(&self) -> bool {
        true
    }

    /// 工具描述（供 LLM 理解何时调用）
    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateTask => "Create a new task for a specific date. Use when the user asks to add, create, or track a new task. Date defaults to today.",
            Self::CreateTasksBatch => "Create several tasks at once (up to 20). Every item is validated before anything is saved; at most one item may be the frog.",
            Self::UpdateTaskStatus => "Set one status flag on a task: completed, neverminded, sticky, froggy (the single most important task of the day) or anxiety_inducing. Completing clears neverminded and vice versa.",
            Self::UpdateTask => "Change a task's title and/or move it to another date.",
            Self::DeleteTask => "Permanently delete a task.",
            Self::ReorderTasks => "Reorder all tasks of a date. task_ids must list every task of that date exactly once, in the desired order.",
            Self::ListTasks => "List tasks for a date (default today), optionally filtered by status: active, completed, neverminded or all.",
            Self::GetTaskDetails => "Get full details of a single task, including its recurring pattern if any.",
            Self::CreateRecurringPattern => "Create a recurring pattern that generates a task automatically (daily, weekly, monthly or yearly). Weekly needs days_of_week (0=Monday..6=Sunday), monthly needs day_of_month, yearly needs month and day_of_month.",
            Self::ListRecurringPatterns => "List the user's recurring patterns (active ones only by default).",
            Self::UpdateRecurringPattern => "Update fields of a recurring pattern. Only the supplied fields change; the result must still be a valid pattern.",
            Self::PauseRecurringPattern => "Pause a recurring pattern so it stops generating tasks.",
            Self::ResumeRecurringPattern => "Resume a paused recurring pattern.",
            Self::DeleteRecurringPattern => "Delete a recurring pattern. Tasks it already generated are kept.",
        }
    }

    pub fn parameters(&self) -> Value {
        match self {
            Self::CreateTask => parameters_for::<CreateTaskInput>(),
            Self::CreateTasksBatch => parameters_for::<CreateTasksBatchInput>(),
            Self::UpdateTaskStatus => parameters_for::<UpdateTaskStatusInput>(),
            Self::UpdateTask => parameters_for::<UpdateTaskInput>(),
            Self::DeleteTask | Self::GetTaskDetails => parameters_for::<TaskIdInput>(),
            Self::ReorderTasks => parameters_for::<ReorderTasksInput>(),
            Self::ListTasks => parameters_for::<ListTasksInput>(),
            Self::CreateRecurringPattern => parameters_for::<CreatePatternInput>(),
            Self::ListRecurringPatterns => parameters_for::<ListPatternsInput>(),
            Self::UpdateRecurringPattern => parameters_for::<UpdatePatternInput>(),
            Self::PauseRecurringPattern
            | Self::ResumeRecurringPattern
            | Self::DeleteRecurringPattern => parameters_for::<PatternIdInput>(),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// provider 侧的工具声明
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<ToolName> for ToolSpec {
    fn from(tool: ToolName) -> Self {
        Self {
            name: tool.as_str().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }
}

/// 全部工具声明
pub fn tool_specs() -> Vec<ToolSpec> {
    ToolName::ALL.into_iter().map(ToolSpec::from).collect()
}

/// 工具声明的 JSON 文本（调试 / 导出用）
pub fn to_schema_json() -> String {
    serde_json::to_string_pretty(&tool_specs()).unwrap_or_else(|_| "[]".to_string())
}
