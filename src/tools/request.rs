//! 强类型工具请求：名称 + JSON 参数在边界处一次性解析为某个变体，之后只做 match 分发

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::{StoreError, ToolError};
use crate::store::{TaskStore, UserId};
use crate::tools::pattern_tools::{
    self, CreatePatternInput, ListPatternsInput, PatternIdInput, UpdatePatternInput,
};
use crate::tools::registry::ToolName;
use crate::tools::task_tools::{
    self, CreateTaskInput, CreateTasksBatchInput, ListTasksInput, ReorderTasksInput, TaskIdInput,
    UpdateTaskInput, UpdateTaskStatusInput,
};

/// 单次执行的上下文：操作者与其「今天」（工作日）
pub struct ToolContext<'a> {
    pub store: &'a TaskStore,
    pub owner: UserId,
    pub today: NaiveDate,
}

/// 解析 YYYY-MM-DD
pub fn parse_date(label: &str, raw: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ToolError::InvalidInput(format!("Invalid {label} format: {raw}. Use YYYY-MM-DD.")))
}

/// 缺省或空字符串时取 default
pub fn resolve_date(label: &str, raw: Option<&str>, default: NaiveDate) -> Result<NaiveDate, ToolError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_date(label, s),
        _ => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub enum ToolRequest {
    CreateTask(CreateTaskInput),
    CreateTasksBatch(CreateTasksBatchInput),
    UpdateTaskStatus(UpdateTaskStatusInput),
    UpdateTask(UpdateTaskInput),
    DeleteTask(TaskIdInput),
    ReorderTasks(ReorderTasksInput),
    ListTasks(ListTasksInput),
    GetTaskDetails(TaskIdInput),
    CreateRecurringPattern(CreatePatternInput),
    ListRecurringPatterns(ListPatternsInput),
    UpdateRecurringPattern(UpdatePatternInput),
    PauseRecurringPattern(PatternIdInput),
    ResumeRecurringPattern(PatternIdInput),
    DeleteRecurringPattern(PatternIdInput),
}

fn decode<T: DeserializeOwned>(tool: ToolName, input: &Value) -> Result<T, ToolError> {
    let input = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input.clone()
    };
    serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidInput(format!("Invalid input for {tool}: {e}")))
}

fn encode<T: Serialize>(output: T) -> Result<Value, ToolError> {
    serde_json::to_value(output)
        .map_err(|e| ToolError::Domain(StoreError::InvalidData(format!("cannot encode result: {e}"))))
}

impl ToolRequest {
    pub fn parse(tool: ToolName, input: &Value) -> Result<Self, ToolError> {
        Ok(match tool {
            ToolName::CreateTask => Self::CreateTask(decode(tool, input)?),
            ToolName::CreateTasksBatch => Self::CreateTasksBatch(decode(tool, input)?),
            ToolName::UpdateTaskStatus => Self::UpdateTaskStatus(decode(tool, input)?),
            ToolName::UpdateTask => Self::UpdateTask(decode(tool, input)?),
            ToolName::DeleteTask => Self::DeleteTask(decode(tool, input)?),
            ToolName::ReorderTasks => Self::ReorderTasks(decode(tool, input)?),
            ToolName::ListTasks => Self::ListTasks(decode(tool, input)?),
            ToolName::GetTaskDetails => Self::GetTaskDetails(decode(tool, input)?),
            ToolName::CreateRecurringPattern => Self::CreateRecurringPattern(decode(tool, input)?),
            ToolName::ListRecurringPatterns => Self::ListRecurringPatterns(decode(tool, input)?),
            ToolName::UpdateRecurringPattern => Self::UpdateRecurringPattern(decode(tool, input)?),
            ToolName::PauseRecurringPattern => Self::PauseRecurringPattern(decode(tool, input)?),
            ToolName::ResumeRecurringPattern => Self::ResumeRecurringPattern(decode(tool, input)?),
            ToolName::DeleteRecurringPattern => Self::DeleteRecurringPattern(decode(tool, input)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::CreateTask(_) => ToolName::CreateTask,
            Self::CreateTasksBatch(_) => ToolName::CreateTasksBatch,
            Self::UpdateTaskStatus(_) => ToolName::UpdateTaskStatus,
            Self::UpdateTask(_) => ToolName::UpdateTask,
            Self::DeleteTask(_) => ToolName::DeleteTask,
            Self::ReorderTasks(_) => ToolName::ReorderTasks,
            Self::ListTasks(_) => ToolName::ListTasks,
            Self::GetTaskDetails(_) => ToolName::GetTaskDetails,
            Self::CreateRecurringPattern(_) => ToolName::CreateRecurringPattern,
            Self::ListRecurringPatterns(_) => ToolName::ListRecurringPatterns,
            Self::UpdateRecurringPattern(_) => ToolName::UpdateRecurringPattern,
            Self::PauseRecurringPattern(_) => ToolName::PauseRecurringPattern,
            Self::ResumeRecurringPattern(_) => ToolName::ResumeRecurringPattern,
            Self::DeleteRecurringPattern(_) => ToolName::DeleteRecurringPattern,
        }
    }

    /// 执行并把类型化输出编码为 JSON
    pub fn run(self, ctx: &ToolContext<'_>) -> Result<Value, ToolError> {
        match self {
            Self::CreateTask(i) => encode(task_tools::create_task(ctx, i)?),
            Self::CreateTasksBatch(i) => encode(task_tools::create_tasks_batch(ctx, i)?),
            Self::UpdateTaskStatus(i) => encode(task_tools::update_task_status(ctx, i)?),
            Self::UpdateTask(i) => encode(task_tools::update_task(ctx, i)?),
            Self::DeleteTask(i) => encode(task_tools::delete_task(ctx, i)?),
            Self::ReorderTasks(i) => encode(task_tools::reorder_tasks(ctx, i)?),
            Self::ListTasks(i) => encode(task_tools::list_tasks(ctx, i)?),
            Self::GetTaskDetails(i) => encode(task_tools::get_task_details(ctx, i)?),
            Self::CreateRecurringPattern(i) => encode(pattern_tools::create_pattern(ctx, i)?),
            Self::ListRecurringPatterns(i) => encode(pattern_tools::list_patterns(ctx, i)?),
            Self::UpdateRecurringPattern(i) => encode(pattern_tools::update_pattern(ctx, i)?),
            Self::PauseRecurringPattern(i) => encode(pattern_tools::set_pattern_active(ctx, i, false)?),
            Self::ResumeRecurringPattern(i) => encode(pattern_tools::set_pattern_active(ctx, i, true)?),
            Self::DeleteRecurringPattern(i) => encode(pattern_tools::delete_pattern(ctx, i)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_typed_input() {
        let req = ToolRequest::parse(ToolName::ReorderTasks, &json!({"task_ids": [3, 1, 2]})).unwrap();
        match req {
            ToolRequest::ReorderTasks(input) => {
                assert_eq!(input.task_ids, vec![3, 1, 2]);
                assert!(input.date.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_is_invalid_input() {
        let err = ToolRequest::parse(ToolName::DeleteTask, &json!({"task_id": "seven"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(err.to_string().starts_with("Invalid input for delete_task"));
    }

    #[test]
    fn null_input_means_no_arguments() {
        let req = ToolRequest::parse(ToolName::ListRecurringPatterns, &Value::Null).unwrap();
        assert_eq!(req.name(), ToolName::ListRecurringPatterns);
    }

    #[test]
    fn dates_default_and_validate() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(resolve_date("date", None, today).unwrap(), today);
        assert_eq!(resolve_date("date", Some(""), today).unwrap(), today);
        assert_eq!(
            parse_date("date", "2025-02-30").unwrap_err().to_string(),
            "Invalid date format: 2025-02-30. Use YYYY-MM-DD."
        );
    }
}
