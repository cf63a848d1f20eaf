//! 工具执行器
//!
//! execute(actor, tool_name, input)：名称解析 → 操作者检查 → 输入解析 → 执行，
//! 无论成败都包装成统一信封，追加一条进程内执行记录与一条审计行，并输出结构化审计日志（JSON）。

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::WorkingDay;
use crate::core::{Actor, ToolError};
use crate::store::{TaskStore, UserId};
use crate::tools::registry::{tool_specs, ToolName, ToolSpec};
use crate::tools::request::{ToolContext, ToolRequest};

/// 统一结果信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ToolEnvelope {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// 回填给 provider 的文本
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"success\":{},\"error\":{:?}}}",
                self.success,
                self.error.as_deref().unwrap_or("")
            )
        })
    }
}

/// 进程内执行记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub tool: String,
    pub owner: Option<UserId>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

pub struct ToolExecutor {
    store: Arc<TaskStore>,
    clock: WorkingDay,
    log: Mutex<Vec<ExecutionRecord>>,
}

impl ToolExecutor {
    pub fn new(store: Arc<TaskStore>, clock: WorkingDay) -> Self {
        Self {
            store,
            clock,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn clock(&self) -> WorkingDay {
        self.clock
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        tool_specs()
    }

    /// 执行指定工具；永不返回 Err，所有失败都落在信封的 error 字段
    pub fn execute(&self, actor: Option<&Actor>, tool_name: &str, input: Value) -> ToolEnvelope {
        let start = Instant::now();
        let owner = actor.map(|a| a.user_id);
        let result = self.dispatch(actor, tool_name, &input);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (envelope, outcome) = match result {
            Ok(value) => (ToolEnvelope::ok(value), "ok"),
            Err(e) => {
                let outcome = match &e {
                    ToolError::UnknownTool(_) => "unknown_tool",
                    ToolError::ActorRequired => "actor_required",
                    ToolError::InvalidInput(_) => "invalid_input",
                    ToolError::Domain(_) => "error",
                };
                (ToolEnvelope::err(e.to_string()), outcome)
            }
        };

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "owner": owner,
            "ok": envelope.success,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "input_preview": input_preview(&input),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        if let Err(e) = self.store.append_audit(
            owner,
            tool_name,
            &input,
            envelope.result.as_ref(),
            envelope.error.as_deref(),
            envelope.success,
        ) {
            tracing::error!(tool = tool_name, error = %e, "failed to persist audit entry");
        }

        match self.log.lock() {
            Ok(mut log) => log.push(ExecutionRecord {
                tool: tool_name.to_string(),
                owner,
                success: envelope.success,
                error: envelope.error.clone(),
                duration_ms,
            }),
            Err(_) => tracing::error!("execution log mutex poisoned"),
        }

        envelope
    }

    fn dispatch(&self, actor: Option<&Actor>, tool_name: &str, input: &Value) -> Result<Value, ToolError> {
        let tool = ToolName::parse(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;
        if tool.requires_actor() && actor.is_none() {
            return Err(ToolError::ActorRequired);
        }
        // 没有不需要操作者的工具，数据访问总是按 owner 限定
        let owner = actor.map(|a| a.user_id).ok_or(ToolError::ActorRequired)?;
        let request = ToolRequest::parse(tool, input)?;
        let ctx = ToolContext {
            store: &self.store,
            owner,
            today: self.clock.today(),
        };
        request.run(&ctx)
    }

    /// 执行记录快照
    pub fn execution_log(&self) -> Vec<ExecutionRecord> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

fn input_preview(input: &Value) -> String {
    let s = input.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(TaskStore::open_in_memory().unwrap()), WorkingDay::default())
    }

    #[test]
    fn success_is_enveloped_and_audited() {
        let ex = executor();
        let actor = Actor::new(1);
        let env = ex.execute(Some(&actor), "create_task", json!({"title": "Write", "date": "2025-01-06"}));
        assert!(env.success, "{env:?}");
        assert_eq!(env.result.as_ref().unwrap()["task"]["title"], "Write");
        assert!(env.error.is_none());

        let audit = ex.store().list_audit(Some(1)).unwrap();
        assert_eq!(audit.len(), 1);
        assert!(audit[0].success);
        assert_eq!(ex.execution_log().len(), 1);
    }

    #[test]
    fn rejections_are_recorded_too() {
        let ex = executor();
        let unknown = ex.execute(Some(&Actor::new(1)), "create_intention", json!({}));
        assert_eq!(unknown.error.as_deref(), Some("Unknown tool: create_intention"));

        let anonymous = ex.execute(None, "list_tasks", json!({}));
        assert_eq!(
            anonymous.error.as_deref(),
            Some("User authentication required for this tool")
        );

        let log = ex.execution_log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|r| !r.success));
        assert_eq!(ex.store().list_audit(None).unwrap().len(), 2);
    }

    #[test]
    fn domain_errors_surface_in_envelope() {
        let ex = executor();
        let actor = Actor::new(1);
        let first = ex.execute(Some(&actor), "create_task", json!({"title": "A", "date": "2025-01-06", "froggy": true}));
        assert!(first.success);
        let second = ex.execute(Some(&actor), "create_task", json!({"title": "B", "date": "2025-01-06", "froggy": true}));
        assert!(!second.success);
        assert!(second.error.unwrap().contains("A frog already exists for 2025-01-06"));

        let foreign = ex.execute(Some(&Actor::new(2)), "delete_task", json!({"task_id": 1}));
        assert_eq!(
            foreign.error.as_deref(),
            Some("Task with ID 1 not found or doesn't belong to you")
        );
        let audit = ex.store().list_audit(None).unwrap();
        assert_eq!(audit.iter().filter(|a| !a.success).count(), 2);
    }

    #[test]
    fn preview_is_bounded() {
        let long = json!({"title": "x".repeat(500)});
        assert!(input_preview(&long).chars().count() <= 203);
    }
}
