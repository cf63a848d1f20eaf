//! 回合过程事件：用于 CLI / 前端展示轮次、工具调用、结果与回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 第几轮 provider 调用
    RoundStarted { round: usize, max_rounds: usize },
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具结果（预览）
    ToolResult {
        tool: String,
        success: bool,
        preview: String,
    },
    /// 主 provider 失败，已改用备
    ProviderFallback {
        primary: String,
        secondary: String,
        error: String,
    },
    Final { text: String },
    /// 达到轮次上限
    Exhausted { rounds: usize },
    Error { text: String },
}
