//! Completion provider 抽象
//!
//! 发送带角色的消息列表与可用工具声明，返回最终文本或一组工具调用请求；与具体厂商无关。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::memory::Message;
use crate::tools::ToolSpec;

/// provider 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// provider 请求的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// 本轮为何停止
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Final,
    ToolRequested,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub stop: StopReason,
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            stop: StopReason::Final,
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            stop: StopReason::ToolRequested,
            text: None,
            tool_calls,
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 用于日志与事件
    fn name(&self) -> &str;

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Completion, LlmError>;
}
