//! Mock provider（用于测试与离线演示，无需 API）

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::traits::{Completion, CompletionProvider, LlmError, ToolCall};
use crate::memory::Message;
use crate::tools::ToolSpec;

/// 按顺序返回预设结果；脚本用完后返回固定文本
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<Completion, LlmError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>, script: Vec<Completion>) -> Self {
        Self::with_results(name, script.into_iter().map(Ok).collect())
    }

    pub fn with_results(name: impl Into<String>, script: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用时收到的消息
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Completion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(Completion::text("(script exhausted)")))
    }
}

/// 总是失败
pub struct FailingProvider {
    name: String,
    error: LlmError,
}

impl FailingProvider {
    pub fn new(name: impl Into<String>, error: LlmError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<Completion, LlmError> {
        Err(self.error.clone())
    }
}

/// 每轮都请求同一个工具调用（用于测试回合上限）
pub struct LoopingToolProvider {
    tool: String,
    arguments: Value,
    calls: AtomicUsize,
}

impl LoopingToolProvider {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for LoopingToolProvider {
    fn name(&self) -> &str {
        "looping"
    }

    async fn complete(&self, _messages: &[Message], _tools: &[ToolSpec]) -> Result<Completion, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion::tools(vec![ToolCall {
            id: format!("call_{n}"),
            name: self.tool.clone(),
            arguments: self.arguments.clone(),
        }]))
    }
}
