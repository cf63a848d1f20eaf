//! OpenAI 兼容 Chat Completions 客户端（reqwest）
//!
//! 适用于任意 `/chat/completions` 端点（OpenAI、DeepSeek、自建代理等），支持 function tools。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::traits::{Completion, CompletionProvider, LlmError, StopReason, ToolCall};
use crate::memory::{Message, Role};
use crate::tools::ToolSpec;

pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        model: &str,
        api_key: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let name = name.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured(format!("{name}: empty API key")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            name,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Message → OpenAI 消息 JSON
pub fn to_wire_message(m: &Message) -> Value {
    match m.role {
        Role::Assistant if !m.tool_calls.is_empty() => {
            let calls: Vec<Value> = m
                .tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments.to_string() },
                    })
                })
                .collect();
            let content = if m.content.is_empty() {
                Value::Null
            } else {
                Value::String(m.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": m.tool_call_id.clone().unwrap_or_default(),
            "content": m.content,
        }),
        role => json!({ "role": role.as_str(), "content": m.content }),
    }
}

pub fn to_wire_tool(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        },
    })
}

/// 解析 `/chat/completions` 响应体
pub fn parse_completion(data: &Value) -> Result<Completion, LlmError> {
    let choice = data["choices"]
        .get(0)
        .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;
    let message = &choice["message"];
    let text = message["content"].as_str().map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| LlmError::InvalidResponse("tool call without name".to_string()))?;
            let raw = call["function"]["arguments"].as_str().unwrap_or("{}");
            // 参数不是合法 JSON 时原样保留，交给工具层报告 InvalidInput
            let arguments = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            tool_calls.push(ToolCall {
                // 部分兼容端点不返回 id，结果回填需要唯一 id
                id: call["id"]
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: name.to_string(),
                arguments,
            });
        }
    }

    let stop = if tool_calls.is_empty() {
        StopReason::Final
    } else {
        StopReason::ToolRequested
    };
    Ok(Completion {
        stop,
        text,
        tool_calls,
    })
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Completion, LlmError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages.iter().map(to_wire_message).collect::<Vec<_>>(),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(to_wire_tool).collect());
        }

        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(provider = %self.name, model = %self.model, tools = tools.len(), "calling completion API");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| LlmError::Http(e.to_string()))?;
        if !status.is_success() {
            tracing::error!(provider = %self.name, status = %status, "completion API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let data: Value =
            serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parse_completion(&data)
    }
}
