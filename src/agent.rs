//! Agent 运行时
//!
//! 把存储、工具执行器、主备 provider 组装在一起：
//! Agent::from_config 从配置构建，chat 对单条用户输入跑一个有界回合并返回结果。
//! 对话按用户持久化：每回合带上最近 HISTORY_LIMIT 条消息，每个工作日限制发送条数。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::clock::WorkingDay;
use crate::config::{AppConfig, ProviderSection, DEFAULT_MAX_MESSAGES_PER_DAY};
use crate::core::{Actor, AgentError, StoreError};
use crate::llm::{CompletionProvider, FallbackProvider, LlmError, OpenAiProvider};
use crate::memory::{Conversation, Message};
use crate::react::{
    build_task_context, run_turn, system_prompt, AgentEvent, TurnOutcome, TurnResult, TurnSession,
};
use crate::store::{ChatRecord, ChatRole, TaskStore};
use crate::tools::ToolExecutor;

/// 每回合带给模型的历史消息条数（含本次输入）
pub const HISTORY_LIMIT: usize = 20;

pub struct Agent {
    executor: ToolExecutor,
    provider: FallbackProvider,
    max_messages_per_day: u32,
}

impl Agent {
    pub fn new(store: Arc<TaskStore>, clock: WorkingDay, provider: FallbackProvider) -> Self {
        Self {
            executor: ToolExecutor::new(store, clock),
            provider,
            max_messages_per_day: DEFAULT_MAX_MESSAGES_PER_DAY,
        }
    }

    pub fn with_daily_limit(mut self, max_messages_per_day: u32) -> Self {
        self.max_messages_per_day = max_messages_per_day;
        self
    }

    /// 打开数据库并按 [llm] 段构建主备 provider；主 provider 缺少 API Key 时报错
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let store = Arc::new(TaskStore::open(&cfg.app.database_path)?);
        let provider = build_provider(cfg)?;
        Ok(Self::new(store, WorkingDay::new(cfg.schedule.rollover_hour), provider)
            .with_daily_limit(cfg.llm.max_messages_per_day))
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        self.executor.store()
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// 一个用户回合：检查每日限额，注入当天任务上下文与最近对话，运行有界回合并保存双方消息
    ///
    /// provider 不可用时只保留用户消息，不写入助手回复。
    pub async fn chat(
        &self,
        actor: &Actor,
        message: &str,
        event_tx: Option<&UnboundedSender<AgentEvent>>,
    ) -> Result<TurnResult, AgentError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        let owner = actor.user_id;
        let today = self.executor.clock().today();
        let sent = self.store().count_user_messages_on(owner, today)?;
        if sent >= self.max_messages_per_day as usize {
            tracing::warn!(owner, sent, limit = self.max_messages_per_day, "daily message limit reached");
            return Err(AgentError::DailyLimit(self.max_messages_per_day));
        }

        let context = build_task_context(self.store(), owner, today)?;
        let mut conversation = Conversation::new(system_prompt(today, &context));
        for record in self.store().recent_chat(owner, HISTORY_LIMIT - 1)? {
            conversation.push(match record.role {
                ChatRole::User => Message::user(record.content),
                ChatRole::Assistant => Message::assistant(record.content),
            });
        }
        self.store()
            .append_chat(owner, ChatRole::User, message, None, None, today)?;

        let mut session = TurnSession::new(&self.provider, &self.executor, actor);
        if let Some(tx) = event_tx {
            session = session.with_event_tx(tx);
        }
        let result = run_turn(&session, &mut conversation, message).await;

        if result.outcome != TurnOutcome::ProviderUnavailable {
            let tools = if result.tool_executions.is_empty() {
                None
            } else {
                Some(serde_json::to_value(&result.tool_executions).map_err(|e| {
                    StoreError::InvalidData(format!("tool executions: {e}"))
                })?)
            };
            self.store().append_chat(
                owner,
                ChatRole::Assistant,
                &result.response,
                tools.as_ref(),
                result.provider.as_deref(),
                today,
            )?;
        }
        Ok(result)
    }

    /// 该用户的完整对话记录（正序）
    pub fn history(&self, actor: &Actor) -> Result<Vec<ChatRecord>, AgentError> {
        Ok(self.store().list_chat(actor.user_id)?)
    }

    /// 清空该用户的对话记录，返回删除条数
    pub fn clear_history(&self, actor: &Actor) -> Result<usize, AgentError> {
        Ok(self.store().clear_chat(actor.user_id)?)
    }
}

fn openai_from_section(
    name: &str,
    section: &ProviderSection,
    cfg: &AppConfig,
) -> Result<OpenAiProvider, LlmError> {
    let key = section
        .api_key()
        .ok_or_else(|| LlmError::NotConfigured(format!("{name}: {} is not set", section.api_key_env)))?;
    OpenAiProvider::new(
        name,
        &section.base_url,
        &section.model,
        &key,
        cfg.llm.max_tokens,
        Duration::from_secs(cfg.llm.request_timeout_secs),
    )
}

/// 主 provider 必须可用；备 provider 配置错误只记录告警并按无回退处理
pub fn build_provider(cfg: &AppConfig) -> Result<FallbackProvider, AgentError> {
    let primary = openai_from_section("primary", &cfg.llm.primary, cfg)
        .map_err(|e| AgentError::ConfigError(e.to_string()))?;
    let secondary = match &cfg.llm.secondary {
        Some(section) => match openai_from_section("secondary", section, cfg) {
            Ok(p) => Some(Arc::new(p) as Arc<dyn CompletionProvider>),
            Err(e) => {
                tracing::warn!(error = %e, "secondary provider disabled");
                None
            }
        },
        None => None,
    };
    tracing::info!(
        primary = %cfg.llm.primary.model,
        secondary = secondary.is_some(),
        fallback_enabled = cfg.llm.fallback_enabled,
        "providers configured"
    );
    Ok(FallbackProvider::new(
        Arc::new(primary),
        secondary,
        cfg.llm.fallback_enabled,
    ))
}
