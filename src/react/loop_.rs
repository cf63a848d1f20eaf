//! 对话回合主循环
//!
//! 显式状态机：AwaitingCompletion -> (ExecutingTools -> AwaitingCompletion)* -> Done。
//! 状态转移由 provider 的 stop reason 驱动；最多 MAX_ROUND_TRIPS 次 provider 调用，
//! 第 5 轮请求的工具仍会执行，之后以固定文案结束。
//! 可选 event_tx：向 CLI 等前端推送 RoundStarted / ToolCall / ToolResult / ProviderFallback / Final。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::Actor;
use crate::llm::{Completion, CompletionProvider, FallbackProvider, LlmError, StopReason, ToolCall};
use crate::memory::{Conversation, Message};
use crate::react::AgentEvent;
use crate::tools::{ToolEnvelope, ToolExecutor};

/// 单个回合内 provider 调用上限
pub const MAX_ROUND_TRIPS: usize = 5;

pub const EXHAUSTED_MESSAGE: &str = "I'm sorry, I couldn't complete that request within the allowed number of steps. \
     Any changes made so far have been saved. Please try a simpler or more specific request.";

pub const UNAVAILABLE_MESSAGE: &str =
    "Sorry, the assistant is unavailable right now. Please try again later.";

/// 工具结果预览最大字符数
const RESULT_PREVIEW_CHARS: usize = 200;

/// 回合如何结束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered,
    Exhausted,
    ProviderUnavailable,
}

/// 回合内执行过的一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExecution {
    pub round: usize,
    pub call_id: String,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub envelope: ToolEnvelope,
}

#[derive(Debug)]
pub struct TurnResult {
    pub response: String,
    pub outcome: TurnOutcome,
    /// 实际发生的 provider 调用次数
    pub rounds: usize,
    pub tool_executions: Vec<ToolExecution>,
    /// 最后一次成功应答的 provider 名（回退后为备用 provider）
    pub provider: Option<String>,
    /// 导致 ProviderUnavailable 的错误
    pub error: Option<LlmError>,
}

enum TurnState {
    AwaitingCompletion { round: usize },
    ExecutingTools { round: usize, text: String, calls: Vec<ToolCall> },
    Done { outcome: TurnOutcome, response: String },
}

/// 回合配置
pub struct TurnSession<'a> {
    pub provider: &'a FallbackProvider,
    pub executor: &'a ToolExecutor,
    pub actor: &'a Actor,
    pub max_rounds: usize,
    pub event_tx: Option<&'a UnboundedSender<AgentEvent>>,
}

impl<'a> TurnSession<'a> {
    pub fn new(provider: &'a FallbackProvider, executor: &'a ToolExecutor, actor: &'a Actor) -> Self {
        Self {
            provider,
            executor,
            actor,
            max_rounds: MAX_ROUND_TRIPS,
            event_tx: None,
        }
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 覆盖轮次上限（至少 1）
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    fn send(&self, ev: AgentEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > RESULT_PREVIEW_CHARS {
        format!("{}...", s.chars().take(RESULT_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}

/// 运行一个用户回合；conversation 应已含 system 消息
///
/// provider 失败不会返回 Err：回合以 ProviderUnavailable 结束，已提交的工具执行保持不变。
pub async fn run_turn(
    session: &TurnSession<'_>,
    conversation: &mut Conversation,
    user_input: &str,
) -> TurnResult {
    conversation.push(Message::user(user_input));
    let specs = session.executor.specs();
    let mut executions = Vec::new();
    let mut rounds = 0;
    let mut error = None;
    let mut provider = None;
    let mut state = TurnState::AwaitingCompletion { round: 1 };

    loop {
        state = match state {
            TurnState::AwaitingCompletion { round } => {
                rounds = round;
                session.send(AgentEvent::RoundStarted {
                    round,
                    max_rounds: session.max_rounds,
                });
                match session.provider.complete_with_notice(conversation.messages(), &specs).await {
                    Ok((completion, notice)) => {
                        provider = Some(match &notice {
                            Some(n) => n.secondary.clone(),
                            None => session.provider.name().to_string(),
                        });
                        if let Some(n) = notice {
                            session.send(AgentEvent::ProviderFallback {
                                primary: n.primary,
                                secondary: n.secondary,
                                error: n.error,
                            });
                        }
                        next_after_completion(round, completion)
                    }
                    Err(e) => {
                        tracing::error!(round, error = %e, "assistant unavailable");
                        session.send(AgentEvent::Error { text: e.to_string() });
                        error = Some(e);
                        TurnState::Done {
                            outcome: TurnOutcome::ProviderUnavailable,
                            response: UNAVAILABLE_MESSAGE.to_string(),
                        }
                    }
                }
            }
            TurnState::ExecutingTools { round, text, calls } => {
                conversation.push(Message::assistant_tool_calls(text, calls.clone()));
                for call in calls {
                    session.send(AgentEvent::ToolCall {
                        tool: call.name.clone(),
                        args: call.arguments.clone(),
                    });
                    let envelope = session.executor.execute(
                        Some(session.actor),
                        &call.name,
                        call.arguments.clone(),
                    );
                    let content = envelope.to_content();
                    session.send(AgentEvent::ToolResult {
                        tool: call.name.clone(),
                        success: envelope.success,
                        preview: preview(&content),
                    });
                    conversation.push(Message::tool_result(call.id.clone(), content));
                    executions.push(ToolExecution {
                        round,
                        call_id: call.id,
                        tool: call.name,
                        arguments: call.arguments,
                        envelope,
                    });
                }
                if round >= session.max_rounds {
                    tracing::warn!(rounds = round, tools = executions.len(), "turn exhausted round limit");
                    session.send(AgentEvent::Exhausted { rounds: round });
                    TurnState::Done {
                        outcome: TurnOutcome::Exhausted,
                        response: EXHAUSTED_MESSAGE.to_string(),
                    }
                } else {
                    TurnState::AwaitingCompletion { round: round + 1 }
                }
            }
            TurnState::Done { outcome, response } => {
                if outcome != TurnOutcome::ProviderUnavailable {
                    conversation.push(Message::assistant(response.clone()));
                }
                if outcome == TurnOutcome::Answered {
                    session.send(AgentEvent::Final { text: response.clone() });
                }
                tracing::info!(?outcome, rounds, tools = executions.len(), "turn finished");
                return TurnResult {
                    response,
                    outcome,
                    rounds,
                    tool_executions: executions,
                    provider,
                    error,
                };
            }
        };
    }
}

/// 工具请求但没有工具调用时按最终回复处理
fn next_after_completion(round: usize, completion: Completion) -> TurnState {
    let text = completion.text.unwrap_or_default();
    match completion.stop {
        StopReason::ToolRequested if !completion.tool_calls.is_empty() => TurnState::ExecutingTools {
            round,
            text,
            calls: completion.tool_calls,
        },
        _ => TurnState::Done {
            outcome: TurnOutcome::Answered,
            response: text,
        },
    }
}
