//! 对话编排层：任务上下文、回合事件、有界回合状态机

pub mod context;
pub mod events;
pub mod loop_;

pub use context::{build_task_context, system_prompt};
pub use events::AgentEvent;
pub use loop_::{run_turn, ToolExecution, TurnOutcome, TurnResult, TurnSession, MAX_ROUND_TRIPS};
