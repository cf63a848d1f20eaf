//! LLM 层：provider 抽象、OpenAI 兼容实现、主备回退、Mock

pub mod fallback;
pub mod mock;
pub mod openai;
pub mod traits;

pub use fallback::{FallbackNotice, FallbackProvider};
pub use mock::{FailingProvider, LoopingToolProvider, ScriptedProvider};
pub use openai::OpenAiProvider;
pub use traits::{Completion, CompletionProvider, LlmError, StopReason, ToolCall};
