//! 核心：错误类型、执行上下文（显式传递的操作者）

pub mod context;
pub mod error;

pub use context::Actor;
pub use error::{AgentError, EntityKind, StoreError, ToolError};
