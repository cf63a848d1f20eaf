//! 工具层：封闭的工具集合、强类型输入、统一信封与审计

pub mod executor;
pub mod pattern_tools;
pub mod registry;
pub mod request;
pub mod schema;
pub mod task_tools;

pub use executor::{ExecutionRecord, ToolEnvelope, ToolExecutor};
pub use registry::{tool_specs, ToolName, ToolSpec};
pub use request::{ToolContext, ToolRequest};
pub use schema::parameters_for;
