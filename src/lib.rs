//! Intentions - 每日任务追踪服务
//!
//! 模块划分：
//! - **agent**: Agent 运行时（存储 + 工具执行器 + 主备 provider）
//! - **clock**: 工作日时钟（凌晨切换）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 操作者上下文与分层错误
//! - **llm**: completion provider 抽象、OpenAI 兼容实现、主备回退、Mock
//! - **memory**: 回合内对话记录
//! - **observability**: tracing 初始化
//! - **react**: 任务上下文、回合事件、有界回合状态机
//! - **recurrence**: 循环规则判定、幂等物化、批量驱动
//! - **store**: SQLite 存储（任务、循环规则、审计）
//! - **tools**: 工具注册表、输入契约与执行器

pub mod agent;
pub mod clock;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod recurrence;
pub mod store;
pub mod tools;

pub use agent::Agent;
pub use clock::WorkingDay;
pub use store::TaskStore;
