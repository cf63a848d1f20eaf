//! 错误类型
//!
//! 按层划分：StoreError（存储与不变量）、ToolError（工具分发与输入契约）、AgentError（对话编排）。
//! 前三类（校验 / 不变量 / 不存在）最终都落在工具信封的 error 字段里。

use chrono::NaiveDate;
use thiserror::Error;

use crate::llm::LlmError;

/// 不存在 / 非本人所有时报告的实体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Pattern,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "Task"),
            Self::Pattern => write!(f, "Recurring pattern"),
        }
    }
}

/// 存储层与领域不变量错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("A frog already exists for {date}: '{existing_title}' (ID: {existing_id}). Only one frog per day allowed.")]
    FrogConflict {
        date: NaiveDate,
        existing_id: i64,
        existing_title: String,
    },

    #[error("Task ids do not match the tasks for {date}: expected {expected} task(s), got {supplied} id(s) (missing, extra, duplicate or foreign ids)")]
    ReorderMismatch {
        date: NaiveDate,
        expected: usize,
        supplied: usize,
    },

    /// 不区分「不存在」与「属于他人」，避免泄露存在性
    #[error("{kind} with ID {id} not found or doesn't belong to you")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid persisted data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// 是否为单写者数据库的瞬时冲突（busy / locked）
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// 工具分发错误
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("User authentication required for this tool")]
    ActorRequired,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Domain(#[from] StoreError),
}

/// 对话编排错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[from] LlmError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Daily message limit ({0}) reached. Please try again tomorrow.")]
    DailyLimit(u32),
}
