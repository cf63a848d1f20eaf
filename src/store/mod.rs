//! 任务存储：Task / RecurringPattern / AuditEntry / ChatRecord 的 SQLite 实现
//!
//! 冲突敏感的写（froggy、排序、循环生成）都在 `BEGIN IMMEDIATE` 事务内完成：
//! 先拿写锁，再检查现有 frog，再写入；两个并发「设为 frog」不可能都看到「当前无 frog」。

pub mod audit;
pub mod chat;
pub mod db;
pub mod model;
pub mod patterns;
pub mod tasks;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::core::StoreError;

pub use model::{
    normalize_title, AuditEntry, ChatRecord, ChatRole, Frequency, NewTask, PatternId, PatternRule,
    RecurringPattern, StatusField, StatusFilter, Task, TaskId, TaskStatus, UserId, MAX_TITLE_CHARS,
};
pub use patterns::PatternUpdate;
pub use tasks::{Materialized, Simulation, TaskEdit};

/// 存储句柄：单连接 + 互斥；多个句柄（多进程 / 多连接）之间由 SQLite 写锁串行化
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_db(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_db_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::InvalidData("connection mutex poisoned".to_string()))
    }

    /// 只读访问
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// 在 IMMEDIATE 事务内执行；f 返回 Ok 时提交，否则回滚
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.transact(true, f)
    }

    /// commit = false 时无论结果如何都回滚（dry-run）
    pub(crate) fn transact<T>(
        &self,
        commit: bool,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        if commit {
            tx.commit()?;
        } else {
            tx.rollback()?;
        }
        Ok(out)
    }
}
