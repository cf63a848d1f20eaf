//! SQLite 连接初始化与建表迁移
//!
//! 迁移版本记在 `PRAGMA user_version`；连接打开后先开启外键、设置 busy_timeout，再执行未应用的迁移。

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::core::StoreError;

/// 按顺序执行的迁移；下标 + 1 即版本号
const MIGRATIONS: &[&str] = &[
    // v1：任务、循环规则、审计
    "CREATE TABLE patterns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner INTEGER NOT NULL,
        title TEXT NOT NULL,
        frequency TEXT NOT NULL CHECK (frequency IN ('daily', 'weekly', 'monthly', 'yearly')),
        interval INTEGER NOT NULL DEFAULT 1 CHECK (interval >= 1),
        days_of_week TEXT,
        day_of_month INTEGER,
        month INTEGER,
        start_date TEXT NOT NULL,
        end_date TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        default_sticky INTEGER NOT NULL DEFAULT 0,
        default_froggy INTEGER NOT NULL DEFAULT 0,
        default_anxiety_inducing INTEGER NOT NULL DEFAULT 0,
        last_generated_date TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_patterns_owner ON patterns(owner, active);

    CREATE TABLE tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner INTEGER NOT NULL,
        title TEXT NOT NULL,
        date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        completed INTEGER NOT NULL DEFAULT 0,
        neverminded INTEGER NOT NULL DEFAULT 0,
        sticky INTEGER NOT NULL DEFAULT 0,
        froggy INTEGER NOT NULL DEFAULT 0,
        anxiety_inducing INTEGER NOT NULL DEFAULT 0,
        pattern_id INTEGER REFERENCES patterns(id) ON DELETE SET NULL
    );
    CREATE INDEX idx_tasks_owner_date ON tasks(owner, date, sort_order);
    CREATE UNIQUE INDEX idx_tasks_one_frog ON tasks(owner, date) WHERE froggy = 1;

    CREATE TABLE audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner INTEGER,
        tool TEXT NOT NULL,
        input TEXT NOT NULL,
        output TEXT,
        error TEXT,
        success INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_audit_owner ON audit_log(owner, id);",
    // v2：对话记录
    "CREATE TABLE chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner INTEGER NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
        content TEXT NOT NULL,
        tool_executions TEXT,
        provider TEXT,
        day TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_chat_owner ON chat_messages(owner, id);
    CREATE INDEX idx_chat_owner_day ON chat_messages(owner, day, role);",
];

pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// 打开文件数据库（WAL），并应用迁移
pub fn open_db(path: impl AsRef<Path>) -> Result<Connection, StoreError> {
    let started = Instant::now();
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidData(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
    }
    let mut conn = Connection::open(path)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    bootstrap(&mut conn)?;
    tracing::info!(
        path = %path.display(),
        duration_ms = started.elapsed().as_millis() as u64,
        "database opened"
    );
    Ok(conn)
}

/// 打开内存数据库（测试用）
pub fn open_db_in_memory() -> Result<Connection, StoreError> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap(&mut conn)?;
    Ok(conn)
}

fn bootstrap(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if current > latest {
        return Err(StoreError::InvalidData(format!(
            "database schema version {current} is newer than supported {latest}"
        )));
    }
    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = idx as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::info!(version, "schema migration applied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_reach_latest_version() {
        let conn = open_db_in_memory().unwrap();
        let v: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(v, latest_version());
    }

    #[test]
    fn reopening_file_db_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/intentions.db");
        drop(open_db(&path).unwrap());
        let conn = open_db(&path).unwrap();
        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
