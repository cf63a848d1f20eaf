//! 对话记录：每个用户一条按时间排序的消息流

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};
use serde_json::Value;

use crate::core::StoreError;
use crate::store::model::{ChatRecord, ChatRole, UserId};
use crate::store::TaskStore;

struct RawChat {
    record: ChatRecord,
    role: String,
    tool_executions: Option<String>,
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<RawChat> {
    Ok(RawChat {
        record: ChatRecord {
            id: row.get(0)?,
            owner: row.get(1)?,
            role: ChatRole::User,
            content: row.get(3)?,
            tool_executions: None,
            provider: row.get(5)?,
            day: row.get(6)?,
            created_at: row.get(7)?,
        },
        role: row.get(2)?,
        tool_executions: row.get(4)?,
    })
}

fn decode(raw: RawChat) -> Result<ChatRecord, StoreError> {
    let mut record = raw.record;
    record.role = ChatRole::parse(&raw.role)
        .ok_or_else(|| StoreError::InvalidData(format!("chat role: {}", raw.role)))?;
    record.tool_executions = raw
        .tool_executions
        .map(|t| serde_json::from_str(&t))
        .transpose()
        .map_err(|e| StoreError::InvalidData(format!("chat tool_executions: {e}")))?;
    Ok(record)
}

const SELECT_CHAT: &str = "SELECT id, owner, role, content, tool_executions, provider, day, created_at
     FROM chat_messages";

impl TaskStore {
    pub fn append_chat(
        &self,
        owner: UserId,
        role: ChatRole,
        content: &str,
        tool_executions: Option<&Value>,
        provider: Option<&str>,
        day: NaiveDate,
    ) -> Result<ChatRecord, StoreError> {
        let encoded = tool_executions.map(Value::to_string);
        let created_at = Utc::now();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO chat_messages (owner, role, content, tool_executions, provider, day, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![owner, role.as_str(), content, encoded, provider, day, created_at],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(ChatRecord {
            id,
            owner,
            role,
            content: content.to_string(),
            tool_executions: tool_executions.cloned(),
            provider: provider.map(str::to_string),
            day,
            created_at,
        })
    }

    /// 最近 limit 条消息，按时间正序返回
    pub fn recent_chat(&self, owner: UserId, limit: usize) -> Result<Vec<ChatRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let raw = self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_CHAT} WHERE owner = ?1 ORDER BY id DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![owner, limit], chat_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        let mut records = raw.into_iter().map(decode).collect::<Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn list_chat(&self, owner: UserId) -> Result<Vec<ChatRecord>, StoreError> {
        let raw = self.read(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_CHAT} WHERE owner = ?1 ORDER BY id"))?;
            let rows = stmt.query_map(params![owner], chat_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        raw.into_iter().map(decode).collect()
    }

    /// 某工作日内该用户发送的消息数（每日限额）
    pub fn count_user_messages_on(&self, owner: UserId, day: NaiveDate) -> Result<usize, StoreError> {
        let n: i64 = self.read(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE owner = ?1 AND day = ?2 AND role = 'user'",
                params![owner, day],
                |row| row.get(0),
            )?)
        })?;
        Ok(n as usize)
    }

    /// 删除该用户全部对话记录，返回删除条数
    pub fn clear_chat(&self, owner: UserId) -> Result<usize, StoreError> {
        let deleted = self.write(|tx| {
            Ok(tx.execute("DELETE FROM chat_messages WHERE owner = ?1", params![owner])?)
        })?;
        tracing::info!(owner, deleted, "chat history cleared");
        Ok(deleted)
    }
}
