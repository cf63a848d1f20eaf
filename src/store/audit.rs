//! 工具调用审计（只追加）

use chrono::Utc;
use rusqlite::{params, Row};
use serde_json::Value;

use crate::core::StoreError;
use crate::store::model::{AuditEntry, UserId};
use crate::store::TaskStore;

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<(AuditEntry, String, Option<String>)> {
    let entry = AuditEntry {
        id: row.get(0)?,
        owner: row.get(1)?,
        tool: row.get(2)?,
        input: Value::Null,
        output: None,
        error: row.get(5)?,
        success: row.get(6)?,
        created_at: row.get(7)?,
    };
    Ok((entry, row.get(3)?, row.get(4)?))
}

impl TaskStore {
    pub fn append_audit(
        &self,
        owner: Option<UserId>,
        tool: &str,
        input: &Value,
        output: Option<&Value>,
        error: Option<&str>,
        success: bool,
    ) -> Result<i64, StoreError> {
        let input = input.to_string();
        let output = output.map(Value::to_string);
        self.write(|tx| {
            tx.execute(
                "INSERT INTO audit_log (owner, tool, input, output, error, success, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![owner, tool, input, output, error, success, Utc::now()],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// 按写入顺序列出审计记录；owner 为 None 时返回全部
    pub fn list_audit(&self, owner: Option<UserId>) -> Result<Vec<AuditEntry>, StoreError> {
        let raw = self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner, tool, input, output, error, success, created_at
                 FROM audit_log WHERE (?1 IS NULL OR owner = ?1) ORDER BY id",
            )?;
            let rows = stmt.query_map(params![owner], entry_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        raw.into_iter()
            .map(|(mut entry, input, output)| {
                entry.input = serde_json::from_str(&input)
                    .map_err(|e| StoreError::InvalidData(format!("audit input: {e}")))?;
                entry.output = output
                    .map(|o| serde_json::from_str(&o))
                    .transpose()
                    .map_err(|e| StoreError::InvalidData(format!("audit output: {e}")))?;
                Ok(entry)
            })
            .collect()
    }
}
