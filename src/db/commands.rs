//! Command record storage.
//!
//! A command row is written exactly three times by the pipeline: created
//! pending at intake, updated with intent/parameters after classification,
//! and updated with the final result after dispatch. After that only a
//! user-initiated delete may touch it.

use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use serde_json::{Map, Value};

use super::Database;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub intent: String,
    pub parameters: Map<String, Value>,
    pub result_status: String,
    pub result_message: String,
    pub result_data: Map<String, Value>,
    pub execution_time_ms: i64,
    pub matched_images: Vec<i64>,
    pub created_album_id: Option<i64>,
    pub created_at: String,
}

impl Database {
    /// Create a pending command record at intake.
    pub fn create_command(&self, user_id: i64, text: &str) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO commands (user_id, text, created_at)
            VALUES (?, ?, ?)
            "#,
            params![user_id, text, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record the classifier's verdict. Only intent and parameters are
    /// written; the result columns stay pending until dispatch completes.
    pub fn set_command_classification(
        &self,
        command_id: i64,
        intent: &str,
        parameters: &Map<String, Value>,
    ) -> Result<()> {
        let parameters_json = serde_json::to_string(parameters)?;
        self.conn.execute(
            "UPDATE commands SET intent = ?, parameters = ? WHERE id = ?",
            params![intent, parameters_json, command_id],
        )?;
        Ok(())
    }

    /// Record the final outcome and timing after dispatch.
    #[allow(clippy::too_many_arguments)]
    pub fn finish_command(
        &self,
        command_id: i64,
        status: &str,
        message: &str,
        data: &Map<String, Value>,
        execution_time_ms: i64,
        matched_images: &[i64],
        created_album_id: Option<i64>,
    ) -> Result<()> {
        let data_json = serde_json::to_string(data)?;
        let matched_json = serde_json::to_string(matched_images)?;
        self.conn.execute(
            r#"
            UPDATE commands
            SET result_status = ?, result_message = ?, result_data = ?,
                execution_time_ms = ?, matched_images = ?, created_album_id = ?
            WHERE id = ?
            "#,
            params![
                status,
                message,
                data_json,
                execution_time_ms,
                matched_json,
                created_album_id,
                command_id
            ],
        )?;
        Ok(())
    }

    #[allow(dead_code)]
    pub fn get_command(&self, user_id: i64, command_id: i64) -> Result<Option<CommandRecord>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, user_id, text, intent, parameters,
                   result_status, result_message, result_data,
                   execution_time_ms, matched_images, created_album_id, created_at
            FROM commands
            WHERE id = ? AND user_id = ?
            "#,
            params![command_id, user_id],
            row_to_command,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Command history, newest first.
    pub fn list_commands(&self, user_id: i64, limit: u32, offset: u32) -> Result<Vec<CommandRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, text, intent, parameters,
                   result_status, result_message, result_data,
                   execution_time_ms, matched_images, created_album_id, created_at
            FROM commands
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )?;

        let records = stmt
            .query_map(params![user_id, limit, offset], row_to_command)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    pub fn count_commands(&self, user_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM commands WHERE user_id = ?",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a command the user owns. Returns true if a row was removed.
    pub fn delete_command(&self, user_id: i64, command_id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM commands WHERE id = ? AND user_id = ?",
            params![command_id, user_id],
        )?;
        Ok(removed > 0)
    }
}

fn row_to_command(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandRecord> {
    let parameters_json: String = row.get(4)?;
    let data_json: String = row.get(7)?;
    let matched_json: String = row.get(9)?;
    Ok(CommandRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        intent: row.get(3)?,
        parameters: serde_json::from_str(&parameters_json).unwrap_or_default(),
        result_status: row.get(5)?,
        result_message: row.get(6)?,
        result_data: serde_json::from_str(&data_json).unwrap_or_default(),
        execution_time_ms: row.get(8)?,
        matched_images: serde_json::from_str(&matched_json).unwrap_or_default(),
        created_album_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}
