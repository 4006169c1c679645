//! Image reads scoped by owning user.

use anyhow::Result;
use rusqlite::params;
use serde::Serialize;
use serde_json::Value;

use super::Database;

/// Full image record as returned inside command result envelopes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub path: String,
    pub mimetype: Option<String>,
    pub size_bytes: i64,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    pub created_at: String,
}

impl Database {
    // Ingestion API; the upload layer that calls it lives outside this crate.
    #[allow(dead_code)]
    pub fn insert_image(
        &self,
        user_id: i64,
        filename: &str,
        path: &str,
        description: &str,
        tags: &[String],
    ) -> Result<i64> {
        let tags_json = serde_json::to_string(tags)?;
        self.conn.execute(
            r#"
            INSERT INTO images (user_id, filename, path, description, tags)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![user_id, filename, path, description, tags_json],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    #[allow(dead_code)]
    pub fn get_image(&self, user_id: i64, image_id: i64) -> Result<Option<ImageRecord>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, user_id, filename, path, mimetype, size_bytes,
                   description, tags, analysis, created_at
            FROM images
            WHERE id = ? AND user_id = ?
            "#,
            params![image_id, user_id],
            row_to_image,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch images by id for one user. Ids belonging to other users are
    /// silently dropped; no ordering is guaranteed, callers reorder.
    pub fn get_images_by_ids(&self, user_id: i64, ids: &[i64]) -> Result<Vec<ImageRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT id, user_id, filename, path, mimetype, size_bytes,
                   description, tags, analysis, created_at
            FROM images
            WHERE user_id = ? AND id IN ({})
            "#,
            placeholders
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut sql_params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
        for id in ids {
            sql_params.push(id);
        }

        let records = stmt
            .query_map(sql_params.as_slice(), row_to_image)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    /// Register an image in the vector index. The registry only records that
    /// an index entry exists; the actual vector lives in the index backend.
    #[allow(dead_code)]
    pub fn register_vector(&self, user_id: i64, image_id: i64, model_name: &str, dims: i64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO vectors (image_id, user_id, model_name, dims)
            VALUES (?, ?, ?, ?)
            "#,
            params![image_id, user_id, model_name, dims],
        )?;
        Ok(())
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRecord> {
    let tags_json: String = row.get(7)?;
    let analysis_json: Option<String> = row.get(8)?;
    Ok(ImageRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filename: row.get(2)?,
        path: row.get(3)?,
        mimetype: row.get(4)?,
        size_bytes: row.get(5)?,
        description: row.get(6)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        analysis: analysis_json.and_then(|a| serde_json::from_str(&a).ok()),
        created_at: row.get(9)?,
    })
}
