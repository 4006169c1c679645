//! Album storage.
//!
//! The cover image is decided at write time: the first image written into a
//! coverless album becomes the cover, and later changes to the image list
//! never move it.

use anyhow::Result;
use rusqlite::params;
use serde::Serialize;

use super::Database;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub cover_image_id: Option<i64>,
    pub is_auto: bool,
    pub tags: Vec<String>,
    /// Image ids in album order.
    pub images: Vec<i64>,
    pub created_at: String,
}

impl Database {
    /// Create an album owned by `user_id` with an initial ordered image list.
    /// When the list is non-empty, the first image becomes the cover.
    pub fn create_album(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        image_ids: &[i64],
        tags: &[String],
        is_auto: bool,
    ) -> Result<i64> {
        let tags_json = serde_json::to_string(tags)?;
        self.conn.execute(
            r#"
            INSERT INTO albums (user_id, name, description, cover_image_id, is_auto, tags)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                name,
                description,
                image_ids.first(),
                is_auto,
                tags_json
            ],
        )?;
        let album_id = self.conn.last_insert_rowid();

        for (position, image_id) in image_ids.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO album_images (album_id, image_id, position) VALUES (?, ?, ?)",
                params![album_id, image_id, position as i64],
            )?;
        }

        Ok(album_id)
    }

    /// Append images to an album the user owns, preserving existing order.
    /// Sets the cover only if the album has none yet.
    #[allow(dead_code)]
    pub fn add_images_to_album(&self, user_id: i64, album_id: i64, image_ids: &[i64]) -> Result<()> {
        let owned = self.conn.query_row(
            "SELECT id FROM albums WHERE id = ? AND user_id = ?",
            params![album_id, user_id],
            |row| row.get::<_, i64>(0),
        );
        match owned {
            Ok(_) => {}
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                anyhow::bail!("album {} not found", album_id)
            }
            Err(e) => return Err(e.into()),
        }

        let next_position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM album_images WHERE album_id = ?",
            [album_id],
            |row| row.get(0),
        )?;

        for (offset, image_id) in image_ids.iter().enumerate() {
            self.conn.execute(
                "INSERT OR IGNORE INTO album_images (album_id, image_id, position) VALUES (?, ?, ?)",
                params![album_id, image_id, next_position + offset as i64],
            )?;
        }

        // Write-time cover rule: only a coverless album picks one up
        self.conn.execute(
            r#"
            UPDATE albums
            SET cover_image_id = (
                SELECT image_id FROM album_images
                WHERE album_id = ?
                ORDER BY position ASC
                LIMIT 1
            )
            WHERE id = ? AND cover_image_id IS NULL
            "#,
            params![album_id, album_id],
        )?;

        Ok(())
    }

    #[allow(dead_code)]
    pub fn get_album(&self, user_id: i64, album_id: i64) -> Result<Option<AlbumRecord>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, user_id, name, description, cover_image_id, is_auto, tags, created_at
            FROM albums
            WHERE id = ? AND user_id = ?
            "#,
            params![album_id, user_id],
            |row| {
                let tags_json: String = row.get(6)?;
                Ok(AlbumRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    cover_image_id: row.get(4)?,
                    is_auto: row.get(5)?,
                    tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                    images: Vec::new(),
                    created_at: row.get(7)?,
                })
            },
        );

        let mut album = match result {
            Ok(album) => album,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = self.conn.prepare(
            "SELECT image_id FROM album_images WHERE album_id = ? ORDER BY position ASC",
        )?;
        album.images = stmt
            .query_map([album_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(Some(album))
    }
}
