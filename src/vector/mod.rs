//! Vector lookup collaborator.
//!
//! The production index is a placeholder: it returns an unranked sample of
//! the requesting user's registered images with a constant score, which
//! preserves the result contract while a real similarity backend does not
//! exist. Anything implementing [`VectorIndex`] can be slotted in behind the
//! pipeline without touching the handlers.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

/// One lookup hit. `score` is a relevance placeholder until a real
/// similarity backend exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    pub image_id: i64,
    #[allow(dead_code)]
    pub score: f32,
}

/// Text-to-image lookup. Must only ever return ids owned by the requesting
/// user.
pub trait VectorIndex: Send {
    fn search_by_text(&self, user_id: i64, query: &str) -> Result<Vec<VectorMatch>>;
}

/// Placeholder score reported for every hit.
const PLACEHOLDER_SCORE: f32 = 0.9;

/// Index over the `vectors` registry table. Opens its own connection so the
/// collaborator stays independent of the main store handle.
pub struct SqliteVectorIndex {
    conn: Connection,
    limit: u32,
}

impl SqliteVectorIndex {
    pub fn open(db_path: &Path, limit: u32) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Ok(Self { conn, limit })
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn search_by_text(&self, user_id: i64, _query: &str) -> Result<Vec<VectorMatch>> {
        // No similarity ranking yet: take a bounded sample of the user's
        // indexed images. The query text only influences a real backend.
        let mut stmt = self.conn.prepare(
            "SELECT image_id FROM vectors WHERE user_id = ? ORDER BY image_id ASC LIMIT ?",
        )?;

        let matches = stmt
            .query_map(rusqlite::params![user_id, self.limit], |row| {
                Ok(VectorMatch {
                    image_id: row.get(0)?,
                    score: PLACEHOLDER_SCORE,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(matches)
    }
}
