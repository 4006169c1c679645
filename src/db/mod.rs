mod schema;
pub mod albums;
pub mod commands;
pub mod images;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub use albums::AlbumRecord;
pub use commands::CommandRecord;
pub use images::ImageRecord;
pub use schema::{MIGRATIONS, SCHEMA};

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // Enforce the album_images/vectors cascade rules
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }
}
