pub const SCHEMA: &str = r#"
-- Images table: uploaded photos and their analysis output
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    path TEXT NOT NULL,
    mimetype TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,

    -- Free-text description and tag set
    description TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',        -- JSON array

    -- Opaque analysis blob (model output, never interpreted here)
    analysis TEXT,

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_images_user ON images(user_id);

-- Albums: user-curated or command-generated collections
CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    cover_image_id INTEGER,                 -- set once, never auto-changed
    is_auto INTEGER NOT NULL DEFAULT 0,     -- created by the command pipeline
    tags TEXT NOT NULL DEFAULT '[]',        -- JSON array
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (cover_image_id) REFERENCES images(id)
);

CREATE INDEX IF NOT EXISTS idx_albums_user ON albums(user_id);

-- Ordered album membership
CREATE TABLE IF NOT EXISTS album_images (
    album_id INTEGER NOT NULL,
    image_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (album_id, image_id),
    FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE CASCADE,
    FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_album_images_album ON album_images(album_id);

-- Commands: one row per natural-language request
CREATE TABLE IF NOT EXISTS commands (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    intent TEXT NOT NULL DEFAULT 'unknown', -- search/create_album/edit/filter/sort/unknown
    parameters TEXT NOT NULL DEFAULT '{}',  -- JSON object, shape depends on intent
    result_status TEXT NOT NULL DEFAULT 'pending',  -- pending/success/failed
    result_message TEXT NOT NULL DEFAULT '',
    result_data TEXT NOT NULL DEFAULT '{}', -- JSON object
    execution_time_ms INTEGER NOT NULL DEFAULT 0,
    matched_images TEXT NOT NULL DEFAULT '[]',  -- JSON array of image ids
    created_album_id INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_commands_user_created ON commands(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_commands_intent ON commands(intent);

-- Vector index registry: which images have an entry in the lookup index
CREATE TABLE IF NOT EXISTS vectors (
    image_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    model_name TEXT NOT NULL,
    dims INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_vectors_user ON vectors(user_id);
"#;

/// Statements applied to databases created before the column existed.
/// Failures are ignored; on a fresh schema every column is already present.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE commands ADD COLUMN matched_images TEXT NOT NULL DEFAULT '[]'",
    "ALTER TABLE commands ADD COLUMN created_album_id INTEGER",
];
