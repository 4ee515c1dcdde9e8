//! SQL DDL for the ledger store.
//! Table and column names match databases written by earlier deployments, so
//! every statement must stay conditional.

/// Settings key holding the admin credential hash.
pub const ADMIN_PASSWORD_KEY: &str = "admin_password";

/// SQLite schema with:
/// - `places.name` UNIQUE, the insert-or-get target
/// - `objects.place_id` referencing `places(id)`; no cascade, deletes are guarded
/// - `settings` as a plain key/value table
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS places (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS objects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_name TEXT NOT NULL,
    car_number TEXT NOT NULL,
    place_id INTEGER NOT NULL,
    image_path TEXT,
    FOREIGN KEY (place_id) REFERENCES places(id)
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_objects_place_id ON objects(place_id);
"#;
