// MIT License
// Copyright (c) 2024 Graham King

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::Type;

use crate::error::Result;
use crate::model::Categories;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub const CREATE_USER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NULL,
    auth_id TEXT NULL,
    nickname TEXT NOT NULL,
    profile_image TEXT NULL,
    category TEXT NOT NULL DEFAULT '[]',
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE (nickname),
    UNIQUE (auth_id)
)
"#;

pub const CREATE_BOOK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS book (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    isbn TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    publisher TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '[]',
    thumbnail TEXT NOT NULL DEFAULT '',
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE (isbn)
)
"#;

// A note outlives its author (user_id goes NULL) but pins its book
pub const CREATE_NOTE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS note (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NULL,
    book_id INTEGER NOT NULL,
    hit INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE SET NULL,
    FOREIGN KEY (book_id) REFERENCES book (id) ON DELETE RESTRICT,
    UNIQUE (user_id, book_id)
)
"#;

pub const CREATE_NOTE_LIKE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS note_like (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    note_id INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE,
    FOREIGN KEY (note_id) REFERENCES note (id) ON DELETE CASCADE,
    UNIQUE (user_id, note_id)
)
"#;

pub const CREATE_PAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS page (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL,
    note_index INTEGER NOT NULL,
    transcript TEXT NOT NULL,
    phrase TEXT NULL,
    book_page INTEGER NULL,
    hit INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    FOREIGN KEY (note_id) REFERENCES note (id) ON DELETE CASCADE,
    UNIQUE (note_id, note_index)
)
"#;

pub const CREATE_PAGE_LIKE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS page_like (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    page_id INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE CASCADE,
    FOREIGN KEY (page_id) REFERENCES page (id) ON DELETE CASCADE,
    UNIQUE (user_id, page_id)
)
"#;

// parent is 0 for a root comment, so it is not a foreign key
pub const CREATE_PAGE_COMMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS page_comment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL,
    user_id INTEGER NULL,
    depth INTEGER NOT NULL DEFAULT 0,
    parent INTEGER NOT NULL DEFAULT 0,
    content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    FOREIGN KEY (page_id) REFERENCES page (id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES user (id) ON DELETE SET NULL
)
"#;

const SCHEMA: [&str; 7] = [
    CREATE_USER_TABLE,
    CREATE_BOOK_TABLE,
    CREATE_NOTE_TABLE,
    CREATE_NOTE_LIKE_TABLE,
    CREATE_PAGE_TABLE,
    CREATE_PAGE_LIKE_TABLE,
    CREATE_PAGE_COMMENT_TABLE,
];

/// Open (creating if needed) the database file and make sure the schema exists.
/// Every caller thread should open its own connection.
pub fn open(path: &Path) -> Result<rusqlite::Connection> {
    let db_conn = rusqlite::Connection::open(path)?;
    // Switching journal mode takes a lock too
    db_conn.busy_timeout(BUSY_TIMEOUT)?;
    // WAL lets readers continue while a page batch holds the write lock
    db_conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    })?;
    prepare(&db_conn)?;
    Ok(db_conn)
}

pub fn open_in_memory() -> Result<rusqlite::Connection> {
    let db_conn = rusqlite::Connection::open_in_memory()?;
    prepare(&db_conn)?;
    Ok(db_conn)
}

fn prepare(db_conn: &rusqlite::Connection) -> Result<()> {
    db_conn.busy_timeout(BUSY_TIMEOUT)?;
    db_conn.pragma_update(None, "foreign_keys", "ON")?;
    for create in SCHEMA {
        db_conn.execute(create, ())?;
    }
    Ok(())
}

/// True if this is an insert or update that hit a UNIQUE constraint.
/// Foreign key failures are also constraint violations, which is why this checks the extended code.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn categories_to_sql(categories: &Categories) -> Result<String> {
    Ok(serde_json::to_string(categories)?)
}

/// For use inside a row mapping closure, `idx` is the column
pub fn categories_from_sql(idx: usize, s: &str) -> rusqlite::Result<Categories> {
    if s.is_empty() {
        return Ok(BTreeSet::new());
    }
    serde_json::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
