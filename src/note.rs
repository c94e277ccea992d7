// MIT License
// Copyright (c) 2024 Graham King

use chrono::Utc;
use rusqlite::OptionalExtension;
use tracing::{debug, info};

use crate::book;
use crate::error::{Error, Result};
use crate::model::{Note, NoteDetail};
use crate::page;
use crate::search::BookSearch;
use crate::user;

const SELECT_NOTE: &str = "SELECT id, user_id, book_id, hit, created_at FROM note";

/// The user's note for the book with this ISBN, created (with the book, if needed) when missing.
/// Safe against concurrent calls for the same pair: the UNIQUE (user_id, book_id)
/// constraint decides, and the loser reads the winner's row.
pub fn resolve_or_create(
    db_conn: &rusqlite::Connection,
    search: &dyn BookSearch,
    user_id: i64,
    isbn: &str,
) -> Result<Note> {
    if isbn.trim().is_empty() {
        return Err(Error::MissingIsbn);
    }
    user::ensure_exists(db_conn, user_id)?;
    let book = book::resolve_or_create(db_conn, search, isbn, None)?;

    let now = Utc::now();
    let inserted = db_conn.execute(
        r#"INSERT INTO note (user_id, book_id, hit, created_at, updated_at)
           VALUES (?1, ?2, 0, ?3, ?3)
           ON CONFLICT(user_id, book_id) DO NOTHING"#,
        (user_id, book.id, now),
    )?;
    let note = db_conn.query_row(
        &format!("{SELECT_NOTE} WHERE user_id = ?1 AND book_id = ?2"),
        (user_id, book.id),
        from_row,
    )?;
    if inserted == 0 {
        debug!(user_id, book_id = book.id, id = note.id, "note already exists");
    } else {
        info!(user_id, book_id = book.id, id = note.id, "note created");
    }
    Ok(note)
}

pub fn get(db_conn: &rusqlite::Connection, id: i64) -> Result<Note> {
    db_conn
        .query_row(&format!("{SELECT_NOTE} WHERE id = ?1"), [id], from_row)
        .optional()?
        .ok_or(Error::NoteNotFound(id))
}

/// The note, if `actor` wrote it
pub fn get_owned(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<Note> {
    let note = get(db_conn, id)?;
    if note.user_id != Some(actor) {
        return Err(Error::Unauthorized);
    }
    Ok(note)
}

/// Note with its book, likes and pages
pub fn detail(db_conn: &rusqlite::Connection, id: i64) -> Result<NoteDetail> {
    let note = get(db_conn, id)?;
    let book = book::get(db_conn, note.book_id)?;
    let like_count = db_conn.query_row(
        "SELECT COUNT(*) FROM note_like WHERE note_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    let pages = page::details_for_note(db_conn, id)?;
    Ok(NoteDetail {
        note,
        book,
        like_count,
        pages,
    })
}

/// Read a note. Counts as a view unless the reader is the author.
pub fn view(db_conn: &rusqlite::Connection, viewer: Option<i64>, id: i64) -> Result<NoteDetail> {
    let note = get(db_conn, id)?;
    if viewer.is_none() || viewer != note.user_id {
        increment_hit(db_conn, id)?;
    }
    detail(db_conn, id)
}

pub fn increment_hit(db_conn: &rusqlite::Connection, id: i64) -> Result<()> {
    let changed = db_conn.execute("UPDATE note SET hit = hit + 1 WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(Error::NoteNotFound(id));
    }
    Ok(())
}

/// Delete a note and, by cascade, its pages, their comments and all likes
pub fn delete(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<()> {
    get_owned(db_conn, actor, id)?;
    db_conn.execute("DELETE FROM note WHERE id = ?1", [id])?;
    info!(id, actor, "note deleted");
    Ok(())
}

pub(crate) fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        book_id: row.get(2)?,
        hit: row.get(3)?,
        created_at: row.get(4)?,
    })
}
