// MIT License
// Copyright (c) 2024 Graham King

use chrono::Utc;
use rusqlite::OptionalExtension;
use tracing::{debug, info, warn};

use crate::db;
use crate::error::{Error, Result};
use crate::isbn;
use crate::model::{Book, NewBook};
use crate::search::BookSearch;

const SELECT_BOOK: &str =
    "SELECT id, isbn, title, author, publisher, category, thumbnail, created_at FROM book";

/// Return the stored book for `raw_isbn`, creating it if there is none yet.
///
/// A new book is built from `fallback` when the caller supplied the fields,
/// otherwise from the first external search hit. An existing row is returned as-is,
/// never updated, and at most one row is written.
pub fn resolve_or_create(
    db_conn: &rusqlite::Connection,
    search: &dyn BookSearch,
    raw_isbn: &str,
    fallback: Option<NewBook>,
) -> Result<Book> {
    let isbn = isbn::normalize(raw_isbn)?;
    if let Some(book) = find_by_isbn(db_conn, &isbn)? {
        debug!(isbn = isbn.as_str(), id = book.id, "book already stored");
        return Ok(book);
    }

    let new = match fallback {
        Some(fields) => fields,
        None => {
            let mut found = search.search(&isbn, Some(1))?;
            if found.is_empty() {
                return Err(Error::BookNotFound { isbn });
            }
            found.remove(0).into()
        }
    };
    validate(&new)?;

    // Someone else may have stored it while we were searching, then their row wins
    let inserted = db_conn.execute(
        r#"INSERT INTO book (isbn, title, author, publisher, category, thumbnail, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT(isbn) DO NOTHING"#,
        (
            &isbn,
            &new.title,
            &new.author,
            &new.publisher,
            db::categories_to_sql(&new.categories)?,
            &new.thumbnail,
            Utc::now(),
        ),
    )?;
    if inserted == 0 {
        warn!(isbn = isbn.as_str(), "book inserted concurrently, using existing row");
    }
    let book = find_by_isbn(db_conn, &isbn)?.ok_or_else(|| Error::BookNotFound {
        isbn: isbn.clone(),
    })?;
    if inserted != 0 {
        info!(isbn = isbn.as_str(), id = book.id, title = book.title.as_str(), "book created");
    }
    Ok(book)
}

/// `raw_isbn` is normalized first
pub fn find_by_isbn(db_conn: &rusqlite::Connection, raw_isbn: &str) -> Result<Option<Book>> {
    let isbn = isbn::normalize(raw_isbn)?;
    let book = db_conn
        .query_row(&format!("{SELECT_BOOK} WHERE isbn = ?1"), [&isbn], from_row)
        .optional()?;
    Ok(book)
}

/// Books are only reached through a note's foreign key, so a missing row is a storage error
pub fn get(db_conn: &rusqlite::Connection, id: i64) -> Result<Book> {
    let book = db_conn.query_row(&format!("{SELECT_BOOK} WHERE id = ?1"), [id], from_row)?;
    Ok(book)
}

/// Stored books whose title, author or publisher contains `q`, ignoring ASCII case
pub fn search_local(db_conn: &rusqlite::Connection, q: &str) -> Result<Vec<Book>> {
    let q = q.trim();
    if q.is_empty() {
        return Ok(vec![]);
    }
    let pattern = format!("%{}%", escape_like(q));
    let mut stmt = db_conn.prepare(&format!(
        r#"{SELECT_BOOK}
           WHERE title LIKE ?1 ESCAPE '\' OR author LIKE ?1 ESCAPE '\' OR publisher LIKE ?1 ESCAPE '\'
           ORDER BY created_at, id"#
    ))?;
    let books = stmt
        .query_map([pattern], from_row)?
        .collect::<rusqlite::Result<Vec<Book>>>()?;
    Ok(books)
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn validate(new: &NewBook) -> Result<()> {
    if new.title.trim().is_empty() {
        return Err(Error::Validation("book title is required".to_string()));
    }
    if !new.thumbnail.is_empty() {
        crate::validate_url("thumbnail", &new.thumbnail)?;
    }
    Ok(())
}

fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Book> {
    let raw_category: String = row.get(5)?;
    Ok(Book {
        id: row.get(0)?,
        isbn: row.get(1)?,
        title: row.get(2)?,
        author: row.get(3)?,
        publisher: row.get(4)?,
        categories: db::categories_from_sql(5, &raw_category)?,
        thumbnail: row.get(6)?,
        created_at: row.get(7)?,
    })
}
