// MIT License
// Copyright (c) 2024 Graham King

use chrono::Utc;
use rusqlite::{OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Note, Page, PageDetail, PagePatch, PagePayload};
use crate::note;
use crate::search::BookSearch;

const SELECT_PAGE: &str = "SELECT id, note_id, note_index, transcript, phrase, book_page, hit, created_at FROM page";

const SELECT_PAGE_DETAIL: &str = r#"
SELECT p.id, p.note_id, p.note_index, p.transcript, p.phrase, p.book_page, p.hit, p.created_at,
    (SELECT COUNT(*) FROM page_like l WHERE l.page_id = p.id),
    (SELECT COUNT(*) FROM page_comment c WHERE c.page_id = p.id)
FROM page p"#;

/// Which note new pages go into
#[derive(Debug, Clone, PartialEq)]
pub enum NoteRef {
    /// An existing note, which must belong to the caller
    Id(i64),
    /// The caller's note for this book, created if needed
    Isbn(String),
}

/// Add pages for `actor`, resolving the target note first.
/// Returns the note and the new pages in the order given.
pub fn add_pages(
    db_conn: &mut rusqlite::Connection,
    search: &dyn BookSearch,
    actor: i64,
    target: &NoteRef,
    payloads: &[PagePayload],
) -> Result<(Note, Vec<Page>)> {
    validate_batch(payloads)?;
    let note = match target {
        NoteRef::Id(id) => note::get_owned(db_conn, actor, *id)?,
        NoteRef::Isbn(isbn) => note::resolve_or_create(db_conn, search, actor, isbn)?,
    };
    let pages = insert_batch(db_conn, note.id, payloads)?;
    Ok((note, pages))
}

/// Append `payloads` to the note, numbering them from the current page count.
///
/// The count and the inserts share one IMMEDIATE transaction, so the database write lock
/// is held from the read onwards and concurrent batches on the same note cannot
/// be given overlapping indices. All pages are stored or none are.
pub fn insert_batch(
    db_conn: &mut rusqlite::Connection,
    note_id: i64,
    payloads: &[PagePayload],
) -> Result<Vec<Page>> {
    validate_batch(payloads)?;

    let tx = db_conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let exists = tx
        .query_row("SELECT 1 FROM note WHERE id = ?1", [note_id], |_| Ok(()))
        .optional()?;
    if exists.is_none() {
        return Err(Error::NoteNotFound(note_id));
    }
    let base: i64 = tx.query_row(
        "SELECT COUNT(*) FROM page WHERE note_id = ?1",
        [note_id],
        |row| row.get(0),
    )?;

    let now = Utc::now();
    let mut pages = Vec::with_capacity(payloads.len());
    let mut stmt = tx.prepare(
        r#"INSERT INTO page (note_id, note_index, transcript, phrase, book_page, hit, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
           RETURNING (id)"#,
    )?;
    for (offset, p) in payloads.iter().enumerate() {
        let note_index = base + offset as i64;
        let id = stmt.query_row(
            (
                note_id,
                note_index,
                &p.transcript,
                &p.phrase,
                p.book_page,
                now,
            ),
            |row| row.get::<_, i64>(0),
        )?;
        pages.push(Page {
            id,
            note_id,
            note_index,
            transcript: p.transcript.clone(),
            phrase: p.phrase.clone(),
            book_page: p.book_page,
            hit: 0,
            created_at: now,
        });
    }
    stmt.finalize()?;
    tx.commit()?;

    info!(
        note_id,
        first = base,
        count = pages.len(),
        "pages added"
    );
    Ok(pages)
}

pub fn get(db_conn: &rusqlite::Connection, id: i64) -> Result<Page> {
    db_conn
        .query_row(&format!("{SELECT_PAGE} WHERE id = ?1"), [id], from_row)
        .optional()?
        .ok_or(Error::PageNotFound(id))
}

/// The page and its note, if `actor` wrote the note
pub fn get_owned(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<(Page, Note)> {
    let page = get(db_conn, id)?;
    let note = note::get(db_conn, page.note_id)?;
    if note.user_id != Some(actor) {
        return Err(Error::Unauthorized);
    }
    Ok((page, note))
}

pub fn detail(db_conn: &rusqlite::Connection, id: i64) -> Result<PageDetail> {
    db_conn
        .query_row(
            &format!("{SELECT_PAGE_DETAIL} WHERE p.id = ?1"),
            [id],
            detail_from_row,
        )
        .optional()?
        .ok_or(Error::PageNotFound(id))
}

/// All pages of a note, in index order
pub fn details_for_note(db_conn: &rusqlite::Connection, note_id: i64) -> Result<Vec<PageDetail>> {
    let mut stmt = db_conn.prepare(&format!(
        "{SELECT_PAGE_DETAIL} WHERE p.note_id = ?1 ORDER BY p.note_index"
    ))?;
    let pages = stmt
        .query_map([note_id], detail_from_row)?
        .collect::<rusqlite::Result<Vec<PageDetail>>>()?;
    Ok(pages)
}

/// Read a page. Counts as a view unless the reader wrote it.
pub fn view(db_conn: &rusqlite::Connection, viewer: Option<i64>, id: i64) -> Result<PageDetail> {
    let page = get(db_conn, id)?;
    let owner = note::get(db_conn, page.note_id)?.user_id;
    if viewer.is_none() || viewer != owner {
        db_conn.execute("UPDATE page SET hit = hit + 1 WHERE id = ?1", [id])?;
    }
    detail(db_conn, id)
}

/// Change the text fields of one page. Position in the note is not touched.
pub fn edit(
    db_conn: &rusqlite::Connection,
    actor: i64,
    id: i64,
    patch: &PagePatch,
) -> Result<Page> {
    let (mut page, _) = get_owned(db_conn, actor, id)?;
    if patch.is_empty() {
        return Ok(page);
    }
    if let Some(t) = &patch.transcript {
        crate::validate_url("transcript", t)?;
        page.transcript = t.clone();
    }
    if let Some(p) = &patch.phrase {
        page.phrase = if p.trim().is_empty() {
            None
        } else {
            Some(p.clone())
        };
    }
    if let Some(bp) = patch.book_page {
        validate_book_page(bp)?;
        page.book_page = Some(bp);
    }
    db_conn.execute(
        "UPDATE page SET transcript = ?1, phrase = ?2, book_page = ?3, updated_at = ?4 WHERE id = ?5",
        (&page.transcript, &page.phrase, page.book_page, Utc::now(), id),
    )?;
    Ok(page)
}

/// Delete a page, closing the gap it leaves in the note's numbering
pub fn delete(db_conn: &mut rusqlite::Connection, actor: i64, id: i64) -> Result<()> {
    let tx = db_conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (page, _) = get_owned(&tx, actor, id)?;
    tx.execute("DELETE FROM page WHERE id = ?1", [id])?;
    // Two steps via negative values, UNIQUE (note_id, note_index) is checked per row
    tx.execute(
        "UPDATE page SET note_index = -note_index WHERE note_id = ?1 AND note_index > ?2",
        (page.note_id, page.note_index),
    )?;
    tx.execute(
        "UPDATE page SET note_index = -note_index - 1 WHERE note_id = ?1 AND note_index < 0",
        [page.note_id],
    )?;
    tx.commit()?;
    info!(id, note_id = page.note_id, actor, "page deleted");
    Ok(())
}

fn validate_batch(payloads: &[PagePayload]) -> Result<()> {
    if payloads.is_empty() {
        return Err(Error::Validation("no pages given".to_string()));
    }
    for p in payloads {
        crate::validate_url("transcript", &p.transcript)?;
        if let Some(bp) = p.book_page {
            validate_book_page(bp)?;
        }
    }
    Ok(())
}

fn validate_book_page(bp: i64) -> Result<()> {
    if bp < 0 {
        return Err(Error::Validation(format!("invalid book page {bp}")));
    }
    Ok(())
}

fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        note_id: row.get(1)?,
        note_index: row.get(2)?,
        transcript: row.get(3)?,
        phrase: row.get(4)?,
        book_page: row.get(5)?,
        hit: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn detail_from_row(row: &rusqlite::Row) -> rusqlite::Result<PageDetail> {
    Ok(PageDetail {
        page: from_row(row)?,
        like_count: row.get(8)?,
        comment_count: row.get(9)?,
    })
}
