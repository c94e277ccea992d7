// MIT License
// Copyright (c) 2024 Graham King

use chrono::Utc;
use rusqlite::OptionalExtension;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::PageComment;
use crate::page;

/// `parent` of a comment made directly on a page
pub const ROOT: i64 = 0;

const SELECT_COMMENT: &str =
    "SELECT id, page_id, user_id, depth, parent, content, created_at FROM page_comment";

/// Comment on a page, or reply to `parent_id` when it is not `ROOT`.
/// A reply must be on the same page as its parent and sits one level deeper.
pub fn create(
    db_conn: &rusqlite::Connection,
    author: i64,
    page_id: i64,
    parent_id: i64,
    content: &str,
) -> Result<PageComment> {
    page::get(db_conn, page_id)?;
    let content = validate_content(content)?;
    crate::user::ensure_exists(db_conn, author)?;

    let (parent, depth) = if parent_id == ROOT {
        (ROOT, 0)
    } else {
        let Some(p) = find(db_conn, parent_id)? else {
            return Err(Error::ParentCommentNotFound(parent_id));
        };
        if p.page_id != page_id {
            return Err(Error::InvalidParentComment {
                parent: parent_id,
                page: page_id,
            });
        }
        (p.id, p.depth + 1)
    };

    let now = Utc::now();
    let mut stmt = db_conn.prepare(
        r#"INSERT INTO page_comment (page_id, user_id, depth, parent, content, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           RETURNING (id)"#,
    )?;
    let id = stmt.query_row((page_id, author, depth, parent, &content, now), |row| {
        row.get::<_, i64>(0)
    })?;
    info!(id, page_id, parent, depth, "comment created");
    Ok(PageComment {
        id,
        page_id,
        user_id: Some(author),
        depth,
        parent,
        content,
        created_at: now,
    })
}

pub fn get(db_conn: &rusqlite::Connection, id: i64) -> Result<PageComment> {
    find(db_conn, id)?.ok_or(Error::CommentNotFound(id))
}

fn find(db_conn: &rusqlite::Connection, id: i64) -> Result<Option<PageComment>> {
    let c = db_conn
        .query_row(&format!("{SELECT_COMMENT} WHERE id = ?1"), [id], from_row)
        .optional()?;
    Ok(c)
}

/// Comments of a page, oldest first
pub fn list(db_conn: &rusqlite::Connection, page_id: i64) -> Result<Vec<PageComment>> {
    page::get(db_conn, page_id)?;
    let mut stmt = db_conn.prepare(&format!(
        "{SELECT_COMMENT} WHERE page_id = ?1 ORDER BY created_at, id"
    ))?;
    let comments = stmt
        .query_map([page_id], from_row)?
        .collect::<rusqlite::Result<Vec<PageComment>>>()?;
    Ok(comments)
}

/// Only the content can change
pub fn edit(
    db_conn: &rusqlite::Connection,
    actor: i64,
    id: i64,
    content: &str,
) -> Result<PageComment> {
    let mut c = get_authored(db_conn, actor, id)?;
    c.content = validate_content(content)?;
    db_conn.execute(
        "UPDATE page_comment SET content = ?1, updated_at = ?2 WHERE id = ?3",
        (&c.content, Utc::now(), id),
    )?;
    Ok(c)
}

pub fn delete(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<()> {
    get_authored(db_conn, actor, id)?;
    db_conn.execute("DELETE FROM page_comment WHERE id = ?1", [id])?;
    info!(id, actor, "comment deleted");
    Ok(())
}

fn get_authored(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<PageComment> {
    let c = get(db_conn, id)?;
    if c.user_id != Some(actor) {
        return Err(Error::Unauthorized);
    }
    Ok(c)
}

fn validate_content(content: &str) -> Result<String> {
    if content.trim().is_empty() {
        return Err(Error::Validation("comment is empty".to_string()));
    }
    Ok(content.to_string())
}

fn from_row(row: &rusqlite::Row) -> rusqlite::Result<PageComment> {
    Ok(PageComment {
        id: row.get(0)?,
        page_id: row.get(1)?,
        user_id: row.get(2)?,
        depth: row.get(3)?,
        parent: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}
