// MIT License
// Copyright (c) 2024 Graham King

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::db;
use crate::error::{Error, Result};
use crate::user;

/// Something a user can like
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Note(i64),
    Page(i64),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub target: Target,
    pub created_at: DateTime<Utc>,
}

impl Target {
    fn table(&self) -> &'static str {
        match self {
            Target::Note(_) => "note_like",
            Target::Page(_) => "page_like",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Target::Note(_) => "note_id",
            Target::Page(_) => "page_id",
        }
    }

    fn id(&self) -> i64 {
        match self {
            Target::Note(id) | Target::Page(id) => *id,
        }
    }

    fn ensure_exists(&self, db_conn: &rusqlite::Connection) -> Result<()> {
        let (sql, missing) = match self {
            Target::Note(id) => ("SELECT 1 FROM note WHERE id = ?1", Error::NoteNotFound(*id)),
            Target::Page(id) => ("SELECT 1 FROM page WHERE id = ?1", Error::PageNotFound(*id)),
        };
        let found = db_conn
            .query_row(sql, [self.id()], |_| Ok(()))
            .optional()?;
        found.ok_or(missing)
    }
}

/// Record that `user_id` likes `target`. A user likes a thing at most once.
pub fn like(db_conn: &rusqlite::Connection, user_id: i64, target: Target) -> Result<Like> {
    target.ensure_exists(db_conn)?;
    user::ensure_exists(db_conn, user_id)?;
    if is_liked(db_conn, user_id, target)? {
        return Err(Error::AlreadyLiked);
    }
    // The UNIQUE constraint still decides if two requests race past the check
    let now = Utc::now();
    let id = db_conn
        .query_row(
            &format!(
                "INSERT INTO {} (user_id, {}, created_at) VALUES (?1, ?2, ?3) RETURNING (id)",
                target.table(),
                target.column()
            ),
            (user_id, target.id(), now),
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                Error::AlreadyLiked
            } else {
                e.into()
            }
        })?;
    debug!(user_id, ?target, "liked");
    Ok(Like {
        id,
        user_id,
        target,
        created_at: now,
    })
}

pub fn unlike(db_conn: &rusqlite::Connection, user_id: i64, target: Target) -> Result<()> {
    target.ensure_exists(db_conn)?;
    let removed = db_conn.execute(
        &format!(
            "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
            target.table(),
            target.column()
        ),
        (user_id, target.id()),
    )?;
    if removed == 0 {
        return Err(Error::NoSuchLike);
    }
    debug!(user_id, ?target, "unliked");
    Ok(())
}

pub fn is_liked(db_conn: &rusqlite::Connection, user_id: i64, target: Target) -> Result<bool> {
    let found = db_conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2",
                target.table(),
                target.column()
            ),
            (user_id, target.id()),
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Users who like `target`, earliest first
pub fn likers(db_conn: &rusqlite::Connection, target: Target) -> Result<Vec<i64>> {
    target.ensure_exists(db_conn)?;
    let mut stmt = db_conn.prepare(&format!(
        "SELECT user_id FROM {} WHERE {} = ?1 ORDER BY created_at, id",
        target.table(),
        target.column()
    ))?;
    let ids = stmt
        .query_map([target.id()], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}
