// MIT License
// Copyright (c) 2024 Graham King

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rusqlite::{OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::db;
use crate::error::{Error, Result};
use crate::model::{Categories, User};

pub const MAX_NICKNAME: usize = 15;

pub const EMAIL_DOMAINS: &[&str] = &[
    "naver.com",
    "gmail.com",
    "outlook.com",
    "daum.net",
    "hanmail.net",
    "nate.com",
    "hotmail.com",
    "icloud.com",
];

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@([A-Za-z0-9.-]+)$").unwrap());

const SELECT_USER: &str =
    "SELECT id, email, auth_id, nickname, profile_image, category, created_at FROM user";

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: Option<String>,
    pub auth_id: Option<String>,
    pub nickname: String,
    pub profile_image: Option<String>,
    pub categories: Categories,
}

pub fn create(db_conn: &rusqlite::Connection, new: NewUser) -> Result<User> {
    if new.email.is_none() && new.auth_id.is_none() {
        return Err(Error::Validation(
            "either an email or a social account is required".to_string(),
        ));
    }
    let email = new.email.as_deref().map(validate_email).transpose()?;
    let nickname = validate_nickname(&new.nickname)?;
    if let Some(img) = &new.profile_image {
        crate::validate_url("profile_image", img)?;
    }
    if nickname_exists(db_conn, &nickname)? {
        return Err(Error::NicknameTaken(nickname));
    }

    let now = Utc::now();
    let mut stmt = db_conn.prepare(
        r#"INSERT INTO user (email, auth_id, nickname, profile_image, category, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           RETURNING (id)"#,
    )?;
    let id = stmt
        .query_row(
            (
                &email,
                &new.auth_id,
                &nickname,
                &new.profile_image,
                db::categories_to_sql(&new.categories)?,
                now,
            ),
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| unique_to_error(e, &nickname))?;
    info!(id, nickname = nickname.as_str(), "user created");
    get(db_conn, id)
}

pub fn get(db_conn: &rusqlite::Connection, id: i64) -> Result<User> {
    find(db_conn, id)?.ok_or(Error::UserNotFound(id))
}

pub fn find(db_conn: &rusqlite::Connection, id: i64) -> Result<Option<User>> {
    let user = db_conn
        .query_row(&format!("{SELECT_USER} WHERE id = ?1"), [id], from_row)
        .optional()?;
    Ok(user)
}

/// Look up a social login identity such as "k@12345"
pub fn find_by_auth_id(db_conn: &rusqlite::Connection, auth_id: &str) -> Result<Option<User>> {
    let user = db_conn
        .query_row(
            &format!("{SELECT_USER} WHERE auth_id = ?1"),
            [auth_id],
            from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn ensure_exists(db_conn: &rusqlite::Connection, id: i64) -> Result<()> {
    let found = db_conn
        .query_row("SELECT 1 FROM user WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    found.ok_or(Error::UserNotFound(id))
}

/// Add `categories` to the ones the user follows. Returns the new set.
pub fn follow_categories(
    db_conn: &mut rusqlite::Connection,
    id: i64,
    categories: &Categories,
) -> Result<Categories> {
    update_categories(db_conn, id, |current| {
        current.extend(categories.iter().copied())
    })
}

/// Remove `categories` from the ones the user follows. Returns the new set.
pub fn unfollow_categories(
    db_conn: &mut rusqlite::Connection,
    id: i64,
    categories: &Categories,
) -> Result<Categories> {
    update_categories(db_conn, id, |current| {
        current.retain(|c| !categories.contains(c))
    })
}

fn update_categories(
    db_conn: &mut rusqlite::Connection,
    id: i64,
    change: impl FnOnce(&mut Categories),
) -> Result<Categories> {
    // Read-modify-write, so take the write lock first
    let tx = db_conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let raw: Option<String> = tx
        .query_row("SELECT category FROM user WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    let Some(raw) = raw else {
        return Err(Error::UserNotFound(id));
    };
    let mut current = db::categories_from_sql(0, &raw)?;
    change(&mut current);
    tx.execute(
        "UPDATE user SET category = ?1, updated_at = ?2 WHERE id = ?3",
        (db::categories_to_sql(&current)?, Utc::now(), id),
    )?;
    tx.commit()?;
    Ok(current)
}

/// Change nickname and / or profile image. `None` leaves a field alone.
pub fn update_profile(
    db_conn: &rusqlite::Connection,
    id: i64,
    nickname: Option<&str>,
    profile_image: Option<&str>,
) -> Result<User> {
    let mut user = get(db_conn, id)?;
    if let Some(n) = nickname {
        let n = validate_nickname(n)?;
        if n != user.nickname && nickname_exists(db_conn, &n)? {
            return Err(Error::NicknameTaken(n));
        }
        user.nickname = n;
    }
    if let Some(img) = profile_image {
        crate::validate_url("profile_image", img)?;
        user.profile_image = Some(img.to_string());
    }
    db_conn
        .execute(
            "UPDATE user SET nickname = ?1, profile_image = ?2, updated_at = ?3 WHERE id = ?4",
            (&user.nickname, &user.profile_image, Utc::now(), id),
        )
        .map_err(|e| unique_to_error(e, &user.nickname))?;
    Ok(user)
}

/// Users can only delete themselves. Their notes stay, without an author.
pub fn delete(db_conn: &rusqlite::Connection, actor: i64, id: i64) -> Result<()> {
    ensure_exists(db_conn, id)?;
    if actor != id {
        return Err(Error::Unauthorized);
    }
    db_conn.execute("DELETE FROM user WHERE id = ?1", [id])?;
    info!(id, "user deleted");
    Ok(())
}

fn nickname_exists(db_conn: &rusqlite::Connection, nickname: &str) -> Result<bool> {
    let found = db_conn
        .query_row(
            "SELECT 1 FROM user WHERE nickname = ?1",
            [nickname],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn unique_to_error(e: rusqlite::Error, nickname: &str) -> Error {
    if !db::is_unique_violation(&e) {
        return e.into();
    }
    match &e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("auth_id") => {
            Error::Validation("social account already registered".to_string())
        }
        _ => Error::NicknameTaken(nickname.to_string()),
    }
}

fn validate_nickname(nickname: &str) -> Result<String> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(Error::Validation("nickname is required".to_string()));
    }
    if nickname.chars().count() > MAX_NICKNAME {
        return Err(Error::Validation(format!(
            "nickname is longer than {MAX_NICKNAME} characters"
        )));
    }
    Ok(nickname.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_string();
    let Some(caps) = EMAIL.captures(&email) else {
        return Err(Error::Validation(format!("invalid email {email:?}")));
    };
    let domain = caps[1].to_lowercase();
    if !EMAIL_DOMAINS.contains(&domain.as_str()) {
        return Err(Error::Validation(format!("invalid_domain {domain}")));
    }
    Ok(email)
}

fn from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let raw_category: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        auth_id: row.get(2)?,
        nickname: row.get(3)?,
        profile_image: row.get(4)?,
        categories: db::categories_from_sql(5, &raw_category)?,
        created_at: row.get(6)?,
    })
}
