// MIT License
// Copyright (c) 2024 Graham King

use std::fs;
use std::io::{self, Read};

use scribble::config::Config;
use scribble::feed::Paging;
use scribble::search::NaverSearch;

pub mod book;
pub mod comment;
pub mod feed;
pub mod note;
pub mod page;
pub mod user;

/// What every handler gets: storage, the search provider, and who is asking
pub struct Context {
    pub db_conn: rusqlite::Connection,
    pub search: NaverSearch,
    pub user: Option<i64>,
    pub config: Config,
}

impl Context {
    /// The acting user, for operations that need one
    pub fn actor(&self) -> scribble::Result<i64> {
        self.user.ok_or(scribble::Error::Unauthorized)
    }

    pub fn paging(&self, limit: Option<usize>, offset: usize) -> Paging {
        Paging {
            limit: limit.unwrap_or(self.config.feed.default_limit),
            offset,
        }
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Request body from a file, or stdin when `path` is "-"
pub fn read_body(path: &str) -> anyhow::Result<serde_json::Value> {
    let mut s = String::new();
    if path == "-" {
        io::stdin().read_to_string(&mut s)?;
    } else {
        s = fs::read_to_string(path)?;
    }
    let v = serde_json::from_str(&s).map_err(scribble::Error::from)?;
    Ok(v)
}

pub fn error_body(err: &scribble::Error) -> serde_json::Value {
    serde_json::json!({
        "status": err.status().as_u16(),
        "detail": err.code(),
        "message": err.to_string(),
    })
}
