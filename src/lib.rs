// MIT License
// Copyright (c) 2024 Graham King

//! Social book transcription notes: users keep one note per book,
//! fill it with ordered pages of copied excerpts, and comment on and like each other's pages.

pub mod book;
pub mod comment;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod isbn;
pub mod like;
pub mod model;
pub mod note;
pub mod page;
pub mod search;
pub mod user;

#[cfg(test)]
mod fixtures;

pub use error::{Error, IsbnError, Result};

/// Require an absolute http(s) URL
pub(crate) fn validate_url(field: &str, s: &str) -> Result<()> {
    match reqwest::Url::parse(s) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        _ => Err(Error::Validation(format!("{field} is not a http(s) URL: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn urls() {
        assert!(super::validate_url("t", "https://img.example.com/a.jpg").is_ok());
        assert!(super::validate_url("t", "http://img.example.com/a.jpg?x=1").is_ok());
        assert!(super::validate_url("t", "img.example.com/a.jpg").is_err());
        assert!(super::validate_url("t", "ftp://img.example.com/a.jpg").is_err());
        assert!(super::validate_url("t", "").is_err());
    }
}
