// MIT License
// Copyright (c) 2024 Graham King

use http::StatusCode;

/// Why an ISBN was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IsbnError {
    #[error("not a string")]
    NotString,
    #[error("wrong length")]
    WrongLength,
    #[error("failed checksum")]
    FailedChecksum,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid ISBN: {0}")]
    InvalidIsbn(#[from] IsbnError),

    #[error("no ISBN given")]
    MissingIsbn,

    #[error("no book found for ISBN {isbn}")]
    BookNotFound { isbn: String },

    #[error("book search failed: {0}")]
    ExternalLookupFailed(String),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("note {0} not found")]
    NoteNotFound(i64),

    #[error("page {0} not found")]
    PageNotFound(i64),

    #[error("comment {0} not found")]
    CommentNotFound(i64),

    #[error("parent comment {0} not found")]
    ParentCommentNotFound(i64),

    #[error("comment {parent} does not belong to page {page}")]
    InvalidParentComment { parent: i64, page: i64 },

    #[error("already liked")]
    AlreadyLiked,

    #[error("not liked")]
    NoSuchLike,

    #[error("not allowed to change this resource")]
    Unauthorized,

    #[error("nickname {0:?} is taken")]
    NicknameTaken(String),

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The status a HTTP view would answer with
    pub fn status(&self) -> StatusCode {
        use Error::*;
        match self {
            InvalidIsbn(_)
            | MissingIsbn
            | InvalidParentComment { .. }
            | AlreadyLiked
            | NoSuchLike
            | Validation(_) => StatusCode::BAD_REQUEST,
            Unauthorized => StatusCode::UNAUTHORIZED,
            BookNotFound { .. }
            | UserNotFound(_)
            | NoteNotFound(_)
            | PageNotFound(_)
            | CommentNotFound(_)
            | ParentCommentNotFound(_) => StatusCode::NOT_FOUND,
            NicknameTaken(_) => StatusCode::CONFLICT,
            ExternalLookupFailed(_) => StatusCode::BAD_GATEWAY,
            Storage(_) | Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable reason, used as the `detail` of an error response
    pub fn code(&self) -> &'static str {
        use Error::*;
        match self {
            InvalidIsbn(IsbnError::NotString) => "invalid_isbn_not_string",
            InvalidIsbn(IsbnError::WrongLength) => "invalid_isbn_wrong_length",
            InvalidIsbn(IsbnError::FailedChecksum) => "invalid_isbn_failed_checksum",
            MissingIsbn => "no_book_in_req_body",
            BookNotFound { .. } => "no_exist_book",
            ExternalLookupFailed(_) => "invalid_response",
            UserNotFound(_) => "no_exist_user",
            NoteNotFound(_) => "no_exist_note",
            PageNotFound(_) => "no_exist_page",
            CommentNotFound(_) => "no_exist_page_comment",
            ParentCommentNotFound(_) => "no_exist_parent_comment",
            InvalidParentComment { .. } => "invalid_parent_comment_pk",
            AlreadyLiked => "exist_like",
            NoSuchLike => "no_exist_like",
            Unauthorized => "unauthorized_user",
            NicknameTaken(_) => "exist_nickname",
            Validation(_) => "invalid",
            Storage(_) => "storage_error",
            Serialization(_) => "serialization_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_kinds_map_to_404() {
        for e in [
            Error::NoteNotFound(1),
            Error::PageNotFound(1),
            Error::ParentCommentNotFound(1),
            Error::BookNotFound {
                isbn: "9791166832598".to_string(),
            },
        ] {
            assert_eq!(e.status(), StatusCode::NOT_FOUND, "{e}");
        }
    }

    #[test]
    fn lookup_failures_are_distinct() {
        let empty = Error::BookNotFound {
            isbn: "9791166832598".to_string(),
        };
        let down = Error::ExternalLookupFailed("HTTP error 503".to_string());
        assert_ne!(empty.status(), down.status());
        assert_ne!(empty.code(), down.code());
    }

    #[test]
    fn isbn_codes() {
        let e: Error = IsbnError::WrongLength.into();
        assert_eq!(e.code(), "invalid_isbn_wrong_length");
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "invalid ISBN: wrong length");
    }
}
