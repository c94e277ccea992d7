// MIT License
// Copyright (c) 2024 Graham King

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Note, PageDetail};
use crate::{note, page, user};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub limit: usize,
    pub offset: usize,
}

impl Paging {
    /// `(limit, offset)` as SQL parameters. A zero limit would never advance.
    fn bind(&self) -> Result<(i64, i64)> {
        if self.limit == 0 {
            return Err(Error::Validation("limit must be at least 1".to_string()));
        }
        let limit = i64::try_from(self.limit)
            .map_err(|_| Error::Validation(format!("limit {} is too large", self.limit)))?;
        let offset = i64::try_from(self.offset)
            .map_err(|_| Error::Validation(format!("offset {} is too large", self.offset)))?;
        Ok((limit, offset))
    }
}

/// One window of a longer result list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub count: usize,
    pub previous_offset: Option<usize>,
    pub next_offset: Option<usize>,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    pub fn new(count: usize, paging: Paging, items: Vec<T>) -> Listing<T> {
        let next_offset = paging
            .offset
            .checked_add(paging.limit)
            .filter(|next| paging.limit > 0 && *next < count);
        let previous_offset = if paging.offset == 0 || paging.limit == 0 {
            None
        } else {
            Some(paging.offset.saturating_sub(paging.limit))
        };
        Listing {
            count,
            previous_offset,
            next_offset,
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Newest,
    Hit,
    Likes,
    Comments,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// A page as it appears on the main feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub page: PageDetail,
    pub author_id: Option<i64>,
    pub isbn: String,
    pub title: String,
}

/// Every page, sorted and windowed
pub fn pages(
    db_conn: &rusqlite::Connection,
    key: SortKey,
    order: SortOrder,
    paging: Paging,
) -> Result<Listing<FeedEntry>> {
    let column = match key {
        SortKey::Newest => "p.created_at",
        SortKey::Hit => "p.hit",
        SortKey::Likes => "like_count",
        SortKey::Comments => "comment_count",
    };
    let direction = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let (limit, offset) = paging.bind()?;
    let count: i64 = db_conn.query_row("SELECT COUNT(*) FROM page", (), |row| row.get(0))?;

    let mut stmt = db_conn.prepare(&format!(
        r#"SELECT p.id, p.note_id, p.note_index, p.transcript, p.phrase, p.book_page, p.hit, p.created_at,
               (SELECT COUNT(*) FROM page_like l WHERE l.page_id = p.id) AS like_count,
               (SELECT COUNT(*) FROM page_comment c WHERE c.page_id = p.id) AS comment_count,
               n.user_id, b.isbn, b.title
           FROM page p
           JOIN note n ON n.id = p.note_id
           JOIN book b ON b.id = n.book_id
           ORDER BY {column} {direction}, p.id {direction}
           LIMIT ?1 OFFSET ?2"#
    ))?;
    let entries = stmt
        .query_map((limit, offset), |row| {
            Ok(FeedEntry {
                page: page::detail_from_row(row)?,
                author_id: row.get(10)?,
                isbn: row.get(11)?,
                title: row.get(12)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<FeedEntry>>>()?;
    Ok(Listing::new(count as usize, paging, entries))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NoteSortKey {
    #[default]
    Newest,
    Hit,
    Likes,
    Pages,
}

/// A note as it appears on its author's shelf
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEntry {
    #[serde(flatten)]
    pub note: Note,
    pub isbn: String,
    pub title: String,
    pub like_count: i64,
    pub page_count: i64,
}

/// A user's notes that have at least one page, sorted and windowed
pub fn user_notes(
    db_conn: &rusqlite::Connection,
    user_id: i64,
    key: NoteSortKey,
    order: SortOrder,
    paging: Paging,
) -> Result<Listing<NoteEntry>> {
    let (limit, offset) = paging.bind()?;
    user::ensure_exists(db_conn, user_id)?;
    let column = match key {
        NoteSortKey::Newest => "n.created_at",
        NoteSortKey::Hit => "n.hit",
        NoteSortKey::Likes => "like_count",
        NoteSortKey::Pages => "page_count",
    };
    let direction = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let count: i64 = db_conn.query_row(
        r#"SELECT COUNT(*) FROM note n
           WHERE n.user_id = ?1 AND EXISTS (SELECT 1 FROM page p WHERE p.note_id = n.id)"#,
        [user_id],
        |row| row.get(0),
    )?;

    let mut stmt = db_conn.prepare(&format!(
        r#"SELECT n.id, n.user_id, n.book_id, n.hit, n.created_at,
               (SELECT COUNT(*) FROM note_like l WHERE l.note_id = n.id) AS like_count,
               (SELECT COUNT(*) FROM page p WHERE p.note_id = n.id) AS page_count,
               b.isbn, b.title
           FROM note n
           JOIN book b ON b.id = n.book_id
           WHERE n.user_id = ?1 AND EXISTS (SELECT 1 FROM page p WHERE p.note_id = n.id)
           ORDER BY {column} {direction}, n.id {direction}
           LIMIT ?2 OFFSET ?3"#
    ))?;
    let entries = stmt
        .query_map((user_id, limit, offset), |row| {
            Ok(NoteEntry {
                note: note::from_row(row)?,
                like_count: row.get(5)?,
                page_count: row.get(6)?,
                isbn: row.get(7)?,
                title: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<NoteEntry>>>()?;
    Ok(Listing::new(count as usize, paging, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::Error;
    use crate::fixtures;
    use crate::book;
    use crate::like::{self, Target};
    use crate::model::{NewBook, PagePayload};

    #[test]
    fn listing_offsets() {
        let l = Listing::new(10, Paging { limit: 4, offset: 0 }, vec![(); 4]);
        assert_eq!((l.previous_offset, l.next_offset), (None, Some(4)));
        let l = Listing::new(10, Paging { limit: 4, offset: 4 }, vec![(); 4]);
        assert_eq!((l.previous_offset, l.next_offset), (Some(0), Some(8)));
        let l = Listing::new(10, Paging { limit: 4, offset: 8 }, vec![(); 2]);
        assert_eq!((l.previous_offset, l.next_offset), (Some(4), None));
        // Never negative
        let l = Listing::new(10, Paging { limit: 4, offset: 2 }, vec![(); 4]);
        assert_eq!(l.previous_offset, Some(0));
    }

    fn setup() -> (rusqlite::Connection, i64, Vec<i64>) {
        let mut db_conn = db::open_in_memory().unwrap();
        let search = fixtures::catalog();
        let u = fixtures::user(&db_conn, "reader");
        let n = note::resolve_or_create(&db_conn, &search, u, "9791166832598").unwrap();
        let payloads: Vec<PagePayload> = (0..3)
            .map(|i| PagePayload {
                transcript: fixtures::transcript(i),
                phrase: None,
                book_page: None,
            })
            .collect();
        let ids = page::insert_batch(&mut db_conn, n.id, &payloads)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        (db_conn, u, ids)
    }

    #[test]
    fn sort_by_likes() {
        let (db_conn, u, ids) = setup();
        let other = fixtures::user(&db_conn, "other");
        like::like(&db_conn, u, Target::Page(ids[2])).unwrap();
        like::like(&db_conn, other, Target::Page(ids[2])).unwrap();
        like::like(&db_conn, other, Target::Page(ids[0])).unwrap();

        let feed = pages(
            &db_conn,
            SortKey::Likes,
            SortOrder::Descending,
            Paging { limit: 2, offset: 0 },
        )
        .unwrap();
        assert_eq!(feed.count, 3);
        assert_eq!(feed.next_offset, Some(2));
        let got: Vec<(i64, i64)> = feed
            .items
            .iter()
            .map(|e| (e.page.page.id, e.page.like_count))
            .collect();
        assert_eq!(got, vec![(ids[2], 2), (ids[0], 1)]);
        assert_eq!(feed.items[0].isbn, "9791166832598");
        assert_eq!(feed.items[0].author_id, Some(u));
    }

    #[test]
    fn sort_by_hit_ascending() {
        let (db_conn, _, ids) = setup();
        page::view(&db_conn, None, ids[0]).unwrap();
        page::view(&db_conn, None, ids[0]).unwrap();
        page::view(&db_conn, None, ids[1]).unwrap();
        let feed = pages(
            &db_conn,
            SortKey::Hit,
            SortOrder::Ascending,
            Paging { limit: 10, offset: 0 },
        )
        .unwrap();
        let got: Vec<i64> = feed.items.iter().map(|e| e.page.page.id).collect();
        assert_eq!(got, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn notes_of_user() {
        let (mut db_conn, u, ids) = setup();
        let search = fixtures::catalog();
        let first = page::get(&db_conn, ids[0]).unwrap().note_id;
        let second = note::resolve_or_create(&db_conn, &search, u, "9788949114118").unwrap();
        page::insert_batch(
            &mut db_conn,
            second.id,
            &[PagePayload {
                transcript: fixtures::transcript(9),
                phrase: None,
                book_page: None,
            }],
        )
        .unwrap();
        // A note without pages stays off the shelf
        let fields = NewBook {
            title: "빈 노트".to_string(),
            ..Default::default()
        };
        book::resolve_or_create(&db_conn, &search, "0306406152", Some(fields)).unwrap();
        note::resolve_or_create(&db_conn, &search, u, "0306406152").unwrap();

        let all = Paging { limit: 10, offset: 0 };
        let l = user_notes(&db_conn, u, NoteSortKey::Pages, SortOrder::Ascending, all).unwrap();
        assert_eq!(l.count, 2);
        let got: Vec<(i64, i64)> = l.items.iter().map(|e| (e.note.id, e.page_count)).collect();
        assert_eq!(got, vec![(second.id, 1), (first, 3)]);
        assert_eq!(l.items[0].isbn, "9788949114118");

        let other = fixtures::user(&db_conn, "other");
        like::like(&db_conn, other, Target::Note(second.id)).unwrap();
        let l = user_notes(&db_conn, u, NoteSortKey::Likes, SortOrder::Descending, all).unwrap();
        let got: Vec<(i64, i64)> = l.items.iter().map(|e| (e.note.id, e.like_count)).collect();
        assert_eq!(got, vec![(second.id, 1), (first, 0)]);

        let one = Paging { limit: 1, offset: 0 };
        let l = user_notes(&db_conn, u, NoteSortKey::Pages, SortOrder::Descending, one).unwrap();
        assert_eq!(l.items.len(), 1);
        assert_eq!(l.items[0].note.id, first);
        assert_eq!(l.next_offset, Some(1));

        assert!(matches!(
            user_notes(&db_conn, 404, NoteSortKey::Newest, SortOrder::Descending, one)
                .unwrap_err(),
            Error::UserNotFound(404)
        ));
    }

    #[test]
    fn zero_limit_rejected() {
        let (db_conn, u, _) = setup();
        let zero = Paging { limit: 0, offset: 3 };
        assert!(matches!(
            pages(&db_conn, SortKey::Newest, SortOrder::Descending, zero).unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            user_notes(&db_conn, u, NoteSortKey::Newest, SortOrder::Descending, zero).unwrap_err(),
            Error::Validation(_)
        ));
        // Never points back at itself
        let l = Listing::new(10, zero, Vec::<()>::new());
        assert_eq!((l.previous_offset, l.next_offset), (None, None));
    }

    #[test]
    fn huge_offset_does_not_overflow() {
        let (db_conn, _, _) = setup();
        let far = Paging {
            limit: 4,
            offset: usize::MAX,
        };
        let l = Listing::new(10, far, Vec::<()>::new());
        assert_eq!(l.next_offset, None);
        assert_eq!(l.previous_offset, Some(usize::MAX - 4));
        assert!(matches!(
            pages(&db_conn, SortKey::Newest, SortOrder::Descending, far).unwrap_err(),
            Error::Validation(_)
        ));
    }
}
