// MIT License
// Copyright (c) 2024 Graham King

use std::collections::BTreeSet;
use std::fmt;
use std::str;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Reading interests. A user follows a subset of these, a book is tagged with a subset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    LiteraryFiction,
    EconomicsManagement,
    SelfDevelopment,
    History,
    ReligionSpirituality,
    PoliticsSociety,
    ArtCulture,
    ComputerTechnologyEngineering,
    Science,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::LiteraryFiction,
        Category::EconomicsManagement,
        Category::SelfDevelopment,
        Category::History,
        Category::ReligionSpirituality,
        Category::PoliticsSociety,
        Category::ArtCulture,
        Category::ComputerTechnologyEngineering,
        Category::Science,
    ];

    pub fn as_str(&self) -> &'static str {
        use Category::*;
        match self {
            LiteraryFiction => "literary_fiction",
            EconomicsManagement => "economics_management",
            SelfDevelopment => "self_development",
            History => "history",
            ReligionSpirituality => "religion_spirituality",
            PoliticsSociety => "politics_society",
            ArtCulture => "art_culture",
            ComputerTechnologyEngineering => "computer_technology_engineering",
            Science => "science",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("invalid category {s:?}")))
    }
}

pub type Categories = BTreeSet<Category>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    /// Social login identity, e.g. "k@12345"
    pub auth_id: Option<String>,
    pub nickname: String,
    pub profile_image: Option<String>,
    pub categories: Categories,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub categories: Categories,
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a book the caller describes directly, instead of fetching them from search
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default, rename = "category")]
    pub categories: Categories,
    #[serde(default)]
    pub thumbnail: String,
}

/// One search hit from the external book search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCandidate {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub thumbnail: String,
}

impl From<BookCandidate> for NewBook {
    fn from(c: BookCandidate) -> Self {
        NewBook {
            title: c.title,
            author: c.author,
            publisher: c.publisher,
            categories: Categories::new(),
            thumbnail: c.thumbnail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: i64,
    /// None once the author's account is deleted
    pub user_id: Option<i64>,
    pub book_id: i64,
    pub hit: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: i64,
    pub note_id: i64,
    /// 0-based position within the note
    pub note_index: i64,
    /// Image of the hand-copied excerpt
    pub transcript: String,
    pub phrase: Option<String>,
    /// Page number in the printed book
    pub book_page: Option<i64>,
    pub hit: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PagePayload {
    pub transcript: String,
    #[serde(default)]
    pub phrase: Option<String>,
    #[serde(default)]
    pub book_page: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PagePatch {
    pub transcript: Option<String>,
    /// An empty phrase clears it
    pub phrase: Option<String>,
    pub book_page: Option<i64>,
}

impl PagePatch {
    pub fn is_empty(&self) -> bool {
        self.transcript.is_none() && self.phrase.is_none() && self.book_page.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageComment {
    pub id: i64,
    pub page_id: i64,
    pub user_id: Option<i64>,
    /// 0 for a comment directly on the page
    pub depth: i64,
    /// Id of the comment replied to, or `comment::ROOT`
    pub parent: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PageComment {
    pub fn is_root(&self) -> bool {
        self.parent == crate::comment::ROOT
    }
}

/// A page with its social counters, as shown to readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: Page,
    pub like_count: i64,
    pub comment_count: i64,
}

/// A note with its book and pages in index order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: Note,
    pub book: Book,
    pub like_count: i64,
    pub pages: Vec<PageDetail>,
}
