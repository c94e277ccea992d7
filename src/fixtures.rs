// MIT License
// Copyright (c) 2024 Graham King

// Shared test data

use crate::model::BookCandidate;
use crate::search::StaticSearch;
use crate::user::{self, NewUser};

pub fn summer() -> BookCandidate {
    BookCandidate {
        isbn: "9791166832598".to_string(),
        title: "여름이 온다".to_string(),
        author: "이수지".to_string(),
        publisher: "비룡소".to_string(),
        thumbnail: "https://bookthumb-phinf.pstatic.net/cover/208/162/20816223.jpg".to_string(),
    }
}

pub fn winter() -> BookCandidate {
    BookCandidate {
        isbn: "9788949114118".to_string(),
        title: "겨울 이야기".to_string(),
        author: "작가".to_string(),
        publisher: "출판사".to_string(),
        thumbnail: String::new(),
    }
}

pub fn catalog() -> StaticSearch {
    StaticSearch::new(vec![summer(), winter()])
}

pub fn user(db_conn: &rusqlite::Connection, nickname: &str) -> i64 {
    user::create(
        db_conn,
        NewUser {
            email: Some(format!("{nickname}@naver.com")),
            nickname: nickname.to_string(),
            ..Default::default()
        },
    )
    .unwrap()
    .id
}

pub fn transcript(n: usize) -> String {
    format!("https://img.example.com/transcript/{n}.jpg")
}
