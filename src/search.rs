// MIT License
// Copyright (c) 2024 Graham King

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::isbn;
use crate::model::BookCandidate;

// The provider highlights matches with <b>..</b>
static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new("<.+?>").unwrap());

/// Third-party book metadata lookup
pub trait BookSearch {
    /// An ISBN-shaped `query` is an exact lookup (zero or one result),
    /// anything else is a free-text search returning up to `max_results`.
    fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<BookCandidate>>;
}

/// Naver book search API
pub struct NaverSearch {
    client: reqwest::blocking::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    display: usize,
}

#[derive(Debug, serde::Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchItem {
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    isbn: String,
    #[serde(default)]
    image: String,
}

impl NaverSearch {
    pub fn new(cfg: &SearchConfig) -> Result<NaverSearch> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::ExternalLookupFailed(e.to_string()))?;
        Ok(NaverSearch {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            display: cfg.display,
        })
    }

    fn send(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<SearchItem>> {
        let res = self
            .client
            .get(url)
            .query(params)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .send()
            .map_err(|e| {
                warn!(url, error = %e, "book search request failed");
                Error::ExternalLookupFailed(e.to_string())
            })?;
        if res.status() != http::StatusCode::OK {
            warn!(url, status = %res.status(), "book search returned an error");
            return Err(Error::ExternalLookupFailed(format!(
                "HTTP error {}",
                res.status()
            )));
        }
        let out: SearchResponse = res
            .json()
            .map_err(|e| Error::ExternalLookupFailed(format!("bad response body: {e}")))?;
        Ok(out.items)
    }
}

impl BookSearch for NaverSearch {
    fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<BookCandidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        let items = match isbn::normalize(query) {
            Ok(normalized) => {
                debug!(isbn = normalized.as_str(), "exact ISBN search");
                let url = format!("{}/book_adv.json", self.base_url);
                let items = self.send(&url, &[("d_isbn", normalized)])?;
                if items.len() > 1 {
                    return Err(Error::ExternalLookupFailed(format!(
                        "{} results for a single ISBN",
                        items.len()
                    )));
                }
                items
            }
            Err(_) => {
                let shown = max_results.unwrap_or(self.display);
                debug!(query, shown, "free text book search");
                let url = format!("{}/book.json", self.base_url);
                self.send(
                    &url,
                    &[("query", query.to_string()), ("display", shown.to_string())],
                )?
            }
        };
        Ok(items.into_iter().map(to_candidate).collect())
    }
}

fn to_candidate(item: SearchItem) -> BookCandidate {
    // "isbn" is "<isbn10> <isbn13>", keep the last one
    let isbn = strip_markup(&item.isbn)
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string();
    // Drop the resize / cache-busting query string
    let thumbnail = match item.image.split_once('?') {
        Some((url, _)) => url.to_string(),
        None => item.image,
    };
    BookCandidate {
        isbn,
        title: strip_markup(&item.title),
        author: strip_markup(&item.author),
        publisher: strip_markup(&item.publisher),
        thumbnail,
    }
}

fn strip_markup(s: &str) -> String {
    MARKUP.replace_all(s, "").into_owned()
}

/// A `BookSearch` answering from a fixed list, without network access.
/// Counts how often it was asked.
#[derive(Debug, Default)]
pub struct StaticSearch {
    books: Vec<BookCandidate>,
    calls: AtomicUsize,
    fail: bool,
}

impl StaticSearch {
    pub fn new(books: Vec<BookCandidate>) -> StaticSearch {
        StaticSearch {
            books,
            ..Default::default()
        }
    }

    /// A provider that is always down
    pub fn failing() -> StaticSearch {
        StaticSearch {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BookSearch for StaticSearch {
    fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<BookCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::ExternalLookupFailed("HTTP error 503".to_string()));
        }
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        if let Ok(normalized) = isbn::normalize(query) {
            return Ok(self
                .books
                .iter()
                .filter(|b| b.isbn == normalized)
                .take(1)
                .cloned()
                .collect());
        }
        let needle = query.to_lowercase();
        Ok(self
            .books
            .iter()
            .filter(|b| b.title.to_lowercase().contains(&needle))
            .take(max_results.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::*;

    const RESPONSE: &str = r#"{
        "lastBuildDate": "Wed, 01 Jun 2022 12:36:31 +0900",
        "total": 1,
        "start": 1,
        "display": 1,
        "items": [
            {
                "title": "<b>여름이 온다</b>",
                "link": "http://book.naver.com/bookdb/book_detail.php?bid=20816223",
                "image": "https://bookthumb-phinf.pstatic.net/cover/208/162/20816223.jpg?type=m1&udate=20210809",
                "author": "이수지",
                "price": "22000",
                "discount": "19800",
                "publisher": "비룡소",
                "pubdate": "20210730",
                "isbn": "8949114117 <b>9788949114118</b>",
                "description": "..."
            }
        ]
    }"#;

    #[test]
    fn candidate_cleanup() {
        let res: SearchResponse = serde_json::from_str(RESPONSE).unwrap();
        let c: Vec<BookCandidate> = res.items.into_iter().map(to_candidate).collect();
        assert_eq!(
            c,
            vec![BookCandidate {
                isbn: "9788949114118".to_string(),
                title: "여름이 온다".to_string(),
                author: "이수지".to_string(),
                publisher: "비룡소".to_string(),
                thumbnail: "https://bookthumb-phinf.pstatic.net/cover/208/162/20816223.jpg"
                    .to_string(),
            }]
        );
    }

    #[test]
    fn missing_items_is_empty() {
        let res: SearchResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(res.items.is_empty());
    }

    #[test]
    fn single_isbn_field() {
        let c = to_candidate(SearchItem {
            title: "t".to_string(),
            author: String::new(),
            publisher: String::new(),
            isbn: "9791166832598".to_string(),
            image: String::new(),
        });
        assert_eq!(c.isbn, "9791166832598");
        assert_eq!(c.thumbnail, "");
    }

    #[test]
    fn empty_query_skips_provider() {
        let cfg = SearchConfig {
            // Nothing listens here, a request would fail
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let naver = NaverSearch::new(&cfg).unwrap();
        assert!(naver.search("   ", None).unwrap().is_empty());
    }

    #[test]
    fn static_search_routes_isbn_and_text() {
        let s = StaticSearch::new(vec![BookCandidate {
            isbn: "9788949114118".to_string(),
            title: "여름이 온다".to_string(),
            author: "이수지".to_string(),
            publisher: "비룡소".to_string(),
            thumbnail: String::new(),
        }]);
        assert_eq!(s.search("978-89-491-1411-8", None).unwrap().len(), 1);
        assert_eq!(s.search("여름", Some(5)).unwrap().len(), 1);
        assert!(s.search("9791166832598", None).unwrap().is_empty());
        assert_eq!(s.calls(), 3);
    }

    // Answers one request with `status` and `body`, and hands back what it was sent
    fn serve_once(status: &'static str, body: &'static str) -> (SearchConfig, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                request.push_str(&line);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            request
        });
        let cfg = SearchConfig {
            base_url: format!("http://{addr}/v1/search"),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..Default::default()
        };
        (cfg, handle)
    }

    // Loopback must not go through a proxy from the environment
    fn local_naver(cfg: &SearchConfig) -> NaverSearch {
        let mut naver = NaverSearch::new(cfg).unwrap();
        naver.client = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap();
        naver
    }

    const TWO_ITEMS: &str = r#"{"items": [
        {"title": "a", "isbn": "9791166832598"},
        {"title": "b", "isbn": "9791166832598"}
    ]}"#;

    #[test]
    fn isbn_query_uses_exact_lookup() {
        let (cfg, server) = serve_once("200 OK", RESPONSE);
        let found = local_naver(&cfg)
            .search("978-89-491-1411-8", None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].isbn, "9788949114118");

        let request = server.join().unwrap().to_lowercase();
        assert!(
            request.starts_with("get /v1/search/book_adv.json?d_isbn=9788949114118 "),
            "{request}"
        );
        assert!(request.contains("x-naver-client-id: id\r\n"), "{request}");
        assert!(request.contains("x-naver-client-secret: secret\r\n"), "{request}");
    }

    #[test]
    fn text_query_uses_free_search() {
        let (cfg, server) = serve_once("200 OK", RESPONSE);
        let found = local_naver(&cfg)
            .search("summer", Some(3))
            .unwrap();
        assert_eq!(found.len(), 1);
        let request = server.join().unwrap();
        assert!(
            request.starts_with("GET /v1/search/book.json?query=summer&display=3 "),
            "{request}"
        );
    }

    #[test]
    fn error_status_is_lookup_failed() {
        let (cfg, server) = serve_once("503 Service Unavailable", "{}");
        let err = local_naver(&cfg)
            .search("9791166832598", None)
            .unwrap_err();
        assert!(matches!(err, Error::ExternalLookupFailed(_)), "{err}");
        server.join().unwrap();
    }

    #[test]
    fn bad_body_is_lookup_failed() {
        let (cfg, server) = serve_once("200 OK", "{not json");
        let err = local_naver(&cfg)
            .search("summer", None)
            .unwrap_err();
        assert!(matches!(err, Error::ExternalLookupFailed(_)), "{err}");
        server.join().unwrap();
    }

    #[test]
    fn two_hits_for_one_isbn_is_lookup_failed() {
        let (cfg, server) = serve_once("200 OK", TWO_ITEMS);
        let err = local_naver(&cfg)
            .search("9791166832598", None)
            .unwrap_err();
        assert!(matches!(err, Error::ExternalLookupFailed(_)), "{err}");
        server.join().unwrap();
    }
}
