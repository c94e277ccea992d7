// MIT License
// Copyright (c) 2024 Graham King

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

pub const DB_NAME: &str = "scribble.db";
pub const CFG_NAME: &str = "config.yaml";
pub const CFG_DIR: &str = ".config/scribble";

/// Everything the binary needs, built once in main and handed down
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    /// Used when RUST_LOG is not set
    pub log_level: String,
    pub search: SearchConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
    /// Number of results for a free text search
    pub display: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub default_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: None,
            log_level: "info".to_string(),
            search: SearchConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            base_url: "https://openapi.naver.com/v1/search".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 5,
            display: 5,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig { default_limit: 4 }
    }
}

impl Config {
    /// Read `path`, or `$HOME/.config/scribble/config.yaml` if it exists, then apply env overrides.
    /// An explicit path that does not exist is an error, a missing default file is not.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let mut cfg = match path {
            Some(p) => Config::from_file(p)?,
            None => match default_dir() {
                Some(dir) if dir.join(CFG_NAME).exists() => Config::from_file(&dir.join(CFG_NAME))?,
                _ => Config::default(),
            },
        };
        cfg.apply_env(|k| env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("{}", path.display()))?;
        Config::parse(&contents).with_context(|| format!("{}", path.display()))
    }

    pub fn parse(s: &str) -> anyhow::Result<Config> {
        if s.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    /// Search credentials come from the environment when set there
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("NAVER_API_CLIENT_ID") {
            self.search.client_id = id;
        }
        if let Some(secret) = lookup("NAVER_API_CLIENT_SECRET") {
            self.search.client_secret = secret;
        }
    }

    /// Configured database path, else the default location (creating its directory)
    pub fn resolve_db_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(p) = &self.db_path {
            return Ok(p.clone());
        }
        let Some(dir) = default_dir() else {
            anyhow::bail!("$HOME not set, pass --db-path");
        };
        fs::create_dir_all(&dir)?;
        Ok(dir.join(DB_NAME))
    }
}

fn default_dir() -> Option<PathBuf> {
    let user_home = env::var("HOME").ok()?;
    Some(PathBuf::from(user_home).join(CFG_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = Config::parse(
            r#"
db_path: /tmp/s.db
search:
  client_id: abc
  timeout_secs: 2
"#,
        )
        .unwrap();
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/s.db")));
        assert_eq!(cfg.search.client_id, "abc");
        assert_eq!(cfg.search.timeout_secs, 2);
        assert_eq!(cfg.search.display, 5);
        assert_eq!(cfg.feed.default_limit, 4);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::parse("\n").unwrap(), Config::default());
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = Config::parse("search:\n  client_id: from-file\n").unwrap();
        cfg.apply_env(|k| match k {
            "NAVER_API_CLIENT_ID" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(cfg.search.client_id, "from-env");
        assert_eq!(cfg.search.client_secret, "");
    }

    #[test]
    fn bad_yaml_is_an_error() {
        assert!(Config::parse("search: [1, 2").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
