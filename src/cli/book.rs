// MIT License
// Copyright (c) 2024 Graham King

use scribble::model::NewBook;
use scribble::search::BookSearch;
use scribble::{book, isbn};

use super::{print_json, read_body, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Ask the external book search directly. Nothing is stored.
    Search {
        query: String,
        /// How many results for a free text query
        #[clap(long)]
        display: Option<usize>,
    },

    /// Return the stored book for an ISBN, fetching and storing it if needed
    Resolve { isbn: String },

    /// Store a book described by a JSON file ("-" for stdin):
    /// {"isbn": .., "title": .., "author": .., "publisher": .., "category": [..], "thumbnail": ..}
    Create { file: String },

    /// Search stored books by title, author or publisher
    Find { query: String },
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Search { query, display } => {
            print_json(&ctx.search.search(&query, display)?)
        }
        Commands::Resolve { isbn } => print_json(&book::resolve_or_create(
            &ctx.db_conn,
            &ctx.search,
            &isbn,
            None,
        )?),
        Commands::Create { file } => do_create(ctx, &file),
        Commands::Find { query } => print_json(&book::search_local(&ctx.db_conn, &query)?),
    }
}

fn do_create(ctx: &Context, file: &str) -> anyhow::Result<()> {
    let body = read_body(file)?;
    // The ISBN may arrive as any JSON value, only a string passes
    let raw = match body.get("isbn") {
        Some(v) => isbn::normalize_value(v).map_err(scribble::Error::from)?,
        None => return Err(scribble::Error::MissingIsbn.into()),
    };
    let fields: NewBook = serde_json::from_value(body).map_err(scribble::Error::from)?;
    let b = book::resolve_or_create(&ctx.db_conn, &ctx.search, &raw, Some(fields))?;
    print_json(&b)
}
