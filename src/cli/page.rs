// MIT License
// Copyright (c) 2024 Graham King

use scribble::like::{self, Target};
use scribble::model::{PagePatch, PagePayload};
use scribble::page::{self, NoteRef};

use super::{print_json, read_body, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Append pages from a JSON array file ("-" for stdin):
    /// [{"transcript": "https://..", "phrase": "..", "book_page": 12}, ..]
    Add {
        file: String,
        /// An existing note of the acting user
        #[clap(long, conflicts_with = "isbn", required_unless_present = "isbn")]
        note: Option<i64>,
        /// The acting user's note for this book, created if needed
        #[clap(long)]
        isbn: Option<String>,
    },

    /// Show a page with its like and comment counts. Counts a view.
    Show { id: i64 },

    /// Change a page's text fields
    Edit {
        id: i64,
        #[clap(long)]
        transcript: Option<String>,
        #[clap(long)]
        phrase: Option<String>,
        #[clap(long)]
        book_page: Option<i64>,
    },

    /// Delete a page. Later pages of the note move up one place.
    Delete { id: i64 },

    Like { id: i64 },

    Unlike { id: i64 },

    /// Users who like the page
    Likers { id: i64 },
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Add { file, note, isbn } => do_add(ctx, &file, note, isbn),
        Commands::Show { id } => print_json(&page::view(&ctx.db_conn, ctx.user, id)?),
        Commands::Edit {
            id,
            transcript,
            phrase,
            book_page,
        } => {
            let patch = PagePatch {
                transcript,
                phrase,
                book_page,
            };
            print_json(&page::edit(&ctx.db_conn, ctx.actor()?, id, &patch)?)
        }
        Commands::Delete { id } => {
            let actor = ctx.actor()?;
            page::delete(&mut ctx.db_conn, actor, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::Like { id } => print_json(&like::like(&ctx.db_conn, ctx.actor()?, Target::Page(id))?),
        Commands::Unlike { id } => {
            like::unlike(&ctx.db_conn, ctx.actor()?, Target::Page(id))?;
            print_json(&serde_json::json!({ "unliked": Target::Page(id) }))
        }
        Commands::Likers { id } => print_json(&like::likers(&ctx.db_conn, Target::Page(id))?),
    }
}

fn do_add(
    ctx: &mut Context,
    file: &str,
    note: Option<i64>,
    isbn: Option<String>,
) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let target = match (note, isbn) {
        (Some(id), _) => NoteRef::Id(id),
        (None, Some(isbn)) => NoteRef::Isbn(isbn),
        (None, None) => return Err(scribble::Error::MissingIsbn.into()),
    };
    let payloads: Vec<PagePayload> =
        serde_json::from_value(read_body(file)?).map_err(scribble::Error::from)?;
    let (note, pages) = page::add_pages(&mut ctx.db_conn, &ctx.search, actor, &target, &payloads)?;
    print_json(&serde_json::json!({ "note": note, "pages": pages }))
}
