// MIT License
// Copyright (c) 2024 Graham King

use scribble::like::{self, Target};
use scribble::note;

use super::{print_json, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Get or create the acting user's note for a book
    Create { isbn: String },

    /// Show a note with its book, likes and pages. Counts a view.
    Show { id: i64 },

    /// Delete one of the acting user's notes, with all its pages
    Delete { id: i64 },

    Like { id: i64 },

    Unlike { id: i64 },

    /// Users who like the note
    Likers { id: i64 },
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Create { isbn } => {
            let actor = ctx.actor()?;
            print_json(&note::resolve_or_create(
                &ctx.db_conn,
                &ctx.search,
                actor,
                &isbn,
            )?)
        }
        Commands::Show { id } => print_json(&note::view(&ctx.db_conn, ctx.user, id)?),
        Commands::Delete { id } => {
            note::delete(&ctx.db_conn, ctx.actor()?, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::Like { id } => print_json(&like::like(&ctx.db_conn, ctx.actor()?, Target::Note(id))?),
        Commands::Unlike { id } => {
            like::unlike(&ctx.db_conn, ctx.actor()?, Target::Note(id))?;
            print_json(&serde_json::json!({ "unliked": Target::Note(id) }))
        }
        Commands::Likers { id } => print_json(&like::likers(&ctx.db_conn, Target::Note(id))?),
    }
}
