// MIT License
// Copyright (c) 2024 Graham King

use scribble::comment;

use super::{print_json, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Comment on a page, or reply to another comment on it
    Add {
        page: i64,
        content: String,
        /// The comment being replied to
        #[clap(long, default_value_t = comment::ROOT)]
        parent: i64,
    },

    /// A page's comments, oldest first
    List { page: i64 },

    Edit { id: i64, content: String },

    Delete { id: i64 },
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Add {
            page,
            content,
            parent,
        } => print_json(&comment::create(
            &ctx.db_conn,
            ctx.actor()?,
            page,
            parent,
            &content,
        )?),
        Commands::List { page } => print_json(&comment::list(&ctx.db_conn, page)?),
        Commands::Edit { id, content } => {
            print_json(&comment::edit(&ctx.db_conn, ctx.actor()?, id, &content)?)
        }
        Commands::Delete { id } => {
            comment::delete(&ctx.db_conn, ctx.actor()?, id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}
