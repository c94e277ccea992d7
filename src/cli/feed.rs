// MIT License
// Copyright (c) 2024 Graham King

use scribble::feed::{self, NoteSortKey, SortKey, SortOrder};

use super::{print_json, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Every page, sorted
    Pages {
        #[clap(long, value_enum, default_value_t)]
        sort: SortKey,
        #[clap(long, value_enum, default_value_t)]
        order: SortOrder,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long, default_value_t = 0)]
        offset: usize,
    },

    /// One user's notes that have pages. Defaults to the acting user.
    Notes {
        user: Option<i64>,
        #[clap(long, value_enum, default_value_t)]
        sort: NoteSortKey,
        #[clap(long, value_enum, default_value_t)]
        order: SortOrder,
        #[clap(long)]
        limit: Option<usize>,
        #[clap(long, default_value_t = 0)]
        offset: usize,
    },
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Pages {
            sort,
            order,
            limit,
            offset,
        } => {
            let paging = ctx.paging(limit, offset);
            print_json(&feed::pages(&ctx.db_conn, sort, order, paging)?)
        }
        Commands::Notes {
            user,
            sort,
            order,
            limit,
            offset,
        } => {
            let user_id = match user {
                Some(id) => id,
                None => ctx.actor()?,
            };
            let paging = ctx.paging(limit, offset);
            print_json(&feed::user_notes(&ctx.db_conn, user_id, sort, order, paging)?)
        }
    }
}
