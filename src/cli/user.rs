// MIT License
// Copyright (c) 2024 Graham King

use scribble::model::{Categories, Category};
use scribble::user::{self, NewUser};

use super::{print_json, Context};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Register a user. Needs an email or an auth id.
    Create {
        #[clap(long)]
        nickname: String,
        #[clap(long)]
        email: Option<String>,
        #[clap(long)]
        auth_id: Option<String>,
        #[clap(long)]
        profile_image: Option<String>,
        /// Categories to follow, may be repeated
        #[clap(long = "category", value_enum)]
        categories: Vec<Category>,
    },

    /// Show a user, by id or by auth id
    Show {
        id: Option<i64>,
        #[clap(long, conflicts_with = "id")]
        auth_id: Option<String>,
    },

    /// Follow more categories, as the acting user
    Follow {
        #[clap(value_enum, required = true)]
        categories: Vec<Category>,
    },

    /// Stop following categories, as the acting user
    Unfollow {
        #[clap(value_enum, required = true)]
        categories: Vec<Category>,
    },

    /// Change the acting user's nickname or profile image
    Profile {
        #[clap(long)]
        nickname: Option<String>,
        #[clap(long)]
        profile_image: Option<String>,
    },

    /// Delete the acting user. Their notes remain, without an author.
    Delete,
}

pub fn run(ctx: &mut Context, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Create {
            nickname,
            email,
            auth_id,
            profile_image,
            categories,
        } => {
            let new = NewUser {
                email,
                auth_id,
                nickname,
                profile_image,
                categories: categories.into_iter().collect(),
            };
            print_json(&user::create(&ctx.db_conn, new)?)
        }
        Commands::Show { id, auth_id } => do_show(ctx, id, auth_id.as_deref()),
        Commands::Follow { categories } => {
            let actor = ctx.actor()?;
            let set: Categories = categories.into_iter().collect();
            print_json(&user::follow_categories(&mut ctx.db_conn, actor, &set)?)
        }
        Commands::Unfollow { categories } => {
            let actor = ctx.actor()?;
            let set: Categories = categories.into_iter().collect();
            print_json(&user::unfollow_categories(&mut ctx.db_conn, actor, &set)?)
        }
        Commands::Profile {
            nickname,
            profile_image,
        } => {
            let actor = ctx.actor()?;
            let u = user::update_profile(
                &ctx.db_conn,
                actor,
                nickname.as_deref(),
                profile_image.as_deref(),
            )?;
            print_json(&u)
        }
        Commands::Delete => {
            let actor = ctx.actor()?;
            user::delete(&ctx.db_conn, actor, actor)?;
            print_json(&serde_json::json!({ "deleted": actor }))
        }
    }
}

fn do_show(ctx: &Context, id: Option<i64>, auth_id: Option<&str>) -> anyhow::Result<()> {
    let u = match (id, auth_id) {
        (_, Some(a)) => match user::find_by_auth_id(&ctx.db_conn, a)? {
            Some(u) => u,
            None => {
                return Err(scribble::Error::Validation(format!("no user for auth id {a}")).into())
            }
        },
        (Some(id), None) => user::get(&ctx.db_conn, id)?,
        (None, None) => user::get(&ctx.db_conn, ctx.actor()?)?,
    };
    print_json(&u)
}
