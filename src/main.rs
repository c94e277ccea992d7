// MIT License
// Copyright (c) 2024 Graham King

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scribble::config::Config;
use scribble::db;
use scribble::search::NaverSearch;

mod cli;

#[derive(Parser)]
struct Cli {
    /// Sets a custom config file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Sets a custom database path
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Id of the user making the request
    #[arg(long, short, value_name = "ID")]
    user: Option<i64>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    User {
        #[clap(subcommand)]
        subcommand: cli::user::Commands,
    },
    Book {
        #[clap(subcommand)]
        subcommand: cli::book::Commands,
    },
    Note {
        #[clap(subcommand)]
        subcommand: cli::note::Commands,
    },
    Page {
        #[clap(subcommand)]
        subcommand: cli::page::Commands,
    },
    Comment {
        #[clap(subcommand)]
        subcommand: cli::comment::Commands,
    },
    Feed {
        #[clap(subcommand)]
        subcommand: cli::feed::Commands,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(p) = args.db_path {
        cfg.db_path = Some(p);
    }

    // stdout is for JSON responses
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let db_path = cfg.resolve_db_path()?;
    let db_conn = db::open(&db_path).with_context(|| format!("{}", db_path.display()))?;
    let search = NaverSearch::new(&cfg.search)?;
    let mut ctx = cli::Context {
        db_conn,
        search,
        user: args.user,
        config: cfg,
    };

    let res = match args.command {
        Commands::User { subcommand } => cli::user::run(&mut ctx, subcommand),
        Commands::Book { subcommand } => cli::book::run(&mut ctx, subcommand),
        Commands::Note { subcommand } => cli::note::run(&mut ctx, subcommand),
        Commands::Page { subcommand } => cli::page::run(&mut ctx, subcommand),
        Commands::Comment { subcommand } => cli::comment::run(&mut ctx, subcommand),
        Commands::Feed { subcommand } => cli::feed::run(&mut ctx, subcommand),
    };
    let Err(e) = res else {
        return Ok(());
    };
    // Typed failures become an error response, anything else is a crash
    match e.downcast_ref::<scribble::Error>() {
        Some(err) => {
            eprintln!("{}", cli::error_body(err));
            process::exit(1);
        }
        None => Err(e),
    }
}
