#![deny(unsafe_code)]

//! skillhub: inspect a skill corpus and plan budgeted loads from it.

mod config;
mod service;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use service::SkillhubService;
use skillhub_types::DocumentKind;

/// Registry and progressive-disclosure loader for skill corpora.
#[derive(Parser)]
#[command(name = "skillhub", version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over the global and local ones.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan the corpus and report failures and cost warnings.
    Scan,

    /// Plan which documents to load for a query.
    Load {
        /// Free-text query matched against trigger phrases.
        query: String,

        /// Token budget; defaults to `default_budget` from config.
        #[arg(short, long, allow_negative_numbers = true)]
        budget: Option<i64>,

        /// Also pull in `enhances` targets of matched documents.
        #[arg(long)]
        enhances: bool,

        /// Print the planned content instead of the plan.
        #[arg(long)]
        render: bool,

        /// Emit JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one document.
    Get {
        /// Document id.
        id: String,

        /// Emit JSON.
        #[arg(long)]
        json: bool,
    },

    /// List registered documents.
    List {
        /// Only this kind (skill, agent, command).
        #[arg(short, long)]
        kind: Option<DocumentKind>,

        /// Only documents carrying this tag.
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Expand ids into their dependency-ordered closure.
    Resolve {
        /// Seed document ids.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Also follow `enhances` of the seeds.
        #[arg(long)]
        enhances: bool,
    },

    /// Print the generated Markdown index.
    Index {
        /// Only this kind; all kinds otherwise.
        #[arg(short, long)]
        kind: Option<DocumentKind>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "info".to_string(),
        2 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }

    SkillhubService::new(config).run(cli.command).await
}
