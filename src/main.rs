use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "stet")]
#[command(about = "Local-first code review with an LLM, one hunk at a time")]
#[command(version)]
struct Cli {
    /// Path inside the repository (defaults to the current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose logging and full error chains
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a review session against a baseline (defaults to HEAD)
    Start {
        /// Baseline commit, branch or tag
        reference: Option<String>,

        /// Skip the model and emit one canned finding per hunk
        #[arg(long)]
        dry_run: bool,

        /// Start even with uncommitted changes to tracked files
        #[arg(long)]
        allow_dirty: bool,

        /// Strictness preset: strict, default or lenient (append + to disable the banned-phrase filter)
        #[arg(long)]
        strictness: Option<String>,

        /// Also report style nitpicks
        #[arg(long)]
        nitpicky: bool,

        /// Print progress and findings as newline-delimited JSON
        #[arg(long)]
        stream: bool,

        /// Limit the review to these paths
        #[arg(last = true)]
        paths: Vec<String>,
    },

    /// Review hunks changed since the last pass
    Run {
        #[arg(long)]
        dry_run: bool,

        /// Review the whole baseline diff, including dismissed locations
        #[arg(long)]
        force: bool,

        /// Replace existing findings instead of merging
        #[arg(long)]
        replace: bool,

        #[arg(long)]
        stream: bool,
    },

    /// Review the whole diff again and replace all findings
    Rerun {
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        stream: bool,
    },

    /// Finish the session and write a note on HEAD
    Finish,

    /// Dismiss a finding by ID or unique prefix
    Dismiss {
        id: String,

        /// false_positive, already_correct, wrong_suggestion or out_of_scope
        reason: Option<String>,
    },

    /// Show the current session
    Status {
        #[arg(long)]
        json: bool,
    },

    /// List active findings
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let verbose = cli.verbose;
    if let Err(err) = dispatch(cli).await {
        if verbose {
            eprintln!("Error: {:#}", err);
        } else {
            eprintln!("Error: {}", err);
        }
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Start {
            reference,
            dry_run,
            allow_dirty,
            strictness,
            nitpicky,
            stream,
            paths,
        } => {
            let args = cli::review::StartArgs {
                reference: reference.unwrap_or_default(),
                dry_run,
                allow_dirty,
                strictness,
                nitpicky,
                stream,
                paths,
            };
            cli::review::start_command(&work_dir, args).await
        }
        Commands::Run {
            dry_run,
            force,
            replace,
            stream,
        } => cli::review::run_command(&work_dir, dry_run, force, replace, stream).await,
        Commands::Rerun { dry_run, stream } => {
            cli::review::run_command(&work_dir, dry_run, true, true, stream).await
        }
        Commands::Finish => cli::review::finish_command(&work_dir).await,
        Commands::Dismiss { id, reason } => {
            cli::findings::dismiss_command(&work_dir, &id, reason.as_deref())
        }
        Commands::Status { json } => cli::status::status_command(&work_dir, json),
        Commands::List { json } => cli::findings::list_command(&work_dir, json),
    }
}
