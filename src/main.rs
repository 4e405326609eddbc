//! `projref` command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use projref::{commands, diagnostics};
use tracing_subscriber::EnvFilter;

/// Command-line interface.
#[derive(Parser)]
#[command(name = "projref", version, about = "Reconcile references in MSBuild project files")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Add a reference to a sibling project and save
    AddProject {
        /// Project file to edit
        project: PathBuf,
        /// Project file to reference
        reference: PathBuf,
    },
    /// Report projects whose references are not in canonical order
    Check {
        /// Directory to scan for project files
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Deduplicate and reorder references in every project, then save
    Clean {
        /// Directory to scan for project files
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Show a project's target framework and declared references
    List {
        /// Project file to inspect
        project: PathBuf,
        /// Print machine-readable JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
}

/// Parse arguments, install logging, and dispatch. Errors render as markdown on stderr.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("projref=debug,info")
    } else {
        EnvFilter::new("projref=warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::AddProject { project, reference } => {
            commands::add_project(&project, &reference).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Check { root } => commands::check(&root),
        Commands::Clean { root } => commands::clean(&root),
        Commands::List { project, json } => commands::list(&project, json).map(|()| return ExitCode::SUCCESS),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}
