//! Command-line lifecycle tooling for agentfs mounts.
//!
//! Subcommand surface mirrors the original `stackedfs` argparse tool
//! exactly: `init`, `mount`, `unmount`, `agent add`, `status`, `conflicts`,
//! `direnv`.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentfs", about = "Layered overlay filesystem for multi-agent repos")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new repository layout at `path`.
    Init { path: PathBuf },

    /// Mount `repo` at `mount_point`.
    Mount {
        repo: PathBuf,
        mount_point: PathBuf,
        #[arg(short, long)]
        foreground: bool,
        #[arg(short, long)]
        debug: bool,
    },

    /// Unmount a previously mounted directory.
    Unmount { mount_point: PathBuf },

    /// Agent management commands.
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Show layer and conflict status.
    Status {
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },

    /// List recorded conflicts.
    Conflicts {
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },

    /// Print shell exports for direnv integration.
    Direnv {
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
        #[arg(short, long)]
        agent: Option<String>,
    },
}

#[derive(Subcommand)]
enum AgentCommand {
    /// Register a new agent layer.
    Add {
        name: String,
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let debug = matches!(
        &args.command,
        Command::Mount { debug: true, .. }
    );
    init_tracing(debug);

    let result = match args.command {
        Command::Init { path } => commands::init::run(&path),
        Command::Mount {
            repo,
            mount_point,
            foreground,
            debug,
        } => commands::mount::run(&repo, &mount_point, foreground, debug),
        Command::Unmount { mount_point } => commands::unmount::run(&mount_point),
        Command::Agent {
            command: AgentCommand::Add { name, repo },
        } => commands::agent::add(&repo, &name),
        Command::Status { repo } => commands::status::run(&repo),
        Command::Conflicts { repo } => commands::conflicts::run(&repo),
        Command::Direnv { repo, agent } => commands::direnv::run(&repo, agent.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).init();
}
