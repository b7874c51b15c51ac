use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "outfit")]
#[command(version)]
#[command(about = "Detect package managers and provision this machine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show command output instead of writing it to the log
    #[arg(long, global = true, env = "OUTFIT_DEBUG")]
    pub debug: bool,

    /// Attach every command to the terminal
    #[arg(long, global = true)]
    pub interactive: bool,

    /// Show what would run without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show this system and its available package managers
    Detect {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect provider definitions
    #[command(subcommand)]
    Providers(ProvidersCommand),

    /// Install package managers
    Setup {
        /// Providers to install
        #[arg(required = true)]
        providers: Vec<String>,
    },

    /// Remove a package manager
    Teardown {
        /// Provider to remove
        provider: String,
    },

    /// Manage packages through a package manager
    #[command(subcommand)]
    Packages(PackagesCommand),

    /// Manage third-party repositories
    #[command(subcommand)]
    Repo(RepoCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Subcommand)]
pub enum ProvidersCommand {
    /// List providers that support this system
    List {
        /// Include providers for other systems
        #[arg(short, long)]
        all: bool,
    },

    /// Show one provider definition
    Show {
        /// Provider name
        name: String,
    },
}

// ============================================================================
// Packages
// ============================================================================

#[derive(Args, Clone, Default)]
pub struct ManagerArg {
    /// Package manager to use (defaults to the detected default)
    #[arg(short, long)]
    pub manager: Option<String>,
}

#[derive(Subcommand)]
pub enum PackagesCommand {
    /// Install packages
    Install {
        /// Packages to install
        #[arg(required = true)]
        packages: Vec<String>,

        /// Install one package at a time and keep going on failure
        #[arg(long)]
        isolated: bool,

        #[command(flatten)]
        manager: ManagerArg,
    },

    /// Remove packages
    Remove {
        /// Packages to remove
        #[arg(required = true)]
        packages: Vec<String>,

        #[command(flatten)]
        manager: ManagerArg,
    },

    /// Search available packages
    Search {
        /// Search term
        query: String,

        #[command(flatten)]
        manager: ManagerArg,
    },

    /// List installed packages
    List {
        #[command(flatten)]
        manager: ManagerArg,
    },

    /// Refresh package metadata
    Update {
        #[command(flatten)]
        manager: ManagerArg,
    },

    /// Clean package caches
    Clean {
        #[command(flatten)]
        manager: ManagerArg,
    },

    /// Install core package groups (all groups when none are named)
    Core {
        /// Groups to install, e.g. base, build
        groups: Vec<String>,

        /// Only print the packages
        #[arg(long)]
        show: bool,

        #[command(flatten)]
        manager: ManagerArg,
    },
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Subcommand)]
pub enum RepoCommand {
    /// Add a repository
    Add(RepoAddArgs),

    /// Remove a repository
    Remove {
        /// Repository name
        name: String,

        #[command(flatten)]
        manager: ManagerArg,
    },
}

#[derive(Args)]
pub struct RepoAddArgs {
    /// Repository name, used for file names
    pub name: String,

    /// Repository URL
    pub url: String,

    /// Signing key URL
    #[arg(short, long)]
    pub key_url: Option<String>,

    /// Release channel (defaults to the distribution codename)
    #[arg(long)]
    pub channel: Option<String>,

    /// Repository component
    #[arg(long)]
    pub component: Option<String>,

    /// Architecture name as the repository spells it
    #[arg(long)]
    pub arch: Option<String>,

    #[command(flatten)]
    pub manager: ManagerArg,
}
