use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "cattree")]
#[command(about = "Manage a named category hierarchy")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base directory (default: ~/.cattree)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a category path (e.g., "Books/Fiction/Classics")
    Add {
        /// Category path; missing segments are created
        path: String,

        /// Add below this parent (bare name or full path such as "books/fiction")
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Remove a category by its full path
    Remove {
        /// Category path, resolved from the top level (e.g., "Books/Fiction")
        path: String,

        /// Also remove all descendants
        #[arg(long)]
        cascade: bool,
    },

    /// Show the category tree
    Tree {
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all categories to a CSV file
    Export {
        /// Output file (default: tabular.export_file from config)
        file: Option<PathBuf>,

        /// Don't write a header row
        #[arg(long)]
        no_header: bool,
    },

    /// Import categories from a CSV file
    Import {
        /// CSV file with (category, parent) rows
        file: PathBuf,

        /// Treat the first row as data
        #[arg(long)]
        no_header: bool,
    },

    /// Insert sample categories into an empty store
    Seed,

    /// Interactive chat commands (/help, /viewTree, /addElement, ...)
    Chat {
        /// Chat id used for the session
        #[arg(long, default_value = "0")]
        chat_id: i64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g., removal.policy)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., removal.policy)
        key: String,

        /// Value to set (e.g., "cascade")
        value: String,
    },

    /// List all config values
    List,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init,
}
