use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cattree_core::chat::{ChatDispatcher, ChatId, Reply, Transport, EMPTY_TREE};
use cattree_core::config::{Config, RemovalPolicy};
use cattree_core::engine::HierarchyEngine;
use cattree_core::store::FileStore;
use cattree_core::tabular;
use cattree_core::{CatTreeError, Result};

mod args;
use args::{Cli, Commands, ConfigAction, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let base_dir = match resolve_base_dir(cli.base_dir) {
        Ok(dir) => dir,
        Err(e) => return report(e),
    };
    tracing::debug!(base_dir = %base_dir.display(), "resolved base directory");

    let result = match cli.command {
        Some(Commands::Add { path, parent }) => handle_add(&base_dir, &path, parent.as_deref()),
        Some(Commands::Remove { path, cascade }) => handle_remove(&base_dir, &path, cascade),
        Some(Commands::Tree { json }) => handle_tree(&base_dir, json),
        Some(Commands::Export { file, no_header }) => {
            handle_export(&base_dir, file.as_deref(), no_header)
        }
        Some(Commands::Import { file, no_header }) => handle_import(&base_dir, &file, no_header),
        Some(Commands::Seed) => handle_seed(&base_dir),
        Some(Commands::Chat { chat_id }) => handle_chat(&base_dir, chat_id),
        Some(Commands::Config { action }) => handle_config(action, &base_dir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(e: CatTreeError) -> ExitCode {
    eprintln!("{} {}", "[ERROR]".red().bold(), e);
    ExitCode::from(e.exit_code() as u8)
}

/// `CATTREE_LOG` wins over the -v / -q flags
fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_env("CATTREE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "cattree", &mut io::stdout());
}

fn resolve_base_dir(cli_base: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(base) = cli_base {
        return Ok(base);
    }

    if let Ok(base) = std::env::var("CATTREE_BASE") {
        return Ok(PathBuf::from(base));
    }

    let home = dirs::home_dir().ok_or(CatTreeError::HomeNotFound)?;
    Ok(home.join(".cattree"))
}

/// Engine over the file store configured for `base_dir`
fn open_engine(base_dir: &Path) -> Result<(HierarchyEngine<FileStore>, Config)> {
    let config = Config::load(base_dir)?;
    let store = FileStore::open(config.store_path(base_dir))?;
    Ok((HierarchyEngine::from_config(store, &config), config))
}

fn handle_add(base_dir: &Path, path: &str, parent: Option<&str>) -> Result<()> {
    let (mut engine, _) = open_engine(base_dir)?;
    let added = engine.add_category(path, parent)?;

    println!("{} {}", "Added:".green(), added.path.cyan());
    if added.created.len() > 1 {
        for category in &added.created {
            println!("  {} {}", "[NEW]".green(), category.name);
        }
    }
    if added.existing > 0 {
        println!(
            "  {}",
            format!("({} existing categories reused)", added.existing).dimmed()
        );
    }

    Ok(())
}

fn handle_remove(base_dir: &Path, path: &str, cascade: bool) -> Result<()> {
    let (engine, _) = open_engine(base_dir)?;
    let mut engine = if cascade {
        engine.with_removal_policy(RemovalPolicy::Cascade)
    } else {
        engine
    };

    let removed = engine.remove_category(path)?;

    println!("{} {}", "Removed:".green(), removed.path.cyan());
    if removed.removed > 1 {
        println!(
            "  {}",
            format!("({} descendants removed)", removed.removed - 1).dimmed()
        );
    }

    Ok(())
}

fn handle_tree(base_dir: &Path, json: bool) -> Result<()> {
    let (engine, _) = open_engine(base_dir)?;

    if json {
        let nodes = engine.snapshot()?;
        let out = serde_json::to_string_pretty(&nodes).map_err(|e| CatTreeError::Io(e.into()))?;
        println!("{}", out);
        return Ok(());
    }

    if engine.is_empty()? {
        println!("{}", EMPTY_TREE.dimmed());
        return Ok(());
    }

    print!("{}", engine.render_tree()?);
    Ok(())
}

fn handle_export(base_dir: &Path, file: Option<&Path>, no_header: bool) -> Result<()> {
    let (engine, config) = open_engine(base_dir)?;
    let path = file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.export_path(base_dir));
    let header = config.tabular.header && !no_header;

    let rows = tabular::export_csv(engine.store(), &path, header)?;

    println!(
        "{} {} ({} categories)",
        "Exported:".green(),
        path.display(),
        rows
    );
    Ok(())
}

fn handle_import(base_dir: &Path, file: &Path, no_header: bool) -> Result<()> {
    let (mut engine, config) = open_engine(base_dir)?;
    let header = config.tabular.header && !no_header;

    println!();
    println!("File: {}", file.display().to_string().cyan());
    println!("Importing...");

    let report = tabular::import_csv(&mut engine, file, header)?;

    for failure in &report.failures {
        println!(
            "  {} row {}: {}",
            "[FAIL]".red().bold(),
            failure.row,
            failure.error
        );
    }

    println!();
    println!("Summary:");
    println!("  Rows: {}", report.rows);
    println!("  Created: {}", report.created);
    println!("  Skipped: {}", report.skipped);
    println!("  Failed: {}", report.failures.len());
    println!();

    if report.is_clean() {
        println!("{}", "Import complete.".green());
    } else {
        println!("{}", "Import finished with errors.".yellow());
    }

    Ok(())
}

fn handle_seed(base_dir: &Path) -> Result<()> {
    let (mut engine, _) = open_engine(base_dir)?;

    if engine.seed_sample()? {
        println!("{}", "Seeded sample categories:".green());
        print!("{}", engine.render_tree()?);
    } else {
        println!("{}", "Store is not empty; nothing seeded.".yellow());
    }
    Ok(())
}

/// Prints replies to stdout in place of a chat service
struct ConsoleTransport<W: Write> {
    out: W,
}

impl<W: Write> Transport for ConsoleTransport<W> {
    fn send_text(&mut self, _chat: ChatId, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text.trim_end())?;
        Ok(())
    }

    fn send_file(&mut self, _chat: ChatId, path: &Path) -> Result<()> {
        writeln!(self.out, "{} {}", "[FILE]".cyan(), path.display())?;
        Ok(())
    }
}

fn handle_chat(base_dir: &Path, chat: ChatId) -> Result<()> {
    let (engine, config) = open_engine(base_dir)?;
    let mut dispatcher = ChatDispatcher::from_config(engine, base_dir, &config);
    let mut transport = ConsoleTransport { out: io::stdout() };

    println!("{}", "Chat mode. Type /help for commands, Ctrl-D to quit.".dimmed());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = chat_reply(&mut dispatcher, chat, line);
        dispatcher.deliver(&mut transport, chat, &reply)?;
    }

    Ok(())
}

/// After `/upload`, any line that is not a known command names the file to import
fn chat_reply<S: cattree_core::CategoryStore>(
    dispatcher: &mut ChatDispatcher<S>,
    chat: ChatId,
    line: &str,
) -> Reply {
    if dispatcher.is_uploading(chat) && !dispatcher.is_command(line) {
        dispatcher.handle_document(chat, Path::new(line))
    } else {
        dispatcher.handle_text(chat, line)
    }
}

fn handle_config(action: ConfigAction, base_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(base_dir)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(CatTreeError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(base_dir)?;
            config.set(&key, &value)?;
            config.save(base_dir)?;
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::List => {
            let config = Config::load(base_dir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            let path = Config::path(base_dir);
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            let path = Config::init(base_dir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }

    Ok(())
}
