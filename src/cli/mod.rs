use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::collection::NoteCollection;
use crate::config::{AppConfig, ConfigLoader, ConfigPaths};
use crate::storage::{self, StorageHandle};

pub mod commands;

use self::commands::{
    AddArgs, AttachArgs, DeleteArgs, DetachArgs, DrawArgs, EditArgs, ExportArgs, ListArgs,
    NoteArgs, StdinPrompter, ThemeArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "memopad",
    version,
    about = "Terminal note pad with text and freehand notes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over MEMOPAD_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MEMOPAD_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a text note
    Add(AddArgs),
    /// Create a handwriting note from pen strokes
    Draw(DrawArgs),
    /// Print the note list
    List(ListArgs),
    /// Open a note and print it (counts as a view)
    Show(NoteArgs),
    /// Change a note's title or body
    Edit(EditArgs),
    /// Delete one or more notes
    Delete(DeleteArgs),
    /// Toggle a note's favorite flag
    Favorite(NoteArgs),
    /// Toggle a note's lock flag (unlocks the session first)
    Lock(NoteArgs),
    /// Attach files to a note
    Attach(AttachArgs),
    /// Remove an attachment from a note
    Detach(DetachArgs),
    /// Write a note's attachments (and drawing) to disk
    Export(ExportArgs),
    /// Set or change the session password
    Password,
    /// Show or change the color theme
    Theme(ThemeArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("MEMOPAD_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("MEMOPAD_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    let output = match command {
        Commands::Tui => {
            let mut app = App::new(config, storage, &paths)?;
            return app.run();
        }
        command => execute(command, storage, &config, &paths)?,
    };
    print!("{output}");
    Ok(())
}

/// Runs one batch subcommand and returns what it prints.
fn execute(
    command: Commands,
    storage: StorageHandle,
    config: &AppConfig,
    paths: &ConfigPaths,
) -> Result<String> {
    let mut collection = NoteCollection::load(storage).context("loading notes")?;
    let mut prompter = StdinPrompter;
    match command {
        Commands::Tui => bail!("the terminal UI is not a batch command"),
        Commands::Add(args) => commands::add_note(&mut collection, config, args),
        Commands::Draw(args) => commands::draw_note(&mut collection, config, args),
        Commands::List(args) => commands::list_notes(&collection, config, &mut prompter, args),
        Commands::Show(args) => commands::show_note(&mut collection, &mut prompter, args),
        Commands::Edit(args) => commands::edit_note(&mut collection, &mut prompter, args),
        Commands::Delete(args) => commands::delete_notes(&mut collection, &mut prompter, args),
        Commands::Favorite(args) => commands::toggle_favorite(&mut collection, args),
        Commands::Lock(args) => commands::toggle_lock(&mut collection, &mut prompter, args),
        Commands::Attach(args) => commands::attach_files(&mut collection, args),
        Commands::Detach(args) => commands::detach_file(&mut collection, args),
        Commands::Export(args) => {
            commands::export_note(&mut collection, &mut prompter, &paths.export_dir, args)
        }
        Commands::Password => commands::change_password(&collection, &mut prompter),
        Commands::Theme(args) => commands::theme(&collection, config, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
