//! FormDraft command-line entry point.

mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formdraft_core::{CanvasConfig, Editor, Notice, NoticeLevel};
use std::path::{Path, PathBuf};

/// FormDraft - replay canvas edits and round-trip form markup
#[derive(Parser, Debug)]
#[command(name = "formdraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON action script and print the exported markup
    Run {
        /// Action script (array of actions or action arrays)
        script: PathBuf,

        /// Canvas configuration file
        #[arg(short, long, default_value = "formdraft.json")]
        config: PathBuf,

        /// Print the final canvas state as JSON instead of markup
        #[arg(long)]
        state: bool,
    },

    /// Import a markup file and print it back in canonical form
    Import {
        /// Markup file to import
        input: PathBuf,

        /// Canvas configuration file
        #[arg(short, long, default_value = "formdraft.json")]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<CanvasConfig> {
    CanvasConfig::load(path).with_context(|| format!("cannot load config {}", path.display()))
}

fn print_notice(notice: &Notice) {
    let label = match notice.level {
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    eprintln!("{}: {}", label, notice.message);
}

fn run(script_path: &Path, config_path: &Path, dump_state: bool) -> Result<()> {
    let mut editor = Editor::new(load_config(config_path)?);
    let steps = script::load_script(script_path)?;
    log::info!("Replaying {} step(s) from {}", steps.len(), script_path.display());

    for notice in script::replay(&mut editor, steps) {
        print_notice(&notice);
    }

    if dump_state {
        println!("{}", serde_json::to_string_pretty(editor.state())?);
    } else {
        println!("{}", editor.export_markup());
    }
    Ok(())
}

fn import(input: &Path, config_path: &Path) -> Result<()> {
    let mut editor = Editor::new(load_config(config_path)?);
    let markup = std::fs::read_to_string(input).with_context(|| format!("cannot read {}", input.display()))?;

    let warnings = editor.import_markup(&markup);
    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }
    log::info!(
        "Imported {} element(s) from {}",
        editor.canvas().len(),
        input.display()
    );
    println!("{}", editor.export_markup());
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Starting FormDraft");

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { script, config, state } => run(&script, &config, state),
        Command::Import { input, config } => import(&input, &config),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
