use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::board_io;
use crate::io::config_io::{self, CONFIG_FILE};
use crate::model::config::{BoardConfig, Scope};
use crate::parse::normalize_tag;

/// Check that every column name yields a usable, distinct column tag.
pub(super) fn validate_columns(columns: &[String]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for name in columns {
        let tag = normalize_tag(name);
        if tag.is_empty() {
            return Err(format!("column name \"{}\" has no tag characters", name));
        }
        if tag.eq_ignore_ascii_case("done") || tag.eq_ignore_ascii_case("archived") {
            return Err(format!("\"{}\" is reserved and cannot be a column", name));
        }
        if !seen.insert(tag.clone()) {
            return Err(format!(
                "columns \"{}\" and an earlier one share the tag #{}",
                name, tag
            ));
        }
    }
    Ok(())
}

/// Build the configuration for a new board from the init flags.
fn build_config(args: &InitArgs) -> Result<BoardConfig, String> {
    let mut config = BoardConfig::default();
    if !args.columns.is_empty() {
        validate_columns(&args.columns)?;
        config.columns = args.columns.clone();
    }
    if args.everywhere {
        config.scope = Scope::Everywhere;
    }
    if let Some(ref path) = args.task_path {
        config.default_task_path = Some(path.clone());
    }
    Ok(config)
}

pub fn cmd_init(args: InitArgs, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.is_file() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = dir.parent()
        && let Ok(parent_board) = board_io::discover_board(parent)
    {
        eprintln!("Note: enclosing board found at {}/", parent_board.display());
        eprintln!("Creating new board in {}/", dir.display());
    }

    let config = build_config(&args)?;
    fs::create_dir_all(dir)?;
    fs::write(&config_path, config_io::render_config(&config)?)?;

    let vault_root = board_io::find_vault_root(dir);
    println!("Initialized board: {}", dir.display());
    println!("  vault: {}", vault_root.display());
    println!("  columns: {}", config.columns.join(", "));
    Ok(())
}
