use std::path::PathBuf;

use super::config::{BoardConfig, Scope};

/// A located board: where its configuration lives and which vault it reads
#[derive(Debug, Clone)]
pub struct BoardContext {
    /// Root of the vault that document paths are relative to
    pub vault_root: PathBuf,
    /// Directory holding `taskboard.toml`
    pub board_dir: PathBuf,
    /// `board_dir` relative to `vault_root`, `/`-separated (empty at the root)
    pub board_folder: String,
    /// Parsed taskboard.toml
    pub config: BoardConfig,
}

impl BoardContext {
    /// Vault folder whose documents the board scans
    pub fn scan_folder(&self) -> &str {
        match self.config.scope {
            Scope::Folder => &self.board_folder,
            Scope::Everywhere => "",
        }
    }
}
