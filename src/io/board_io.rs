use std::fs;
use std::path::{Path, PathBuf};

use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::store::vault_relative;
use crate::model::board::BoardContext;

/// Directory that marks the root of an Obsidian vault
const VAULT_MARKER: &str = ".obsidian";

/// Error type for board I/O operations
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("not a task board: no taskboard.toml found")]
    NotABoard,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse taskboard.toml: {0}")]
    ConfigParseError(#[from] toml_edit::TomlError),
    #[error("could not serialize taskboard.toml: {0}")]
    ConfigSerializeError(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the board by walking up from the given directory, looking for
/// a `taskboard.toml`.
pub fn discover_board(start: &Path) -> Result<PathBuf, BoardError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(BoardError::NotABoard);
        }
    }
}

/// The vault a board lives in: the nearest ancestor (or the board directory
/// itself) holding `.obsidian/`, else the board directory.
pub fn find_vault_root(board_dir: &Path) -> PathBuf {
    board_dir
        .ancestors()
        .find(|dir| dir.join(VAULT_MARKER).is_dir())
        .unwrap_or(board_dir)
        .to_path_buf()
}

/// Load the board rooted at `board_dir`.
pub fn load_board(board_dir: &Path) -> Result<BoardContext, BoardError> {
    let board_dir = fs::canonicalize(board_dir).map_err(|e| BoardError::ReadError {
        path: board_dir.to_path_buf(),
        source: e,
    })?;
    if !board_dir.join(CONFIG_FILE).is_file() {
        return Err(BoardError::NotABoard);
    }

    let config = config_io::read_config(&board_dir)?;
    let vault_root = find_vault_root(&board_dir);
    let board_folder = vault_relative(&vault_root, &board_dir).unwrap_or_default();

    Ok(BoardContext {
        vault_root,
        board_dir,
        board_folder,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Scope;
    use tempfile::TempDir;

    fn create_test_vault(dir: &Path) {
        fs::create_dir_all(dir.join(".obsidian")).unwrap();
        fs::create_dir_all(dir.join("Boards/Home/notes")).unwrap();
        fs::write(
            dir.join("Boards/Home").join(CONFIG_FILE),
            "columns = [\"Today\", \"Later\"]\nscope = \"everywhere\"\n",
        )
        .unwrap();
    }

    #[test]
    fn test_discover_board() {
        let tmp = TempDir::new().unwrap();
        create_test_vault(tmp.path());
        let board = tmp.path().join("Boards/Home");

        assert_eq!(discover_board(&board).unwrap(), board);
        assert_eq!(discover_board(&board.join("notes")).unwrap(), board);
    }

    #[test]
    fn test_discover_board_not_found() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_board(tmp.path()),
            Err(BoardError::NotABoard)
        ));
    }

    #[test]
    fn test_find_vault_root() {
        let tmp = TempDir::new().unwrap();
        create_test_vault(tmp.path());
        let board = tmp.path().join("Boards/Home");
        assert_eq!(find_vault_root(&board), tmp.path());

        let plain = TempDir::new().unwrap();
        assert_eq!(find_vault_root(plain.path()), plain.path());
    }

    #[test]
    fn test_load_board() {
        let tmp = TempDir::new().unwrap();
        create_test_vault(tmp.path());

        let board = load_board(&tmp.path().join("Boards/Home")).unwrap();
        assert_eq!(board.board_folder, "Boards/Home");
        assert_eq!(board.config.columns, vec!["Today", "Later"]);
        assert_eq!(board.config.scope, Scope::Everywhere);
        assert_eq!(board.scan_folder(), "");
        assert_eq!(board.vault_root, fs::canonicalize(tmp.path()).unwrap());
    }

    #[test]
    fn test_load_board_at_vault_root() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "columns = []\n").unwrap();
        let board = load_board(tmp.path()).unwrap();
        assert_eq!(board.board_folder, "");
        assert_eq!(board.scan_folder(), "");
    }
}
