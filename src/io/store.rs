use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("could not create {path}: {source}")]
    Create { path: String, source: io::Error },
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("path leaves the vault: {0}")]
    OutsideVault(String),
}

/// Whole-document access to the vault that holds the task lines.
///
/// Paths are vault-relative and `/`-separated.
pub trait DocumentStore {
    fn read_whole(&self, path: &str) -> Result<String, StoreError>;
    fn write_whole(&self, path: &str, text: &str) -> Result<(), StoreError>;
    fn exists(&self, path: &str) -> bool;
    fn create_file(&self, path: &str, initial_text: &str) -> Result<(), StoreError>;
    fn create_folder(&self, path: &str) -> Result<(), StoreError>;
    /// All markdown documents under `folder` (empty = whole vault), sorted.
    fn list_documents(&self, folder: &str) -> Result<Vec<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// A vault on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a vault path onto the root. `.` and `..` segments are refused.
    fn full_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StoreError::OutsideVault(path.to_string()));
            }
            full.push(segment);
        }
        Ok(full)
    }
}

impl DocumentStore for FsStore {
    fn read_whole(&self, path: &str) -> Result<String, StoreError> {
        fs::read_to_string(self.full_path(path)?).map_err(|e| StoreError::Read {
            path: path.to_string(),
            source: e,
        })
    }

    fn write_whole(&self, path: &str, text: &str) -> Result<(), StoreError> {
        atomic_write(&self.full_path(path)?, text.as_bytes()).map_err(|e| StoreError::Write {
            path: path.to_string(),
            source: e,
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_ok_and(|full| full.exists())
    }

    fn create_file(&self, path: &str, initial_text: &str) -> Result<(), StoreError> {
        let full = self.full_path(path)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .and_then(|mut file| file.write_all(initial_text.as_bytes()))
            .map_err(|e| StoreError::Create {
                path: path.to_string(),
                source: e,
            })
    }

    fn create_folder(&self, path: &str) -> Result<(), StoreError> {
        fs::create_dir_all(self.full_path(path)?).map_err(|e| StoreError::Create {
            path: path.to_string(),
            source: e,
        })
    }

    fn list_documents(&self, folder: &str) -> Result<Vec<String>, StoreError> {
        let mut documents = Vec::new();
        let start = self.full_path(folder)?;
        if start.is_dir() {
            collect_markdown(&self.root, &start, &mut documents).map_err(|e| {
                StoreError::Read {
                    path: folder.to_string(),
                    source: e,
                }
            })?;
        }
        documents.sort();
        Ok(documents)
    }
}

/// Recursively collect `.md` files below `dir`, skipping hidden entries
/// (`.obsidian/`, `.trash/`, ...).
fn collect_markdown(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_markdown(root, &path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("md")
            && let Some(rel) = vault_relative(root, &path)
        {
            out.push(rel);
        }
    }
    Ok(())
}

/// Express `path` relative to `root` with `/` separators.
pub fn vault_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(segments?.join("/"))
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A vault held in memory. Single-threaded, like the board itself.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RefCell<BTreeMap<String, String>>,
    folders: RefCell<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builder-style insert of a document
    pub fn with_document(self, path: &str, text: &str) -> Self {
        self.documents
            .borrow_mut()
            .insert(path.to_string(), text.to_string());
        self
    }

    /// Remove a document, returning its text
    pub fn remove(&self, path: &str) -> Option<String> {
        self.documents.borrow_mut().remove(path)
    }
}

impl DocumentStore for MemoryStore {
    fn read_whole(&self, path: &str) -> Result<String, StoreError> {
        self.documents
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn write_whole(&self, path: &str, text: &str) -> Result<(), StoreError> {
        self.documents
            .borrow_mut()
            .insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.documents.borrow().contains_key(path) || self.folders.borrow().contains(path)
    }

    fn create_file(&self, path: &str, initial_text: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.borrow_mut();
        if documents.contains_key(path) {
            return Err(StoreError::Create {
                path: path.to_string(),
                source: io::Error::from(io::ErrorKind::AlreadyExists),
            });
        }
        documents.insert(path.to_string(), initial_text.to_string());
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<(), StoreError> {
        self.folders.borrow_mut().insert(path.to_string());
        Ok(())
    }

    fn list_documents(&self, folder: &str) -> Result<Vec<String>, StoreError> {
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder.trim_end_matches('/'))
        };
        Ok(self
            .documents
            .borrow()
            .keys()
            .filter(|p| p.starts_with(&prefix) && p.ends_with(".md"))
            .cloned()
            .collect())
    }
}
