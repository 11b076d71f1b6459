use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::store::vault_relative;

/// A change to a markdown document of the vault, path vault-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Created or modified
    Changed(String),
    Removed(String),
}

impl FileEvent {
    pub fn path(&self) -> &str {
        match self {
            FileEvent::Changed(path) | FileEvent::Removed(path) => path,
        }
    }
}

/// Watches a vault for changes to its markdown documents.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl DocumentWatcher {
    /// Start watching the vault rooted at `vault_root`, recursively.
    pub fn start(vault_root: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let root = vault_root.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                for file_event in classify(&root, event) {
                    let _ = tx.send(file_event);
                }
            },
            Config::default(),
        )?;

        watcher.watch(vault_root, RecursiveMode::Recursive)?;
        Ok(DocumentWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending file events.
    pub fn poll(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Wait up to `timeout` for the next event, then drain whatever else
    /// queued behind it. Duplicates are collapsed, keeping first-seen order.
    pub fn wait(&self, timeout: Duration) -> Vec<FileEvent> {
        let mut events = match self.rx.recv_timeout(timeout) {
            Ok(evt) => vec![evt],
            Err(_) => return Vec::new(),
        };
        for evt in self.poll() {
            if !events.contains(&evt) {
                events.push(evt);
            }
        }
        events
    }
}

/// Turn a raw notify event into document events. Only `.md` files outside
/// hidden directories count.
fn classify(root: &Path, event: Event) -> Vec<FileEvent> {
    let removed = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => false,
        EventKind::Remove(_) => true,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .filter_map(|p| document_path(root, &p))
        .map(|path| {
            // Renames arrive as modify events; the old name no longer exists
            if removed || !root.join(&path).exists() {
                FileEvent::Removed(path)
            } else {
                FileEvent::Changed(path)
            }
        })
        .collect()
}

fn document_path(root: &Path, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        return None;
    }
    let rel = vault_relative(root, path)?;
    if rel.split('/').any(|segment| segment.starts_with('.')) {
        return None;
    }
    Some(rel)
}
