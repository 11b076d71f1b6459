mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::board_io;
use crate::io::config_io;
use crate::io::lock::BoardLock;
use crate::io::store::{DocumentStore, FsStore};
use crate::io::watcher::{DocumentWatcher, FileEvent};
use crate::model::board::BoardContext;
use crate::model::column::{ColumnTag, ColumnTagTable};
use crate::model::link::PathLinkResolver;
use crate::model::task::Task;
use crate::ops::reconcile::{BoardIndex, ScanReport};
use crate::ops::task_ops;
use crate::ops::view::Board;
use crate::parse::normalize_tag;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Line width used when neither `--width` nor `$COLUMNS` is set
const DEFAULT_WIDTH: usize = 100;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let start = match cli.board_dir {
        Some(ref dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };

    match cli.command {
        // Init works on the directory itself, before board discovery
        Commands::Init(args) => cmd_init(args, &start),

        // Read commands
        Commands::Scan => cmd_scan(&start, json),
        Commands::Board(args) => cmd_board(&start, args, json),
        Commands::List(args) => cmd_list(&start, args, json),
        Commands::Show(args) => cmd_show(&start, args, json),

        // Write commands
        Commands::Move(args) => cmd_move(&start, args, json),
        Commands::Done(args) => cmd_done(&start, args, json),
        Commands::Edit(args) => cmd_edit(&start, args, json),
        Commands::Archive(args) => cmd_archive(&start, args, json),
        Commands::Delete(args) => cmd_delete(&start, args, json),
        Commands::Add(args) => cmd_add(&start, args, json),
        Commands::Column(args) => cmd_column(&start, args),

        Commands::Watch => cmd_watch(&start, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A board with its documents scanned into an index
struct LoadedBoard {
    board: BoardContext,
    store: FsStore,
    columns: ColumnTagTable,
    index: BoardIndex,
    scan: ScanReport,
}

fn load_board(board_dir: &Path) -> Result<LoadedBoard, Box<dyn std::error::Error>> {
    let board = board_io::load_board(board_dir)?;
    let store = FsStore::new(&board.vault_root);
    let columns = board.config.column_table();
    let documents = store.list_documents(board.scan_folder())?;

    let mut index = BoardIndex::new();
    let scan = index.scan(&store, &documents, &columns, &PathLinkResolver);

    Ok(LoadedBoard {
        board,
        store,
        columns,
        index,
        scan,
    })
}

fn load_board_cwd(start: &Path) -> Result<LoadedBoard, Box<dyn std::error::Error>> {
    let board_dir = board_io::discover_board(start)?;
    load_board(&board_dir)
}

/// Discover the board, take its write lock, then scan it. The lock is held
/// for as long as the returned guard lives.
fn load_board_locked(
    start: &Path,
) -> Result<(BoardLock, LoadedBoard), Box<dyn std::error::Error>> {
    let board_dir = board_io::discover_board(start)?;
    let lock = BoardLock::acquire_default(&board_dir)?;
    let loaded = load_board(&board_dir)?;
    Ok((lock, loaded))
}

fn terminal_width(requested: Option<usize>) -> usize {
    requested
        .or_else(|| std::env::var("COLUMNS").ok()?.parse().ok())
        .unwrap_or(DEFAULT_WIDTH)
}

/// Whether a task belongs on the Done side of the board
fn is_done(task: &Task) -> bool {
    task.done()
        || task
            .column()
            .and_then(|c| c.column_tag())
            .is_some_and(ColumnTag::is_done)
}

fn print_written(id: &str, path: &str, line: &str, json: bool) -> CmdResult {
    if json {
        let written = WrittenJson {
            id: id.to_string(),
            path: path.to_string(),
            line: (!line.is_empty()).then(|| line.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&written)?);
    } else if line.is_empty() {
        println!("{} removed from {}", short_id(id), path);
    } else {
        println!("{} {}", short_id(id), line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_scan(start: &Path, json: bool) -> CmdResult {
    let loaded = load_board_cwd(start)?;
    let tasks = loaded.index.len();

    if json {
        let output = ScanJson {
            tasks,
            report: &loaded.scan,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for line in format_scan_report(&loaded.scan, tasks) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_board(start: &Path, args: BoardArgs, json: bool) -> CmdResult {
    let loaded = load_board_cwd(start)?;
    let board = Board::from_index(&loaded.index, &loaded.board.config);

    if json {
        println!("{}", serde_json::to_string_pretty(&board_to_json(&board))?);
    } else {
        let width = terminal_width(args.width);
        for line in format_board(&board, loaded.board.config.show_filepath, width) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_list(start: &Path, args: ListArgs, json: bool) -> CmdResult {
    let loaded = load_board_cwd(start)?;
    let column_filter = args
        .column
        .as_deref()
        .map(|c| task_ops::resolve_column(&loaded.columns, c))
        .transpose()?;
    let tag_filter = args.tag.as_deref().map(|t| t.trim_start_matches('#'));

    let tasks: Vec<&Task> = loaded
        .index
        .tasks()
        .into_iter()
        .filter(|task| !task.is_archived() && !task.is_deleted())
        .filter(|task| args.done || !is_done(task))
        .filter(|task| match column_filter {
            Some(ref column) => task.column().and_then(|c| c.column_tag()) == Some(column),
            None => true,
        })
        .filter(|task| match tag_filter {
            Some(tag) => task.tags().contains(tag),
            None => true,
        })
        .collect();

    if json {
        let output: Vec<TaskJson> = tasks.iter().map(|t| task_to_json(t)).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let width = terminal_width(None);
        for task in tasks {
            println!(
                "{}",
                format_task_line(task, loaded.board.config.show_filepath, width)
            );
        }
    }
    Ok(())
}

fn cmd_show(start: &Path, args: IdArg, json: bool) -> CmdResult {
    let loaded = load_board_cwd(start)?;
    let id = loaded.index.resolve_id(&args.id)?;
    let task = loaded
        .index
        .get(id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task_to_json(task))?);
    } else {
        for line in format_task_detail(task, &loaded.columns) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_move(start: &Path, args: MoveArgs, json: bool) -> CmdResult {
    let (_lock, mut loaded) = load_board_locked(start)?;
    let id = loaded.index.resolve_id(&args.id)?.to_string();
    let path = task_path(&loaded.index, &id)?;

    let line = if normalize_tag(&args.column).eq_ignore_ascii_case(ColumnTag::DONE) {
        task_ops::mark_done(&loaded.store, &mut loaded.index, &id)?
    } else {
        let column = task_ops::resolve_column(&loaded.columns, &args.column)?;
        task_ops::change_column(&loaded.store, &mut loaded.index, &id, column)?
    };
    print_written(&id, &path, &line, json)
}

fn cmd_done(start: &Path, args: IdArg, json: bool) -> CmdResult {
    let (_lock, mut loaded) = load_board_locked(start)?;
    let id = loaded.index.resolve_id(&args.id)?.to_string();
    let path = task_path(&loaded.index, &id)?;
    let line = task_ops::mark_done(&loaded.store, &mut loaded.index, &id)?;
    print_written(&id, &path, &line, json)
}

fn cmd_edit(start: &Path, args: EditArgs, json: bool) -> CmdResult {
    let (_lock, mut loaded) = load_board_locked(start)?;
    let id = loaded.index.resolve_id(&args.id)?.to_string();
    let path = task_path(&loaded.index, &id)?;
    let line = task_ops::update_content(&loaded.store, &mut loaded.index, &id, &args.content)?;
    print_written(&id, &path, &line, json)
}

fn cmd_archive(start: &Path, args: ArchiveArgs, json: bool) -> CmdResult {
    let (_lock, mut loaded) = load_board_locked(start)?;
    let mut ids = Vec::new();
    for prefix in &args.ids {
        let id = loaded.index.resolve_id(prefix)?.to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let lines = task_ops::archive_tasks(&loaded.store, &mut loaded.index, &ids)?;
    if json {
        let output: Vec<WrittenJson> = ids
            .iter()
            .zip(&lines)
            .map(|(id, line)| WrittenJson {
                id: id.clone(),
                path: loaded
                    .index
                    .location(id)
                    .map(|l| l.path.clone())
                    .unwrap_or_default(),
                line: Some(line.clone()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for id in &ids {
            println!("{} archived", short_id(id));
        }
    }
    Ok(())
}

fn cmd_delete(start: &Path, args: IdArg, json: bool) -> CmdResult {
    let (_lock, mut loaded) = load_board_locked(start)?;
    let id = loaded.index.resolve_id(&args.id)?.to_string();
    let path = task_path(&loaded.index, &id)?;
    task_ops::delete_task(&loaded.store, &mut loaded.index, &id)?;
    print_written(&id, &path, "", json)
}

fn cmd_add(start: &Path, args: AddArgs, json: bool) -> CmdResult {
    let (_lock, loaded) = load_board_locked(start)?;
    let column = task_ops::resolve_column(&loaded.columns, &args.column)?;

    let path = match args.file {
        Some(ref file) => {
            let file = file.trim_start_matches('/');
            if !loaded.store.exists(file) {
                return Err(format!("document not found: {}", file).into());
            }
            task_ops::add_to_document(&loaded.store, file, &column, &args.content)?;
            file.to_string()
        }
        None => task_ops::add_new(
            &loaded.store,
            &column,
            &args.content,
            &loaded.board.board_folder,
            loaded.board.config.default_task_path.as_deref(),
        )?,
    };

    let line = task_ops::new_task_line(&column, &args.content);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "path": path, "line": line }))?
        );
    } else {
        println!("added to {}: {}", path, line);
    }
    Ok(())
}

fn task_path(index: &BoardIndex, id: &str) -> Result<String, Box<dyn std::error::Error>> {
    Ok(index
        .location(id)
        .ok_or_else(|| format!("task not found: {}", id))?
        .path
        .clone())
}

// ---------------------------------------------------------------------------
// Column management
// ---------------------------------------------------------------------------

fn cmd_column(start: &Path, args: ColumnCmd) -> CmdResult {
    let board_dir = board_io::discover_board(start)?;
    let _lock = BoardLock::acquire_default(&board_dir)?;
    let mut doc = config_io::read_config_document(&board_dir)?;

    match args.action {
        ColumnAction::Add(a) => {
            let mut columns = config_io::read_config(&board_dir)?.columns;
            columns.push(a.name.clone());
            init::validate_columns(&columns)?;
            if !config_io::add_column(&mut doc, &a.name) {
                return Err(format!("column already exists: {}", a.name).into());
            }
            config_io::write_config(&board_dir, &doc)?;
            println!("column added: {} (#{})", a.name, normalize_tag(&a.name));
        }
        ColumnAction::Rm(a) => {
            if !config_io::remove_column(&mut doc, &a.name) {
                return Err(format!("no such column: {}", a.name).into());
            }
            config_io::write_config(&board_dir, &doc)?;
            println!("column removed: {}", a.name);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// Whether a vault document is part of the board's scan scope
fn in_scope(folder: &str, path: &str) -> bool {
    folder.is_empty()
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn cmd_watch(start: &Path, json: bool) -> CmdResult {
    let mut loaded = load_board_cwd(start)?;
    let vault_root: PathBuf = loaded.board.vault_root.clone();
    let folder = loaded.board.scan_folder().to_string();
    let watcher = DocumentWatcher::start(&vault_root)?;

    eprintln!(
        "watching {} ({} tasks); Ctrl-C to stop",
        vault_root.display(),
        loaded.index.len()
    );

    loop {
        for event in watcher.wait(Duration::from_secs(1)) {
            if !in_scope(&folder, event.path()) {
                continue;
            }
            match event {
                FileEvent::Changed(path) => {
                    match loaded.index.reconcile_document(
                        &loaded.store,
                        &path,
                        &loaded.columns,
                        &PathLinkResolver,
                    ) {
                        Ok(report) if json => println!("{}", serde_json::to_string(&report)?),
                        Ok(report) => println!(
                            "{}: {} tasks (+{} -{})",
                            report.path,
                            report.seen.len(),
                            report.added.len(),
                            report.evicted.len()
                        ),
                        Err(e) => tracing::warn!(error = %e, "reconciliation failed"),
                    }
                }
                FileEvent::Removed(path) => {
                    let evicted = loaded.index.forget_document(&path);
                    if json {
                        println!(
                            "{}",
                            serde_json::to_string(
                                &serde_json::json!({ "path": path, "removed": true, "evicted": evicted })
                            )?
                        );
                    } else {
                        println!("{}: gone (-{})", path, evicted.len());
                    }
                }
            }
        }
    }
}
