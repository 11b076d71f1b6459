use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - a kanban board over markdown task lines"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different board directory
    #[arg(short = 'C', long = "board-dir", global = true)]
    pub board_dir: Option<String>,

    /// Log reconciliation and write-back details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a board (taskboard.toml) in the current directory
    Init(InitArgs),
    /// Scan the board's documents and report what was found
    Scan,
    /// Show the board, column by column
    Board(BoardArgs),
    /// List tasks
    List(ListArgs),
    /// Show task details
    Show(IdArg),
    /// Move a task to a column
    Move(MoveArgs),
    /// Mark a task done
    Done(IdArg),
    /// Replace a task's text
    Edit(EditArgs),
    /// Archive tasks (they leave the board but stay in their documents)
    Archive(ArchiveArgs),
    /// Delete a task's line from its document
    Delete(IdArg),
    /// Add a new task to a column
    Add(AddArgs),
    /// Add or remove board columns
    Column(ColumnCmd),
    /// Watch the vault and reconcile documents as they change
    Watch,
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Board column, in order (repeatable; default: the standard columns)
    #[arg(long = "column", value_name = "NAME")]
    pub columns: Vec<String>,
    /// Document new tasks are appended to, relative to the board
    #[arg(long, value_name = "PATH")]
    pub task_path: Option<String>,
    /// Scan the whole vault instead of the board directory
    #[arg(long)]
    pub everywhere: bool,
    /// Overwrite an existing taskboard.toml
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BoardArgs {
    /// Maximum line width (default: $COLUMNS, else 100)
    #[arg(long)]
    pub width: Option<usize>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks in this column (tag or display name)
    #[arg(long)]
    pub column: Option<String>,
    /// Only tasks carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
    /// Include done tasks
    #[arg(long)]
    pub done: bool,
}

#[derive(Args)]
pub struct IdArg {
    /// Task id or a unique prefix of it
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct MoveArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// Target column (tag or display name)
    pub column: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id or a unique prefix of it
    pub id: String,
    /// New task text
    pub content: String,
}

#[derive(Args)]
pub struct ArchiveArgs {
    /// Task ids or unique prefixes
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Column for the new task (tag or display name)
    pub column: String,
    /// Task text (may be empty)
    #[arg(default_value = "")]
    pub content: String,
    /// Append to this vault document instead of the default task path
    #[arg(long, value_name = "PATH")]
    pub file: Option<String>,
}

#[derive(Args)]
pub struct ColumnCmd {
    #[command(subcommand)]
    pub action: ColumnAction,
}

#[derive(Subcommand)]
pub enum ColumnAction {
    /// Append a column to the board
    Add(ColumnNameArg),
    /// Remove a column from the board
    Rm(ColumnNameArg),
}

#[derive(Args)]
pub struct ColumnNameArg {
    /// Column display name
    pub name: String,
}
