pub mod board;
pub mod column;
pub mod config;
pub mod link;
pub mod task;

pub use board::*;
pub use column::*;
pub use config::*;
pub use link::*;
pub use task::*;
