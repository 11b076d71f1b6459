pub mod reconcile;
pub mod task_ops;
pub mod view;
