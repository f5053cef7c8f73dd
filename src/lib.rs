// TodoStore - Task list with filtering, statistics and blob-store persistence

pub mod blob;
pub mod config;
pub mod display;
pub mod filter;
pub mod models;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
pub use config::{Backend, Config};
pub use filter::{CompletionFilter, Selector, SortKey, SortOrder, ViewState, derive};
pub use models::{Category, Priority, Status, Task, TaskOptions, TaskPatch, now_ms};
pub use stats::Stats;
pub use store::{DEFAULT_KEY, State, Store};
