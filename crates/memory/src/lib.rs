//! Long-term memory stores and content storage for OpenTwin.

pub mod scoring;
pub mod in_memory;
pub mod file_store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use file_store::FileStore;

#[cfg(feature = "sqlite")]
pub use sqlite::ContentStore;

use std::path::Path;
use std::sync::Arc;

use opentwin_core::LongTermStore;

/// Open the store named by `backend` (`file` or `memory`) rooted at `dir`.
pub fn open_store(backend: &str, dir: &Path) -> Arc<dyn LongTermStore> {
    match backend {
        "memory" => Arc::new(InMemoryStore::new()),
        _ => Arc::new(FileStore::open(dir)),
    }
}
