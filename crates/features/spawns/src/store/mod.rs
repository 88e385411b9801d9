//! Repository implementations: a process-local store for tests and embedding,
//! and the `SQLite` store used by the server.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
