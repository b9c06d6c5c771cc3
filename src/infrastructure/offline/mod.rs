mod mappers;
mod rows;

pub mod file_store;
pub mod memory_store;
pub mod sqlite_store;

pub use file_store::JsonFileActionLogStore;
pub use memory_store::InMemoryActionLogStore;
pub use sqlite_store::SqliteActionLogStore;
