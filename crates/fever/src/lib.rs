//! Fever: compiles ordered fragment lists into content-addressed,
//! pre-compressed artifacts and keeps the most requested ones in memory.

pub mod events;
pub mod file;
pub mod hot_cache;
mod pipeline;
pub mod registry;

pub use events::{Edit, EditListener};
pub use file::{Delivery, File, Snapshot};
pub use hot_cache::{HotCache, MemoryHotCache};
pub use registry::Fever;

pub use fever_core::{Encoding, FeverConfig, FeverError, FileOptions, FileState, Result, Sizes, SourceMap};
pub use fever_storage::{ByteStream, LocalStore, MemoryStore, Store};
