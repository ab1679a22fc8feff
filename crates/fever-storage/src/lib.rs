//! Artifact storage backends for fever.

pub mod local_fs;
pub mod memory;
pub mod traits;

pub use local_fs::LocalStore;
pub use memory::MemoryStore;
pub use traits::{ByteStream, Store};
