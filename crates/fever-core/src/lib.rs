//! Shared building blocks for fever: fingerprints, compression codecs,
//! source maps, configuration and the error taxonomy.

pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod mime;
pub mod source_map;
pub mod types;

pub use codec::Encoding;
pub use config::FeverConfig;
pub use error::{FeverError, Result};
pub use source_map::SourceMap;
pub use types::{FileOptions, FileState, Sizes};
