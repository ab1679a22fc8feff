use async_trait::async_trait;
use fever_core::error::Result;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Readable byte stream handed out by [`Store::open_read_stream`].
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Byte store that fragments are read from and artifacts are written to.
#[async_trait]
pub trait Store: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn open_read_stream(&self, path: &str) -> Result<ByteStream>;
}
