use crate::domain::model::{DriveFile, FileMetadata, LustreFid};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// The subset of Google Drive v3 the copytool relies on.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Lists files matching a Drive query, first page only.
    async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>>;

    async fn create_file(
        &self,
        metadata: &FileMetadata,
        media: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DriveFile>;

    /// Uploads a new revision of an existing file.
    async fn update_file(
        &self,
        file_id: &str,
        metadata: &FileMetadata,
        media: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DriveFile>;

    /// Streams file content into `sink`, returning the number of bytes written.
    async fn download_file(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64>;
}

/// Produces the human readable description stored with an archived file.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, fid: &LustreFid) -> String;
}
