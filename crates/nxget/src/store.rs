//! Filesystem persistence for downloaded containers.

use std::io;
use std::path::PathBuf;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use nxget_cdn::ByteStream;
use nxget_fetch::{ContentSink, MetaSink};

/// Writes downloaded blobs into one output directory.
///
/// Content blobs land as `{content_id}.nca`, meta blobs as
/// `{content_id}.cnmt.nca`. Destination names are derived from unique
/// content IDs, so concurrent jobs never collide.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn file_name(&self, content_id: &str, is_meta: bool) -> PathBuf {
        let suffix = if is_meta { ".cnmt.nca" } else { ".nca" };
        self.root.join(format!("{content_id}{suffix}"))
    }

    pub async fn write_meta_file(&self, content_id: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.file_name(content_id, true);
        debug!(len = bytes.len(), path = %path.display(), "store meta");
        tokio::fs::write(&path, bytes).await
    }
}

impl MetaSink for DirStore {
    async fn store_meta(
        &self,
        bytes: &[u8],
        title_id: &str,
        content_id: &str,
        version: &str,
        url: Option<&str>,
    ) -> io::Result<()> {
        debug!(title_id, version, url = url.unwrap_or(""), "meta downloaded");
        self.write_meta_file(content_id, bytes).await
    }
}

impl ContentSink for DirStore {
    async fn store_content(
        &self,
        mut stream: ByteStream,
        content_id: &str,
        url: Option<&str>,
    ) -> io::Result<()> {
        let path = self.file_name(content_id, false);
        debug!(url = url.unwrap_or(""), path = %path.display(), "store content");

        let mut file = File::create(&path).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(io::Error::other)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await
    }
}
