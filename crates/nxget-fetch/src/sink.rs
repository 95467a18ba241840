//! Persistence callbacks invoked by the pipeline.

use std::future::Future;
use std::io;

use nxget_cdn::ByteStream;

/// Persists downloaded meta containers.
///
/// Invoked on whichever worker finished the job; implementations must be
/// safe to call concurrently when the job cap exceeds 1. The source URL is
/// passed for diagnostics only.
pub trait MetaSink: Send + Sync {
    fn store_meta(
        &self,
        bytes: &[u8],
        title_id: &str,
        content_id: &str,
        version: &str,
        url: Option<&str>,
    ) -> impl Future<Output = io::Result<()>> + Send;
}

/// Persists downloaded content blobs without buffering them.
pub trait ContentSink: Send + Sync {
    fn store_content(
        &self,
        stream: ByteStream,
        content_id: &str,
        url: Option<&str>,
    ) -> impl Future<Output = io::Result<()>> + Send;
}
