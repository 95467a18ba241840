//! Bounded meta and content download passes.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tracing::debug;

use nxget_cdn::Cdn;
use nxget_cnmt::{
    CnmtEntry, ContainerDecoder, ContentTarget, MetaTarget, expect_content_batch,
    expect_meta_batch, resolve,
};

use crate::error::PipelineError;
use crate::progress::ProgressReporter;
use crate::sink::{ContentSink, MetaSink};

pub const DEFAULT_MAX_JOBS: usize = 5;

/// Drives the meta-resolution and content passes against one CDN.
///
/// The two passes are strictly sequential; jobs within a pass run
/// concurrently up to the job cap with no completion ordering. The first
/// failed job aborts the pass, leaving already-persisted files in place.
pub struct Pipeline<C, D> {
    cdn: Arc<C>,
    decoder: Arc<D>,
    max_jobs: usize,
}

impl<C, D> Pipeline<C, D>
where
    C: Cdn + 'static,
    D: ContainerDecoder + 'static,
{
    /// `max_jobs` caps concurrent in-flight downloads, floored at 1.
    pub fn new(cdn: Arc<C>, decoder: Arc<D>, max_jobs: usize) -> Self {
        Self { cdn, decoder, max_jobs: max_jobs.max(1) }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Download every meta container reachable from `root` and return the
    /// content entries they name, in no particular order.
    ///
    /// `root` must hold only meta entries. Each frontier pass downloads its
    /// entries concurrently, persists the blobs through `sink`, and decodes
    /// them; the loop ends when no meta entries remain. A nested container
    /// listing further meta entries violates the graph invariant.
    pub async fn resolve_meta<S>(
        &self,
        root: Vec<CnmtEntry>,
        sink: Arc<S>,
        progress: Option<Arc<ProgressReporter>>,
    ) -> Result<Vec<CnmtEntry>, PipelineError>
    where
        S: MetaSink + 'static,
    {
        let mut frontier = expect_meta_batch(root)?;
        let mut contents = Vec::new();

        while !frontier.is_empty() {
            let discovered =
                self.meta_pass(std::mem::take(&mut frontier), &sink, progress.as_ref()).await?;
            contents.extend(discovered.into_iter().map(CnmtEntry::from));
        }

        Ok(contents)
    }

    async fn meta_pass<S>(
        &self,
        targets: Vec<MetaTarget>,
        sink: &Arc<S>,
        progress: Option<&Arc<ProgressReporter>>,
    ) -> Result<Vec<ContentTarget>, PipelineError>
    where
        S: MetaSink + 'static,
    {
        debug!(count = targets.len(), "meta pass");
        let semaphore = Arc::new(Semaphore::new(self.max_jobs));
        let mut jobs = FuturesUnordered::new();

        for target in targets {
            let cdn = Arc::clone(&self.cdn);
            let decoder = Arc::clone(&self.decoder);
            let sink = Arc::clone(sink);
            let semaphore = Arc::clone(&semaphore);
            let progress = progress.map(Arc::clone);

            jobs.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();

                let blob = cdn.meta(&target.title_id, &target.version).await?;
                sink.store_meta(
                    &blob.bytes,
                    &target.title_id,
                    &blob.content_id,
                    &target.version,
                    Some(&blob.url),
                )
                .await
                .map_err(|source| PipelineError::Sink {
                    what: "meta",
                    id: target.title_id.clone(),
                    source,
                })?;

                let entries = resolve(decoder.as_ref(), &blob.bytes)?;
                let found = expect_content_batch(entries)?;
                if let Some(progress) = &progress {
                    progress.advance()?;
                }
                Ok::<_, PipelineError>(found)
            }));
        }

        let mut contents = Vec::new();
        while let Some(joined) = jobs.next().await {
            let found = joined.map_err(|err| PipelineError::Worker(err.to_string()))??;
            contents.extend(found);
        }
        Ok(contents)
    }

    /// Stream every content entry to `sink`.
    ///
    /// `entries` must hold only content entries.
    pub async fn fetch_content<S>(
        &self,
        entries: Vec<CnmtEntry>,
        sink: Arc<S>,
        progress: Option<Arc<ProgressReporter>>,
    ) -> Result<(), PipelineError>
    where
        S: ContentSink + 'static,
    {
        let targets = expect_content_batch(entries)?;
        debug!(count = targets.len(), "content pass");
        let semaphore = Arc::new(Semaphore::new(self.max_jobs));
        let mut jobs = FuturesUnordered::new();

        for target in targets {
            let cdn = Arc::clone(&self.cdn);
            let sink = Arc::clone(&sink);
            let semaphore = Arc::clone(&semaphore);
            let progress = progress.clone();

            jobs.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();

                let blob = cdn.content(&target.content_id).await?;
                sink.store_content(blob.stream, &target.content_id, Some(&blob.url))
                    .await
                    .map_err(|source| PipelineError::Sink {
                        what: "content",
                        id: target.content_id.clone(),
                        source,
                    })?;
                if let Some(progress) = &progress {
                    progress.advance()?;
                }
                Ok::<_, PipelineError>(())
            }));
        }

        while let Some(joined) = jobs.next().await {
            joined.map_err(|err| PipelineError::Worker(err.to_string()))??;
        }
        Ok(())
    }
}
