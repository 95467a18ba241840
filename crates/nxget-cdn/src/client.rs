//! The CDN protocol client.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::{Client, Identity, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::CdnConfig;
use crate::error::CdnError;

/// A boxed byte stream carrying a response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, CdnError>> + Send + 'static>>;

const CONTENT_ID_HEADER: &str = "X-Nintendo-Content-ID";

/// One title listed in the version index.
#[derive(Debug, Clone, Deserialize)]
pub struct TitleMeta {
    pub title_id: String,
    pub title_version: u64,
}

/// The `system_update_meta` version index.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionIndex {
    pub timestamp: u64,
    pub system_update_metas: Vec<TitleMeta>,
}

/// A downloaded meta container together with its content ID.
#[derive(Debug, Clone)]
pub struct MetaBlob {
    pub bytes: Vec<u8>,
    pub content_id: String,
    pub url: String,
}

/// An open content download. The body has not been read yet.
pub struct ContentBlob {
    pub stream: ByteStream,
    pub url: String,
}

/// The four CDN operations the download pipeline needs.
///
/// [`CdnClient`] is the production implementation; tests substitute mock
/// transports.
pub trait Cdn: Send + Sync {
    /// Fetch and parse the JSON version index.
    fn version_index(&self) -> impl Future<Output = Result<VersionIndex, CdnError>> + Send;

    /// Fetch the update-meta object for a title, returning its bytes and the
    /// content ID announced in the response headers.
    fn update_meta(
        &self,
        title_id: &str,
        version: &str,
    ) -> impl Future<Output = Result<MetaBlob, CdnError>> + Send;

    /// Resolve a title's content ID, then fetch the content-meta object it
    /// names. Two requests; the first one's body is discarded.
    fn meta(
        &self,
        title_id: &str,
        version: &str,
    ) -> impl Future<Output = Result<MetaBlob, CdnError>> + Send;

    /// Open a streaming download of a terminal content blob.
    fn content(&self, content_id: &str)
    -> impl Future<Output = Result<ContentBlob, CdnError>> + Send;
}

/// Protocol client holding the TLS identity and one persistent transport.
pub struct CdnClient {
    config: CdnConfig,
    http: Client,
}

impl CdnClient {
    /// Build the persistent transport around `identity`.
    ///
    /// Server certificate validation is disabled on purpose: the CDN
    /// presents a certificate the default trust store does not recognize.
    pub fn new(config: CdnConfig, identity: Identity) -> Result<Self, CdnError> {
        let http = Client::builder()
            .identity(identity)
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .user_agent(config.user_agent())
            .build()
            .map_err(CdnError::ClientBuild)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CdnConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<Response, CdnError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| CdnError::Transport { url: url.to_string(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CdnError::UnexpectedStatus { url: url.to_string(), status });
        }
        Ok(response)
    }

    async fn get_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), CdnError> {
        let response = self.get(url).await?;
        let content_id = header_value(&response, CONTENT_ID_HEADER);
        let bytes = response
            .bytes()
            .await
            .map_err(|source| CdnError::Transport { url: url.to_string(), source })?;
        Ok((bytes.to_vec(), content_id))
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

impl Cdn for CdnClient {
    async fn version_index(&self) -> Result<VersionIndex, CdnError> {
        let url = self.config.version_index_url();
        self.get(&url).await?.json().await.map_err(CdnError::Schema)
    }

    async fn update_meta(&self, title_id: &str, version: &str) -> Result<MetaBlob, CdnError> {
        let url = self.config.update_meta_url(title_id, version);
        let (bytes, content_id) = self.get_bytes(&url).await?;
        let content_id = content_id.ok_or_else(|| CdnError::MissingHeader {
            url: url.clone(),
            header: CONTENT_ID_HEADER,
        })?;
        Ok(MetaBlob { bytes, content_id, url })
    }

    async fn meta(&self, title_id: &str, version: &str) -> Result<MetaBlob, CdnError> {
        let probe_url = self.config.update_meta_url(title_id, version);
        let probe = self.get(&probe_url).await?;
        let content_id = header_value(&probe, CONTENT_ID_HEADER).ok_or_else(|| {
            CdnError::MissingHeader { url: probe_url.clone(), header: CONTENT_ID_HEADER }
        })?;
        drop(probe);

        let url = self.config.content_meta_url(title_id, &content_id);
        let (bytes, _) = self.get_bytes(&url).await?;
        Ok(MetaBlob { bytes, content_id, url })
    }

    async fn content(&self, content_id: &str) -> Result<ContentBlob, CdnError> {
        let url = self.config.content_url(content_id);
        let response = self.get(&url).await?;
        let stream_url = url.clone();
        let stream = response
            .bytes_stream()
            .map_err(move |source| CdnError::Transport { url: stream_url.clone(), source });
        Ok(ContentBlob { stream: Box::pin(stream), url })
    }
}
