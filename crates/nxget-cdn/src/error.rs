//! Error types for nxget-cdn.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("PEM section header `-----BEGIN {0}-----` not found")]
    SectionHeaderMissing(String),

    #[error("PEM section footer `-----END {0}-----` not found")]
    SectionFooterMissing(String),

    #[error("PEM section {label} is not valid base64")]
    InvalidSectionEncoding {
        label: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to read certificate file: {0}")]
    CertificateRead(#[source] std::io::Error),

    #[error("failed to assemble TLS client identity: {0}")]
    IdentityAssembly(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned unexpected status {status}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("response from {url} is missing the {header} header")]
    MissingHeader { url: String, header: &'static str },

    #[error("version index does not match the expected schema: {0}")]
    Schema(#[source] reqwest::Error),
}
