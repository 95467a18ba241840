//! The seam to the external container decoder.

use thiserror::Error;

/// Descriptor of a nested meta title inside a content-meta record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaDescriptor {
    /// Hex title ID, `0`-prefixed.
    pub title_id: String,
    /// Decimal title version.
    pub version: String,
}

/// Descriptor of a terminal content blob inside a content-meta record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// Lowercase hex content ID.
    pub content_id: String,
}

/// One decoded content-meta file, descriptors in container order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CnmtRecord {
    pub meta_entries: Vec<MetaDescriptor>,
    pub content_entries: Vec<ContentDescriptor>,
}

/// Failure reported by a container decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("container is corrupt: {0}")]
    Corrupt(String),
    #[error("container integrity check failed: {0}")]
    Integrity(String),
    #[error("missing key material: {0}")]
    MissingKey(String),
}

/// Decrypts a downloaded container and enumerates its content-meta records.
///
/// The decryption keyset is bound at construction of the implementation;
/// nothing else in the graph machinery ever sees it. Decoding the same bytes
/// twice must yield identical records in identical order.
pub trait ContainerDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<CnmtRecord>, DecodeError>;
}
