//! Graph entries decoded from content-meta containers.

use thiserror::Error;

/// One pointer decoded out of a content-meta container.
///
/// A meta entry names another title that must be fetched and decoded; a
/// content entry names a terminal downloadable blob. The pipeline only ever
/// handles batches of a single kind, enforced by the `expect_*` guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CnmtEntry {
    Meta {
        /// Hex title ID, `0`-prefixed.
        title_id: String,
        /// Decimal title version.
        version: String,
    },
    Content {
        /// Lowercase hex content ID.
        content_id: String,
    },
}

impl CnmtEntry {
    pub fn is_meta(&self) -> bool {
        matches!(self, CnmtEntry::Meta { .. })
    }
}

/// A meta entry narrowed out of a kind-checked batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTarget {
    pub title_id: String,
    pub version: String,
}

/// A content entry narrowed out of a kind-checked batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTarget {
    pub content_id: String,
}

impl From<MetaTarget> for CnmtEntry {
    fn from(target: MetaTarget) -> Self {
        CnmtEntry::Meta { title_id: target.title_id, version: target.version }
    }
}

impl From<ContentTarget> for CnmtEntry {
    fn from(target: ContentTarget) -> Self {
        CnmtEntry::Content { content_id: target.content_id }
    }
}

/// A batch mixed entry kinds where a single kind was expected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphInvariantViolation {
    #[error("expected only meta entries, found content {content_id}")]
    UnexpectedContent { content_id: String },
    #[error("expected only content entries, found meta {title_id} v{version}")]
    UnexpectedMeta { title_id: String, version: String },
}

/// Narrow `entries` to meta targets, refusing content-kind strays.
pub fn expect_meta_batch(
    entries: Vec<CnmtEntry>,
) -> Result<Vec<MetaTarget>, GraphInvariantViolation> {
    entries
        .into_iter()
        .map(|entry| match entry {
            CnmtEntry::Meta { title_id, version } => Ok(MetaTarget { title_id, version }),
            CnmtEntry::Content { content_id } => {
                Err(GraphInvariantViolation::UnexpectedContent { content_id })
            }
        })
        .collect()
}

/// Narrow `entries` to content targets, refusing meta-kind strays.
pub fn expect_content_batch(
    entries: Vec<CnmtEntry>,
) -> Result<Vec<ContentTarget>, GraphInvariantViolation> {
    entries
        .into_iter()
        .map(|entry| match entry {
            CnmtEntry::Content { content_id } => Ok(ContentTarget { content_id }),
            CnmtEntry::Meta { title_id, version } => {
                Err(GraphInvariantViolation::UnexpectedMeta { title_id, version })
            }
        })
        .collect()
}
