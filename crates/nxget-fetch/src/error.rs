//! Error types for nxget-fetch.

use thiserror::Error;

use nxget_cdn::CdnError;
use nxget_cnmt::{DecodeError, GraphInvariantViolation};

use crate::progress::ReporterMisuse;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cdn(#[from] CdnError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Graph(#[from] GraphInvariantViolation),

    #[error("failed to persist {what} {id}: {source}")]
    Sink {
        what: &'static str,
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Reporter(#[from] ReporterMisuse),
}
