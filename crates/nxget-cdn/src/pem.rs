//! Minimal PEM reading for the client certificate bundle.

use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::CdnError;

/// An in-memory PEM file holding the TLS client key and certificate.
#[derive(Debug, Clone)]
pub struct PemDocument {
    text: String,
}

impl PemDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CdnError> {
        let text = fs::read_to_string(path).map_err(CdnError::CertificateRead)?;
        Ok(Self::new(text))
    }

    /// The decoded bytes between the BEGIN/END markers for `label`.
    ///
    /// A missing header and a missing footer are distinct failures.
    pub fn section(&self, label: &str) -> Result<Vec<u8>, CdnError> {
        let header = format!("-----BEGIN {label}-----");
        let footer = format!("-----END {label}-----");

        let start = self
            .text
            .find(&header)
            .ok_or_else(|| CdnError::SectionHeaderMissing(label.to_string()))?
            + header.len();
        let end = self.text[start..]
            .find(&footer)
            .map(|offset| start + offset)
            .ok_or_else(|| CdnError::SectionFooterMissing(label.to_string()))?;

        let body: String = self.text[start..end].split_whitespace().collect();
        BASE64.decode(body.as_bytes()).map_err(|source| CdnError::InvalidSectionEncoding {
            label: label.to_string(),
            source,
        })
    }

    pub fn has_section(&self, label: &str) -> bool {
        self.text.contains(&format!("-----BEGIN {label}-----"))
            && self.text.contains(&format!("-----END {label}-----"))
    }
}
