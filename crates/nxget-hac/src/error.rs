//! Error types for nxget-hac.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NcaError {
    #[error("container too small ({0} bytes)")]
    Truncated(usize),

    #[error("unsupported container magic {0:?}")]
    BadMagic(String),

    #[error("no partition filesystem section present")]
    NoPfs0Section,

    #[error("unsupported section encryption type {0}")]
    UnsupportedEncryption(u8),

    #[error("unsupported section hash type {0}")]
    UnsupportedHash(u8),

    #[error("section integrity check failed: {0}")]
    Integrity(String),

    #[error("no key_area_key_application for key generation {0}")]
    MissingKeyAreaKey(u8),

    #[error("rights-id protected container is not supported")]
    RightsIdCrypto,

    #[error("malformed partition filesystem: {0}")]
    BadPfs0(String),

    #[error("malformed content-meta file: {0}")]
    BadCnmt(String),
}
