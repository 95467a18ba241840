//! NCA container decoding for system-update meta enumeration.
//!
//! Implements just enough of the content-archive format to walk an update
//! meta container: AES-XTS header decryption, key-area unwrapping, AES-CTR
//! section decryption with hierarchical-SHA-256 verification, PFS0 entry
//! enumeration, and packaged `.cnmt` table parsing. [`HacDecoder`] exposes
//! the result through the `nxget-cnmt` decoder seam.

mod cnmt;
mod decoder;
mod error;
mod keyset;
mod nca;
mod pfs0;
mod util;

pub use cnmt::{CnmtContentEntry, CnmtMetaEntry, PackagedCnmt};
pub use decoder::HacDecoder;
pub use error::NcaError;
pub use keyset::{Keyset, KeysetError};
pub use nca::Nca;
pub use pfs0::{Pfs0, Pfs0Entry};
