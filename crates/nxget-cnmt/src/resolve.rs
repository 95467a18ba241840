//! Flattening decoded records into graph entries.

use crate::decoder::{ContainerDecoder, DecodeError};
use crate::entry::CnmtEntry;

/// Decode one content-meta blob into its ordered graph entries.
///
/// Meta entries precede content entries within each record, and records keep
/// the decoder's enumeration order. This resolves a single level of the
/// update tree; the download pipeline drives recursion across levels.
pub fn resolve<D: ContainerDecoder + ?Sized>(
    decoder: &D,
    bytes: &[u8],
) -> Result<Vec<CnmtEntry>, DecodeError> {
    let mut entries = Vec::new();
    for record in decoder.decode(bytes)? {
        for meta in record.meta_entries {
            entries.push(CnmtEntry::Meta { title_id: meta.title_id, version: meta.version });
        }
        for content in record.content_entries {
            entries.push(CnmtEntry::Content { content_id: content.content_id });
        }
    }
    Ok(entries)
}
