//! Packaged content-meta (`.cnmt`) table parsing.
//!
//! Layout: a 0x20-byte header (title ID, version, meta type, extended-header
//! size, entry counts), the extended header, `content_count` entries of 0x38
//! bytes, then `content_meta_count` entries of 0x10 bytes.

use crate::error::NcaError;
use crate::util::{le16, le32, le48, le64};

const HEADER_SIZE: usize = 0x20;
const CONTENT_ENTRY_SIZE: usize = 0x38;
const META_ENTRY_SIZE: usize = 0x10;

/// A content entry: one terminal blob belonging to this title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnmtContentEntry {
    pub hash: [u8; 32],
    pub content_id: [u8; 16],
    pub size: u64,
    pub content_type: u8,
}

/// A content-meta entry: another title this update depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnmtMetaEntry {
    pub title_id: u64,
    pub version: u32,
    pub meta_type: u8,
}

/// A parsed packaged content-meta file.
#[derive(Debug, Clone)]
pub struct PackagedCnmt {
    pub title_id: u64,
    pub version: u32,
    pub meta_type: u8,
    pub content_entries: Vec<CnmtContentEntry>,
    pub meta_entries: Vec<CnmtMetaEntry>,
}

impl PackagedCnmt {
    pub fn parse(bytes: &[u8]) -> Result<Self, NcaError> {
        if bytes.len() < HEADER_SIZE {
            return Err(NcaError::BadCnmt("truncated header".into()));
        }

        let title_id = le64(&bytes[0x0..]);
        let version = le32(&bytes[0x8..]);
        let meta_type = bytes[0xC];
        let extended_header_size = le16(&bytes[0xE..]) as usize;
        let content_count = le16(&bytes[0x10..]) as usize;
        let meta_count = le16(&bytes[0x12..]) as usize;

        let content_offset = HEADER_SIZE + extended_header_size;
        let meta_offset = content_offset + content_count * CONTENT_ENTRY_SIZE;
        let end = meta_offset + meta_count * META_ENTRY_SIZE;
        if bytes.len() < end {
            return Err(NcaError::BadCnmt(format!(
                "{content_count} content and {meta_count} meta entries do not fit"
            )));
        }

        let mut content_entries = Vec::with_capacity(content_count);
        for index in 0..content_count {
            let entry = &bytes[content_offset + index * CONTENT_ENTRY_SIZE..];
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&entry[0x0..0x20]);
            let mut content_id = [0u8; 16];
            content_id.copy_from_slice(&entry[0x20..0x30]);
            content_entries.push(CnmtContentEntry {
                hash,
                content_id,
                size: le48(&entry[0x30..]),
                content_type: entry[0x36],
            });
        }

        let mut meta_entries = Vec::with_capacity(meta_count);
        for index in 0..meta_count {
            let entry = &bytes[meta_offset + index * META_ENTRY_SIZE..];
            meta_entries.push(CnmtMetaEntry {
                title_id: le64(&entry[0x0..]),
                version: le32(&entry[0x8..]),
                meta_type: entry[0xC],
            });
        }

        Ok(Self { title_id, version, meta_type, content_entries, meta_entries })
    }
}

#[cfg(test)]
pub(crate) fn build(
    title_id: u64,
    version: u32,
    contents: &[([u8; 16], u64)],
    metas: &[(u64, u32)],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&title_id.to_le_bytes());
    out.extend_from_slice(&version.to_le_bytes());
    out.push(1); // SystemUpdate
    out.push(0);
    out.extend_from_slice(&0u16.to_le_bytes()); // no extended header
    out.extend_from_slice(&(contents.len() as u16).to_le_bytes());
    out.extend_from_slice(&(metas.len() as u16).to_le_bytes());
    out.extend_from_slice(&[0u8; 0xC]);

    for (content_id, size) in contents {
        out.extend_from_slice(&[0u8; 32]);
        out.extend_from_slice(content_id);
        out.extend_from_slice(&size.to_le_bytes()[..6]);
        out.push(0); // Meta content type
        out.push(0);
    }
    for (title_id, version) in metas {
        out.extend_from_slice(&title_id.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
    }
    out
}
