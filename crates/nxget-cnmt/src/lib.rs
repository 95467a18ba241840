//! Content-meta domain types and graph resolution.
//!
//! A system update is described by a tree of content-meta containers: the
//! root container lists further meta titles, each of which lists the
//! terminal content blobs making up the update. This crate holds the types
//! decoded out of those containers, the seam to the external container
//! decoder, and the single-level resolution step that flattens one decoded
//! container into an ordered list of graph entries. Recursion across levels
//! lives in `nxget-fetch`, because every level needs a network fetch in
//! between.

mod decoder;
mod entry;
mod resolve;
mod version;

pub use decoder::{CnmtRecord, ContainerDecoder, ContentDescriptor, DecodeError, MetaDescriptor};
pub use entry::{
    CnmtEntry, ContentTarget, GraphInvariantViolation, MetaTarget, expect_content_batch,
    expect_meta_batch,
};
pub use resolve::resolve;
pub use version::{ParseVersionError, VersionCode};
