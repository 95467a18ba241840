//! Mutual-TLS protocol client for the firmware CDN.
//!
//! The CDN authenticates devices with a TLS client certificate and serves
//! three kinds of objects: a JSON version index, update-meta containers
//! (addressed by title ID and version, with the backing content ID announced
//! in a response header), and opaque content blobs (addressed by content
//! ID). This crate assembles the client identity from a PEM bundle, keeps
//! one persistent transport configured for the CDN's quirks, and exposes the
//! four protocol operations behind the [`Cdn`] trait so the download
//! pipeline can run against a mock transport in tests.

mod client;
mod config;
mod error;
mod identity;
mod pem;

pub use client::{ByteStream, Cdn, CdnClient, ContentBlob, MetaBlob, TitleMeta, VersionIndex};
pub use config::{CdnConfig, SYSTEM_UPDATE_TITLE};
pub use error::CdnError;
pub use identity::{CERTIFICATE, PRIVATE_KEY, assemble};
pub use pem::PemDocument;
