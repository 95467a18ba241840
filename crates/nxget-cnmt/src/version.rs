//! Packed system-update version codes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A system-update version number packed into 64 bits.
///
/// Bit layout: `[26..31]` major, `[20..25]` minor, `[16..20]` patch,
/// `[0..16]` build number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionCode(u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid version code: {0:?}")]
pub struct ParseVersionError(pub String);

impl VersionCode {
    /// Wrap an already-unpacked version value.
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Parse a version code from its decimal string form.
    pub fn parse(s: &str) -> Result<Self, ParseVersionError> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseVersionError(s.to_string()))
    }

    /// Pack the individual fields into a version code.
    pub fn from_parts(major: u64, minor: u64, patch: u64, build: u64) -> Self {
        Self((major & 0x1f) << 26 | (minor & 0x1f) << 20 | (patch & 0xf) << 16 | (build & 0xffff))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn major(&self) -> u64 {
        (self.0 >> 26) & 0x1f
    }

    pub fn minor(&self) -> u64 {
        (self.0 >> 20) & 0x1f
    }

    pub fn patch(&self) -> u64 {
        (self.0 >> 16) & 0xf
    }

    pub fn build_number(&self) -> u64 {
        self.0 & 0xffff
    }
}

impl FromStr for VersionCode {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionCode::parse(s)
    }
}

impl fmt::Display for VersionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}
