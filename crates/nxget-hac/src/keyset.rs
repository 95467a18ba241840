//! `prod.keys` keyset parsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

const MAX_KEY_GENERATIONS: usize = 32;

#[derive(Debug, Error)]
pub enum KeysetError {
    #[error("failed to read keyset file: {0}")]
    Read(#[source] std::io::Error),

    #[error("keyset line {line} is malformed: {text:?}")]
    Malformed { line: usize, text: String },

    #[error("keyset value for {name} is not valid hex")]
    BadHex { name: String },

    #[error("keyset value for {name} has the wrong length (expected {expected} bytes)")]
    BadLength { name: String, expected: usize },

    #[error("keyset is missing {0}")]
    Missing(&'static str),
}

/// Decryption keys loaded from a `prod.keys` file.
///
/// Only the keys the decoder needs are retained; unknown names are ignored.
/// The material is opaque to everything outside this crate.
#[derive(Clone, Debug)]
pub struct Keyset {
    header_key: [u8; 32],
    key_area_keys_application: Vec<Option<[u8; 16]>>,
}

impl Keyset {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeysetError> {
        let text = fs::read_to_string(path).map_err(KeysetError::Read)?;
        Self::parse(&text)
    }

    /// Parse `name = hex` lines. Empty lines and `#`/`;` comments are
    /// skipped.
    pub fn parse(text: &str) -> Result<Self, KeysetError> {
        let mut named: HashMap<String, Vec<u8>> = HashMap::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                return Err(KeysetError::Malformed { line: index + 1, text: raw.to_string() });
            };
            let name = name.trim().to_ascii_lowercase();
            let bytes = hex::decode(value.trim())
                .map_err(|_| KeysetError::BadHex { name: name.clone() })?;
            named.insert(name, bytes);
        }

        let header_key =
            fixed::<32>(&named, "header_key")?.ok_or(KeysetError::Missing("header_key"))?;

        let mut key_area_keys_application = vec![None; MAX_KEY_GENERATIONS];
        for generation in 0..MAX_KEY_GENERATIONS {
            let name = format!("key_area_key_application_{generation:02x}");
            key_area_keys_application[generation] = fixed::<16>(&named, &name)?;
        }

        Ok(Self { header_key, key_area_keys_application })
    }

    pub fn header_key(&self) -> &[u8; 32] {
        &self.header_key
    }

    pub fn key_area_key_application(&self, generation: u8) -> Option<&[u8; 16]> {
        self.key_area_keys_application.get(generation as usize).and_then(|key| key.as_ref())
    }
}

fn fixed<const N: usize>(
    named: &HashMap<String, Vec<u8>>,
    name: &str,
) -> Result<Option<[u8; N]>, KeysetError> {
    match named.get(name) {
        None => Ok(None),
        Some(bytes) => bytes
            .as_slice()
            .try_into()
            .map(Some)
            .map_err(|_| KeysetError::BadLength { name: name.to_string(), expected: N }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# header material
header_key = 000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f
key_area_key_application_00 = 202122232425262728292a2b2c2d2e2f
titlekek_00 = ffffffffffffffffffffffffffffffff
";

    #[test]
    fn parses_known_keys_and_ignores_the_rest() {
        let keyset = Keyset::parse(SAMPLE).unwrap();
        assert_eq!(keyset.header_key()[0], 0x00);
        assert_eq!(keyset.header_key()[31], 0x1f);
        assert_eq!(keyset.key_area_key_application(0).unwrap()[0], 0x20);
        assert!(keyset.key_area_key_application(1).is_none());
    }

    #[test]
    fn missing_header_key_is_an_error() {
        let err = Keyset::parse("key_area_key_application_00 = 202122232425262728292a2b2c2d2e2f")
            .unwrap_err();
        assert!(matches!(err, KeysetError::Missing("header_key")));
    }

    #[test]
    fn rejects_bad_hex() {
        let err = Keyset::parse("header_key = zz").unwrap_err();
        assert!(matches!(err, KeysetError::BadHex { .. }));
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = Keyset::parse("header_key = aabb").unwrap_err();
        assert!(matches!(err, KeysetError::BadLength { expected: 32, .. }));
    }

    #[test]
    fn rejects_lines_without_separator() {
        let err = Keyset::parse("header_key aabb").unwrap_err();
        assert!(matches!(err, KeysetError::Malformed { line: 1, .. }));
    }
}
