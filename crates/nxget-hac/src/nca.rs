//! NCA3 container reading.
//!
//! Header layout (after AES-XTS decryption, 0x200-byte sectors with the
//! Nintendo tweak): magic at 0x200, key generations at 0x206/0x220, rights
//! ID at 0x230, section entries at 0x240 (media-unit offsets), key area at
//! 0x300, one 0x200-byte filesystem header per section from 0x400.

use aes::Aes128;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, KeyInit, KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use sha2::{Digest, Sha256};
use xts_mode::Xts128;

use crate::error::NcaError;
use crate::keyset::Keyset;
use crate::pfs0::Pfs0;
use crate::util::{get_nintendo_tweak, le32, le64};

type Aes128Ctr = Ctr128BE<Aes128>;

const HEADER_SIZE: usize = 0xC00;
const SECTOR_SIZE: usize = 0x200;
const MEDIA_UNIT: u64 = 0x200;
const MAGIC_NCA3: &[u8; 4] = b"NCA3";
const SECTION_COUNT: usize = 4;

const FS_TYPE_PFS0: u8 = 1;
const HASH_HIERARCHICAL_SHA256: u8 = 2;
const ENC_NONE: u8 = 1;
const ENC_CTR: u8 = 3;

/// Key-area slot holding the CTR body key.
const BODY_KEY_SLOT: usize = 2;

struct SectionInfo {
    /// Absolute byte offset of the section inside the container.
    offset: u64,
    size: u64,
    /// Offset of the section's filesystem header inside the main header.
    fs_header: usize,
}

/// A content archive with its header decrypted and body key unwrapped.
pub struct Nca<'a> {
    raw: &'a [u8],
    header: Vec<u8>,
    body_key: [u8; 16],
}

impl<'a> Nca<'a> {
    pub fn parse(keyset: &Keyset, raw: &'a [u8]) -> Result<Self, NcaError> {
        if raw.len() < HEADER_SIZE {
            return Err(NcaError::Truncated(raw.len()));
        }

        let mut header = raw[..HEADER_SIZE].to_vec();
        decrypt_header(keyset.header_key(), &mut header);

        if &header[0x200..0x204] != MAGIC_NCA3 {
            return Err(NcaError::BadMagic(
                String::from_utf8_lossy(&header[0x200..0x204]).into_owned(),
            ));
        }
        if header[0x230..0x240].iter().any(|&b| b != 0) {
            return Err(NcaError::RightsIdCrypto);
        }

        let generation = key_generation(&header);
        let kaek = keyset
            .key_area_key_application(generation)
            .ok_or(NcaError::MissingKeyAreaKey(generation))?;
        let body_key = unwrap_key_area_slot(kaek, &header, BODY_KEY_SLOT);

        Ok(Self { raw, header, body_key })
    }

    pub fn content_type(&self) -> u8 {
        self.header[0x205]
    }

    /// Decrypt, verify, and parse the first partition-filesystem section.
    pub fn open_pfs0(&self) -> Result<Pfs0, NcaError> {
        for index in 0..SECTION_COUNT {
            let Some(section) = self.section(index) else { continue };
            let fs = &self.header[section.fs_header..section.fs_header + SECTOR_SIZE];
            if fs[0x2] != FS_TYPE_PFS0 {
                continue;
            }
            let data = self.decrypt_section(&section, fs)?;
            let verified = verify_hierarchical_sha256(fs, &data)?;
            return Pfs0::parse(verified);
        }
        Err(NcaError::NoPfs0Section)
    }

    fn section(&self, index: usize) -> Option<SectionInfo> {
        let entry = &self.header[0x240 + index * 0x10..0x240 + (index + 1) * 0x10];
        let start = u64::from(le32(&entry[0..])) * MEDIA_UNIT;
        let end = u64::from(le32(&entry[4..])) * MEDIA_UNIT;
        if end <= start {
            return None;
        }
        Some(SectionInfo {
            offset: start,
            size: end - start,
            fs_header: 0x400 + index * SECTOR_SIZE,
        })
    }

    fn decrypt_section(&self, section: &SectionInfo, fs: &[u8]) -> Result<Vec<u8>, NcaError> {
        let start = section.offset as usize;
        let end = start + section.size as usize;
        if self.raw.len() < end {
            return Err(NcaError::Truncated(self.raw.len()));
        }

        let mut data = self.raw[start..end].to_vec();
        match fs[0x4] {
            ENC_NONE => {}
            ENC_CTR => {
                let iv = section_iv(fs, section.offset);
                let mut cipher = Aes128Ctr::new(
                    GenericArray::from_slice(&self.body_key),
                    GenericArray::from_slice(&iv),
                );
                cipher.apply_keystream(&mut data);
            }
            other => return Err(NcaError::UnsupportedEncryption(other)),
        }
        Ok(data)
    }
}

fn decrypt_header(header_key: &[u8; 32], header: &mut [u8]) {
    let cipher_1 = Aes128::new(GenericArray::from_slice(&header_key[..16]));
    let cipher_2 = Aes128::new(GenericArray::from_slice(&header_key[16..]));
    let xts = Xts128::new(cipher_1, cipher_2);
    xts.decrypt_area(header, SECTOR_SIZE, 0, get_nintendo_tweak);
}

/// The effective key generation, normalized to a master-key revision.
fn key_generation(header: &[u8]) -> u8 {
    header[0x206].max(header[0x220]).saturating_sub(1)
}

fn unwrap_key_area_slot(kaek: &[u8; 16], header: &[u8], slot: usize) -> [u8; 16] {
    let cipher = Aes128::new(GenericArray::from_slice(kaek));
    let mut block = [0u8; 16];
    block.copy_from_slice(&header[0x300 + slot * 16..0x300 + (slot + 1) * 16]);
    cipher.decrypt_block(GenericArray::from_mut_slice(&mut block));
    block
}

/// CTR IV: the filesystem header's counter bytes reversed, then the section
/// byte offset in 16-byte blocks, big-endian.
fn section_iv(fs: &[u8], section_offset: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    for (slot, byte) in iv[..8].iter_mut().zip(fs[0x140..0x148].iter().rev()) {
        *slot = *byte;
    }
    iv[8..].copy_from_slice(&(section_offset >> 4).to_be_bytes());
    iv
}

/// Check the two-layer SHA-256 hierarchy and return the verified data layer.
fn verify_hierarchical_sha256<'d>(fs: &[u8], data: &'d [u8]) -> Result<&'d [u8], NcaError> {
    if fs[0x3] != HASH_HIERARCHICAL_SHA256 {
        return Err(NcaError::UnsupportedHash(fs[0x3]));
    }

    let hash_info = &fs[0x8..0x100];
    let master_hash = &hash_info[0x00..0x20];
    let block_size = le32(&hash_info[0x20..]) as usize;
    let table_offset = le64(&hash_info[0x28..]) as usize;
    let table_size = le64(&hash_info[0x30..]) as usize;
    let data_offset = le64(&hash_info[0x38..]) as usize;
    let data_size = le64(&hash_info[0x40..]) as usize;

    if block_size == 0 {
        return Err(NcaError::Integrity("zero hash block size".into()));
    }
    let table_end = table_offset.checked_add(table_size).filter(|&end| end <= data.len());
    let data_end = data_offset.checked_add(data_size).filter(|&end| end <= data.len());
    let (Some(table_end), Some(data_end)) = (table_end, data_end) else {
        return Err(NcaError::Integrity("hash layers exceed the section".into()));
    };

    let table = &data[table_offset..table_end];
    if Sha256::digest(table).as_slice() != master_hash {
        return Err(NcaError::Integrity("hash table digest mismatch".into()));
    }

    let layer = &data[data_offset..data_end];
    for (index, block) in layer.chunks(block_size).enumerate() {
        let expected = table
            .get(index * 32..(index + 1) * 32)
            .ok_or_else(|| NcaError::Integrity("hash table too short".into()))?;
        if Sha256::digest(block).as_slice() != expected {
            return Err(NcaError::Integrity(format!("block {index} digest mismatch")));
        }
    }

    Ok(layer)
}
