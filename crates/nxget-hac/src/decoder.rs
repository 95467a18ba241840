//! The production container decoder.

use nxget_cnmt::{CnmtRecord, ContainerDecoder, ContentDescriptor, DecodeError, MetaDescriptor};

use crate::cnmt::PackagedCnmt;
use crate::error::NcaError;
use crate::keyset::Keyset;
use crate::nca::Nca;

/// Decodes downloaded NCA containers with a loaded keyset.
pub struct HacDecoder {
    keyset: Keyset,
}

impl HacDecoder {
    pub fn new(keyset: Keyset) -> Self {
        Self { keyset }
    }
}

impl ContainerDecoder for HacDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<CnmtRecord>, DecodeError> {
        let nca = Nca::parse(&self.keyset, bytes).map_err(map_err)?;
        let pfs = nca.open_pfs0().map_err(map_err)?;

        let mut records = Vec::new();
        for entry in pfs.entries().filter(|entry| entry.name.ends_with(".cnmt")) {
            let cnmt = PackagedCnmt::parse(&entry.data).map_err(map_err)?;
            records.push(record_from_cnmt(&cnmt));
        }
        Ok(records)
    }
}

fn record_from_cnmt(cnmt: &PackagedCnmt) -> CnmtRecord {
    let mut record = CnmtRecord::default();
    for meta in &cnmt.meta_entries {
        record.meta_entries.push(MetaDescriptor {
            title_id: format!("0{:X}", meta.title_id),
            version: meta.version.to_string(),
        });
    }
    for content in &cnmt.content_entries {
        record.content_entries.push(ContentDescriptor { content_id: hex::encode(content.content_id) });
    }
    record
}

fn map_err(err: NcaError) -> DecodeError {
    match err {
        NcaError::Integrity(message) => DecodeError::Integrity(message),
        NcaError::MissingKeyAreaKey(generation) => {
            DecodeError::MissingKey(format!("key_area_key_application generation {generation}"))
        }
        NcaError::RightsIdCrypto => DecodeError::MissingKey("rights-id protected container".into()),
        other => DecodeError::Corrupt(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use aes::Aes128;
    use cipher::generic_array::GenericArray;
    use cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
    use ctr::Ctr128BE;
    use sha2::{Digest, Sha256};
    use xts_mode::Xts128;

    use super::*;
    use crate::util::get_nintendo_tweak;
    use crate::{cnmt, pfs0};

    const HEADER_KEY: [u8; 32] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f,
    ];
    const KAEK: [u8; 16] = [0x20; 16];
    const BODY_KEY: [u8; 16] = [0x42; 16];
    const SECTION_CTR: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];
    const BLOCK_SIZE: usize = 0x1000;

    fn test_keyset() -> Keyset {
        let text = format!(
            "header_key = {}\nkey_area_key_application_00 = {}\n",
            hex::encode(HEADER_KEY),
            hex::encode(KAEK)
        );
        Keyset::parse(&text).unwrap()
    }

    /// Assemble a syntactically complete encrypted container around `pfs`.
    fn build_nca(pfs: &[u8]) -> Vec<u8> {
        // Two-layer hash: table over the data, master hash over the table.
        let mut table = Vec::new();
        for block in pfs.chunks(BLOCK_SIZE) {
            table.extend_from_slice(&Sha256::digest(block));
        }
        let master_hash = Sha256::digest(&table);

        let mut section = Vec::new();
        section.extend_from_slice(&table);
        section.extend_from_slice(pfs);
        let padded = section.len().div_ceil(0x200) * 0x200;
        section.resize(padded, 0);

        let mut header = vec![0u8; 0xC00];
        header[0x200..0x204].copy_from_slice(b"NCA3");
        header[0x205] = 1; // Meta content
        let media_start = (0xC00 / 0x200) as u32;
        let media_end = media_start + (section.len() / 0x200) as u32;
        header[0x240..0x244].copy_from_slice(&media_start.to_le_bytes());
        header[0x244..0x248].copy_from_slice(&media_end.to_le_bytes());

        // Key area slot 2 must unwrap to the body key.
        let kaek = Aes128::new(GenericArray::from_slice(&KAEK));
        let mut wrapped = BODY_KEY;
        kaek.encrypt_block(GenericArray::from_mut_slice(&mut wrapped));
        header[0x320..0x330].copy_from_slice(&wrapped);

        // Section 0 filesystem header.
        let fs = 0x400;
        header[fs + 0x2] = 1; // PFS0
        header[fs + 0x3] = 2; // HierarchicalSha256
        header[fs + 0x4] = 3; // CTR
        header[fs + 0x8..fs + 0x28].copy_from_slice(&master_hash);
        header[fs + 0x28..fs + 0x2C].copy_from_slice(&(BLOCK_SIZE as u32).to_le_bytes());
        header[fs + 0x2C..fs + 0x30].copy_from_slice(&2u32.to_le_bytes());
        header[fs + 0x30..fs + 0x38].copy_from_slice(&0u64.to_le_bytes());
        header[fs + 0x38..fs + 0x40].copy_from_slice(&(table.len() as u64).to_le_bytes());
        header[fs + 0x40..fs + 0x48].copy_from_slice(&(table.len() as u64).to_le_bytes());
        header[fs + 0x48..fs + 0x50].copy_from_slice(&(pfs.len() as u64).to_le_bytes());
        header[fs + 0x140..fs + 0x148].copy_from_slice(&SECTION_CTR);

        // Encrypt the body with the section CTR, then the header with XTS.
        let mut iv = [0u8; 16];
        for (slot, byte) in iv[..8].iter_mut().zip(SECTION_CTR.iter().rev()) {
            *slot = *byte;
        }
        iv[8..].copy_from_slice(&(0xC00u64 >> 4).to_be_bytes());
        let mut body = section;
        Ctr128BE::<Aes128>::new(
            GenericArray::from_slice(&BODY_KEY),
            GenericArray::from_slice(&iv),
        )
        .apply_keystream(&mut body);

        let cipher_1 = Aes128::new(GenericArray::from_slice(&HEADER_KEY[..16]));
        let cipher_2 = Aes128::new(GenericArray::from_slice(&HEADER_KEY[16..]));
        let xts = Xts128::new(cipher_1, cipher_2);
        xts.encrypt_area(&mut header, 0x200, 0, get_nintendo_tweak);

        let mut out = header;
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn decodes_a_round_tripped_container() {
        let cnmt = cnmt::build(
            0x0100000000000816,
            201392178,
            &[([0xAA; 16], 0x1234)],
            &[(0x0100000000000809, 450)],
        );
        let pfs = pfs0::build(&[("Update.cnmt", &cnmt)]);
        let file = build_nca(&pfs);

        let decoder = HacDecoder::new(test_keyset());
        let records = decoder.decode(&file).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].meta_entries,
            vec![MetaDescriptor { title_id: "0100000000000809".into(), version: "450".into() }]
        );
        assert_eq!(
            records[0].content_entries,
            vec![ContentDescriptor { content_id: "aa".repeat(16) }]
        );
    }

    #[test]
    fn decoding_twice_yields_identical_records() {
        let cnmt = cnmt::build(1, 2, &[([0x0F; 16], 16)], &[]);
        let pfs = pfs0::build(&[("a.cnmt", &cnmt)]);
        let file = build_nca(&pfs);
        let decoder = HacDecoder::new(test_keyset());
        assert_eq!(decoder.decode(&file).unwrap(), decoder.decode(&file).unwrap());
    }

    #[test]
    fn corrupted_body_fails_the_integrity_check() {
        let cnmt = cnmt::build(1, 2, &[([0x0F; 16], 16)], &[]);
        let pfs = pfs0::build(&[("a.cnmt", &cnmt)]);
        let mut file = build_nca(&pfs);
        // First body byte belongs to the hash table; the master hash catches it.
        file[0xC00] ^= 0xFF;

        let decoder = HacDecoder::new(test_keyset());
        assert!(matches!(decoder.decode(&file), Err(DecodeError::Integrity(_))));
    }

    #[test]
    fn garbage_input_is_corrupt() {
        let decoder = HacDecoder::new(test_keyset());
        assert!(matches!(decoder.decode(&[0u8; 0x2000]), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn missing_key_generation_is_reported() {
        let keyset = Keyset::parse(&format!("header_key = {}\n", hex::encode(HEADER_KEY))).unwrap();
        let cnmt = cnmt::build(1, 2, &[], &[]);
        let pfs = pfs0::build(&[("a.cnmt", &cnmt)]);
        let file = build_nca(&pfs);
        let decoder = HacDecoder::new(keyset);
        assert!(matches!(decoder.decode(&file), Err(DecodeError::MissingKey(_))));
    }
}
