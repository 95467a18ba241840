//! PFS0 partition-filesystem reading.

use crate::error::NcaError;
use crate::util::{le32, le64};

const MAGIC: &[u8; 4] = b"PFS0";
const HEADER_SIZE: usize = 0x10;
const ENTRY_SIZE: usize = 0x18;

/// One file inside a partition filesystem.
#[derive(Debug, Clone)]
pub struct Pfs0Entry {
    pub name: String,
    pub data: Vec<u8>,
}

/// A fully materialized partition filesystem.
#[derive(Debug, Clone)]
pub struct Pfs0 {
    entries: Vec<Pfs0Entry>,
}

impl Pfs0 {
    pub fn parse(bytes: &[u8]) -> Result<Self, NcaError> {
        if bytes.len() < HEADER_SIZE {
            return Err(NcaError::BadPfs0("truncated header".into()));
        }
        if &bytes[..4] != MAGIC {
            return Err(NcaError::BadPfs0("bad magic".into()));
        }

        let count = le32(&bytes[4..]) as usize;
        let string_table_size = le32(&bytes[8..]) as usize;
        let strings_offset = HEADER_SIZE + count * ENTRY_SIZE;
        let data_offset = strings_offset + string_table_size;
        if bytes.len() < data_offset {
            return Err(NcaError::BadPfs0("entry or string table exceeds input".into()));
        }
        let strings = &bytes[strings_offset..data_offset];

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let entry = &bytes[HEADER_SIZE + index * ENTRY_SIZE..HEADER_SIZE + (index + 1) * ENTRY_SIZE];
            let offset = le64(&entry[0..]) as usize;
            let size = le64(&entry[8..]) as usize;
            let name_offset = le32(&entry[16..]) as usize;

            let name = read_name(strings, name_offset)
                .ok_or_else(|| NcaError::BadPfs0(format!("bad name for entry {index}")))?;

            let start = data_offset
                .checked_add(offset)
                .ok_or_else(|| NcaError::BadPfs0(format!("entry {index} offset overflow")))?;
            let end = start
                .checked_add(size)
                .filter(|&end| end <= bytes.len())
                .ok_or_else(|| NcaError::BadPfs0(format!("entry {index} exceeds input")))?;

            entries.push(Pfs0Entry { name, data: bytes[start..end].to_vec() });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> impl Iterator<Item = &Pfs0Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_name(strings: &[u8], offset: usize) -> Option<String> {
    let tail = strings.get(offset..)?;
    let end = tail.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&tail[..end]).ok().map(str::to_string)
}

#[cfg(test)]
pub(crate) fn build(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut strings = Vec::new();
    let mut name_offsets = Vec::new();
    for (name, _) in files {
        name_offsets.push(strings.len() as u32);
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
    }

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(files.len() as u32).to_le_bytes());
    out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);

    let mut data_offset = 0u64;
    for ((_, data), name_offset) in files.iter().zip(&name_offsets) {
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(&name_offset.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        data_offset += data.len() as u64;
    }

    out.extend_from_slice(&strings);
    for (_, data) in files {
        out.extend_from_slice(data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_two_file_partition() {
        let image = build(&[("Update.cnmt", b"cnmt bytes"), ("extra.bin", b"xx")]);
        let pfs = Pfs0::parse(&image).unwrap();
        assert_eq!(pfs.len(), 2);
        let entries: Vec<_> = pfs.entries().collect();
        assert_eq!(entries[0].name, "Update.cnmt");
        assert_eq!(entries[0].data, b"cnmt bytes");
        assert_eq!(entries[1].name, "extra.bin");
        assert_eq!(entries[1].data, b"xx");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut image = build(&[("a", b"1")]);
        image[0] = b'X';
        assert!(matches!(Pfs0::parse(&image), Err(NcaError::BadPfs0(_))));
    }

    #[test]
    fn rejects_truncated_data() {
        let image = build(&[("a", b"123456")]);
        assert!(matches!(Pfs0::parse(&image[..image.len() - 2]), Err(NcaError::BadPfs0(_))));
    }
}
