//! Minimal ZIP "store" writer for the training photo upload body.
//!
//! The generation service accepts training photos as a single uncompressed
//! ZIP archive. Entries are stored verbatim (method 0) with CRC-32 checksums,
//! so the output is a pure function of entry order and content; the upload
//! body can be compared byte-for-byte against a reference in tests.

/// One named payload inside the archive. Borrows the caller's bytes; nothing
/// is copied until the container is assembled.
#[derive(Debug)]
pub struct ArchiveEntry<'a> {
    pub name: String,
    pub data: &'a [u8],
}

impl<'a> ArchiveEntry<'a> {
    pub fn new(name: impl Into<String>, data: &'a [u8]) -> Self {
        Self { name: name.into(), data }
    }
}

/// Size-limit violations of the ZIP format's 16/32-bit fields.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive cannot hold more than 65535 entries (got {0})")]
    TooManyEntries(usize),

    #[error("entry name exceeds 65535 bytes: {0}")]
    NameTooLong(String),

    #[error("entry {name} is too large for the archive format ({size} bytes)")]
    EntryTooLarge { name: String, size: u64 },

    #[error("archive exceeds the 4 GiB format limit ({0} bytes)")]
    ArchiveTooLarge(u64),
}

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4B50;
const END_OF_DIRECTORY_SIGNATURE: u32 = 0x0605_4B50;

/// ZIP version 2.0: the minimum that understands the store method.
const FORMAT_VERSION: u16 = 20;

/// Build an uncompressed archive from `entries`, in order.
///
/// The whole container is assembled in memory and returned once; no partial
/// output is produced on failure.
pub fn build_archive(entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>, ArchiveError> {
    if entries.len() > u16::MAX as usize {
        return Err(ArchiveError::TooManyEntries(entries.len()));
    }

    // Validate every entry up front so failure never leaves a half-built
    // container in the output path.
    for entry in entries {
        if entry.name.len() > u16::MAX as usize {
            return Err(ArchiveError::NameTooLong(entry.name.clone()));
        }
        if entry.data.len() as u64 > u32::MAX as u64 {
            return Err(ArchiveError::EntryTooLarge {
                name: entry.name.clone(),
                size: entry.data.len() as u64,
            });
        }
    }

    let mut archive = Vec::new();
    let mut central_directory = Vec::new();

    for entry in entries {
        let name = entry.name.as_bytes();
        let size = entry.data.len() as u32;
        let checksum = crc32(entry.data);
        let offset = fit_u32(archive.len() as u64)?;

        // Local file header: store method, zeroed DOS timestamp, stored size
        // recorded as both compressed and uncompressed.
        put_u32(&mut archive, LOCAL_HEADER_SIGNATURE);
        put_u16(&mut archive, FORMAT_VERSION); // version needed to extract
        put_u16(&mut archive, 0); // general purpose bit flag
        put_u16(&mut archive, 0); // compression method (store)
        put_u16(&mut archive, 0); // last mod file time
        put_u16(&mut archive, 0); // last mod file date
        put_u32(&mut archive, checksum);
        put_u32(&mut archive, size); // compressed size
        put_u32(&mut archive, size); // uncompressed size
        put_u16(&mut archive, name.len() as u16);
        put_u16(&mut archive, 0); // extra field length
        archive.extend_from_slice(name);
        archive.extend_from_slice(entry.data);

        put_u32(&mut central_directory, CENTRAL_HEADER_SIGNATURE);
        put_u16(&mut central_directory, FORMAT_VERSION); // version made by
        put_u16(&mut central_directory, FORMAT_VERSION); // version needed
        put_u16(&mut central_directory, 0); // general purpose bit flag
        put_u16(&mut central_directory, 0); // compression method
        put_u16(&mut central_directory, 0); // last mod file time
        put_u16(&mut central_directory, 0); // last mod file date
        put_u32(&mut central_directory, checksum);
        put_u32(&mut central_directory, size);
        put_u32(&mut central_directory, size);
        put_u16(&mut central_directory, name.len() as u16);
        put_u16(&mut central_directory, 0); // extra field length
        put_u16(&mut central_directory, 0); // file comment length
        put_u16(&mut central_directory, 0); // disk number start
        put_u16(&mut central_directory, 0); // internal file attributes
        put_u32(&mut central_directory, 0); // external file attributes
        put_u32(&mut central_directory, offset);
        central_directory.extend_from_slice(name);
    }

    let directory_offset = fit_u32(archive.len() as u64)?;
    let directory_size = fit_u32(central_directory.len() as u64)?;
    archive.extend_from_slice(&central_directory);

    // End of central directory: entry count appears twice because disk
    // splitting is unsupported.
    put_u32(&mut archive, END_OF_DIRECTORY_SIGNATURE);
    put_u16(&mut archive, 0); // number of this disk
    put_u16(&mut archive, 0); // disk where central directory starts
    put_u16(&mut archive, entries.len() as u16);
    put_u16(&mut archive, entries.len() as u16);
    put_u32(&mut archive, directory_size);
    put_u32(&mut archive, directory_offset);
    put_u16(&mut archive, 0); // comment length

    Ok(archive)
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn fit_u32(value: u64) -> Result<u32, ArchiveError> {
    u32::try_from(value).map_err(|_| ArchiveError::ArchiveTooLarge(value))
}

// ── CRC-32 ───────────────────────────────────────────────────────────

/// IEEE 802.3 polynomial, reflected.
const CRC_POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut crc = index as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 { CRC_POLYNOMIAL ^ (crc >> 1) } else { crc >> 1 };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}

/// CRC-32 checksum as used by the ZIP format: initialized to all-ones,
/// finalized by inversion.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = u32::MAX;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC_TABLE[index];
    }
    !crc
}
