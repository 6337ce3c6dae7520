//! Writing the optimized output archive.
//!
//! The writer mirrors the reader's binary layout in the opposite direction:
//! a Local File Header plus payload per entry, then the Central Directory,
//! then the End of Central Directory record. Every file entry is deflated
//! at maximum level; entries that deflate badly (tiny or already-compressed
//! payloads) are stored instead so the container never inflates them.
//!
//! Output archives are plain zip32. With the 150 MiB upload ceiling the
//! 4 GiB limits are unreachable, so ZIP64 writing is deliberately absent.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use anyhow::{Context, Result, bail};

use super::structures::*;

/// One finished entry awaiting its Central Directory record.
struct CentralRecord {
    name: String,
    method: CompressionMethod,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    lfh_offset: u32,
    external_attrs: u32,
}

/// In-memory zip archive writer.
///
/// Entries are appended in processing order; [`finish`](Self::finish)
/// serializes the Central Directory and returns the complete container.
pub struct ArchiveWriter {
    buf: Vec<u8>,
    central: Vec<CentralRecord>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            central: Vec::new(),
        }
    }

    /// Re-create a directory entry (empty payload, trailing slash).
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        self.write_entry(&name, &[], CompressionMethod::Stored, 0, 0, DOS_ATTR_DIRECTORY)
    }

    /// Append a file entry, deflating it at maximum level.
    ///
    /// Falls back to STORED when deflate does not shrink the payload.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut crc = flate2::Crc::new();
        crc.update(data);

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data)?;
        let deflated = encoder.finish().context("deflate failed")?;

        let uncompressed = to_u32(data.len())?;
        if deflated.len() < data.len() {
            self.write_entry(
                name,
                &deflated,
                CompressionMethod::Deflate,
                crc.sum(),
                uncompressed,
                0,
            )?;
        } else {
            self.write_entry(name, data, CompressionMethod::Stored, crc.sum(), uncompressed, 0)?;
        }
        Ok(())
    }

    /// Serialize the Central Directory and EOCD, returning the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let cd_offset = to_u32(self.buf.len())?;
        if self.central.len() > u16::MAX as usize {
            bail!("Too many entries for a zip32 archive");
        }

        for record in &self.central {
            self.buf.write_all(CDFH_SIGNATURE)?;
            self.buf.write_u16::<LittleEndian>(VERSION_DEFLATE)?; // version made by
            self.buf.write_u16::<LittleEndian>(VERSION_DEFLATE)?; // version needed
            self.buf.write_u16::<LittleEndian>(0)?; // flags
            self.buf.write_u16::<LittleEndian>(record.method.as_u16())?;
            self.buf.write_u16::<LittleEndian>(DOS_TIME_EPOCH)?;
            self.buf.write_u16::<LittleEndian>(DOS_DATE_EPOCH)?;
            self.buf.write_u32::<LittleEndian>(record.crc32)?;
            self.buf.write_u32::<LittleEndian>(record.compressed_size)?;
            self.buf.write_u32::<LittleEndian>(record.uncompressed_size)?;
            self.buf
                .write_u16::<LittleEndian>(record.name.len() as u16)?;
            self.buf.write_u16::<LittleEndian>(0)?; // extra field length
            self.buf.write_u16::<LittleEndian>(0)?; // comment length
            self.buf.write_u16::<LittleEndian>(0)?; // disk number start
            self.buf.write_u16::<LittleEndian>(0)?; // internal attrs
            self.buf.write_u32::<LittleEndian>(record.external_attrs)?;
            self.buf.write_u32::<LittleEndian>(record.lfh_offset)?;
            self.buf.write_all(record.name.as_bytes())?;
        }

        let cd_end = to_u32(self.buf.len())?;
        let cd_size = cd_end - cd_offset;
        let total = self.central.len() as u16;

        self.buf.write_all(EndOfCentralDirectory::SIGNATURE)?;
        self.buf.write_u16::<LittleEndian>(0)?; // disk number
        self.buf.write_u16::<LittleEndian>(0)?; // disk with CD
        self.buf.write_u16::<LittleEndian>(total)?;
        self.buf.write_u16::<LittleEndian>(total)?;
        self.buf.write_u32::<LittleEndian>(cd_size)?;
        self.buf.write_u32::<LittleEndian>(cd_offset)?;
        self.buf.write_u16::<LittleEndian>(0)?; // comment length

        Ok(self.buf)
    }

    fn write_entry(
        &mut self,
        name: &str,
        payload: &[u8],
        method: CompressionMethod,
        crc32: u32,
        uncompressed_size: u32,
        external_attrs: u32,
    ) -> Result<()> {
        if name.len() > u16::MAX as usize {
            bail!("Entry name too long: {} bytes", name.len());
        }
        let lfh_offset = to_u32(self.buf.len())?;
        let compressed_size = to_u32(payload.len())?;

        self.buf.write_all(LFH_SIGNATURE)?;
        self.buf.write_u16::<LittleEndian>(VERSION_DEFLATE)?;
        self.buf.write_u16::<LittleEndian>(0)?; // flags
        self.buf.write_u16::<LittleEndian>(method.as_u16())?;
        self.buf.write_u16::<LittleEndian>(DOS_TIME_EPOCH)?;
        self.buf.write_u16::<LittleEndian>(DOS_DATE_EPOCH)?;
        self.buf.write_u32::<LittleEndian>(crc32)?;
        self.buf.write_u32::<LittleEndian>(compressed_size)?;
        self.buf.write_u32::<LittleEndian>(uncompressed_size)?;
        self.buf.write_u16::<LittleEndian>(name.len() as u16)?;
        self.buf.write_u16::<LittleEndian>(0)?; // extra field length
        self.buf.write_all(name.as_bytes())?;
        self.buf.write_all(payload)?;

        self.central.push(CentralRecord {
            name: name.to_string(),
            method,
            crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
            external_attrs,
        });
        Ok(())
    }
}

fn to_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| anyhow::anyhow!("Archive exceeds zip32 limits"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::ArchiveReader;
    use std::sync::Arc;

    #[tokio::test]
    async fn roundtrips_through_reader() {
        let mut writer = ArchiveWriter::new();
        writer.add_directory("assets/").unwrap();
        writer.add_file("assets/a.txt", b"some repetitive text text text").unwrap();
        writer.add_file("tiny.bin", &[0x42]).unwrap();
        let archive = writer.finish().unwrap();

        let reader = ArchiveReader::new(Arc::new(MemoryReader::new(archive)));
        let entries = reader.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_directory);
        assert_eq!(entries[1].file_name, "assets/a.txt");

        let payload = reader.read_entry(&entries[1]).await.unwrap();
        assert_eq!(payload, b"some repetitive text text text");

        // A 1-byte payload cannot deflate smaller, so it must be stored.
        assert_eq!(entries[2].compression_method, CompressionMethod::Stored);
        assert_eq!(reader.read_entry(&entries[2]).await.unwrap(), [0x42]);
    }

    #[tokio::test]
    async fn directory_names_gain_trailing_slash() {
        let mut writer = ArchiveWriter::new();
        writer.add_directory("assets/minecraft").unwrap();
        let archive = writer.finish().unwrap();

        let reader = ArchiveReader::new(Arc::new(MemoryReader::new(archive)));
        let entries = reader.entries().await.unwrap();
        assert_eq!(entries[0].file_name, "assets/minecraft/");
        assert!(entries[0].is_directory);
    }

    #[test]
    fn empty_archive_is_just_an_eocd() {
        let archive = ArchiveWriter::new().finish().unwrap();
        assert_eq!(archive.len(), EndOfCentralDirectory::SIZE);
        assert_eq!(&archive[0..4], EndOfCentralDirectory::SIGNATURE);
    }
}
