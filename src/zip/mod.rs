//! Zip container reading and writing.
//!
//! The service never touches the filesystem: uploads are parsed from an
//! in-memory buffer and the optimized archive is serialized back into one.
//!
//! - [`structures`]: binary records of the zip format (EOCD, headers)
//! - [`reader`]: central-directory parsing and entry extraction
//! - [`writer`]: zip32 serialization with maximum-level deflate
//!
//! Reading supports STORED and DEFLATE methods plus ZIP64 archives;
//! encryption and multi-disk archives are not supported.

mod reader;
mod structures;
mod writer;

pub use reader::ArchiveReader;
pub use structures::*;
pub use writer::ArchiveWriter;

#[cfg(test)]
pub(crate) mod test_support {
    //! Hand-assembled archives for exercising the reader without the writer.

    /// Build a zip of STORED entries. Names ending in '/' become directories.
    pub fn stored_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut central = Vec::new();

        for (name, data) in files {
            let mut crc = flate2::Crc::new();
            crc.update(data);
            let offset = buf.len() as u32;

            buf.extend_from_slice(b"PK\x03\x04");
            buf.extend_from_slice(&20u16.to_le_bytes()); // version needed
            buf.extend_from_slice(&0u16.to_le_bytes()); // flags
            buf.extend_from_slice(&0u16.to_le_bytes()); // method: stored
            buf.extend_from_slice(&0u16.to_le_bytes()); // time
            buf.extend_from_slice(&0x21u16.to_le_bytes()); // date
            buf.extend_from_slice(&crc.sum().to_le_bytes());
            buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
            buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buf.extend_from_slice(&0u16.to_le_bytes()); // extra len
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(data);

            central.push((name.to_string(), crc.sum(), data.len() as u32, offset));
        }

        let cd_offset = buf.len() as u32;
        for (name, crc, size, offset) in &central {
            buf.extend_from_slice(b"PK\x01\x02");
            buf.extend_from_slice(&20u16.to_le_bytes()); // version made by
            buf.extend_from_slice(&20u16.to_le_bytes()); // version needed
            buf.extend_from_slice(&0u16.to_le_bytes()); // flags
            buf.extend_from_slice(&0u16.to_le_bytes()); // method
            buf.extend_from_slice(&0u16.to_le_bytes()); // time
            buf.extend_from_slice(&0x21u16.to_le_bytes()); // date
            buf.extend_from_slice(&crc.to_le_bytes());
            buf.extend_from_slice(&size.to_le_bytes());
            buf.extend_from_slice(&size.to_le_bytes());
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
            buf.extend_from_slice(&0u16.to_le_bytes()); // extra
            buf.extend_from_slice(&0u16.to_le_bytes()); // comment
            buf.extend_from_slice(&0u16.to_le_bytes()); // disk
            buf.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            let external: u32 = if name.ends_with('/') { 0x10 } else { 0 };
            buf.extend_from_slice(&external.to_le_bytes());
            buf.extend_from_slice(&offset.to_le_bytes());
            buf.extend_from_slice(name.as_bytes());
        }
        let cd_size = buf.len() as u32 - cd_offset;

        buf.extend_from_slice(b"PK\x05\x06");
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk number
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk with CD
        buf.extend_from_slice(&(central.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(central.len() as u16).to_le_bytes());
        buf.extend_from_slice(&cd_size.to_le_bytes());
        buf.extend_from_slice(&cd_offset.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // comment len

        buf
    }
}
