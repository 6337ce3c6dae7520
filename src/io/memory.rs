use super::ReadAt;
use anyhow::{Result, bail};
use async_trait::async_trait;

/// In-memory archive reader.
///
/// Uploads are fully buffered before processing begins, so the zip layer
/// only ever reads from a byte buffer. Implements [`ReadAt`] so the parser
/// stays agnostic of where the archive bytes came from.
pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.data.len() {
            bail!(
                "read past end of buffer: {}..{} of {}",
                start,
                end,
                self.data.len()
            );
        }
        buf.copy_from_slice(&self.data[start..end]);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
