//! Arquivo de swap em memória.
//!
//! Cresce como um arquivo comum conforme as escritas avançam, até o limite
//! de `MAX_SWAP_SLOTS` páginas. Ler além do fim escrito é erro.

use super::{BackingStore, SwapIoError};
use crate::mm::config::{MAX_SWAP_SLOTS, PAGE_SIZE};
use alloc::vec::Vec;

pub struct MemorySwapFile {
    data: Vec<u8>,
    limit: usize,
    writes: u64,
    reads: u64,
}

impl MemorySwapFile {
    pub fn new() -> Self {
        Self::with_limit(MAX_SWAP_SLOTS * PAGE_SIZE)
    }

    /// Arquivo com tamanho máximo de `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            writes: 0,
            reads: 0,
        }
    }

    /// Tamanho atual do arquivo
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// (escritas, leituras) realizadas
    pub fn io_counts(&self) -> (u64, u64) {
        (self.writes, self.reads)
    }
}

impl Default for MemorySwapFile {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for MemorySwapFile {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize, SwapIoError> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.limit {
            return Err(SwapIoError::OutOfRange);
        }
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        self.writes += 1;
        Ok(buf.len())
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, SwapIoError> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.data.len() {
            return Err(SwapIoError::OutOfRange);
        }
        buf.copy_from_slice(&self.data[start..end]);
        self.reads += 1;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_what_was_written() {
        let mut file = MemorySwapFile::new();
        let page = [0x5Au8; PAGE_SIZE];
        assert_eq!(file.write_at(&page, 2 * PAGE_SIZE as u64), Ok(PAGE_SIZE));
        assert_eq!(file.len(), 3 * PAGE_SIZE);

        let mut back = [0u8; PAGE_SIZE];
        assert_eq!(file.read_at(&mut back, 2 * PAGE_SIZE as u64), Ok(PAGE_SIZE));
        assert_eq!(back, page);
        assert_eq!(file.io_counts(), (1, 1));
    }

    #[test]
    fn rejects_access_past_limit() {
        let mut file = MemorySwapFile::with_limit(PAGE_SIZE);
        let page = [1u8; PAGE_SIZE];
        assert_eq!(file.write_at(&page, PAGE_SIZE as u64), Err(SwapIoError::OutOfRange));
        let mut back = [0u8; PAGE_SIZE];
        assert_eq!(file.read_at(&mut back, 0), Err(SwapIoError::OutOfRange));
    }
}
