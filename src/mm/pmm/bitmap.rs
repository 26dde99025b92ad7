//! # Bitmap Frame Allocator
//!
//! Alocador de frames sobre uma RAM simulada (`Vec` de páginas). Um bit por
//! frame: 1 = ocupado. Os primeiros `reserved` frames pertencem à imagem do
//! kernel e nunca são entregues.
//!
//! A busca começa na última palavra onde houve sucesso (`next_free`) e dá a
//! volta no bitmap; em RAM pequena o scan linear O(N) não importa.

use super::frame::PhysFrame;
use super::PhysicalMemory;
use crate::mm::config::PAGE_SIZE;
use alloc::vec;
use alloc::vec::Vec;

/// Estatísticas do alocador
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmmStats {
    pub total_frames: usize,
    pub used_frames: usize,
    pub allocations: u64,
    pub frees: u64,
    pub failed_allocs: u64,
}

pub struct BitmapFrameAllocator {
    bitmap: Vec<u64>,
    ram: Vec<[u8; PAGE_SIZE]>,
    total_frames: usize,
    reserved: usize,
    next_free: usize,
    stats: PmmStats,
}

impl BitmapFrameAllocator {
    /// Cria RAM com `total_frames` frames, dos quais os `reserved` primeiros
    /// ficam com o kernel.
    pub fn new(total_frames: usize, reserved: usize) -> Self {
        let reserved = reserved.min(total_frames);
        let words = (total_frames + 63) / 64;
        let mut allocator = Self {
            bitmap: vec![0u64; words],
            ram: vec![[0u8; PAGE_SIZE]; total_frames],
            total_frames,
            reserved,
            next_free: 0,
            stats: PmmStats {
                total_frames,
                ..PmmStats::default()
            },
        };

        for idx in 0..reserved {
            allocator.set_bit(idx);
        }
        allocator.stats.used_frames = reserved;

        crate::kinfo!("(PMM) Frames totais=", total_frames);
        crate::kdebug!("(PMM) Frames do kernel=", reserved);
        allocator
    }

    pub fn stats(&self) -> PmmStats {
        self.stats
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// O frame está alocado?
    pub fn is_allocated(&self, frame: PhysFrame) -> bool {
        let idx = frame.number();
        idx < self.total_frames && self.test_bit(idx)
    }

    #[inline]
    fn set_bit(&mut self, idx: usize) {
        self.bitmap[idx / 64] |= 1 << (idx % 64);
    }

    #[inline]
    fn clear_bit(&mut self, idx: usize) {
        self.bitmap[idx / 64] &= !(1 << (idx % 64));
    }

    #[inline]
    fn test_bit(&self, idx: usize) -> bool {
        self.bitmap[idx / 64] & (1 << (idx % 64)) != 0
    }

    fn index_of(&self, frame: PhysFrame) -> usize {
        let idx = frame.number();
        if idx >= self.total_frames {
            crate::kerror!("(PMM) Frame fora da RAM:", frame.start_address().as_u64());
            panic!("(PMM) acesso a frame fora da RAM");
        }
        idx
    }
}

impl PhysicalMemory for BitmapFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let words = self.bitmap.len();
        for i in 0..words {
            let word_idx = (self.next_free + i) % words;
            let word = self.bitmap[word_idx];
            if word == u64::MAX {
                continue;
            }
            let idx = word_idx * 64 + word.trailing_ones() as usize;
            if idx >= self.total_frames {
                continue;
            }

            self.set_bit(idx);
            self.next_free = word_idx;
            self.ram[idx].fill(0);
            self.stats.used_frames += 1;
            self.stats.allocations += 1;
            crate::ktrace!("(PMM) Frame alocado:", idx);
            return Some(PhysFrame::from_number(idx));
        }

        self.stats.failed_allocs += 1;
        crate::kwarn!("(PMM) OOM: sem frames livres");
        None
    }

    fn deallocate_frame(&mut self, frame: PhysFrame) {
        let idx = self.index_of(frame);
        if idx < self.reserved {
            panic!("(PMM) tentativa de liberar frame do kernel");
        }
        if !self.test_bit(idx) {
            crate::kerror!("(PMM) Double free:", frame.start_address().as_u64());
            panic!("(PMM) double free");
        }
        self.clear_bit(idx);
        self.stats.used_frames -= 1;
        self.stats.frees += 1;
        crate::ktrace!("(PMM) Frame liberado:", idx);
    }

    fn frame(&self, frame: PhysFrame) -> &[u8; PAGE_SIZE] {
        &self.ram[self.index_of(frame)]
    }

    fn frame_mut(&mut self, frame: PhysFrame) -> &mut [u8; PAGE_SIZE] {
        let idx = self.index_of(frame);
        &mut self.ram[idx]
    }

    fn copy_frame(&mut self, src: PhysFrame, dst: PhysFrame) {
        let (s, d) = (self.index_of(src), self.index_of(dst));
        if s != d {
            self.ram[d] = self.ram[s];
        }
    }

    fn reserved_frames(&self) -> usize {
        self.reserved
    }

    fn free_frames(&self) -> usize {
        self.total_frames - self.stats.used_frames
    }
}
