//! # Memory Statistics
//!
//! Contadores globais do VM (todos os processos). Os contadores por processo
//! ficam em `AddressSpace::stats`.

use core::sync::atomic::{AtomicU64, Ordering};

pub static PAGE_FAULTS: AtomicU64 = AtomicU64::new(0);
pub static COW_FAULTS: AtomicU64 = AtomicU64::new(0);
pub static COW_COPIES: AtomicU64 = AtomicU64::new(0);
pub static SWAP_INS: AtomicU64 = AtomicU64::new(0);
pub static PAGE_OUTS: AtomicU64 = AtomicU64::new(0);
pub static FORKS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub page_faults: u64,
    pub cow_faults: u64,
    pub cow_copies: u64,
    pub swap_ins: u64,
    pub page_outs: u64,
    pub forks: u64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MemoryStats {
    MemoryStats {
        page_faults: PAGE_FAULTS.load(Ordering::Relaxed),
        cow_faults: COW_FAULTS.load(Ordering::Relaxed),
        cow_copies: COW_COPIES.load(Ordering::Relaxed),
        swap_ins: SWAP_INS.load(Ordering::Relaxed),
        page_outs: PAGE_OUTS.load(Ordering::Relaxed),
        forks: FORKS.load(Ordering::Relaxed),
    }
}
