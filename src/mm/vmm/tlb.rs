//! # TLB Management
//!
//! Toda mudança de presença ou permissão numa PTE é seguida de um flush
//! completo do TLB do address space dono, antes de a operação retornar.
//!
//! Cada address space carrega uma geração de tradução (`tlb_gen`). O flush
//! avança a geração; o código de troca de contexto recarrega o CR3 quando a
//! geração que a CPU viu ficou para trás. Em uniprocessador isso equivale ao
//! `lcr3` após cada alteração.

use core::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// ESTATÍSTICAS
// =============================================================================

pub struct TlbStats {
    pub full_flushes: AtomicU64,
}

impl TlbStats {
    pub const fn new() -> Self {
        Self {
            full_flushes: AtomicU64::new(0),
        }
    }

    pub fn full_flushes(&self) -> u64 {
        self.full_flushes.load(Ordering::Relaxed)
    }
}

pub static TLB_STATS: TlbStats = TlbStats::new();

// =============================================================================
// GERAÇÃO POR ADDRESS SPACE
// =============================================================================

/// Geração de tradução de um address space.
#[derive(Debug, Default)]
pub struct TlbGeneration(AtomicU64);

impl TlbGeneration {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Invalida todas as traduções cacheadas do address space.
    pub fn flush_all(&self) {
        self.0.fetch_add(1, Ordering::Release);
        TLB_STATS.full_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Traduções carregadas na geração `seen` ainda valem?
    pub fn is_current(&self, seen: u64) -> bool {
        self.current() == seen
    }
}
