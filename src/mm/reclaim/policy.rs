//! # Políticas de Substituição de Páginas
//!
//! Escolhem qual página residente sai quando um processo não isento atinge
//! `MAX_RESIDENT_PAGES` e precisa admitir mais uma. A política é um valor de
//! configuração ([`ReplacementPolicy`]) lido ao construir o
//! `MemoryManager`; cada variante com eviction tem um [`VictimSelector`].
//!
//! | Política | Vítima |
//! |----------|--------|
//! | `Fifo` | slot no cursor, cursor avança |
//! | `SecondChanceFifo` | como FIFO, mas Accessed=1 ganha outra volta |
//! | `ApproxNotFrequentlyUsed` | maior contador de aging |
//! | `ApproxLeastActive` | menos bits 1 no contador |
//! | `QueueTail` | cauda da fila (inserção na cabeça) |
//! | `None` | nenhuma: atingir o limite é erro |

use crate::mm::addr::VirtAddr;
use crate::mm::aspace::resident::{ResidentPage, ResidentSet};
use crate::mm::config::MAX_RESIDENT_PAGES;
use crate::mm::error::MmResult;

/// Política de substituição ativa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacementPolicy {
    /// Sem paging: o limite residente é rígido
    None,
    Fifo,
    SecondChanceFifo,
    ApproxNotFrequentlyUsed,
    ApproxLeastActive,
    QueueTail,
}

impl ReplacementPolicy {
    /// Todas as políticas que evictam páginas.
    pub const EVICTING: [Self; 5] = [
        Self::Fifo,
        Self::SecondChanceFifo,
        Self::ApproxNotFrequentlyUsed,
        Self::ApproxLeastActive,
        Self::QueueTail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Fifo => "FIFO",
            Self::SecondChanceFifo => "SCFIFO",
            Self::ApproxNotFrequentlyUsed => "NFUA",
            Self::ApproxLeastActive => "LAPA",
            Self::QueueTail => "AQ",
        }
    }

    /// Seletor de vítima, ou `None` quando a política não evicta.
    pub fn selector(self) -> Option<&'static dyn VictimSelector> {
        match self {
            Self::None => None,
            Self::Fifo => Some(&Fifo),
            Self::SecondChanceFifo => Some(&SecondChance),
            Self::ApproxNotFrequentlyUsed => Some(&NotFrequentlyUsed),
            Self::ApproxLeastActive => Some(&LeastActive),
            Self::QueueTail => Some(&QueueTail),
        }
    }

    pub fn evicts(self) -> bool {
        self != Self::None
    }

    /// Contador de aging de uma página recém-admitida.
    ///
    /// LAPA começa com todos os bits ligados para que a página nova não seja
    /// a próxima vítima.
    pub fn initial_counter(self) -> u32 {
        match self {
            Self::ApproxLeastActive => u32::MAX,
            _ => 0,
        }
    }

    /// Coloca `page` no resident set na posição que a política espera.
    pub fn admit(self, set: &mut ResidentSet, page: ResidentPage) -> MmResult<usize> {
        match self.selector() {
            Some(selector) => selector.admit(set, page),
            None => set.insert(page),
        }
    }
}

/// Escolha de vítima de uma política.
///
/// `accessed` lê e limpa o bit Accessed da PTE da página (o que o hardware
/// setou desde a última consulta).
pub trait VictimSelector: Sync {
    /// Admite uma página nova. Padrão: primeiro slot disponível.
    fn admit(&self, set: &mut ResidentSet, page: ResidentPage) -> MmResult<usize> {
        set.insert(page)
    }

    /// Slot da vítima, ou `None` se o set estiver vazio.
    fn select_victim(
        &self,
        set: &mut ResidentSet,
        accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize>;
}

// =============================================================================
// FIFO
// =============================================================================

struct Fifo;

impl VictimSelector for Fifo {
    fn select_victim(
        &self,
        set: &mut ResidentSet,
        _accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize> {
        let start = set.cursor();
        let victim = (0..MAX_RESIDENT_PAGES)
            .map(|i| (start + i) % MAX_RESIDENT_PAGES)
            .find(|&slot| set.get(slot).is_some())?;
        set.set_cursor(victim + 1);
        Some(victim)
    }
}

// =============================================================================
// SECOND CHANCE FIFO
// =============================================================================

struct SecondChance;

impl VictimSelector for SecondChance {
    fn select_victim(
        &self,
        set: &mut ResidentSet,
        accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize> {
        if set.is_empty() {
            return None;
        }
        let start = set.cursor();
        // Depois de uma volta completa todos os bits estão limpos
        for i in 0..=2 * MAX_RESIDENT_PAGES {
            let slot = (start + i) % MAX_RESIDENT_PAGES;
            let va = match set.get(slot) {
                Some(page) => page.va,
                None => continue,
            };
            if accessed(va) {
                continue;
            }
            set.set_cursor(slot + 1);
            return Some(slot);
        }
        None
    }
}

// =============================================================================
// NFUA - Not Frequently Used (aging)
// =============================================================================

struct NotFrequentlyUsed;

impl VictimSelector for NotFrequentlyUsed {
    fn select_victim(
        &self,
        set: &mut ResidentSet,
        _accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (slot, page) in set.iter() {
            match best {
                Some((_, counter)) if page.counter <= counter => {}
                _ => best = Some((slot, page.counter)),
            }
        }
        best.map(|(slot, _)| slot)
    }
}

// =============================================================================
// LAPA - Least Accessed Page (aging, popcount)
// =============================================================================

struct LeastActive;

impl VictimSelector for LeastActive {
    fn select_victim(
        &self,
        set: &mut ResidentSet,
        _accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize> {
        // Menos bits 1; empate: menor contador; empate: menor slot
        set.iter()
            .min_by_key(|(slot, page)| (page.counter.count_ones(), page.counter, *slot))
            .map(|(slot, _)| slot)
    }
}

// =============================================================================
// AQ - Advancing Queue
// =============================================================================

struct QueueTail;

impl VictimSelector for QueueTail {
    fn admit(&self, set: &mut ResidentSet, page: ResidentPage) -> MmResult<usize> {
        set.push_front(page)
    }

    fn select_victim(
        &self,
        set: &mut ResidentSet,
        _accessed: &mut dyn FnMut(VirtAddr) -> bool,
    ) -> Option<usize> {
        set.tail()
    }
}
