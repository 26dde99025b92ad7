//! # Swap Subsystem
//!
//! Cada processo tem seu próprio arquivo de swap, visto apenas como uma
//! interface de leitura/escrita por offset ([`BackingStore`]). O
//! [`SwapMap`] registra qual página virtual ocupa cada slot.
//!
//! Slots livres são reutilizados (o menor índice livre primeiro), então o
//! offset de um slot é `índice * PAGE_SIZE` e o arquivo nunca passa de
//! `MAX_SWAP_SLOTS` páginas.
//!
//! Falha de I/O no swap é fatal: a página já saiu (ou ainda não voltou) da
//! RAM e não há como recuperar o conteúdo.

pub mod memfile;

pub use memfile::MemorySwapFile;

use crate::mm::addr::VirtAddr;
use crate::mm::config::{MAX_SWAP_SLOTS, PAGE_SIZE};
use crate::mm::error::{MmError, MmResult};
use core::fmt;

// =============================================================================
// BACKING STORE
// =============================================================================

/// Erro de I/O do arquivo de swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapIoError {
    /// Offset além do fim do arquivo
    OutOfRange,
    /// Dispositivo recusou a operação
    Device,
}

impl fmt::Display for SwapIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "offset fora do arquivo de swap"),
            Self::Device => write!(f, "erro de dispositivo"),
        }
    }
}

/// Arquivo de swap de um processo.
///
/// Offsets são múltiplos de `PAGE_SIZE` e buffers têm no máximo uma página.
/// O retorno é o número de bytes transferidos.
pub trait BackingStore: Send {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize, SwapIoError>;
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, SwapIoError>;
}

// =============================================================================
// SLOTS
// =============================================================================

/// Slot de swap (índice no arquivo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SwapSlot(pub usize);

impl SwapSlot {
    /// Offset em bytes no arquivo de swap
    #[inline]
    pub const fn offset(self) -> u64 {
        (self.0 * PAGE_SIZE) as u64
    }

    #[inline]
    pub const fn from_offset(offset: u64) -> Self {
        Self(offset as usize / PAGE_SIZE)
    }
}

/// Página virtual guardada num slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapEntry {
    pub va: VirtAddr,
    pub slot: SwapSlot,
}

/// Metadados de swap de um processo: slot -> página virtual.
#[derive(Debug, Clone)]
pub struct SwapMap {
    slots: [Option<VirtAddr>; MAX_SWAP_SLOTS],
    len: usize,
}

impl SwapMap {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_SWAP_SLOTS],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserva o menor slot livre para `va`.
    pub fn allocate(&mut self, va: VirtAddr) -> MmResult<SwapSlot> {
        if self.find(va).is_some() {
            crate::kerror!("(SWAP) va já possui slot:", va.as_u64());
            panic!("(SWAP) página duplicada no swap map");
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(MmError::CapacityExceeded)?;
        self.slots[index] = Some(va);
        self.len += 1;
        Ok(SwapSlot(index))
    }

    /// Devolve `slot` a `va`. `CapacityExceeded` se o slot estiver ocupado.
    pub fn claim(&mut self, slot: SwapSlot, va: VirtAddr) -> MmResult<()> {
        match self.slots.get_mut(slot.0) {
            Some(entry @ None) => {
                *entry = Some(va);
                self.len += 1;
                Ok(())
            }
            _ => Err(MmError::CapacityExceeded),
        }
    }

    /// Slot de `va` (busca linear).
    pub fn find(&self, va: VirtAddr) -> Option<SwapSlot> {
        self.slots
            .iter()
            .position(|entry| *entry == Some(va))
            .map(SwapSlot)
    }

    /// Libera o slot de `va`, se houver.
    pub fn release(&mut self, va: VirtAddr) -> Option<SwapSlot> {
        let slot = self.find(va)?;
        self.slots[slot.0] = None;
        self.len -= 1;
        Some(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = SwapEntry> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, entry)| {
            entry.map(|va| SwapEntry {
                va,
                slot: SwapSlot(i),
            })
        })
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_SWAP_SLOTS];
        self.len = 0;
    }
}

impl Default for SwapMap {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// I/O DE PÁGINA
// =============================================================================

/// Grava uma página inteira no slot. Erro ou escrita curta: panic.
pub fn write_page(store: &mut dyn BackingStore, slot: SwapSlot, page: &[u8]) {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    match store.write_at(page, slot.offset()) {
        Ok(n) if n == page.len() => {}
        Ok(n) => {
            crate::kerror!("(SWAP) Escrita curta, bytes=", n);
            panic!("(SWAP) falha de escrita no arquivo de swap");
        }
        Err(_) => {
            crate::kerror!("(SWAP) Erro de escrita no offset=", slot.offset());
            panic!("(SWAP) falha de escrita no arquivo de swap");
        }
    }
}

/// Lê uma página inteira do slot. Erro ou leitura curta: panic.
pub fn read_page(store: &mut dyn BackingStore, slot: SwapSlot, page: &mut [u8]) {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    match store.read_at(page, slot.offset()) {
        Ok(n) if n == page.len() => {}
        Ok(n) => {
            crate::kerror!("(SWAP) Leitura curta, bytes=", n);
            panic!("(SWAP) falha de leitura no arquivo de swap");
        }
        Err(_) => {
            crate::kerror!("(SWAP) Erro de leitura no offset=", slot.offset());
            panic!("(SWAP) falha de leitura no arquivo de swap");
        }
    }
}
