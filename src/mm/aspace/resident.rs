//! # Resident Set
//!
//! Páginas de um processo atualmente em RAM, com o contador de aging de
//! cada uma. Tamanho fixo (`MAX_RESIDENT_PAGES` slots); a posição do slot é
//! a "ordem" que as políticas FIFO e de fila enxergam.
//!
//! Inserção normal ocupa o slot liberado mais recentemente (o da vítima
//! recém-evictada) ou, na falta dele, o primeiro slot livre. Assim, com o set
//! cheio, a sequência evict+insert percorre os slots em round-robin.

use crate::mm::addr::VirtAddr;
use crate::mm::config::MAX_RESIDENT_PAGES;
use crate::mm::error::{MmError, MmResult};

/// Página residente rastreada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidentPage {
    pub va: VirtAddr,
    /// Contador de aging (bit 31 = acesso mais recente)
    pub counter: u32,
}

impl ResidentPage {
    pub const fn new(va: VirtAddr, counter: u32) -> Self {
        Self { va, counter }
    }
}

#[derive(Debug, Clone)]
pub struct ResidentSet {
    slots: [Option<ResidentPage>; MAX_RESIDENT_PAGES],
    len: usize,
    /// Próximo slot que FIFO/second-chance examinam
    cursor: usize,
    /// Último slot esvaziado
    last_freed: Option<usize>,
}

impl ResidentSet {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_RESIDENT_PAGES],
            len: 0,
            cursor: 0,
            last_freed: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_RESIDENT_PAGES
    }

    pub fn capacity(&self) -> usize {
        MAX_RESIDENT_PAGES
    }

    pub fn get(&self, slot: usize) -> Option<&ResidentPage> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut ResidentPage> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Slot ocupado por `va`.
    pub fn find(&self, va: VirtAddr) -> Option<usize> {
        self.slots
            .iter()
            .position(|p| p.map(|p| p.va) == Some(va))
    }

    /// (slot, página) em ordem de slot.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ResidentPage)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResidentPage> + '_ {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, slot: usize) {
        self.cursor = slot % MAX_RESIDENT_PAGES;
    }

    /// Insere no último slot esvaziado ou no primeiro livre.
    pub fn insert(&mut self, page: ResidentPage) -> MmResult<usize> {
        if self.is_full() {
            return Err(MmError::CapacityExceeded);
        }
        let slot = match self.last_freed.take() {
            Some(slot) if self.slots[slot].is_none() => slot,
            _ => self
                .slots
                .iter()
                .position(Option::is_none)
                .ok_or(MmError::CapacityExceeded)?,
        };
        self.slots[slot] = Some(page);
        self.len += 1;
        Ok(slot)
    }

    /// Insere na cabeça (slot 0), deslocando em direção à cauda tudo que
    /// estiver antes do primeiro slot livre.
    pub fn push_front(&mut self, page: ResidentPage) -> MmResult<usize> {
        let hole = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(MmError::CapacityExceeded)?;
        self.slots[..=hole].rotate_right(1);
        self.slots[0] = Some(page);
        self.len += 1;
        self.last_freed = None;
        Ok(0)
    }

    /// Maior slot ocupado (cauda da fila).
    pub fn tail(&self) -> Option<usize> {
        self.slots.iter().rposition(Option::is_some)
    }

    pub fn remove(&mut self, slot: usize) -> Option<ResidentPage> {
        let page = self.slots.get_mut(slot)?.take()?;
        self.len -= 1;
        self.last_freed = Some(slot);
        Some(page)
    }

    pub fn remove_va(&mut self, va: VirtAddr) -> Option<ResidentPage> {
        let slot = self.find(va)?;
        self.remove(slot)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for ResidentSet {
    fn default() -> Self {
        Self::new()
    }
}
