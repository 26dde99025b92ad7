//! # PTE - Fronteira entre o formato de hardware e o estado lógico
//!
//! O resto do VM raciocina sobre [`PageState`]; apenas este arquivo sabe
//! como presença, swap e COW são empacotados no `u64` da entrada.
//!
//! Codificação:
//!
//! ```text
//! Present     : addr(frame) | P | flags
//! CopyOnWrite : addr(frame) | P | COW        (W limpo)
//! Swapped     : offset      | SWAPPED | U | [W] | [COW]   (P limpo)
//! Absent      : 0
//! ```
//!
//! Uma entrada em swap guarda o offset do slot no campo de endereço e mantém
//! os bits de permissão (U, W, COW) para que o swap-in restaure as
//! permissões. Com P limpo o hardware ignora o W.

use crate::mm::addr::PhysAddr;
use crate::mm::config::{
    PTE_ACCESSED, PTE_ADDR_MASK, PTE_COW, PTE_DIRTY, PTE_PRESENT, PTE_SWAPPED, PTE_USER,
    PTE_WRITABLE,
};
use crate::mm::pmm::PhysFrame;
use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// Bits de flag de uma PTE.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PteFlags: u64 {
        const PRESENT = PTE_PRESENT;
        const WRITABLE = PTE_WRITABLE;
        const USER = PTE_USER;
        const ACCESSED = PTE_ACCESSED;
        const DIRTY = PTE_DIRTY;
        const SWAPPED = PTE_SWAPPED;
        const COW = PTE_COW;
    }
}

impl PteFlags {
    /// Bits que descrevem a intenção de acesso do processo.
    pub const PERMISSIONS: Self = Self::USER.union(Self::WRITABLE).union(Self::COW);
}

/// Estado lógico de uma página virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Nada mapeado
    Absent,
    /// Frame residente, possivelmente gravável
    Present { frame: PhysFrame, writable: bool },
    /// Frame residente compartilhado, somente-leitura até o primeiro write
    CopyOnWrite { frame: PhysFrame },
    /// Conteúdo no arquivo de swap do processo
    Swapped { offset: u64 },
}

impl PageState {
    /// Frame residente, se houver.
    pub fn frame(&self) -> Option<PhysFrame> {
        match *self {
            Self::Present { frame, .. } | Self::CopyOnWrite { frame } => Some(frame),
            Self::Absent | Self::Swapped { .. } => None,
        }
    }

    pub fn is_resident(&self) -> bool {
        self.frame().is_some()
    }
}

/// Entrada de page table como o hardware a enxerga.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Pte(u64);

impl Pte {
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    #[inline]
    pub fn is_present(self) -> bool {
        self.flags().contains(PteFlags::PRESENT)
    }

    #[inline]
    pub const fn addr(self) -> PhysAddr {
        PhysAddr::new(self.0 & PTE_ADDR_MASK)
    }

    #[inline]
    pub const fn frame(self) -> PhysFrame {
        PhysFrame::containing_address(self.addr())
    }

    /// Entrada presente apontando para `frame`. PRESENT é sempre incluído.
    pub fn mapped(frame: PhysFrame, flags: PteFlags) -> Self {
        let addr = frame.start_address();
        debug_assert!(addr.fits_pte());
        let flags = (flags | PteFlags::PRESENT) - PteFlags::SWAPPED;
        Self(addr.as_u64() | flags.bits())
    }

    /// Entrada em swap no `offset`, herdando as permissões de `perms`.
    pub fn swapped(offset: u64, perms: PteFlags) -> Self {
        debug_assert!(offset & !PTE_ADDR_MASK == 0);
        let flags = (perms & PteFlags::PERMISSIONS) | PteFlags::SWAPPED;
        Self(offset | flags.bits())
    }

    #[inline]
    pub fn with_flags(self, flags: PteFlags) -> Self {
        Self(self.0 | flags.bits())
    }

    #[inline]
    pub fn without_flags(self, flags: PteFlags) -> Self {
        Self(self.0 & !flags.bits())
    }

    /// Decodifica a entrada.
    pub fn state(self) -> PageState {
        let flags = self.flags();
        if flags.contains(PteFlags::PRESENT) {
            if flags.contains(PteFlags::COW) {
                PageState::CopyOnWrite { frame: self.frame() }
            } else {
                PageState::Present {
                    frame: self.frame(),
                    writable: flags.contains(PteFlags::WRITABLE),
                }
            }
        } else if flags.contains(PteFlags::SWAPPED) {
            PageState::Swapped {
                offset: self.addr().as_u64(),
            }
        } else {
            PageState::Absent
        }
    }
}

impl fmt::Debug for Pte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pte({:#x}, {:?})", self.addr().as_u64(), self.flags())
    }
}
