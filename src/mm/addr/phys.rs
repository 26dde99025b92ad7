use crate::mm::config::{PAGE_OFFSET_BITS, PAGE_SIZE, PTE_ADDR_MASK};
use core::fmt;

/// Endereço físico.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Número do frame (endereço >> 12)
    #[inline]
    pub const fn frame_number(self) -> usize {
        (self.0 >> PAGE_OFFSET_BITS) as usize
    }

    /// Cabe no campo de endereço de uma PTE?
    #[inline]
    pub const fn fits_pte(self) -> bool {
        self.0 & !PTE_ADDR_MASK == 0
    }

    #[inline]
    pub const fn is_page_aligned(self) -> bool {
        self.0 as usize & (PAGE_SIZE - 1) == 0
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
