use crate::mm::config::{
    align_down, align_up, KERNEL_BASE, PAGE_OFFSET_BITS, PAGE_SIZE, PT_ENTRIES, PT_INDEX_BITS,
};
use core::fmt;

/// Endereço virtual de um processo.
///
/// Decomposto em dois índices de 9 bits (diretório e tabela) e um offset
/// de 12 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(u64);

impl VirtAddr {
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn from_usize(addr: usize) -> Self {
        Self(addr as u64)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Base da página que contém este endereço
    #[inline]
    pub const fn page_base(self) -> Self {
        Self(align_down(self.0 as usize, PAGE_SIZE) as u64)
    }

    /// Próximo limite de página (ou o próprio endereço, se alinhado)
    #[inline]
    pub const fn page_round_up(self) -> Self {
        Self(align_up(self.0 as usize, PAGE_SIZE) as u64)
    }

    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 as usize & (PAGE_SIZE - 1)
    }

    /// Índice no diretório (primeiro nível)
    #[inline]
    pub const fn dir_index(self) -> usize {
        (self.0 as usize >> (PAGE_OFFSET_BITS + PT_INDEX_BITS)) & (PT_ENTRIES - 1)
    }

    /// Índice na tabela de páginas (segundo nível)
    #[inline]
    pub const fn table_index(self) -> usize {
        (self.0 as usize >> PAGE_OFFSET_BITS) & (PT_ENTRIES - 1)
    }

    /// Abaixo do mapeamento do kernel?
    #[inline]
    pub const fn is_user(self) -> bool {
        (self.0 as usize) < KERNEL_BASE
    }

    #[inline]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0 + offset as u64)
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#x})", self.0)
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_directory_and_table_indices() {
        let va = VirtAddr::new((3 << 21) | (7 << 12) | 0x123);
        assert_eq!(va.dir_index(), 3);
        assert_eq!(va.table_index(), 7);
        assert_eq!(va.page_offset(), 0x123);
        assert_eq!(va.page_base().as_u64(), (3 << 21) | (7 << 12));
        assert_eq!(va.page_round_up().as_u64(), (3 << 21) | (8 << 12));
    }

    #[test]
    fn kernel_base_is_not_user() {
        assert!(VirtAddr::from_usize(KERNEL_BASE - 1).is_user());
        assert!(!VirtAddr::from_usize(KERNEL_BASE).is_user());
    }
}
