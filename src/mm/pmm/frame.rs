use crate::mm::addr::PhysAddr;
use crate::mm::config::PAGE_SIZE;
use core::fmt;

/// Um frame de memória física (tamanho fixo PAGE_SIZE = 4KiB)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysFrame {
    start_address: PhysAddr,
}

impl PhysFrame {
    /// Frame de número `n` (endereço `n * PAGE_SIZE`)
    #[inline]
    pub const fn from_number(n: usize) -> Self {
        Self {
            start_address: PhysAddr::new((n * PAGE_SIZE) as u64),
        }
    }

    /// Frame que contém o endereço físico dado
    #[inline]
    pub const fn containing_address(addr: PhysAddr) -> Self {
        Self::from_number(addr.frame_number())
    }

    #[inline]
    pub const fn start_address(&self) -> PhysAddr {
        self.start_address
    }

    #[inline]
    pub const fn number(&self) -> usize {
        self.start_address.frame_number()
    }

    /// Frame `count` posições adiante
    #[inline]
    pub const fn add(&self, count: usize) -> Self {
        Self::from_number(self.number() + count)
    }
}

impl fmt::Debug for PhysFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysFrame({:#x})", self.start_address.as_u64())
    }
}
