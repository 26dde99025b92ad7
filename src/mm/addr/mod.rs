//! # Addr - Wrappers Type-Safe para Endereços
//!
//! Tipos distintos para PhysAddr e VirtAddr evitando confusão entre o
//! endereço que o processo enxerga e o frame que o sustenta.

mod phys;
mod virt;

pub use phys::PhysAddr;
pub use virt::VirtAddr;
