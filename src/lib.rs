//! Forge VM.
//!
//! Núcleo de memória virtual do kernel Forge: espaços de endereçamento por
//! processo, paginação por demanda com swap, políticas de substituição de
//! páginas e fork copy-on-write com contagem de referência de frames.
//!
//! O crate é `no_std` + `alloc`. A memória física e o arquivo de swap são
//! consumidos via traits (`PhysicalMemory`, `BackingStore`), o que permite
//! linkar o mesmo código no kernel e nos testes de host.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (Vec/Box para tabelas e swap)
extern crate alloc;

pub mod core; // Logging e sink do klog
pub mod klib; // Framework de testes do kernel
pub mod mm; // Memória virtual (PMM, VMM, swap, reclaim, fault)

pub use crate::mm::{
    AddressSpace, FaultResult, MemoryManager, MmError, MmResult, PageFaultInfo, PageState,
    ReplacementPolicy, VmConfig,
};
