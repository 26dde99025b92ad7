//! # Memory Management Subsystem (MM)
//!
//! Memória virtual por processo com paginação sob demanda, swap por
//! processo, substituição de páginas configurável e fork copy-on-write.
//!
//! ## Arquitetura dos Módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | `pmm`  | Fronteira com o alocador de frames e RAM simulada (bitmap). |
//! | `pfm`  | Refcount de frames compartilhados (COW). |
//! | `vmm`  | Page table de dois níveis, codificação de PTE, TLB. |
//! | `aspace` | Address space do processo: grow/shrink/fork/destroy. |
//! | `reclaim` | Políticas de substituição, aging e eviction. |
//! | `swap` | Metadados de slot e I/O do arquivo de swap. |
//! | `fault` | Resolução de page faults (swap-in, COW). |
//! | `uaccess` | Cópias kernel <-> usuário. |
//!
//! ## Locks
//!
//! Estado compartilhado entre processos fica no [`MemoryManager`]: a tabela
//! de refcount e a memória física, cada uma atrás de um spinlock. A ordem é
//! sempre `frames` -> `memory`. O address space de cada processo é mutado
//! apenas pelo dono (`&mut AddressSpace`).
//!
//! ## Processos isentos
//!
//! Pids `<= EXEMPT_PID_MAX` (init e shell) não têm limites, refcount nem
//! resident set. Fork envolvendo um deles copia as páginas na hora.

pub mod addr;
pub mod aspace;
pub mod config;
pub mod error;
pub mod fault;
pub mod manager;
pub mod pfm;
pub mod pmm;
pub mod reclaim;
pub mod stats;
pub mod swap;
pub mod test;
pub mod uaccess;
pub mod vmm;

// Re-exports para conveniência
pub use addr::{PhysAddr, VirtAddr};
pub use aspace::{AddressSpace, SpaceStats};
pub use config::{Pid, VmConfig, PAGE_SIZE};
pub use error::{MmError, MmResult};
pub use fault::{handle_page_fault, AccessType, FaultResult, PageFaultInfo};
pub use manager::MemoryManager;
pub use pmm::{BitmapFrameAllocator, PhysFrame, PhysicalMemory};
pub use reclaim::ReplacementPolicy;
pub use swap::{BackingStore, MemorySwapFile, SwapIoError};
pub use uaccess::{copy_from_user, copy_to_user};
pub use vmm::PageState;

#[cfg(feature = "self_test")]
pub use test::run_vm_tests;
