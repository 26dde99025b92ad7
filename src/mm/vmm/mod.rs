//! # Virtual Memory Manager (VMM)
//!
//! - `pte`: formato da entrada e seu estado lógico (`PageState`)
//! - `mapper`: page table de dois níveis sobre frames do PMM
//! - `tlb`: flush por address space

pub mod mapper;
pub mod pte;
pub mod tlb;

pub use mapper::PageTable;
pub use pte::{PageState, Pte, PteFlags};
pub use tlb::{TlbGeneration, TLB_STATS};
