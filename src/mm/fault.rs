//! # Page Fault Handler
//!
//! Resolve as faltas que o VM consegue tratar sozinho:
//!
//! - PTE em swap: traz a página de volta (swap-in), evictando outra se o
//!   resident set estiver cheio.
//! - Write em página COW: copia o frame compartilhado ou, se esta é a
//!   última referência, apenas devolve o W.
//!
//! O resto (endereço sem mapeamento, processo isento, violação de
//! proteção) volta como [`FaultResult`] para o kernel decidir.

use crate::mm::addr::VirtAddr;
use crate::mm::aspace::resident::ResidentPage;
use crate::mm::aspace::AddressSpace;
use crate::mm::config::{KERNEL_BASE, MAX_RESIDENT_PAGES, PAGE_SIZE};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::{PhysFrame, PhysicalMemory};
use crate::mm::reclaim::evict;
use crate::mm::stats::{self, COW_COPIES, COW_FAULTS, PAGE_FAULTS, SWAP_INS};
use crate::mm::swap;
use crate::mm::vmm::{PageState, Pte, PteFlags};
use alloc::vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultResult {
    Success,
    OutOfMemory,
    ProtectionViolation,
    InvalidAddress,
    BeyondLimit,
    FatalError,
}

#[derive(Debug, Clone, Copy)]
pub struct PageFaultInfo {
    pub addr: VirtAddr,
    pub access: AccessType,
    pub user_mode: bool,
}

impl PageFaultInfo {
    /// Decodifica o error code de page fault (bit 1 = write, bit 2 = user).
    pub fn from_error_code(addr: u64, error_code: u64) -> Self {
        let access = if error_code & 0x02 != 0 {
            AccessType::Write
        } else {
            AccessType::Read
        };
        Self {
            addr: VirtAddr::new(addr),
            access,
            user_mode: error_code & 0x04 != 0,
        }
    }

    pub fn read(addr: VirtAddr) -> Self {
        Self {
            addr,
            access: AccessType::Read,
            user_mode: true,
        }
    }

    pub fn write(addr: VirtAddr) -> Self {
        Self {
            addr,
            access: AccessType::Write,
            user_mode: true,
        }
    }
}

pub fn handle_page_fault<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    info: PageFaultInfo,
) -> FaultResult {
    space.page_faults += 1;
    stats::bump(&PAGE_FAULTS);

    let va = info.addr.page_base();
    if va.as_usize() >= KERNEL_BASE {
        crate::kwarn!("(FAULT) Acesso além do espaço de usuário:", info.addr.as_u64());
        return FaultResult::BeyondLimit;
    }
    if space.is_exempt() {
        return FaultResult::InvalidAddress;
    }

    let pte = space.table.read(&*mm.memory.lock(), va);
    match (pte.state(), info.access) {
        (PageState::Absent, _) => {
            crate::ktrace!("(FAULT) Sem mapeamento em va=", info.addr.as_u64());
            FaultResult::InvalidAddress
        }
        (PageState::Swapped { .. }, _) => swap_in(space, mm, va, pte),
        (PageState::CopyOnWrite { frame }, AccessType::Write) => {
            resolve_cow(space, mm, va, pte, frame)
        }
        (PageState::Present { writable: false, .. }, AccessType::Write) => {
            crate::kwarn!("(FAULT) Write em página somente-leitura, va=", info.addr.as_u64());
            FaultResult::ProtectionViolation
        }
        // Falta numa página presente com acesso permitido
        (PageState::CopyOnWrite { .. }, AccessType::Read) | (PageState::Present { .. }, _) => {
            crate::kerror!("(FAULT) Falta em página presente, va=", info.addr.as_u64());
            FaultResult::FatalError
        }
    }
}

/// Traz `va` do arquivo de swap para um frame novo.
///
/// O slot é lido e liberado antes da eviction, que assim sempre tem slot
/// livre; o frame vem depois dela, podendo ser o da própria vítima. Sem
/// frame, a eviction é desfeita e `va` volta ao seu slot.
fn swap_in<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    va: VirtAddr,
    pte: Pte,
) -> FaultResult {
    let slot = match space.swap.find(va) {
        Some(slot) => slot,
        None => {
            crate::kerror!("(SWAP) PTE em swap sem metadado, va=", va.as_u64());
            panic!("(SWAP) página em swap sem slot");
        }
    };

    let mut page = vec![0u8; PAGE_SIZE];
    swap::read_page(&mut *space.store, slot, &mut page);
    space.swap.release(va);

    let eviction = if space.resident.len() >= MAX_RESIDENT_PAGES {
        match evict::take_victim(space, mm) {
            Ok(eviction) => Some(eviction),
            Err(_) => {
                crate::kwarn!("(FAULT) Sem vítima para swap-in, va=", va.as_u64());
                return_to_swap(space, va, slot, &page);
                return FaultResult::OutOfMemory;
            }
        }
    } else {
        None
    };

    let reused = eviction.as_ref().filter(|ev| ev.reclaimed).map(|ev| ev.frame);
    let frame = match reused {
        Some(frame) => frame,
        None => {
            let allocated = mm.memory.lock().allocate_frame();
            match allocated {
                Some(frame) => frame,
                None => {
                    crate::kwarn!("(FAULT) Sem frame para swap-in, va=", va.as_u64());
                    if let Some(ev) = eviction {
                        evict::restore_victim(space, mm, ev);
                    }
                    return_to_swap(space, va, slot, &page);
                    return FaultResult::OutOfMemory;
                }
            }
        }
    };
    mm.memory.lock().frame_mut(frame).copy_from_slice(&page);

    let mut perms = pte.flags() & PteFlags::PERMISSIONS;
    if perms.contains(PteFlags::COW) {
        // A cópia em swap é exclusiva do processo
        perms = (perms - PteFlags::COW) | PteFlags::WRITABLE;
    }
    {
        let mut frames = mm.frames.lock();
        let mut pmm = mm.memory.lock();
        frames.set(frame, 1);
        space.table.write(&mut *pmm, va, Pte::mapped(frame, perms));
    }

    let policy = mm.policy();
    if let Err(e) = policy.admit(
        &mut space.resident,
        ResidentPage::new(va, policy.initial_counter()),
    ) {
        crate::kerror!("(FAULT) Resident set cheio após eviction, va=", va.as_u64());
        panic!("(FAULT) admissão falhou no swap-in: {}", e);
    }
    space.tlb.flush_all();
    stats::bump(&SWAP_INS);

    crate::kdebug!("(SWAP) Página trazida do swap, va=", va.as_u64());
    FaultResult::Success
}

/// Devolve `va` ao slot de onde saiu, regravando o conteúdo.
fn return_to_swap(space: &mut AddressSpace, va: VirtAddr, slot: swap::SwapSlot, page: &[u8]) {
    if space.swap.claim(slot, va).is_err() {
        crate::kerror!("(SWAP) Slot ocupado ao devolver va=", va.as_u64());
        panic!("(SWAP) slot de origem ocupado");
    }
    swap::write_page(&mut *space.store, slot, page);
}

/// Write numa página COW.
fn resolve_cow<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    va: VirtAddr,
    pte: Pte,
    frame: PhysFrame,
) -> FaultResult {
    {
        let mut frames = mm.frames.lock();
        let mut pmm = mm.memory.lock();

        let mut target = frame;
        if frames.count(frame) > 1 {
            target = match pmm.allocate_frame() {
                Some(copy) => copy,
                None => {
                    crate::kwarn!("(COW) Sem frame para cópia, va=", va.as_u64());
                    return FaultResult::OutOfMemory;
                }
            };
            pmm.copy_frame(frame, target);
            frames.dec(frame);
            frames.set(target, 1);
            stats::bump(&COW_COPIES);
            crate::ktrace!("(COW) Frame copiado para va=", va.as_u64());
        }

        let mut flags = pte.flags() | PteFlags::WRITABLE | PteFlags::PRESENT;
        if frames.count(target) == 1 {
            flags -= PteFlags::COW;
        }
        space.table.write(&mut *pmm, va, Pte::mapped(target, flags));
    }
    space.tlb.flush_all();
    stats::bump(&COW_FAULTS);
    FaultResult::Success
}
