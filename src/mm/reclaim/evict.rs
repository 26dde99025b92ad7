//! # Eviction Engine
//!
//! Tira uma página do resident set de um processo e a grava no arquivo de
//! swap dele. A PTE passa a guardar o offset do slot, sem P.
//!
//! O frame só volta ao PMM quando ninguém mais o referencia: se outro
//! processo ainda compartilha a página (COW), ele continua com a cópia
//! residente.
//!
//! Quem precisa de um frame logo depois (grow, swap-in) usa `take_victim`,
//! que entrega o frame liberado direto ao chamador em vez de passá-lo pelo
//! PMM, e `restore_victim` para desfazer a eviction se o passo seguinte
//! falhar.

use crate::mm::addr::VirtAddr;
use crate::mm::aspace::resident::ResidentSet;
use crate::mm::aspace::AddressSpace;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::{MmError, MmResult};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::{PhysFrame, PhysicalMemory};
use crate::mm::stats::{self, PAGE_OUTS};
use crate::mm::swap;
use crate::mm::vmm::Pte;
use alloc::vec;

/// Página que saiu da RAM, com o que é preciso para trazê-la de volta.
///
/// Se `reclaimed`, o refcount do frame chegou a zero e o frame continua
/// alocado no PMM: passa a ser do chamador, que o reutiliza ou devolve.
pub(crate) struct Eviction {
    pub va: VirtAddr,
    pub frame: PhysFrame,
    pub reclaimed: bool,
    /// PTE da vítima antes da eviction
    pte: Pte,
    /// Resident set antes da escolha da vítima (cursor incluso)
    before: ResidentSet,
}

/// Evicta uma página de `space` escolhida pela política do manager.
///
/// Retorna o endereço virtual da página evictada. `QuotaExceeded` se a
/// política não evicta; `CapacityExceeded` se o swap estiver cheio.
pub fn evict_page<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
) -> MmResult<VirtAddr> {
    let eviction = take_victim(space, mm)?;
    if eviction.reclaimed {
        mm.memory.lock().deallocate_frame(eviction.frame);
    }
    Ok(eviction.va)
}

/// Evicta uma vítima sem devolver o frame ao PMM.
pub(crate) fn take_victim<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
) -> MmResult<Eviction> {
    let policy = mm.policy();
    let selector = match policy.selector() {
        Some(selector) => selector,
        None => {
            crate::kwarn!("(EVICT) Limite residente sem política, pid=", space.pid);
            return Err(MmError::QuotaExceeded);
        }
    };

    let before = space.resident.clone();
    let table = space.table;
    let victim = {
        let mut pmm = mm.memory.lock();
        selector.select_victim(&mut space.resident, &mut |va| {
            table.test_and_clear_accessed(&mut *pmm, va)
        })
    };
    let (slot_index, va) = match victim.and_then(|i| space.resident.get(i).map(|p| (i, p.va))) {
        Some(found) => found,
        None => {
            crate::kerror!("(EVICT) Resident set vazio, pid=", space.pid);
            panic!("(EVICT) nenhuma vítima");
        }
    };

    let mut page = vec![0u8; PAGE_SIZE];
    let pte = space.table.read(&*mm.memory.lock(), va);
    let frame = match pte.state().frame() {
        Some(frame) => frame,
        None => {
            crate::kerror!("(EVICT) Vítima não residente, va=", va.as_u64());
            panic!("(EVICT) vítima sem frame");
        }
    };
    page.copy_from_slice(&mm.memory.lock().frame(frame)[..]);

    let slot = match space.swap.allocate(va) {
        Ok(slot) => slot,
        Err(e) => {
            space.resident = before;
            return Err(e);
        }
    };
    swap::write_page(&mut *space.store, slot, &page);

    let reclaimed = {
        let mut frames = mm.frames.lock();
        let mut pmm = mm.memory.lock();
        let reclaimed = frames.dec(frame) == 0;
        space
            .table
            .write(&mut *pmm, va, Pte::swapped(slot.offset(), pte.flags()));
        reclaimed
    };
    space.tlb.flush_all();
    space.resident.remove(slot_index);
    space.page_outs += 1;
    stats::bump(&PAGE_OUTS);

    crate::kdebug!("(EVICT) Página enviada ao swap, va=", va.as_u64());
    Ok(Eviction {
        va,
        frame,
        reclaimed,
        pte,
        before,
    })
}

/// Desfaz `eviction`: a vítima volta ao frame original com a PTE, o slot
/// de resident set e o contador de page-outs de antes.
///
/// Com `reclaimed`, o frame precisa ainda estar com o chamador; o conteúdo
/// é relido do swap.
pub(crate) fn restore_victim<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    eviction: Eviction,
) {
    let Eviction {
        va,
        frame,
        reclaimed,
        pte,
        before,
    } = eviction;

    let slot = match space.swap.release(va) {
        Some(slot) => slot,
        None => {
            crate::kerror!("(EVICT) Vítima sem slot ao desfazer, va=", va.as_u64());
            panic!("(EVICT) vítima desfeita sem slot");
        }
    };
    if reclaimed {
        let mut page = vec![0u8; PAGE_SIZE];
        swap::read_page(&mut *space.store, slot, &mut page);
        mm.memory.lock().frame_mut(frame).copy_from_slice(&page);
    }
    {
        let mut frames = mm.frames.lock();
        let mut pmm = mm.memory.lock();
        frames.inc(frame);
        space.table.write(&mut *pmm, va, pte);
    }
    space.tlb.flush_all();
    space.resident = before;
    space.page_outs -= 1;

    crate::kdebug!("(EVICT) Eviction desfeita, va=", va.as_u64());
}
