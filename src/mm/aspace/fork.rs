//! # Fork
//!
//! Processos não isentos compartilham as páginas com o filho via COW: as
//! páginas graváveis do pai perdem o W e ganham o marcador COW, o filho
//! recebe a mesma entrada e o refcount do frame sobe. Páginas em swap são
//! copiadas para o arquivo de swap do filho no mesmo slot.
//!
//! Se pai ou filho for isento, a cópia é imediata (sem refcount).

use super::AddressSpace;
use crate::mm::addr::VirtAddr;
use crate::mm::config::{is_exempt, Pid, MAX_TOTAL_PAGES, PAGE_SIZE};
use crate::mm::error::{MmError, MmResult};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::PhysicalMemory;
use crate::mm::stats::{self, FORKS};
use crate::mm::swap::{self, BackingStore};
use crate::mm::vmm::{PageState, PteFlags};
use alloc::boxed::Box;
use alloc::vec;

impl AddressSpace {
    /// Cria o address space do filho `child_pid` a partir deste.
    pub fn fork<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        child_pid: Pid,
        child_store: Box<dyn BackingStore>,
    ) -> MmResult<AddressSpace> {
        stats::bump(&FORKS);
        let child = if self.is_exempt() || is_exempt(child_pid) {
            self.eager_copy(mm, child_pid, child_store)
        } else {
            self.cow_fork(mm, child_pid, child_store)
        };
        match &child {
            Ok(_) => crate::kdebug!("(ASPACE) fork ok, filho=", child_pid),
            Err(e) => {
                crate::kwarn!("(ASPACE) fork falhou, filho=", child_pid);
                crate::klog!("     ");
                crate::klog!(e.as_str());
                crate::knl!();
            }
        }
        child
    }

    /// Páginas mapeadas (residentes ou em swap) em `[0, size)`.
    fn mapped_pages<M: PhysicalMemory>(&self, mm: &MemoryManager<M>) -> usize {
        let pmm = mm.memory.lock();
        (0..self.size)
            .step_by(PAGE_SIZE)
            .filter(|&va| !self.table.read(&*pmm, VirtAddr::from_usize(va)).is_empty())
            .count()
    }

    /// Cópia imediata de cada página do pai para frames novos do filho.
    pub fn eager_copy<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        child_pid: Pid,
        child_store: Box<dyn BackingStore>,
    ) -> MmResult<AddressSpace> {
        let mut child = AddressSpace::new(mm, child_pid, child_store)?;
        if !child.is_exempt() && self.mapped_pages(mm) > MAX_TOTAL_PAGES {
            child.destroy(mm);
            return Err(MmError::QuotaExceeded);
        }

        let mut page = vec![0u8; PAGE_SIZE];
        let mut va = 0;
        while va < self.size {
            let addr = VirtAddr::from_usize(va);
            va += PAGE_SIZE;

            let pte = self.table.read(&*mm.memory.lock(), addr);
            match pte.state() {
                PageState::Absent => continue,
                PageState::Present { frame, .. } | PageState::CopyOnWrite { frame } => {
                    page.copy_from_slice(&mm.memory.lock().frame(frame)[..]);
                }
                PageState::Swapped { offset } => {
                    swap::read_page(
                        &mut *self.store,
                        swap::SwapSlot::from_offset(offset),
                        &mut page,
                    );
                }
            }

            let mut flags = pte.flags() & PteFlags::PERMISSIONS;
            if flags.contains(PteFlags::COW) {
                flags = (flags - PteFlags::COW) | PteFlags::WRITABLE;
            }
            match child.map_user_page(mm, addr, flags) {
                Ok((frame, _)) => mm.memory.lock().frame_mut(frame).copy_from_slice(&page),
                Err(e) => {
                    child.destroy(mm);
                    return Err(e);
                }
            }
        }

        child.size = self.size;
        Ok(child)
    }

    /// Fork COW: nenhum frame é copiado.
    ///
    /// Pai e filho precisam ser não isentos (isentos não têm refcount);
    /// [`fork`](Self::fork) escolhe o caminho certo.
    pub fn cow_fork<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        child_pid: Pid,
        child_store: Box<dyn BackingStore>,
    ) -> MmResult<AddressSpace> {
        let mut child = AddressSpace::new(mm, child_pid, child_store)?;
        child.resident = self.resident.clone();
        child.swap = self.swap.clone();
        child.size = self.size;

        let shared = {
            let mut frames = mm.frames.lock();
            let mut pmm = mm.memory.lock();
            let mut result = Ok(());
            let mut va = 0;
            while va < self.size {
                let addr = VirtAddr::from_usize(va);
                va += PAGE_SIZE;

                let pte = self.table.read(&*pmm, addr);
                let child_pte = match pte.state() {
                    PageState::Absent => continue,
                    PageState::Present { frame, writable: true } => {
                        let cow = pte.without_flags(PteFlags::WRITABLE).with_flags(PteFlags::COW);
                        self.table.write(&mut *pmm, addr, cow);
                        frames.inc(frame);
                        cow.without_flags(PteFlags::ACCESSED | PteFlags::DIRTY)
                    }
                    PageState::Present { frame, .. } | PageState::CopyOnWrite { frame } => {
                        frames.inc(frame);
                        pte.without_flags(PteFlags::ACCESSED | PteFlags::DIRTY)
                    }
                    PageState::Swapped { .. } => pte,
                };
                if let Err(e) = child.table.install(&mut *pmm, addr, child_pte) {
                    // A entrada não chegou ao filho: devolve a referência
                    if let Some(frame) = child_pte.state().frame() {
                        frames.dec(frame);
                    }
                    result = Err(e);
                    break;
                }
            }
            result
        };
        self.tlb.flush_all();

        if let Err(e) = shared {
            // O filho só libera o que de fato foi instalado
            child.resident.clear();
            child.swap.clear();
            child.destroy(mm);
            return Err(e);
        }

        let mut page = vec![0u8; PAGE_SIZE];
        for entry in self.swap.iter() {
            swap::read_page(&mut *self.store, entry.slot, &mut page);
            swap::write_page(&mut *child.store, entry.slot, &page);
        }

        Ok(child)
    }
}
