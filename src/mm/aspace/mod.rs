//! # Address Space Manager
//!
//! Um [`AddressSpace`] por processo: a page table (exclusiva), o tamanho
//! válido da imagem de usuário, o resident set, os metadados e o arquivo de
//! swap, e os contadores do processo.
//!
//! Processos não isentos (pid > 2) obedecem aos limites de
//! `MAX_RESIDENT_PAGES` residentes e `MAX_TOTAL_PAGES` rastreadas, e seus
//! frames entram na tabela de refcount. Os isentos (init e shell) não
//! passam por nada disso: frames são exclusivos e liberados direto.
//!
//! Toda mudança de presença/permissão numa PTE termina com flush do TLB do
//! address space antes de a operação retornar.

pub mod fork;
pub mod resident;

use crate::mm::addr::{PhysAddr, VirtAddr};
use crate::mm::config::{
    align_down, align_up, is_exempt, Pid, DIR_SPAN, KERNEL_BASE, MAX_RESIDENT_PAGES,
    MAX_TOTAL_PAGES, PAGE_SIZE, VA_LIMIT,
};
use crate::mm::error::{MmError, MmResult};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::{PhysFrame, PhysicalMemory};
use crate::mm::reclaim::evict::{self, Eviction};
use crate::mm::reclaim::aging;
use crate::mm::swap::{BackingStore, SwapMap};
use crate::mm::vmm::{PageState, PageTable, Pte, PteFlags, TlbGeneration};
use alloc::boxed::Box;
use alloc::vec::Vec;
use resident::{ResidentPage, ResidentSet};

/// Contadores de um processo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceStats {
    /// Páginas em RAM (<= 16)
    pub resident_pages: usize,
    /// Páginas no arquivo de swap
    pub swapped_pages: usize,
    /// Residentes + em swap (<= 32)
    pub total_pages: usize,
    /// Page faults recebidos
    pub page_faults: u64,
    /// Páginas enviadas ao swap
    pub page_outs: u64,
}

pub struct AddressSpace {
    pub(crate) pid: Pid,
    pub(crate) table: PageTable,
    /// Tamanho válido da imagem de usuário, em bytes
    pub(crate) size: usize,
    pub(crate) resident: ResidentSet,
    pub(crate) swap: SwapMap,
    pub(crate) store: Box<dyn BackingStore>,
    pub(crate) page_faults: u64,
    pub(crate) page_outs: u64,
    pub(crate) tlb: TlbGeneration,
}

impl AddressSpace {
    /// Cria o address space de `pid` com os mapeamentos do kernel
    /// (frames reservados em `KERNEL_BASE`, sem acesso de usuário).
    pub fn new<M: PhysicalMemory>(
        mm: &MemoryManager<M>,
        pid: Pid,
        store: Box<dyn BackingStore>,
    ) -> MmResult<Self> {
        let mut pmm = mm.memory.lock();
        let kernel_bytes = pmm.reserved_frames() * PAGE_SIZE;
        if KERNEL_BASE + kernel_bytes > VA_LIMIT {
            crate::kerror!("(ASPACE) Imagem do kernel não cabe, bytes=", kernel_bytes);
            return Err(MmError::InvalidAddress);
        }

        let table = PageTable::new(&mut *pmm)?;
        if kernel_bytes > 0 {
            if let Err(e) = table.map_range(
                &mut *pmm,
                VirtAddr::from_usize(KERNEL_BASE),
                kernel_bytes,
                PhysAddr::new(0),
                PteFlags::WRITABLE,
            ) {
                table.free(&mut *pmm);
                return Err(e);
            }
        }
        drop(pmm);

        crate::kdebug!("(ASPACE) Criado para pid=", pid);
        Ok(Self {
            pid,
            table,
            size: 0,
            resident: ResidentSet::new(),
            swap: SwapMap::new(),
            store,
            page_faults: 0,
            page_outs: 0,
            tlb: TlbGeneration::new(),
        })
    }

    // =========================================================================
    // CONSULTAS
    // =========================================================================

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Tamanho da imagem de usuário em bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_exempt(&self) -> bool {
        is_exempt(self.pid)
    }

    pub fn resident_pages(&self) -> usize {
        self.resident.len()
    }

    pub fn swapped_pages(&self) -> usize {
        self.swap.len()
    }

    pub fn total_pages(&self) -> usize {
        self.resident.len() + self.swap.len()
    }

    pub fn stats(&self) -> SpaceStats {
        SpaceStats {
            resident_pages: self.resident_pages(),
            swapped_pages: self.swapped_pages(),
            total_pages: self.total_pages(),
            page_faults: self.page_faults,
            page_outs: self.page_outs,
        }
    }

    pub fn page_table(&self) -> PageTable {
        self.table
    }

    pub fn resident_set(&self) -> &ResidentSet {
        &self.resident
    }

    pub fn swap_map(&self) -> &SwapMap {
        &self.swap
    }

    /// Geração atual do TLB do address space
    pub fn tlb_generation(&self) -> u64 {
        self.tlb.current()
    }

    pub fn flush_tlb(&self) {
        self.tlb.flush_all();
    }

    /// Estado lógico da página que contém `va`.
    pub fn page_state<M: PhysicalMemory>(&self, mm: &MemoryManager<M>, va: VirtAddr) -> PageState {
        self.table.read(&*mm.memory.lock(), va.page_base()).state()
    }

    /// Endereço físico de `va`, se a página estiver residente.
    pub fn translate<M: PhysicalMemory>(
        &self,
        mm: &MemoryManager<M>,
        va: VirtAddr,
    ) -> Option<PhysAddr> {
        let frame = self.page_state(mm, va).frame()?;
        Some(PhysAddr::new(
            frame.start_address().as_u64() + va.page_offset() as u64,
        ))
    }

    // =========================================================================
    // MAPEAMENTO
    // =========================================================================

    /// Mapeia `[va, va + size)` em frames consecutivos a partir de `phys`,
    /// sem contagem de referência nem resident set (dispositivos, janelas
    /// do kernel). Só aceita endereços em `[KERNEL_BASE, VA_LIMIT)`: a faixa
    /// de usuário pertence a `grow`/`shrink`.
    ///
    /// PTE já ocupada: panic.
    pub fn map_range<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        va: VirtAddr,
        size: usize,
        phys: PhysAddr,
        perm: PteFlags,
    ) -> MmResult<()> {
        if va.as_usize() < KERNEL_BASE || va.as_usize() + size > VA_LIMIT {
            return Err(MmError::InvalidAddress);
        }
        let mut pmm = mm.memory.lock();
        self.table.map_range(&mut *pmm, va, size, phys, perm)?;
        drop(pmm);
        self.tlb.flush_all();
        Ok(())
    }

    /// Aloca, zera e mapeia um frame novo em `va`, abrindo espaço no
    /// resident set se necessário.
    ///
    /// Com o set cheio a vítima sai primeiro e, se era a última referência
    /// ao frame, o próprio frame dela é reaproveitado. Em erro nada muda:
    /// a eviction feita aqui é desfeita. Em sucesso, a eviction (se houve)
    /// é retornada para que o chamador possa desfazer a página inteira.
    pub(crate) fn map_user_page<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        va: VirtAddr,
        flags: PteFlags,
    ) -> MmResult<(PhysFrame, Option<Eviction>)> {
        let exempt = self.is_exempt();
        let eviction = if !exempt && self.resident.len() >= MAX_RESIDENT_PAGES {
            Some(evict::take_victim(self, mm)?)
        } else {
            None
        };

        let reused = eviction.as_ref().filter(|ev| ev.reclaimed).map(|ev| ev.frame);
        let frame = match reused {
            Some(frame) => {
                mm.memory.lock().frame_mut(frame).fill(0);
                frame
            }
            None => {
                let allocated = mm.memory.lock().allocate_frame();
                match allocated {
                    Some(frame) => frame,
                    None => {
                        if let Some(ev) = eviction {
                            evict::restore_victim(self, mm, ev);
                        }
                        return Err(MmError::OutOfMemory);
                    }
                }
            }
        };

        let installed = {
            let mut frames = mm.frames.lock();
            let mut pmm = mm.memory.lock();
            let installed = self.table.install(&mut *pmm, va, Pte::mapped(frame, flags));
            match installed {
                Ok(()) if !exempt => {
                    frames.inc(frame);
                }
                Ok(()) => {}
                Err(_) if reused.is_none() => pmm.deallocate_frame(frame),
                Err(_) => {}
            }
            installed
        };
        if let Err(e) = installed {
            if let Some(ev) = eviction {
                evict::restore_victim(self, mm, ev);
            }
            return Err(e);
        }

        if !exempt {
            let policy = mm.policy();
            let page = ResidentPage::new(va, policy.initial_counter());
            if let Err(e) = policy.admit(&mut self.resident, page) {
                self.release_page(mm, va);
                return Err(e);
            }
        }
        crate::ktrace!("(ASPACE) Página mapeada em va=", va.as_u64());
        Ok((frame, eviction))
    }

    /// Desfaz um `map_user_page` bem-sucedido: a página nova sai e a vítima
    /// evictada por ele volta ao lugar.
    fn unmap_user_page<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        va: VirtAddr,
        eviction: Option<Eviction>,
    ) {
        match eviction {
            Some(ev) if ev.reclaimed => {
                // O frame da página nova é o da vítima: fica alocado e volta a ela
                {
                    let mut frames = mm.frames.lock();
                    let mut pmm = mm.memory.lock();
                    self.table.take(&mut *pmm, va);
                    frames.dec(ev.frame);
                }
                self.resident.remove_va(va);
                evict::restore_victim(self, mm, ev);
            }
            Some(ev) => {
                self.release_page(mm, va);
                evict::restore_victim(self, mm, ev);
            }
            None => self.release_page(mm, va),
        }
    }

    /// Desmapeia a página `va`, devolvendo frame ou slot de swap.
    pub(crate) fn release_page<M: PhysicalMemory>(&mut self, mm: &MemoryManager<M>, va: VirtAddr) {
        let exempt = self.is_exempt();
        let mut frames = mm.frames.lock();
        let mut pmm = mm.memory.lock();
        match self.table.take(&mut *pmm, va).state() {
            PageState::Absent => {}
            PageState::Present { frame, .. } | PageState::CopyOnWrite { frame } => {
                if exempt || frames.dec(frame) == 0 {
                    pmm.deallocate_frame(frame);
                }
                self.resident.remove_va(va);
            }
            PageState::Swapped { .. } => {
                self.swap.release(va);
            }
        }
    }

    /// Desmapeia todas as páginas de `[start, end)`, pulando regiões do
    /// diretório sem tabela.
    fn release_range<M: PhysicalMemory>(&mut self, mm: &MemoryManager<M>, start: usize, end: usize) {
        let mut va = start;
        while va < end {
            let addr = VirtAddr::from_usize(va);
            let has_table = self.table.has_table(&*mm.memory.lock(), addr);
            if !has_table {
                va = align_down(va, DIR_SPAN) + DIR_SPAN;
                continue;
            }
            self.release_page(mm, addr);
            va += PAGE_SIZE;
        }
    }

    // =========================================================================
    // CRESCER / ENCOLHER / DESTRUIR
    // =========================================================================

    /// Cresce a imagem de `old_size` para `new_size` bytes.
    ///
    /// Para processos não isentos, o total de páginas rastreadas é checado
    /// antes de tocar em qualquer coisa. Atingido o limite residente, a
    /// política evicta uma página por página nova. Se faltar memória no
    /// meio do caminho, tudo que esta chamada fez é desfeito em ordem
    /// inversa, evictions inclusive.
    pub fn grow<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        old_size: usize,
        new_size: usize,
    ) -> MmResult<usize> {
        if new_size >= KERNEL_BASE {
            crate::kwarn!("(ASPACE) grow além do espaço de usuário:", new_size);
            return Err(MmError::InvalidAddress);
        }
        if new_size < old_size {
            return Ok(old_size);
        }

        let first = align_up(old_size, PAGE_SIZE);
        let pages = align_up(new_size, PAGE_SIZE).saturating_sub(first) / PAGE_SIZE;
        if !self.is_exempt() && self.total_pages() + pages > MAX_TOTAL_PAGES {
            crate::kwarn!("(ASPACE) Quota de páginas excedida, pid=", self.pid);
            return Err(MmError::QuotaExceeded);
        }

        let resident_before = self.resident.clone();
        let mut mapped: Vec<(VirtAddr, Option<Eviction>)> = Vec::with_capacity(pages);
        for i in 0..pages {
            let va = VirtAddr::from_usize(first + i * PAGE_SIZE);
            match self.map_user_page(mm, va, PteFlags::USER | PteFlags::WRITABLE) {
                Ok((_, eviction)) => mapped.push((va, eviction)),
                Err(e) => {
                    crate::kwarn!("(ASPACE) grow falhou, desfazendo até va=", va.as_u64());
                    while let Some((va, eviction)) = mapped.pop() {
                        self.unmap_user_page(mm, va, eviction);
                    }
                    self.resident = resident_before;
                    self.tlb.flush_all();
                    return Err(e);
                }
            }
        }

        self.size = new_size;
        Ok(new_size)
    }

    /// Encolhe a imagem de `old_size` para `new_size` bytes.
    pub fn shrink<M: PhysicalMemory>(
        &mut self,
        mm: &MemoryManager<M>,
        old_size: usize,
        new_size: usize,
    ) -> usize {
        if new_size >= old_size {
            return old_size;
        }
        self.release_range(mm, align_up(new_size, PAGE_SIZE), old_size);
        self.tlb.flush_all();
        self.size = new_size;
        new_size
    }

    /// Libera toda a memória de usuário, o arquivo de swap e a page table.
    pub fn destroy<M: PhysicalMemory>(mut self, mm: &MemoryManager<M>) {
        self.release_range(mm, 0, KERNEL_BASE);
        self.tlb.flush_all();
        self.table.free(&mut *mm.memory.lock());
        crate::kdebug!("(ASPACE) Destruído pid=", self.pid);
    }

    // =========================================================================
    // AGING
    // =========================================================================

    /// Tick de aging: desloca os contadores e incorpora o bit Accessed.
    pub fn age_tick<M: PhysicalMemory>(&mut self, mm: &MemoryManager<M>) {
        let table = self.table;
        let mut pmm = mm.memory.lock();
        aging::age_tick(&mut self.resident, &mut |va| {
            table.test_and_clear_accessed(&mut *pmm, va)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::config::VmConfig;
    use crate::mm::pmm::BitmapFrameAllocator;
    use crate::mm::reclaim::ReplacementPolicy;
    use crate::mm::swap::MemorySwapFile;

    fn machine() -> MemoryManager<BitmapFrameAllocator> {
        MemoryManager::new(
            VmConfig::with_policy(ReplacementPolicy::Fifo),
            BitmapFrameAllocator::new(64, 4),
        )
    }

    #[test]
    fn new_space_maps_kernel_without_user_bit() {
        let mm = machine();
        let space = AddressSpace::new(&mm, 3, Box::new(MemorySwapFile::new())).unwrap();
        for i in 0..4 {
            let va = VirtAddr::from_usize(KERNEL_BASE + i * PAGE_SIZE);
            let pte = space.table.read(&*mm.memory(), va);
            assert_eq!(pte.frame(), PhysFrame::from_number(i));
            assert!(pte.flags().contains(PteFlags::WRITABLE));
            assert!(!pte.flags().contains(PteFlags::USER));
        }
        assert_eq!(space.stats(), SpaceStats::default());
        space.destroy(&mm);
        assert_eq!(mm.free_frames(), 60);
    }

    #[test]
    fn map_range_above_kernel_image() {
        let mm = machine();
        let mut space = AddressSpace::new(&mm, 3, Box::new(MemorySwapFile::new())).unwrap();
        let window = VirtAddr::from_usize(KERNEL_BASE + 0x10_0000);
        let phys = PhysFrame::from_number(2).start_address();

        space
            .map_range(&mm, window, 2 * PAGE_SIZE, phys, PteFlags::empty())
            .unwrap();
        assert_eq!(
            space.translate(&mm, window.add(PAGE_SIZE + 5)),
            Some(PhysAddr::new(3 * PAGE_SIZE as u64 + 5))
        );
        assert_eq!(
            space.map_range(&mm, VirtAddr::new(0), PAGE_SIZE, phys, PteFlags::USER),
            Err(MmError::InvalidAddress)
        );
        space.destroy(&mm);
    }

    #[test]
    #[should_panic(expected = "remap")]
    fn map_range_over_kernel_image_panics() {
        let mm = machine();
        let mut space = AddressSpace::new(&mm, 3, Box::new(MemorySwapFile::new())).unwrap();
        let _ = space.map_range(
            &mm,
            VirtAddr::from_usize(KERNEL_BASE),
            PAGE_SIZE,
            PhysAddr::new(0),
            PteFlags::WRITABLE,
        );
    }

    #[test]
    fn shrink_to_larger_size_is_a_no_op() {
        let mm = machine();
        let mut space = AddressSpace::new(&mm, 3, Box::new(MemorySwapFile::new())).unwrap();
        space.grow(&mm, 0, 3 * PAGE_SIZE).unwrap();
        assert_eq!(space.shrink(&mm, 3 * PAGE_SIZE, 5 * PAGE_SIZE), 3 * PAGE_SIZE);
        assert_eq!(space.grow(&mm, 3 * PAGE_SIZE, PAGE_SIZE), Ok(3 * PAGE_SIZE));
        assert_eq!(space.resident_pages(), 3);

        // Encolher no meio de uma página mantém a página
        space.shrink(&mm, 3 * PAGE_SIZE, PAGE_SIZE + 1);
        assert_eq!(space.resident_pages(), 2);
        assert_eq!(space.size(), PAGE_SIZE + 1);
        space.destroy(&mm);
    }
}
