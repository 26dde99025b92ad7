//! Mapper: page table de dois níveis
//!
//! Diretório (512 entradas) -> tabela (512 PTEs) -> página de 4 KiB. As
//! tabelas vivem em frames do PMM e as entradas são `u64` little-endian
//! lidos pela janela de memória física.
//!
//! Entradas de diretório têm P|W|U: a permissão efetiva fica na PTE.
//! Tabelas intermediárias são alocadas sob demanda e só são liberadas por
//! [`PageTable::free`].

use super::pte::{Pte, PteFlags};
use crate::mm::addr::{PhysAddr, VirtAddr};
use crate::mm::config::{align_down, align_up, PAGE_SIZE, PT_ENTRIES};
use crate::mm::error::{MmError, MmResult};
use crate::mm::pmm::{PhysFrame, PhysicalMemory};

const ENTRY_BYTES: usize = 8;

/// Flags de uma entrada de diretório
const DIR_FLAGS: PteFlags = PteFlags::PRESENT
    .union(PteFlags::WRITABLE)
    .union(PteFlags::USER);

#[inline]
fn read_entry<M: PhysicalMemory + ?Sized>(pmm: &M, table: PhysFrame, index: usize) -> Pte {
    let off = index * ENTRY_BYTES;
    let mut raw = [0u8; ENTRY_BYTES];
    raw.copy_from_slice(&pmm.frame(table)[off..off + ENTRY_BYTES]);
    Pte::from_raw(u64::from_le_bytes(raw))
}

#[inline]
fn write_entry<M: PhysicalMemory + ?Sized>(pmm: &mut M, table: PhysFrame, index: usize, pte: Pte) {
    let off = index * ENTRY_BYTES;
    pmm.frame_mut(table)[off..off + ENTRY_BYTES].copy_from_slice(&pte.raw().to_le_bytes());
}

/// Page table de um processo. Possui apenas o frame raiz; o conteúdo está
/// na memória física.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTable {
    root: PhysFrame,
}

impl PageTable {
    /// Aloca um diretório vazio.
    pub fn new<M: PhysicalMemory + ?Sized>(pmm: &mut M) -> MmResult<Self> {
        let root = pmm.allocate_frame().ok_or(MmError::OutOfMemory)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> PhysFrame {
        self.root
    }

    /// Tabela de segundo nível que cobre `va`, se existir.
    fn table_for<M: PhysicalMemory + ?Sized>(&self, pmm: &M, va: VirtAddr) -> Option<PhysFrame> {
        let dir = read_entry(pmm, self.root, va.dir_index());
        dir.is_present().then(|| dir.frame())
    }

    /// Tabela que cobre `va`, criando-a se necessário.
    fn table_for_or_create<M: PhysicalMemory + ?Sized>(
        &self,
        pmm: &mut M,
        va: VirtAddr,
    ) -> MmResult<PhysFrame> {
        if let Some(table) = self.table_for(pmm, va) {
            return Ok(table);
        }
        let table = pmm.allocate_frame().ok_or(MmError::OutOfMemory)?;
        write_entry(pmm, self.root, va.dir_index(), Pte::mapped(table, DIR_FLAGS));
        crate::ktrace!("(VMM) Nova tabela para dir=", va.dir_index());
        Ok(table)
    }

    /// O diretório tem tabela para a região de `va`?
    pub fn has_table<M: PhysicalMemory + ?Sized>(&self, pmm: &M, va: VirtAddr) -> bool {
        self.table_for(pmm, va).is_some()
    }

    /// PTE de `va`, ou `Pte::EMPTY` quando não há tabela.
    pub fn read<M: PhysicalMemory + ?Sized>(&self, pmm: &M, va: VirtAddr) -> Pte {
        match self.table_for(pmm, va) {
            Some(table) => read_entry(pmm, table, va.table_index()),
            None => Pte::EMPTY,
        }
    }

    /// Sobrescreve a PTE de `va`.
    ///
    /// Só é usado sobre entradas que acabaram de ser lidas como não vazias;
    /// tabela ausente aqui é corrupção da page table.
    pub fn write<M: PhysicalMemory + ?Sized>(&self, pmm: &mut M, va: VirtAddr, pte: Pte) {
        match self.table_for(pmm, va) {
            Some(table) => write_entry(pmm, table, va.table_index(), pte),
            None => {
                crate::kerror!("(VMM) Escrita em PTE sem tabela, va=", va.as_u64());
                panic!("(VMM) PTE sem tabela");
            }
        }
    }

    /// Esvazia a PTE de `va` e retorna o valor antigo (`EMPTY` se não há
    /// tabela).
    pub fn take<M: PhysicalMemory + ?Sized>(&self, pmm: &mut M, va: VirtAddr) -> Pte {
        match self.table_for(pmm, va) {
            Some(table) => {
                let old = read_entry(pmm, table, va.table_index());
                write_entry(pmm, table, va.table_index(), Pte::EMPTY);
                old
            }
            None => Pte::EMPTY,
        }
    }

    /// Instala `pte` numa entrada vazia, criando a tabela se necessário.
    ///
    /// Entrada já ocupada é remap: bug do kernel, panic.
    pub fn install<M: PhysicalMemory + ?Sized>(
        &self,
        pmm: &mut M,
        va: VirtAddr,
        pte: Pte,
    ) -> MmResult<()> {
        let table = self.table_for_or_create(pmm, va)?;
        let index = va.table_index();
        if !read_entry(pmm, table, index).is_empty() {
            crate::kerror!("(VMM) Remap em va=", va.as_u64());
            panic!("(VMM) remap: PTE já ocupada");
        }
        write_entry(pmm, table, index, pte);
        Ok(())
    }

    /// Mapeia `[round_down(va), round_up(va + size))` em frames físicos
    /// consecutivos a partir de `phys`.
    ///
    /// Falha de alocação de tabela é `OutOfMemory`; as páginas já mapeadas
    /// pela chamada permanecem mapeadas.
    pub fn map_range<M: PhysicalMemory + ?Sized>(
        &self,
        pmm: &mut M,
        va: VirtAddr,
        size: usize,
        phys: PhysAddr,
        flags: PteFlags,
    ) -> MmResult<()> {
        if !phys.is_page_aligned() {
            return Err(MmError::NotAligned);
        }
        let start = align_down(va.as_usize(), PAGE_SIZE);
        let end = align_up(va.as_usize() + size, PAGE_SIZE);
        let first = PhysFrame::containing_address(phys);

        for (i, page) in (start..end).step_by(PAGE_SIZE).enumerate() {
            self.install(
                pmm,
                VirtAddr::from_usize(page),
                Pte::mapped(first.add(i), flags),
            )?;
        }
        Ok(())
    }

    /// Aplica `f` à PTE de `va` e grava o resultado. Retorna a PTE antiga.
    pub fn update<M, F>(&self, pmm: &mut M, va: VirtAddr, f: F) -> MmResult<Pte>
    where
        M: PhysicalMemory + ?Sized,
        F: FnOnce(Pte) -> Pte,
    {
        let table = self.table_for(pmm, va).ok_or(MmError::NotMapped)?;
        let old = read_entry(pmm, table, va.table_index());
        write_entry(pmm, table, va.table_index(), f(old));
        Ok(old)
    }

    /// Lê e limpa o bit Accessed de uma página presente.
    pub fn test_and_clear_accessed<M: PhysicalMemory + ?Sized>(
        &self,
        pmm: &mut M,
        va: VirtAddr,
    ) -> bool {
        match self.update(pmm, va, |pte| pte.without_flags(PteFlags::ACCESSED)) {
            Ok(old) => old.is_present() && old.flags().contains(PteFlags::ACCESSED),
            Err(_) => false,
        }
    }

    /// Libera todas as tabelas e o diretório. As páginas de usuário devem
    /// ter sido desmapeadas antes; frames do kernel não são tocados.
    pub fn free<M: PhysicalMemory + ?Sized>(self, pmm: &mut M) {
        for index in 0..PT_ENTRIES {
            let dir = read_entry(pmm, self.root, index);
            if dir.is_present() {
                pmm.deallocate_frame(dir.frame());
            }
        }
        pmm.deallocate_frame(self.root);
    }

    /// Número de tabelas de segundo nível alocadas.
    pub fn table_count<M: PhysicalMemory + ?Sized>(&self, pmm: &M) -> usize {
        (0..PT_ENTRIES)
            .filter(|&i| read_entry(pmm, self.root, i).is_present())
            .count()
    }
}
