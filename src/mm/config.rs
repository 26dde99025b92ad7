//! # Configuração do Módulo de Memória
//!
//! Define constantes, limites por processo e a configuração do VM.

use crate::mm::reclaim::policy::ReplacementPolicy;

// =============================================================================
// CONSTANTES DE TAMANHO
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Máscara para alinhar endereços a página
pub const PAGE_MASK: usize = !(PAGE_SIZE - 1);

/// Bits de offset dentro de uma página
pub const PAGE_OFFSET_BITS: usize = 12;

/// Entradas por tabela (diretório e tabela de páginas)
pub const PT_ENTRIES: usize = 512;

/// Bits de índice por nível
pub const PT_INDEX_BITS: usize = 9;

/// Bytes cobertos por uma entrada de diretório (2 MiB)
pub const DIR_SPAN: usize = PT_ENTRIES * PAGE_SIZE;

// =============================================================================
// LAYOUT DE MEMÓRIA VIRTUAL
// =============================================================================
//
// Paginação de dois níveis: 512 entradas de diretório x 512 PTEs x 4 KiB
// cobrem 1 GiB. Usuário fica abaixo de KERNEL_BASE; o kernel é mapeado
// acima, sem PTE_USER, em todo address space.

/// Fim do espaço endereçável
pub const VA_LIMIT: usize = PT_ENTRIES * DIR_SPAN;

/// Início do mapeamento do kernel
pub const KERNEL_BASE: usize = 0x3000_0000;

// =============================================================================
// LIMITES POR PROCESSO
// =============================================================================

/// Páginas residentes (em RAM) por processo
pub const MAX_RESIDENT_PAGES: usize = 16;

/// Páginas rastreadas (residentes + em swap) por processo
pub const MAX_TOTAL_PAGES: usize = 32;

/// Slots de swap por processo
pub const MAX_SWAP_SLOTS: usize = MAX_TOTAL_PAGES - MAX_RESIDENT_PAGES;

/// Processos com pid <= este valor (init e shell) não passam por paging
pub const EXEMPT_PID_MAX: Pid = 2;

/// Identificador de processo
pub type Pid = u64;

/// Processo isento de limites, refcount e substituição de páginas?
#[inline]
pub const fn is_exempt(pid: Pid) -> bool {
    pid <= EXEMPT_PID_MAX
}

// =============================================================================
// FLAGS DE PAGE TABLE
// =============================================================================

/// Presente
pub const PTE_PRESENT: u64 = 1 << 0;

/// Escrita permitida
pub const PTE_WRITABLE: u64 = 1 << 1;

/// Acessível em user mode
pub const PTE_USER: u64 = 1 << 2;

/// Acessada (setado pelo MMU)
pub const PTE_ACCESSED: u64 = 1 << 5;

/// Dirty
pub const PTE_DIRTY: u64 = 1 << 6;

/// Página em swap (bit disponível para software)
pub const PTE_SWAPPED: u64 = 1 << 9;

/// Página copy-on-write (bit disponível para software)
pub const PTE_COW: u64 = 1 << 10;

/// Máscara para extrair endereço físico (ou offset de swap) de PTE
pub const PTE_ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

// =============================================================================
// CONFIGURAÇÃO DO VM
// =============================================================================

/// Configuração lida uma única vez ao construir o `MemoryManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Política de substituição de páginas ativa
    pub policy: ReplacementPolicy,
}

impl VmConfig {
    pub const fn with_policy(policy: ReplacementPolicy) -> Self {
        Self { policy }
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self::with_policy(ReplacementPolicy::SecondChanceFifo)
    }
}

// =============================================================================
// FUNÇÕES UTILITÁRIAS
// =============================================================================

/// Alinha valor para cima ao múltiplo de align
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Alinha valor para baixo ao múltiplo de align
#[inline(always)]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Verifica se valor está alinhado
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_fits_two_level_tables() {
        assert_eq!(VA_LIMIT, 1 << 30);
        assert!(KERNEL_BASE < VA_LIMIT);
        assert!(is_aligned(KERNEL_BASE, DIR_SPAN));
        assert_eq!(MAX_SWAP_SLOTS, 16);
    }

    #[test]
    fn init_and_shell_are_exempt() {
        assert!(is_exempt(1));
        assert!(is_exempt(2));
        assert!(!is_exempt(3));
    }
}
