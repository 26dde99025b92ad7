//! # Memory Manager
//!
//! Contexto do VM compartilhado por todos os processos: a configuração, a
//! tabela de refcount de frames e a memória física.
//!
//! Cada processo muta apenas o próprio `AddressSpace` (`&mut`); o estado
//! compartilhado fica aqui atrás de spinlocks. Ordem de locks: `frames`
//! antes de `memory`.

use crate::mm::config::VmConfig;
use crate::mm::pfm::FrameTable;
use crate::mm::pmm::PhysicalMemory;
use crate::mm::reclaim::policy::ReplacementPolicy;
use spin::{Mutex, MutexGuard};

pub struct MemoryManager<M: PhysicalMemory> {
    config: VmConfig,
    pub(crate) frames: FrameTable,
    pub(crate) memory: Mutex<M>,
}

impl<M: PhysicalMemory> MemoryManager<M> {
    pub fn new(config: VmConfig, memory: M) -> Self {
        crate::kinfo!("(MM) Inicializando VM, política:");
        crate::klog!("     ");
        crate::klog!(config.policy.as_str());
        crate::knl!();
        Self {
            config,
            frames: FrameTable::new(),
            memory: Mutex::new(memory),
        }
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    /// Política de substituição ativa (fixa durante a vida do manager)
    pub fn policy(&self) -> ReplacementPolicy {
        self.config.policy
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    /// Acesso direto à memória física. Não segurar o guard enquanto chama
    /// operações de address space.
    pub fn memory(&self) -> MutexGuard<'_, M> {
        self.memory.lock()
    }

    pub fn free_frames(&self) -> usize {
        self.memory.lock().free_frames()
    }

    /// Devolve a memória física, consumindo o manager.
    pub fn into_memory(self) -> M {
        self.memory.into_inner()
    }
}
