//! # Page Frame Manager (PFM)
//!
//! Contagem de referência por frame físico. Um frame de usuário pode estar
//! mapeado por vários address spaces depois de um fork COW; ele só volta ao
//! PMM quando a última PTE que aponta para ele desaparece.
//!
//! Invariante: fora de uma operação em andamento, `count(F)` é o número de
//! PTEs Present/COW que apontam para `F` em todos os processos não isentos.
//!
//! Toda leitura-modificação-escrita passa pelo lock. Sequências compostas
//! (o "count > 1 ⇒ copiar ⇒ decrementar" do COW) usam [`FrameTable::lock`]
//! para segurar o lock durante a sequência inteira.
//!
//! Ordem de locks: `FrameTable` antes da memória física, nunca o inverso.

use crate::mm::pmm::PhysFrame;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// Tabela de refcount dos frames de usuário.
///
/// Frames ausentes do mapa têm contagem zero.
pub struct FrameTable {
    refs: Mutex<BTreeMap<PhysFrame, u32>>,
}

/// Acesso exclusivo à tabela enquanto vivo.
pub struct FrameTableGuard<'a> {
    refs: MutexGuard<'a, BTreeMap<PhysFrame, u32>>,
}

impl FrameTable {
    pub const fn new() -> Self {
        Self {
            refs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Adquire o lock para uma sequência atômica de operações.
    pub fn lock(&self) -> FrameTableGuard<'_> {
        FrameTableGuard {
            refs: self.refs.lock(),
        }
    }

    pub fn inc(&self, frame: PhysFrame) -> u32 {
        self.lock().inc(frame)
    }

    pub fn dec(&self, frame: PhysFrame) -> u32 {
        self.lock().dec(frame)
    }

    pub fn count(&self, frame: PhysFrame) -> u32 {
        self.lock().count(frame)
    }

    pub fn set(&self, frame: PhysFrame, count: u32) {
        self.lock().set(frame, count)
    }

    /// Número de frames com contagem > 0
    pub fn tracked(&self) -> usize {
        self.refs.lock().len()
    }

    /// Cópia ordenada de (frame, contagem), para diagnóstico.
    pub fn snapshot(&self) -> Vec<(PhysFrame, u32)> {
        self.refs.lock().iter().map(|(f, c)| (*f, *c)).collect()
    }
}

impl Default for FrameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTableGuard<'_> {
    /// Incrementa e retorna a nova contagem.
    pub fn inc(&mut self, frame: PhysFrame) -> u32 {
        let count = self.refs.entry(frame).or_insert(0);
        *count += 1;
        *count
    }

    /// Decrementa e retorna a nova contagem. Ao chegar em zero o frame sai
    /// da tabela e o chamador deve devolvê-lo ao PMM.
    ///
    /// Decrementar um frame com contagem zero é corrupção: panic.
    pub fn dec(&mut self, frame: PhysFrame) -> u32 {
        let remaining = match self.refs.get_mut(&frame) {
            Some(count) if *count > 0 => {
                *count -= 1;
                *count
            }
            _ => {
                crate::kerror!("(PFM) Refcount negativo:", frame.start_address().as_u64());
                panic!("(PFM) refcount underflow");
            }
        };
        if remaining == 0 {
            self.refs.remove(&frame);
        }
        remaining
    }

    pub fn count(&self, frame: PhysFrame) -> u32 {
        self.refs.get(&frame).copied().unwrap_or(0)
    }

    pub fn set(&mut self, frame: PhysFrame, count: u32) {
        if count == 0 {
            self.refs.remove(&frame);
        } else {
            self.refs.insert(frame, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_follows_inc_and_dec() {
        let table = FrameTable::new();
        let f = PhysFrame::from_number(9);
        assert_eq!(table.count(f), 0);
        assert_eq!(table.inc(f), 1);
        assert_eq!(table.inc(f), 2);
        assert_eq!(table.dec(f), 1);
        assert_eq!(table.dec(f), 0);
        assert_eq!(table.tracked(), 0);
    }

    #[test]
    #[should_panic(expected = "refcount underflow")]
    fn dec_below_zero_panics() {
        let table = FrameTable::new();
        table.dec(PhysFrame::from_number(1));
    }

    #[test]
    fn guard_keeps_compound_update_atomic() {
        let table = FrameTable::new();
        let old = PhysFrame::from_number(4);
        let new = PhysFrame::from_number(5);
        table.set(old, 2);
        {
            let mut refs = table.lock();
            if refs.count(old) > 1 {
                refs.dec(old);
                refs.set(new, 1);
            }
        }
        assert_eq!(table.snapshot(), alloc::vec![(old, 1), (new, 1)]);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let table = std::sync::Arc::new(FrameTable::new());
        let f = PhysFrame::from_number(3);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        table.inc(f);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(table.count(f), 4000);
    }
}
