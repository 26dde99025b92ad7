//! # Physical Memory Manager (PMM)
//!
//! O VM não conhece a mecânica do alocador de frames: consome apenas
//! alocar/liberar e o acesso ao conteúdo de cada frame (a janela HHDM do
//! kernel). [`PhysicalMemory`] é essa fronteira; [`BitmapFrameAllocator`] é
//! a implementação sobre RAM simulada usada no host e nos testes.

pub mod bitmap;
pub mod frame;

pub use bitmap::BitmapFrameAllocator;
pub use frame::PhysFrame;

use crate::mm::config::PAGE_SIZE;

/// Memória física vista pelo VM.
///
/// Os frames entregues por `allocate_frame` já vêm zerados. Acessar um frame
/// fora da RAM é bug do kernel e causa panic.
pub trait PhysicalMemory: Send {
    /// Aloca um frame zerado, ou `None` se a RAM acabou.
    fn allocate_frame(&mut self) -> Option<PhysFrame>;

    /// Devolve um frame ao alocador.
    fn deallocate_frame(&mut self, frame: PhysFrame);

    /// Conteúdo do frame.
    fn frame(&self, frame: PhysFrame) -> &[u8; PAGE_SIZE];

    /// Conteúdo do frame, mutável.
    fn frame_mut(&mut self, frame: PhysFrame) -> &mut [u8; PAGE_SIZE];

    /// Copia o conteúdo de `src` para `dst`.
    fn copy_frame(&mut self, src: PhysFrame, dst: PhysFrame) {
        let data = *self.frame(src);
        self.frame_mut(dst).copy_from_slice(&data);
    }

    /// Frames ocupados pela imagem do kernel, a partir do frame 0.
    /// Todo address space os mapeia em `KERNEL_BASE`.
    fn reserved_frames(&self) -> usize;

    /// Frames livres no momento.
    fn free_frames(&self) -> usize;
}
