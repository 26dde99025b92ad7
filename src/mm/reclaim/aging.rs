//! # Page Aging
//!
//! A cada tick do timer, o contador de cada página residente desloca um bit
//! para a direita e recebe o bit Accessed da PTE no bit 31; o bit Accessed
//! é limpo em seguida. NFUA e LAPA escolhem a vítima por esse contador.

use crate::mm::addr::VirtAddr;
use crate::mm::aspace::resident::ResidentSet;
use core::sync::atomic::{AtomicU64, Ordering};

/// Páginas envelhecidas (total)
pub static PAGES_AGED: AtomicU64 = AtomicU64::new(0);

/// Bit que marca acesso no último intervalo
pub const AGE_MSB: u32 = 1 << 31;

/// Envelhece todas as páginas do set. `accessed` lê e limpa o bit da PTE.
pub fn age_tick(set: &mut ResidentSet, accessed: &mut dyn FnMut(VirtAddr) -> bool) {
    let mut aged = 0;
    for page in set.iter_mut() {
        page.counter >>= 1;
        if accessed(page.va) {
            page.counter |= AGE_MSB;
        }
        aged += 1;
    }
    PAGES_AGED.fetch_add(aged, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::aspace::resident::ResidentPage;

    #[test]
    fn accessed_pages_gain_the_top_bit() {
        let mut set = ResidentSet::new();
        let hot = VirtAddr::new(0x1000);
        let cold = VirtAddr::new(0x2000);
        set.insert(ResidentPage::new(hot, 0b100)).unwrap();
        set.insert(ResidentPage::new(cold, 0b100)).unwrap();

        age_tick(&mut set, &mut |va| va == hot);

        assert_eq!(set.get(0).unwrap().counter, AGE_MSB | 0b10);
        assert_eq!(set.get(1).unwrap().counter, 0b10);
    }
}
