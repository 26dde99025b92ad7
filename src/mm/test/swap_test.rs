//! Testes de swap-in/swap-out

use super::{fill, holds, machine, page, process};
use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::addr::VirtAddr;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::MmError;
use crate::mm::fault::{handle_page_fault, FaultResult, PageFaultInfo};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::BitmapFrameAllocator;
use crate::mm::reclaim::ReplacementPolicy;
use crate::mm::uaccess;
use crate::mm::vmm::{PageState, PteFlags};
use crate::mm::VmConfig;

pub const SWAP_TESTS: &[TestCase] = &[
    TestCase::new("swap_round_trip_keeps_bytes", test_swap_round_trip),
    TestCase::new("every_policy_keeps_contents", test_every_policy_keeps_contents),
    TestCase::new("swap_map_matches_ptes", test_swap_map_matches_ptes),
    TestCase::new("swap_in_keeps_read_only", test_read_only_survives_swap),
    TestCase::new("unaligned_copy_crosses_pages", test_unaligned_copy),
    TestCase::new("swap_in_with_ram_exhausted", test_swap_in_reuses_victim_frame),
];

fn test_swap_round_trip() -> TestResult {
    let mm = machine(ReplacementPolicy::Fifo);
    let mut space = match process(&mm, 3) {
        Some(space) => space,
        None => return TestResult::Failed,
    };

    attempt!(space.grow(&mm, 0, PAGE_SIZE), "(TEST) grow falhou");
    check!(fill(&mut space, &mm, 0, 0xA5), "(TEST) escrita falhou");

    attempt!(space.grow(&mm, PAGE_SIZE, 17 * PAGE_SIZE), "(TEST) grow falhou");
    check!(
        matches!(space.page_state(&mm, page(0)), PageState::Swapped { .. }),
        "(TEST) página 0 não foi evictada"
    );

    check!(holds(&mut space, &mm, 0, 0xA5), "(TEST) conteúdo perdido no swap");
    let stats = space.stats();
    check!(stats.page_faults == 1, "(TEST) swap-in deveria custar uma falta");
    check!(stats.resident_pages == 16, "(TEST) resident != 16");
    check!(stats.swapped_pages == 1, "(TEST) outra página deveria ter saído");
    check!(space.page_state(&mm, page(0)).is_resident(), "(TEST) página 0 não voltou");

    space.destroy(&mm);
    TestResult::Passed
}

fn test_every_policy_keeps_contents() -> TestResult {
    const PAGES: usize = 24;

    for policy in ReplacementPolicy::EVICTING {
        let mm = machine(policy);
        let mut space = match process(&mm, 5) {
            Some(space) => space,
            None => return TestResult::Failed,
        };
        attempt!(space.grow(&mm, 0, PAGES * PAGE_SIZE), "(TEST) grow falhou");

        for n in 0..PAGES {
            check!(fill(&mut space, &mm, n, n as u8 + 1), "(TEST) escrita falhou");
            if n % 4 == 0 {
                space.age_tick(&mm);
            }
        }
        for n in (0..PAGES).rev() {
            check!(holds(&mut space, &mm, n, n as u8 + 1), "(TEST) conteúdo divergente");
        }

        let stats = space.stats();
        check!(stats.resident_pages == 16, "(TEST) resident != 16");
        check!(stats.total_pages == PAGES, "(TEST) total divergente");
        check!(stats.page_outs >= (PAGES - 16) as u64, "(TEST) page_outs baixo");
        space.destroy(&mm);
        check!(mm.frames().tracked() == 0, "(TEST) refcount vazou");
    }
    TestResult::Passed
}

fn test_swap_map_matches_ptes() -> TestResult {
    let mm = machine(ReplacementPolicy::SecondChanceFifo);
    let mut space = match process(&mm, 3) {
        Some(space) => space,
        None => return TestResult::Failed,
    };
    attempt!(space.grow(&mm, 0, 28 * PAGE_SIZE), "(TEST) grow falhou");
    for n in [0, 3, 7, 1, 12] {
        check!(fill(&mut space, &mm, n, 0x11), "(TEST) escrita falhou");
    }

    let mut entries = 0;
    for entry in space.swap_map().iter() {
        entries += 1;
        check!(
            space.page_state(&mm, entry.va)
                == PageState::Swapped {
                    offset: entry.slot.offset()
                },
            "(TEST) PTE não aponta para o slot"
        );
    }
    check!(entries == space.swapped_pages(), "(TEST) contagem de swap divergente");
    check!(entries == 12, "(TEST) deveriam sobrar 12 páginas em swap");
    for (_, resident) in space.resident_set().iter() {
        check!(
            space.page_state(&mm, resident.va).is_resident(),
            "(TEST) resident set aponta para página fora da RAM"
        );
    }

    space.destroy(&mm);
    TestResult::Passed
}

fn test_read_only_survives_swap() -> TestResult {
    let mm = machine(ReplacementPolicy::Fifo);
    let mut space = match process(&mm, 3) {
        Some(space) => space,
        None => return TestResult::Failed,
    };
    attempt!(space.grow(&mm, 0, PAGE_SIZE), "(TEST) grow falhou");
    let table = space.page_table();
    attempt!(
        table.update(&mut *mm.memory(), page(0), |pte| pte
            .without_flags(PteFlags::WRITABLE)),
        "(TEST) PTE ausente"
    );
    attempt!(space.grow(&mm, PAGE_SIZE, 17 * PAGE_SIZE), "(TEST) grow falhou");

    let result = uaccess::copy_to_user(&mut space, &mm, page(0), &[1, 2, 3]);
    check!(result == Err(MmError::ProtectionViolation), "(TEST) write em página RO aceito");
    check!(
        matches!(
            space.page_state(&mm, page(0)),
            PageState::Present {
                writable: false,
                ..
            }
        ),
        "(TEST) swap-in não manteve somente-leitura"
    );
    check!(space.stats().page_faults == 2, "(TEST) esperadas duas faltas");

    space.destroy(&mm);
    TestResult::Passed
}

fn test_unaligned_copy() -> TestResult {
    let mm = machine(ReplacementPolicy::Fifo);
    let mut space = match process(&mm, 3) {
        Some(space) => space,
        None => return TestResult::Failed,
    };
    attempt!(space.grow(&mm, 0, 18 * PAGE_SIZE), "(TEST) grow falhou");

    // Atravessa a fronteira entre a página 0 (em swap) e a 1 (em swap)
    let src = [0x5Au8; 64];
    let at = VirtAddr::from_usize(page(1).as_usize() - 32);
    attempt!(
        uaccess::copy_to_user(&mut space, &mm, at, &src),
        "(TEST) cópia falhou"
    );
    let mut dst = [0u8; 64];
    attempt!(
        uaccess::copy_from_user(&mut space, &mm, at, &mut dst),
        "(TEST) leitura falhou"
    );
    check!(dst == src, "(TEST) bytes divergentes");

    space.destroy(&mm);
    TestResult::Passed
}

fn test_swap_in_reuses_victim_frame() -> TestResult {
    // 19 frames livres: raiz + tabela do kernel + tabela de usuário + 16 páginas
    let mm = MemoryManager::new(
        VmConfig::with_policy(ReplacementPolicy::Fifo),
        BitmapFrameAllocator::new(23, 4),
    );
    let mut space = match process(&mm, 3) {
        Some(space) => space,
        None => return TestResult::Failed,
    };
    attempt!(space.grow(&mm, 0, PAGE_SIZE), "(TEST) grow falhou");
    check!(fill(&mut space, &mm, 0, 0x3C), "(TEST) escrita falhou");
    attempt!(space.grow(&mm, PAGE_SIZE, 17 * PAGE_SIZE), "(TEST) grow falhou");

    check!(mm.free_frames() == 0, "(TEST) RAM deveria estar cheia");
    check!(
        space.page_state(&mm, page(0)) == PageState::Swapped { offset: 0 },
        "(TEST) página 0 não foi evictada"
    );

    let result = handle_page_fault(&mut space, &mm, PageFaultInfo::read(page(0)));
    check!(result == FaultResult::Success, "(TEST) swap-in sem frame livre falhou");
    check!(space.page_state(&mm, page(0)).is_resident(), "(TEST) página 0 não voltou");
    check!(
        matches!(space.page_state(&mm, page(1)), PageState::Swapped { .. }),
        "(TEST) página 1 deveria ceder o frame"
    );
    check!(mm.free_frames() == 0, "(TEST) frame da vítima não foi reaproveitado");
    check!(holds(&mut space, &mm, 0, 0x3C), "(TEST) conteúdo perdido no swap-in");

    let stats = space.stats();
    check!(stats.resident_pages == 16, "(TEST) resident != 16");
    check!(stats.swapped_pages == 1, "(TEST) swapped != 1");
    check!(mm.frames().tracked() == 16, "(TEST) refcounts divergentes");

    space.destroy(&mm);
    check!(mm.free_frames() == 19, "(TEST) destroy não devolveu tudo");
    TestResult::Passed
}
