//! # Testes do Subsistema de Memória
//!
//! Suites de cenário do VM, escritas com o framework do kernel:
//! - `scenario_test.rs` - Limites, eviction e quota
//! - `swap_test.rs` - Round-trip de swap e todas as políticas
//! - `cow_test.rs` - Fork COW, isolamento e refcount
//!
//! Com `self_test` elas rodam dentro do kernel via [`run_vm_tests`]. No
//! host, cada caso também vira um `#[test]` (ver `bridge`).

use crate::klib::test_framework::{run_test_suite, SuiteReport};
use crate::mm::addr::VirtAddr;
use crate::mm::aspace::AddressSpace;
use crate::mm::config::{Pid, PAGE_SIZE};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::{BitmapFrameAllocator, PhysFrame};
use crate::mm::reclaim::ReplacementPolicy;
use crate::mm::swap::MemorySwapFile;
use crate::mm::{uaccess, VmConfig};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;

/// Falha o caso se a condição não vale.
macro_rules! check {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            crate::kerror!($msg);
            return TestResult::Failed;
        }
    };
}

/// Desembrulha um `MmResult`, falhando o caso em `Err`.
macro_rules! attempt {
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(value) => value,
            Err(_) => {
                crate::kerror!($msg);
                return TestResult::Failed;
            }
        }
    };
}

pub mod swap_test;

#[cfg(test)]
mod prop_test;

/// Frames da RAM simulada de cada cenário
pub(crate) const TEST_FRAMES: usize = 256;

/// Frames da imagem do kernel
pub(crate) const TEST_KERNEL_FRAMES: usize = 4;

pub(crate) type TestMachine = MemoryManager<BitmapFrameAllocator>;

/// RAM nova com a política dada.
pub(crate) fn machine(policy: ReplacementPolicy) -> TestMachine {
    MemoryManager::new(
        VmConfig::with_policy(policy),
        BitmapFrameAllocator::new(TEST_FRAMES, TEST_KERNEL_FRAMES),
    )
}

/// Address space vazio com arquivo de swap em memória.
pub(crate) fn process(mm: &TestMachine, pid: Pid) -> Option<AddressSpace> {
    AddressSpace::new(mm, pid, Box::new(MemorySwapFile::new())).ok()
}

/// Endereço da n-ésima página de usuário
pub(crate) const fn page(n: usize) -> VirtAddr {
    VirtAddr::from_usize(n * PAGE_SIZE)
}

/// Grava `byte` na página `n` inteira.
pub(crate) fn fill(space: &mut AddressSpace, mm: &TestMachine, n: usize, byte: u8) -> bool {
    let data = [byte; PAGE_SIZE];
    uaccess::copy_to_user(space, mm, page(n), &data).is_ok()
}

/// A página `n` inteira contém `byte`?
pub(crate) fn holds(space: &mut AddressSpace, mm: &TestMachine, n: usize, byte: u8) -> bool {
    let mut data = [0u8; PAGE_SIZE];
    uaccess::copy_from_user(space, mm, page(n), &mut data).is_ok()
        && data.iter().all(|&b| b == byte)
}

/// Refcount de cada frame = PTEs que o mapeiam nos address spaces dados
/// (todos os não isentos vivos).
pub(crate) fn refcounts_consistent(mm: &TestMachine, spaces: &[&AddressSpace]) -> bool {
    let mut expected: BTreeMap<PhysFrame, u32> = BTreeMap::new();
    for space in spaces.iter().filter(|s| !s.is_exempt()) {
        for va in (0..space.size()).step_by(PAGE_SIZE) {
            if let Some(frame) = space.page_state(mm, VirtAddr::from_usize(va)).frame() {
                *expected.entry(frame).or_insert(0) += 1;
            }
        }
    }
    mm.frames().snapshot().into_iter().eq(expected)
}

/// Executa todas as suites do VM.
pub fn run_vm_tests() -> SuiteReport {
    crate::kinfo!("(MM) Executando testes do VM...");
    let mut report = SuiteReport::default();
    report.merge(run_test_suite("vm_scenarios", scenario_test::SCENARIO_TESTS));
    report.merge(run_test_suite("vm_swap", swap_test::SWAP_TESTS));
    report.merge(run_test_suite("vm_cow", cow_test::COW_TESTS));
    if report.all_passed() {
        crate::kok!("(MM) Testes do VM concluídos");
    } else {
        crate::kfail!("(MM) Testes do VM com falhas");
    }
    report
}

#[cfg(test)]
mod bridge {
    use super::*;
    use crate::klib::test_framework::{TestCase, TestResult};

    fn run_each(tests: &[TestCase]) {
        for test in tests {
            assert_eq!((test.func)(), TestResult::Passed, "{}", test.name);
        }
    }

    #[test]
    fn scenario_suite() {
        run_each(scenario_test::SCENARIO_TESTS);
    }

    #[test]
    fn swap_suite() {
        run_each(swap_test::SWAP_TESTS);
    }

    #[test]
    fn cow_suite() {
        run_each(cow_test::COW_TESTS);
    }

    #[test]
    fn processes_on_many_threads_share_one_manager() {
        use std::sync::Arc;
        use std::thread;

        let mm = Arc::new(machine(ReplacementPolicy::SecondChanceFifo));
        let free = mm.free_frames();

        let workers: std::vec::Vec<_> = (0..4u64)
            .map(|i| {
                let mm = Arc::clone(&mm);
                thread::spawn(move || {
                    let mut parent = process(&mm, 10 + 2 * i).unwrap();
                    parent.grow(&mm, 0, 20 * PAGE_SIZE).unwrap();
                    for n in 0..20 {
                        assert!(fill(&mut parent, &mm, n, i as u8 + n as u8));
                    }
                    let mut child = parent
                        .fork(&mm, 11 + 2 * i, Box::new(MemorySwapFile::new()))
                        .unwrap();
                    for n in 0..20 {
                        assert!(fill(&mut child, &mm, n, 0xF0));
                        assert!(holds(&mut parent, &mm, n, i as u8 + n as u8));
                    }
                    child.destroy(&mm);
                    parent.destroy(&mm);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(mm.frames().tracked(), 0);
        assert_eq!(mm.free_frames(), free);
    }

    #[test]
    fn full_run_reports_no_failures() {
        let report = run_vm_tests();
        assert!(report.all_passed());
        assert_eq!(
            report.passed,
            scenario_test::SCENARIO_TESTS.len()
                + swap_test::SWAP_TESTS.len()
                + cow_test::COW_TESTS.len()
        );
    }
}
