//! Testes de propriedade: sequências aleatórias de grow/shrink/fork/exit e
//! acessos mantêm refcount, limites e conteúdo coerentes.

use super::{machine, process, refcounts_consistent, TestMachine};
use crate::mm::addr::VirtAddr;
use crate::mm::aspace::AddressSpace;
use crate::mm::config::{MAX_RESIDENT_PAGES, MAX_TOTAL_PAGES, PAGE_SIZE};
use crate::mm::error::MmError;
use crate::mm::reclaim::ReplacementPolicy;
use crate::mm::swap::MemorySwapFile;
use crate::mm::uaccess;
use alloc::boxed::Box;
use alloc::vec::Vec;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Grow(usize, usize),
    Shrink(usize, usize),
    Write(usize, usize, u8),
    Read(usize, usize),
    Fork(usize),
    Exit(usize),
    Tick(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), 1usize..8).prop_map(|(s, n)| Op::Grow(s, n)),
        1 => (any::<usize>(), 1usize..6).prop_map(|(s, n)| Op::Shrink(s, n)),
        4 => (any::<usize>(), any::<usize>(), any::<u8>()).prop_map(|(s, p, b)| Op::Write(s, p, b)),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(s, p)| Op::Read(s, p)),
        1 => any::<usize>().prop_map(Op::Fork),
        1 => any::<usize>().prop_map(Op::Exit),
        1 => any::<usize>().prop_map(Op::Tick),
    ]
}

/// Processo e o byte esperado em cada página
struct Proc {
    space: AddressSpace,
    shadow: Vec<u8>,
}

fn check_invariants(mm: &TestMachine, procs: &[Proc]) -> Result<(), TestCaseError> {
    for p in procs {
        let stats = p.space.stats();
        prop_assert!(stats.resident_pages <= MAX_RESIDENT_PAGES);
        prop_assert!(stats.total_pages <= MAX_TOTAL_PAGES);
        prop_assert_eq!(stats.total_pages, p.shadow.len());
        prop_assert_eq!(stats.swapped_pages, p.space.swap_map().len());
        prop_assert_eq!(p.space.size(), p.shadow.len() * PAGE_SIZE);
    }
    let spaces: Vec<&AddressSpace> = procs.iter().map(|p| &p.space).collect();
    prop_assert!(refcounts_consistent(mm, &spaces));
    Ok(())
}

fn run(policy: ReplacementPolicy, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mm = machine(policy);
    let free = mm.free_frames();
    let mut next_pid = 4;
    let mut procs = Vec::new();
    procs.push(Proc {
        space: process(&mm, 3).ok_or_else(|| TestCaseError::fail("sem address space"))?,
        shadow: Vec::new(),
    });

    for op in ops {
        match op {
            Op::Grow(s, n) => {
                let i = s % procs.len();
                let p = &mut procs[i];
                let old = p.space.size();
                match p.space.grow(&mm, old, old + n * PAGE_SIZE) {
                    Ok(_) => p.shadow.resize(p.shadow.len() + n, 0),
                    Err(MmError::QuotaExceeded) => {
                        prop_assert!(p.shadow.len() + n > MAX_TOTAL_PAGES);
                    }
                    Err(e) => return Err(TestCaseError::fail(alloc::format!("grow: {:?}", e))),
                }
            }
            Op::Shrink(s, n) => {
                let i = s % procs.len();
                let p = &mut procs[i];
                let keep = p.shadow.len().saturating_sub(n);
                let old = p.space.size();
                p.space.shrink(&mm, old, keep * PAGE_SIZE);
                p.shadow.truncate(keep);
            }
            Op::Write(s, page, byte) => {
                let i = s % procs.len();
                let p = &mut procs[i];
                if p.shadow.is_empty() {
                    continue;
                }
                let page = page % p.shadow.len();
                let data = [byte; PAGE_SIZE];
                let va = VirtAddr::from_usize(page * PAGE_SIZE);
                prop_assert_eq!(uaccess::copy_to_user(&mut p.space, &mm, va, &data), Ok(()));
                p.shadow[page] = byte;
            }
            Op::Read(s, page) => {
                let i = s % procs.len();
                let p = &mut procs[i];
                if p.shadow.is_empty() {
                    continue;
                }
                let page = page % p.shadow.len();
                let mut data = [0u8; PAGE_SIZE];
                let va = VirtAddr::from_usize(page * PAGE_SIZE);
                prop_assert_eq!(uaccess::copy_from_user(&mut p.space, &mm, va, &mut data), Ok(()));
                prop_assert!(data.iter().all(|&b| b == p.shadow[page]));
            }
            Op::Fork(s) => {
                if procs.len() >= 4 {
                    continue;
                }
                let i = s % procs.len();
                let p = &mut procs[i];
                let child = p.space.fork(&mm, next_pid, Box::new(MemorySwapFile::new()));
                prop_assert!(child.is_ok());
                let shadow = p.shadow.clone();
                if let Ok(space) = child {
                    procs.push(Proc { space, shadow });
                }
                next_pid += 1;
            }
            Op::Exit(s) => {
                if procs.len() == 1 {
                    continue;
                }
                let i = s % procs.len();
                let p = procs.remove(i);
                p.space.destroy(&mm);
            }
            Op::Tick(s) => {
                let i = s % procs.len();
                let p = &mut procs[i];
                p.space.age_tick(&mm);
            }
        }
        check_invariants(&mm, &procs)?;
    }

    for p in procs {
        p.space.destroy(&mm);
    }
    prop_assert_eq!(mm.frames().tracked(), 0);
    prop_assert_eq!(mm.free_frames(), free);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_workloads_keep_vm_consistent(
        policy in 0usize..ReplacementPolicy::EVICTING.len(),
        ops in prop::collection::vec(arb_op(), 1..60),
    ) {
        run(ReplacementPolicy::EVICTING[policy], ops)?;
    }
}
