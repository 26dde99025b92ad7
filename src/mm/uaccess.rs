//! # User Memory Access
//!
//! Cópias kernel <-> usuário que percorrem a page table como a MMU faria:
//! página presente com U e permissão compatível é acessada direto (marcando
//! Accessed, e Dirty no write); qualquer outra coisa passa pelo fault
//! handler e a página é tentada de novo.

use crate::mm::addr::VirtAddr;
use crate::mm::aspace::AddressSpace;
use crate::mm::config::PAGE_SIZE;
use crate::mm::error::{MmError, MmResult};
use crate::mm::fault::{handle_page_fault, AccessType, FaultResult, PageFaultInfo};
use crate::mm::manager::MemoryManager;
use crate::mm::pmm::{PhysFrame, PhysicalMemory};
use crate::mm::vmm::PteFlags;

/// Tentativas por página (swap-in seguido de COW gasta duas faltas)
const MAX_ATTEMPTS: usize = 3;

/// Copia `src` para o endereço de usuário `va`.
pub fn copy_to_user<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    va: VirtAddr,
    src: &[u8],
) -> MmResult<()> {
    let mut done = 0;
    while done < src.len() {
        let addr = va.add(done);
        let offset = addr.page_offset();
        let chunk = (PAGE_SIZE - offset).min(src.len() - done);

        let frame = resolve(space, mm, addr, AccessType::Write)?;
        mm.memory.lock().frame_mut(frame)[offset..offset + chunk]
            .copy_from_slice(&src[done..done + chunk]);
        done += chunk;
    }
    Ok(())
}

/// Copia do endereço de usuário `va` para `dst`.
pub fn copy_from_user<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    va: VirtAddr,
    dst: &mut [u8],
) -> MmResult<()> {
    let mut done = 0;
    while done < dst.len() {
        let addr = va.add(done);
        let offset = addr.page_offset();
        let chunk = (PAGE_SIZE - offset).min(dst.len() - done);

        let frame = resolve(space, mm, addr, AccessType::Read)?;
        dst[done..done + chunk]
            .copy_from_slice(&mm.memory.lock().frame(frame)[offset..offset + chunk]);
        done += chunk;
    }
    Ok(())
}

/// Frame acessível de `va` para `access`, resolvendo faltas no caminho.
fn resolve<M: PhysicalMemory>(
    space: &mut AddressSpace,
    mm: &MemoryManager<M>,
    va: VirtAddr,
    access: AccessType,
) -> MmResult<PhysFrame> {
    let page = va.page_base();
    for _ in 0..MAX_ATTEMPTS {
        {
            let mut pmm = mm.memory.lock();
            let pte = space.table.read(&*pmm, page);
            if pte.is_present() {
                let flags = pte.flags();
                if !flags.contains(PteFlags::USER) {
                    return Err(MmError::InvalidAddress);
                }
                let allowed = match access {
                    AccessType::Read => true,
                    AccessType::Write => flags.contains(PteFlags::WRITABLE),
                };
                if allowed {
                    let mark = match access {
                        AccessType::Read => PteFlags::ACCESSED,
                        AccessType::Write => PteFlags::ACCESSED | PteFlags::DIRTY,
                    };
                    space.table.update(&mut *pmm, page, |pte| pte.with_flags(mark))?;
                    return Ok(pte.frame());
                }
            }
        }

        let info = PageFaultInfo {
            addr: va,
            access,
            user_mode: true,
        };
        match handle_page_fault(space, mm, info) {
            FaultResult::Success => continue,
            failure => return Err(fault_error(failure)),
        }
    }
    crate::kerror!("(MM) Falta não resolvida em va=", va.as_u64());
    Err(MmError::FatalError)
}

/// Erro que uma falta não resolvida vira para quem copia.
fn fault_error(result: FaultResult) -> MmError {
    match result {
        FaultResult::OutOfMemory => MmError::OutOfMemory,
        FaultResult::ProtectionViolation => MmError::ProtectionViolation,
        FaultResult::InvalidAddress | FaultResult::BeyondLimit => MmError::InvalidAddress,
        FaultResult::Success | FaultResult::FatalError => MmError::FatalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_results_map_to_errors() {
        assert_eq!(fault_error(FaultResult::OutOfMemory), MmError::OutOfMemory);
        assert_eq!(
            fault_error(FaultResult::ProtectionViolation),
            MmError::ProtectionViolation
        );
        assert_eq!(fault_error(FaultResult::BeyondLimit), MmError::InvalidAddress);
        assert_eq!(fault_error(FaultResult::InvalidAddress), MmError::InvalidAddress);
        assert_eq!(fault_error(FaultResult::FatalError), MmError::FatalError);
    }
}
