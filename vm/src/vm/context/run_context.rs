use crate::{
    types::{
        instruction::{Instruction, Op1Addr, Register},
        relocatable::{MaybeRelocatable, Relocatable},
    },
    vm::errors::{memory_errors::MemoryError, vm_errors::VirtualMachineError},
};

/// The three VM registers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunContext {
    pub(crate) pc: Relocatable,
    pub(crate) ap: Relocatable,
    pub(crate) fp: Relocatable,
}

impl RunContext {
    pub fn new(pc: Relocatable, ap: Relocatable, fp: Relocatable) -> Self {
        RunContext { pc, ap, fp }
    }

    pub fn get_ap(&self) -> Relocatable {
        self.ap
    }

    pub fn get_fp(&self) -> Relocatable {
        self.fp
    }

    pub fn get_pc(&self) -> Relocatable {
        self.pc
    }

    fn register(&self, register: Register) -> Relocatable {
        match register {
            Register::AP => self.ap,
            Register::FP => self.fp,
        }
    }

    pub fn compute_dst_addr(
        &self,
        instruction: &Instruction,
    ) -> Result<Relocatable, VirtualMachineError> {
        Ok((self.register(instruction.dst_register) + instruction.off0)?)
    }

    pub fn compute_op0_addr(
        &self,
        instruction: &Instruction,
    ) -> Result<Relocatable, VirtualMachineError> {
        Ok((self.register(instruction.op0_register) + instruction.off1)?)
    }

    /// `op0` is only consulted when op1 is addressed through it, so it has to be
    /// resolved first in that case.
    pub fn compute_op1_addr(
        &self,
        instruction: &Instruction,
        op0: Option<&MaybeRelocatable>,
    ) -> Result<Relocatable, VirtualMachineError> {
        let base_addr = match instruction.op1_addr {
            Op1Addr::FP => self.fp,
            Op1Addr::AP => self.ap,
            Op1Addr::Imm if instruction.off2 == 1 => self.pc,
            Op1Addr::Imm => return Err(VirtualMachineError::ImmShouldBe1),
            Op1Addr::Op0 => match op0 {
                Some(MaybeRelocatable::RelocatableValue(addr)) => *addr,
                Some(_) => return Err(MemoryError::AddressNotRelocatable.into()),
                None => return Err(VirtualMachineError::UnknownOp0),
            },
        };
        Ok((base_addr + instruction.off2)?)
    }

    pub(crate) fn set_ap(&mut self, ap: Relocatable) {
        self.ap = ap;
    }

    pub(crate) fn set_fp(&mut self, fp: Relocatable) {
        self.fp = fp;
    }

    pub(crate) fn set_pc(&mut self, pc: Relocatable) {
        self.pc = pc;
    }
}
