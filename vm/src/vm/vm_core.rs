use std::{any::Any, borrow::Cow, collections::HashMap};

use num_traits::ToPrimitive;
use tracing::trace;

use crate::hint_processor::hint_processor_definition::HintProcessor;
use crate::math_utils::{field_div, signed_felt};
use crate::types::builtin_name::BuiltinName;
use crate::types::errors::math_errors::MathError;
use crate::types::exec_scope::ExecutionScopes;
use crate::types::instruction::{
    ApUpdate, FpUpdate, Instruction, Opcode, PcUpdate, Res,
};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::context::run_context::RunContext;
use crate::vm::decoding::decoder::decode_instruction;
use crate::vm::errors::{
    exec_scope_errors::ExecScopeError, memory_errors::MemoryError,
    vm_errors::VirtualMachineError,
};
use crate::vm::runners::builtin_runner::{
    BuiltinRunner, RangeCheckBuiltinRunner, SignatureBuiltinRunner,
};
use crate::vm::trace::trace_entry::TraceEntry;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;
use crate::Felt252;

// Offsets are biased by 2^15 when they are counted against the range-check
// limits, the same way the decoder stores them.
const OFFSET_BIAS: isize = 1 << 15;

#[derive(PartialEq, Eq, Debug)]
pub struct Operands {
    dst: MaybeRelocatable,
    res: Option<MaybeRelocatable>,
    op0: MaybeRelocatable,
    op1: MaybeRelocatable,
}

#[derive(PartialEq, Eq, Debug)]
pub struct OperandsAddresses {
    dst_addr: Relocatable,
    op0_addr: Relocatable,
    op1_addr: Relocatable,
}

/// Which operands were filled in by deduction and still have to be written
/// back to memory.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeducedOperands(u8);

impl DeducedOperands {
    fn set_dst(&mut self, value: bool) {
        self.0 |= value as u8;
    }
    fn set_op0(&mut self, value: bool) {
        self.0 |= (value as u8) << 1;
    }
    fn set_op1(&mut self, value: bool) {
        self.0 |= (value as u8) << 2;
    }

    fn was_dest_deducted(&self) -> bool {
        self.0 & 1 != 0
    }
    fn was_op0_deducted(&self) -> bool {
        self.0 & (1 << 1) != 0
    }
    fn was_op1_deducted(&self) -> bool {
        self.0 & (1 << 2) != 0
    }
}

pub struct VirtualMachine {
    pub(crate) run_context: RunContext,
    pub builtin_runners: Vec<BuiltinRunner>,
    pub segments: MemorySegmentManager,
    pub(crate) trace: Option<Vec<TraceEntry>>,
    pub(crate) current_step: usize,
    pub(crate) rc_limits: Option<(isize, isize)>,
    skip_instruction_execution: bool,
    run_finished: bool,
    pub(crate) disable_trace_padding: bool,
    // Decoded instructions of the program segment, indexed by offset.
    instruction_cache: Vec<Option<Instruction>>,
    pub(crate) relocation_table: Option<Vec<usize>>,
}

impl VirtualMachine {
    pub fn new(trace_enabled: bool) -> VirtualMachine {
        VirtualMachine {
            run_context: RunContext::default(),
            builtin_runners: Vec::new(),
            segments: MemorySegmentManager::new(),
            trace: trace_enabled.then(Vec::new),
            current_step: 0,
            rc_limits: None,
            skip_instruction_execution: false,
            run_finished: false,
            disable_trace_padding: false,
            instruction_cache: Vec::new(),
            relocation_table: None,
        }
    }

    fn update_fp(
        &mut self,
        instruction: &Instruction,
        operands: &Operands,
    ) -> Result<(), VirtualMachineError> {
        let new_fp = match instruction.fp_update {
            FpUpdate::APPlus2 => (self.run_context.ap + 2_usize)?,
            FpUpdate::Dst => match operands.dst {
                // fp stays in its segment and moves to the offset of dst.
                MaybeRelocatable::RelocatableValue(rel) => {
                    Relocatable::from((self.run_context.fp.segment_index, rel.offset))
                }
                MaybeRelocatable::Int(ref num) => Relocatable::from((
                    self.run_context.fp.segment_index,
                    num.to_usize()
                        .ok_or_else(|| MathError::Felt252ToUsizeConversion(Box::new(*num)))?,
                )),
            },
            FpUpdate::Regular => return Ok(()),
        };
        self.run_context.set_fp(new_fp);
        Ok(())
    }

    fn update_ap(
        &mut self,
        instruction: &Instruction,
        operands: &Operands,
    ) -> Result<(), VirtualMachineError> {
        let new_ap = match instruction.ap_update {
            ApUpdate::Add => match &operands.res {
                Some(res) => (self.run_context.ap + res)?,
                None => return Err(VirtualMachineError::UnconstrainedResAdd),
            },
            ApUpdate::Add1 => (self.run_context.ap + 1_usize)?,
            ApUpdate::Add2 => (self.run_context.ap + 2_usize)?,
            ApUpdate::Regular => return Ok(()),
        };
        self.run_context.set_ap(new_ap);
        Ok(())
    }

    fn update_pc(
        &mut self,
        instruction: &Instruction,
        operands: &Operands,
    ) -> Result<(), VirtualMachineError> {
        let new_pc = match instruction.pc_update {
            PcUpdate::Regular => (self.run_context.pc + instruction.size())?,
            PcUpdate::Jump => match operands.res.as_ref().and_then(|res| res.get_relocatable()) {
                Some(res) => res,
                None => return Err(VirtualMachineError::UnconstrainedResJump),
            },
            PcUpdate::JumpRel => match &operands.res {
                Some(MaybeRelocatable::Int(num_res)) => (self.run_context.pc + num_res)?,
                Some(_) => return Err(VirtualMachineError::JumpRelNotInt),
                None => return Err(VirtualMachineError::UnconstrainedResJumpRel),
            },
            PcUpdate::Jnz => {
                if operands.dst.is_zero() {
                    (self.run_context.pc + instruction.size())?
                } else {
                    (self.run_context.pc + &operands.op1)?
                }
            }
        };
        self.run_context.set_pc(new_pc);
        Ok(())
    }

    fn update_registers(
        &mut self,
        instruction: &Instruction,
        operands: Operands,
    ) -> Result<(), VirtualMachineError> {
        self.update_fp(instruction, &operands)?;
        self.update_ap(instruction, &operands)?;
        self.update_pc(instruction, &operands)?;
        Ok(())
    }

    /// Returns `(op0, res)`, deducing op0 from dst and op1 when the opcode
    /// makes it possible. `res` is returned when the deduction fixed it too.
    fn deduce_op0(
        &self,
        instruction: &Instruction,
        dst: Option<&MaybeRelocatable>,
        op1: Option<&MaybeRelocatable>,
    ) -> Result<(Option<MaybeRelocatable>, Option<MaybeRelocatable>), VirtualMachineError> {
        match instruction.opcode {
            Opcode::Call => Ok((
                Some(MaybeRelocatable::from(
                    (self.run_context.pc + instruction.size())?,
                )),
                None,
            )),
            Opcode::AssertEq => match (instruction.res, dst, op1) {
                (Res::Add, Some(dst), Some(op1)) => Ok((Some(dst.sub(op1)?), Some(dst.clone()))),
                (
                    Res::Mul,
                    Some(MaybeRelocatable::Int(num_dst)),
                    Some(MaybeRelocatable::Int(num_op1)),
                ) if *num_op1 != Felt252::ZERO => Ok((
                    Some(MaybeRelocatable::Int(field_div(num_dst, num_op1)?)),
                    dst.cloned(),
                )),
                _ => Ok((None, None)),
            },
            _ => Ok((None, None)),
        }
    }

    /// Returns `(op1, res)`, deducing op1 from dst and op0.
    fn deduce_op1(
        &self,
        instruction: &Instruction,
        dst: Option<&MaybeRelocatable>,
        op0: Option<&MaybeRelocatable>,
    ) -> Result<(Option<MaybeRelocatable>, Option<MaybeRelocatable>), VirtualMachineError> {
        if instruction.opcode != Opcode::AssertEq {
            return Ok((None, None));
        }
        match (instruction.res, dst, op0) {
            (Res::Op1, Some(dst), _) => Ok((Some(dst.clone()), Some(dst.clone()))),
            (Res::Add, Some(dst), Some(op0)) => Ok((dst.sub(op0).ok(), Some(dst.clone()))),
            (
                Res::Mul,
                Some(MaybeRelocatable::Int(num_dst)),
                Some(MaybeRelocatable::Int(num_op0)),
            ) if *num_op0 != Felt252::ZERO => Ok((
                Some(MaybeRelocatable::Int(field_div(num_dst, num_op0)?)),
                dst.cloned(),
            )),
            _ => Ok((None, None)),
        }
    }

    /// Asks the builtin owning `address`'s segment, if any, for its value.
    fn deduce_memory_cell(
        &self,
        address: Relocatable,
    ) -> Result<Option<MaybeRelocatable>, VirtualMachineError> {
        match self
            .builtin_runners
            .iter()
            .find(|builtin| builtin.base() as isize == address.segment_index)
        {
            Some(builtin) => Ok(builtin.deduce_memory_cell(address, &self.segments.memory)?),
            None => Ok(None),
        }
    }

    fn compute_res(
        &self,
        instruction: &Instruction,
        op0: &MaybeRelocatable,
        op1: &MaybeRelocatable,
    ) -> Result<Option<MaybeRelocatable>, VirtualMachineError> {
        match instruction.res {
            Res::Op1 => Ok(Some(op1.clone())),
            Res::Add => Ok(Some(op0.add(op1)?)),
            Res::Mul => match (op0, op1) {
                (MaybeRelocatable::Int(num_op0), MaybeRelocatable::Int(num_op1)) => {
                    Ok(Some(MaybeRelocatable::Int(*num_op0 * *num_op1)))
                }
                _ => Err(VirtualMachineError::ComputeResRelocatableMul(Box::new((
                    op0.clone(),
                    op1.clone(),
                )))),
            },
            Res::Unconstrained => Ok(None),
        }
    }

    fn deduce_dst(
        &self,
        instruction: &Instruction,
        res: &Option<MaybeRelocatable>,
    ) -> Result<MaybeRelocatable, VirtualMachineError> {
        match (instruction.opcode, res) {
            (Opcode::AssertEq, Some(res)) => Ok(res.clone()),
            (Opcode::Call, _) => Ok(MaybeRelocatable::from(self.run_context.get_fp())),
            _ => Err(VirtualMachineError::NoDst),
        }
    }

    fn opcode_assertions(
        &self,
        instruction: &Instruction,
        operands: &Operands,
    ) -> Result<(), VirtualMachineError> {
        match instruction.opcode {
            Opcode::AssertEq => match &operands.res {
                None => Err(VirtualMachineError::UnconstrainedResAssertEq),
                Some(res) if res != &operands.dst => Err(VirtualMachineError::DiffAssertValues(
                    Box::new((operands.dst.clone(), res.clone())),
                )),
                Some(_) => Ok(()),
            },
            Opcode::Call => {
                let return_pc = MaybeRelocatable::from((self.run_context.pc + instruction.size())?);
                if operands.op0 != return_pc {
                    return Err(VirtualMachineError::CantWriteReturnPc(Box::new((
                        operands.op0.clone(),
                        return_pc,
                    ))));
                }
                let return_fp = MaybeRelocatable::from(self.run_context.get_fp());
                if operands.dst != return_fp {
                    return Err(VirtualMachineError::CantWriteReturnFp(Box::new((
                        operands.dst.clone(),
                        return_fp,
                    ))));
                }
                Ok(())
            }
            Opcode::Ret | Opcode::NOp => Ok(()),
        }
    }

    fn insert_deduced_operands(
        &mut self,
        deduced_operands: DeducedOperands,
        operands: &Operands,
        operands_addresses: &OperandsAddresses,
    ) -> Result<(), VirtualMachineError> {
        let memory = &mut self.segments.memory;
        if deduced_operands.was_op0_deducted() {
            memory.insert(operands_addresses.op0_addr, &operands.op0)?;
        }
        if deduced_operands.was_op1_deducted() {
            memory.insert(operands_addresses.op1_addr, &operands.op1)?;
        }
        if deduced_operands.was_dest_deducted() {
            memory.insert(operands_addresses.dst_addr, &operands.dst)?;
        }
        Ok(())
    }

    fn update_rc_limits(&mut self, instruction: &Instruction) {
        let offsets = [instruction.off0, instruction.off1, instruction.off2].map(|off| off + OFFSET_BIAS);
        let (mut min, mut max) = self.rc_limits.unwrap_or((offsets[0], offsets[0]));
        for off in offsets {
            min = min.min(off);
            max = max.max(off);
        }
        self.rc_limits = Some((min, max));
    }

    fn run_instruction(&mut self, instruction: &Instruction) -> Result<(), VirtualMachineError> {
        let (operands, operands_addresses, deduced_operands) =
            self.compute_operands(instruction)?;
        self.insert_deduced_operands(deduced_operands, &operands, &operands_addresses)?;
        self.opcode_assertions(instruction, &operands)?;

        if let Some(trace) = &mut self.trace {
            trace.push(TraceEntry {
                pc: self.run_context.pc.offset,
                ap: self.run_context.ap.offset,
                fp: self.run_context.fp.offset,
            });
        }

        self.update_rc_limits(instruction);

        let memory = &mut self.segments.memory;
        memory.mark_as_accessed(operands_addresses.dst_addr);
        memory.mark_as_accessed(operands_addresses.op0_addr);
        memory.mark_as_accessed(operands_addresses.op1_addr);

        self.update_registers(instruction, operands)?;
        self.current_step += 1;
        Ok(())
    }

    fn decode_current_instruction(&self) -> Result<Instruction, VirtualMachineError> {
        let encoded_instruction = self
            .segments
            .memory
            .get_integer(self.run_context.pc)?
            .to_u64()
            .ok_or(VirtualMachineError::InvalidInstructionEncoding)?;
        Ok(decode_instruction(encoded_instruction)?)
    }

    /// Runs the hints attached to the current pc, in order.
    ///
    /// A failing hint aborts the step; the error carries the pc and the
    /// hint's index. The runner fills in the hint code.
    pub fn step_hint(
        &mut self,
        hint_processor: &mut dyn HintProcessor,
        exec_scopes: &mut ExecutionScopes,
        hint_datas: &[Box<dyn Any>],
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), VirtualMachineError> {
        let pc = self.run_context.pc;
        for (hint_index, hint_data) in hint_datas.iter().enumerate() {
            hint_processor
                .execute_hint(self, exec_scopes, hint_data, constants)
                .map_err(|err| VirtualMachineError::Hint(Box::new((pc, hint_index, "".into(), err))))?
        }
        Ok(())
    }

    fn fetch_instruction(&mut self) -> Result<Instruction, VirtualMachineError> {
        let pc = self.run_context.pc;
        // Only the program segment is cached: code loaded elsewhere may still
        // be written while the run goes on.
        if pc.segment_index != 0 {
            return self.decode_current_instruction();
        }
        if let Some(Some(instruction)) = self.instruction_cache.get(pc.offset) {
            return Ok(*instruction);
        }
        let instruction = self.decode_current_instruction()?;
        if self.instruction_cache.len() <= pc.offset {
            self.instruction_cache.resize(pc.offset + 1, None);
        }
        self.instruction_cache[pc.offset] = Some(instruction);
        Ok(instruction)
    }

    pub fn step_instruction(&mut self) -> Result<(), VirtualMachineError> {
        let instruction = self.fetch_instruction()?;
        trace!(
            step = self.current_step,
            pc = %self.run_context.pc,
            ap = %self.run_context.ap,
            fp = %self.run_context.fp,
            "executing instruction"
        );
        if self.skip_instruction_execution {
            self.run_context.set_pc((self.run_context.pc + instruction.size())?);
            self.skip_instruction_execution = false;
            return Ok(());
        }
        self.run_instruction(&instruction)
    }

    pub fn step(
        &mut self,
        hint_processor: &mut dyn HintProcessor,
        exec_scopes: &mut ExecutionScopes,
        hint_datas: &[Box<dyn Any>],
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), VirtualMachineError> {
        self.step_hint(hint_processor, exec_scopes, hint_datas, constants)?;
        self.step_instruction()
    }

    fn compute_op0_deductions(
        &self,
        op0_addr: Relocatable,
        res: &mut Option<MaybeRelocatable>,
        instruction: &Instruction,
        dst_op: &Option<MaybeRelocatable>,
        op1_op: &Option<MaybeRelocatable>,
    ) -> Result<MaybeRelocatable, VirtualMachineError> {
        let op0_op = match self.deduce_memory_cell(op0_addr)? {
            None => {
                let op0;
                (op0, *res) = self.deduce_op0(instruction, dst_op.as_ref(), op1_op.as_ref())?;
                op0
            }
            deduced_memory_cell => deduced_memory_cell,
        };
        op0_op.ok_or_else(|| {
            VirtualMachineError::FailedToComputeOperands(Box::new(("op0".to_string(), op0_addr)))
        })
    }

    fn compute_op1_deductions(
        &self,
        op1_addr: Relocatable,
        res: &mut Option<MaybeRelocatable>,
        instruction: &Instruction,
        dst_op: &Option<MaybeRelocatable>,
        op0: &MaybeRelocatable,
    ) -> Result<MaybeRelocatable, VirtualMachineError> {
        let op1_op = match self.deduce_memory_cell(op1_addr)? {
            None => {
                let (op1, deduced_res) = self.deduce_op1(instruction, dst_op.as_ref(), Some(op0))?;
                if res.is_none() {
                    *res = deduced_res
                }
                op1
            }
            deduced_memory_cell => deduced_memory_cell,
        };
        op1_op.ok_or_else(|| {
            VirtualMachineError::FailedToComputeOperands(Box::new(("op1".to_string(), op1_addr)))
        })
    }

    /// Reads dst, op0 and op1, deducing whatever memory doesn't hold yet, and
    /// computes res.
    pub fn compute_operands(
        &self,
        instruction: &Instruction,
    ) -> Result<(Operands, OperandsAddresses, DeducedOperands), VirtualMachineError> {
        let dst_addr = self.run_context.compute_dst_addr(instruction)?;
        let dst_op = self.segments.memory.get(&dst_addr).map(Cow::into_owned);

        let op0_addr = self.run_context.compute_op0_addr(instruction)?;
        let op0_op = self.segments.memory.get(&op0_addr).map(Cow::into_owned);

        let op1_addr = self
            .run_context
            .compute_op1_addr(instruction, op0_op.as_ref())?;
        let op1_op = self.segments.memory.get(&op1_addr).map(Cow::into_owned);

        let mut res: Option<MaybeRelocatable> = None;
        let mut deduced_operands = DeducedOperands::default();

        let op0 = match op0_op {
            Some(op0) => op0,
            None => {
                deduced_operands.set_op0(true);
                self.compute_op0_deductions(op0_addr, &mut res, instruction, &dst_op, &op1_op)?
            }
        };

        let op1 = match op1_op {
            Some(op1) => op1,
            None => {
                deduced_operands.set_op1(true);
                self.compute_op1_deductions(op1_addr, &mut res, instruction, &dst_op, &op0)?
            }
        };

        if res.is_none() {
            res = self.compute_res(instruction, &op0, &op1)?;
        }

        let dst = match dst_op {
            Some(dst) => dst,
            None => {
                deduced_operands.set_dst(true);
                self.deduce_dst(instruction, &res)?
            }
        };

        Ok((
            Operands { dst, res, op0, op1 },
            OperandsAddresses {
                dst_addr,
                op0_addr,
                op1_addr,
            },
            deduced_operands,
        ))
    }

    /// Checks every written builtin cell against what the builtin deduces for it.
    pub fn verify_auto_deductions(&self) -> Result<(), VirtualMachineError> {
        for builtin in &self.builtin_runners {
            let index = builtin.base();
            let Some(segment) = self.segments.memory.data.get(index) else {
                continue;
            };
            for (offset, cell) in segment.iter().enumerate() {
                let Some(cell) = cell else {
                    continue;
                };
                let addr = Relocatable::from((index as isize, offset));
                if let Some(deduced) = builtin.deduce_memory_cell(addr, &self.segments.memory)? {
                    if &deduced != cell.get_value() {
                        return Err(VirtualMachineError::InconsistentAutoDeduction(Box::new((
                            builtin.name().to_str_with_suffix(),
                            deduced,
                            Some(cell.get_value().clone()),
                        ))));
                    }
                }
            }
        }
        Ok(())
    }

    /// Same check as [`VirtualMachine::verify_auto_deductions`], for one address.
    pub fn verify_auto_deductions_for_addr(
        &self,
        addr: Relocatable,
        builtin: &BuiltinRunner,
    ) -> Result<(), VirtualMachineError> {
        let Some(value) = builtin.deduce_memory_cell(addr, &self.segments.memory)? else {
            return Ok(());
        };
        let Some(current_value) = self.segments.memory.get(&addr) else {
            return Ok(());
        };
        if value != *current_value {
            return Err(VirtualMachineError::InconsistentAutoDeduction(Box::new((
                builtin.name().to_str_with_suffix(),
                value,
                Some(current_value.into_owned()),
            ))));
        }
        Ok(())
    }

    pub fn end_run(&mut self, exec_scopes: &ExecutionScopes) -> Result<(), VirtualMachineError> {
        self.verify_auto_deductions()?;
        self.run_finished = true;
        match exec_scopes.data.len() {
            1 => Ok(()),
            _ => Err(ExecScopeError::NoScopeError.into()),
        }
    }

    pub fn mark_address_range_as_accessed(
        &mut self,
        base: Relocatable,
        len: usize,
    ) -> Result<(), VirtualMachineError> {
        if !self.run_finished {
            return Err(VirtualMachineError::RunNotFinished);
        }
        for i in 0..len {
            self.segments.memory.mark_as_accessed((base + i)?);
        }
        Ok(())
    }

    pub fn add_memory_segment(&mut self) -> Relocatable {
        self.segments.add()
    }

    pub fn add_temporary_segment(&mut self) -> Relocatable {
        self.segments.add_temporary_segment()
    }

    /// Registers that temporary segment `src_ptr` lands at `dst_ptr` on relocation.
    pub fn add_relocation_rule(
        &mut self,
        src_ptr: Relocatable,
        dst_ptr: Relocatable,
    ) -> Result<(), MemoryError> {
        self.segments.memory.add_relocation_rule(src_ptr, dst_ptr)
    }

    pub fn get_ap(&self) -> Relocatable {
        self.run_context.get_ap()
    }

    pub fn get_fp(&self) -> Relocatable {
        self.run_context.get_fp()
    }

    pub fn get_pc(&self) -> Relocatable {
        self.run_context.get_pc()
    }

    pub fn get_current_step(&self) -> usize {
        self.current_step
    }

    pub fn get_trace(&self) -> Option<&Vec<TraceEntry>> {
        self.trace.as_ref()
    }

    pub fn get_integer(&self, key: Relocatable) -> Result<Cow<Felt252>, MemoryError> {
        self.segments.memory.get_integer(key)
    }

    pub fn get_relocatable(&self, key: Relocatable) -> Result<Relocatable, MemoryError> {
        self.segments.memory.get_relocatable(key)
    }

    /// The value at `key`, if any.
    pub fn get_maybe<'a, 'b: 'a, K: 'a>(&'b self, key: &'a K) -> Option<MaybeRelocatable>
    where
        Relocatable: TryFrom<&'a K>,
    {
        self.segments.memory.get(key).map(Cow::into_owned)
    }

    pub fn insert_value<T: Into<MaybeRelocatable>>(
        &mut self,
        key: Relocatable,
        val: T,
    ) -> Result<(), MemoryError> {
        self.segments.memory.insert_value(key, val)
    }

    /// Writes `data` from `ptr` on and returns the first address after it.
    pub fn load_data(
        &mut self,
        ptr: Relocatable,
        data: &[MaybeRelocatable],
    ) -> Result<Relocatable, MemoryError> {
        if ptr.segment_index == 0 {
            self.instruction_cache.resize(data.len(), None);
        }
        self.segments.load_data(ptr, data)
    }

    /// The `n_ret` cells right below ap.
    pub fn get_return_values(&self, n_ret: usize) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        let addr = (self.run_context.get_ap() - n_ret)
            .map_err(|_| MemoryError::FailedToGetReturnValues(Box::new((n_ret, self.get_ap()))))?;
        self.segments.memory.get_continuous_range(addr, n_ret)
    }

    pub fn get_range(&self, addr: Relocatable, size: usize) -> Vec<Option<Cow<MaybeRelocatable>>> {
        self.segments.memory.get_range(addr, size)
    }

    pub fn get_continuous_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        self.segments.memory.get_continuous_range(addr, size)
    }

    pub fn get_integer_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<Cow<Felt252>>, MemoryError> {
        self.segments.memory.get_integer_range(addr, size)
    }

    pub fn get_range_check_builtin(&self) -> Result<&RangeCheckBuiltinRunner, VirtualMachineError> {
        self.builtin_runners
            .iter()
            .find_map(|builtin| match builtin {
                BuiltinRunner::RangeCheck(range_check) => Some(range_check),
                _ => None,
            })
            .ok_or(VirtualMachineError::NoRangeCheckBuiltin)
    }

    pub fn get_signature_builtin(
        &mut self,
    ) -> Result<&mut SignatureBuiltinRunner, VirtualMachineError> {
        self.builtin_runners
            .iter_mut()
            .find_map(|builtin| match builtin {
                BuiltinRunner::Signature(signature) => Some(signature),
                _ => None,
            })
            .ok_or(VirtualMachineError::NoSignatureBuiltin)
    }

    #[doc(hidden)]
    pub fn skip_next_instruction_execution(&mut self) {
        self.skip_instruction_execution = true;
    }

    #[doc(hidden)]
    pub fn set_ap(&mut self, ap: Relocatable) {
        self.run_context.set_ap(ap)
    }

    #[doc(hidden)]
    pub fn set_fp(&mut self, fp: Relocatable) {
        self.run_context.set_fp(fp)
    }

    #[doc(hidden)]
    pub fn set_pc(&mut self, pc: Relocatable) {
        self.run_context.set_pc(pc)
    }

    pub fn get_segment_used_size(&self, index: usize) -> Option<usize> {
        self.segments.get_segment_used_size(index)
    }

    pub fn get_segment_size(&self, index: usize) -> Option<usize> {
        self.segments.get_segment_size(index)
    }

    pub fn gen_arg(&mut self, arg: &dyn Any) -> Result<MaybeRelocatable, MemoryError> {
        self.segments.gen_arg(arg)
    }

    /// Writes the output builtin's segment, one value per line, felts in
    /// signed form. Does nothing when the run has no output builtin.
    pub fn write_output(
        &mut self,
        writer: &mut impl std::fmt::Write,
    ) -> Result<(), VirtualMachineError> {
        let Some(segment_index) = self
            .builtin_runners
            .iter()
            .find(|builtin| builtin.name() == BuiltinName::output)
            .map(BuiltinRunner::base)
        else {
            return Ok(());
        };

        let used_size = self
            .segments
            .compute_effective_sizes()
            .get(segment_index)
            .copied()
            .unwrap_or_default();
        for offset in 0..used_size {
            let formatted_value = match self
                .segments
                .memory
                .get(&Relocatable::from((segment_index as isize, offset)))
            {
                Some(value) => match value.as_ref() {
                    MaybeRelocatable::Int(num) => signed_felt(num).to_string(),
                    MaybeRelocatable::RelocatableValue(rel) => rel.to_string(),
                },
                None => "<missing>".to_string(),
            };
            writeln!(writer, "{formatted_value}")
                .map_err(|_| VirtualMachineError::FailedToWriteOutput)?;
        }
        Ok(())
    }

    /// Flat `(address, page)` pairs of the public memory. Needs a relocated run.
    pub fn get_public_memory_addresses(&self) -> Result<Vec<(usize, usize)>, VirtualMachineError> {
        match &self.relocation_table {
            Some(relocation_table) => Ok(self
                .segments
                .get_public_memory_addresses(relocation_table)?),
            None => Err(MemoryError::UnrelocatedMemory.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::any_box;
    use crate::hint_processor::builtin_hint_processor::builtin_hint_processor_definition::{
        BuiltinHintProcessor, HintProcessorData,
    };
    use crate::hint_processor::builtin_hint_processor::hint_code;
    use crate::relocatable;
    use crate::types::instruction::{Op1Addr, Register};
    use crate::utils::test_utils::*;
    use crate::vm::errors::hint_errors::HintError;
    use crate::vm::runners::builtin_runner::{BitwiseBuiltinRunner, OutputBuiltinRunner};
    use assert_matches::assert_matches;
    use rstest::rstest;

    // [ap] = imm; ap++
    const ASSERT_IMM_AP_PLUS_1: u64 = 0x480680017fff8000;
    // [ap] = [ap - 1] + [ap - 2]; ap++
    const ADD_AP_PLUS_1: u64 = 0x48307fff7ffe8000;
    // call rel imm
    const CALL_REL: u64 = 0x1104800180018000;
    // jmp rel imm if [ap - 1] != 0
    const JNZ_REL: u64 = 0x20680017fff7fff;
    // ret
    const RET: u64 = 0x208b7fff7fff7ffe;

    fn instruction(opcode: Opcode, res: Res) -> Instruction {
        Instruction {
            off0: 0,
            off1: 1,
            off2: 2,
            dst_register: Register::AP,
            op0_register: Register::FP,
            op1_addr: Op1Addr::AP,
            res,
            pc_update: PcUpdate::Regular,
            ap_update: ApUpdate::Regular,
            fp_update: FpUpdate::Regular,
            opcode,
        }
    }

    fn operands(dst: MaybeRelocatable, res: Option<MaybeRelocatable>) -> Operands {
        Operands {
            dst,
            res,
            op0: mayberelocatable!(0),
            op1: mayberelocatable!(3),
        }
    }

    fn vm_with_program(program: &[MaybeRelocatable], ap: usize, fp: usize) -> VirtualMachine {
        let mut vm = vm!(true);
        add_segments!(vm, 2);
        vm.load_data(relocatable!(0, 0), program).unwrap();
        run_context!(vm, 0, ap, fp);
        vm
    }

    fn step(vm: &mut VirtualMachine) -> Result<(), VirtualMachineError> {
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        vm.step(
            &mut hint_processor,
            exec_scopes_ref!(),
            &[],
            &HashMap::new(),
        )
    }

    #[test]
    fn update_fp_ap_plus_2() {
        let mut ins = instruction(Opcode::Call, Res::Op1);
        ins.fp_update = FpUpdate::APPlus2;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_fp(&ins, &operands(mayberelocatable!(11), None)).unwrap();
        assert_eq!(vm.get_fp(), relocatable!(1, 7));
    }

    #[test]
    fn update_fp_dst_relocatable() {
        let mut ins = instruction(Opcode::Ret, Res::Op1);
        ins.fp_update = FpUpdate::Dst;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_fp(&ins, &operands(mayberelocatable!(1, 2), None)).unwrap();
        assert_eq!(vm.get_fp(), relocatable!(1, 2));
    }

    #[test]
    fn update_fp_dst_other_segment_keeps_execution_segment() {
        let mut ins = instruction(Opcode::Ret, Res::Op1);
        ins.fp_update = FpUpdate::Dst;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_fp(&ins, &operands(mayberelocatable!(3, 9), None)).unwrap();
        assert_eq!(vm.get_fp(), relocatable!(1, 9));
    }

    #[test]
    fn update_fp_dst_int_keeps_segment() {
        let mut ins = instruction(Opcode::Ret, Res::Op1);
        ins.fp_update = FpUpdate::Dst;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_fp(&ins, &operands(mayberelocatable!(11), None)).unwrap();
        assert_eq!(vm.get_fp(), relocatable!(1, 11));
    }

    #[rstest]
    #[case(ApUpdate::Regular, 5)]
    #[case(ApUpdate::Add1, 6)]
    #[case(ApUpdate::Add2, 7)]
    #[case(ApUpdate::Add, 13)]
    fn update_ap_variants(#[case] ap_update: ApUpdate, #[case] expected: usize) {
        let mut ins = instruction(Opcode::NOp, Res::Add);
        ins.ap_update = ap_update;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_ap(&ins, &operands(mayberelocatable!(11), Some(mayberelocatable!(8))))
            .unwrap();
        assert_eq!(vm.get_ap(), relocatable!(1, expected));
    }

    #[test]
    fn update_ap_add_without_res() {
        let mut ins = instruction(Opcode::NOp, Res::Unconstrained);
        ins.ap_update = ApUpdate::Add;
        let mut vm = vm!();
        assert_matches!(
            vm.update_ap(&ins, &operands(mayberelocatable!(11), None)),
            Err(VirtualMachineError::UnconstrainedResAdd)
        );
    }

    #[test]
    fn update_pc_jump_needs_relocatable_res() {
        let mut ins = instruction(Opcode::NOp, Res::Op1);
        ins.pc_update = PcUpdate::Jump;
        let mut vm = vm!();
        vm.update_pc(&ins, &operands(mayberelocatable!(0), Some(mayberelocatable!(0, 9))))
            .unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 9));
        assert_matches!(
            vm.update_pc(&ins, &operands(mayberelocatable!(0), Some(mayberelocatable!(9)))),
            Err(VirtualMachineError::UnconstrainedResJump)
        );
    }

    #[test]
    fn update_pc_jump_rel() {
        let mut ins = instruction(Opcode::NOp, Res::Op1);
        ins.pc_update = PcUpdate::JumpRel;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_pc(&ins, &operands(mayberelocatable!(0), Some(mayberelocatable!(5))))
            .unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 9));
        assert_matches!(
            vm.update_pc(&ins, &operands(mayberelocatable!(0), Some(mayberelocatable!(1, 0)))),
            Err(VirtualMachineError::JumpRelNotInt)
        );
        assert_matches!(
            vm.update_pc(&ins, &operands(mayberelocatable!(0), None)),
            Err(VirtualMachineError::UnconstrainedResJumpRel)
        );
    }

    #[rstest]
    #[case(0, 5)]
    #[case(1, 7)]
    fn update_pc_jnz(#[case] dst: i32, #[case] expected_pc: usize) {
        let mut ins = instruction(Opcode::NOp, Res::Unconstrained);
        ins.pc_update = PcUpdate::Jnz;
        let mut vm = vm!();
        run_context!(vm, 4, 5, 6);
        vm.update_pc(&ins, &operands(mayberelocatable!(dst), None)).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, expected_pc));
    }

    #[test]
    fn deduce_op0_for_call() {
        let vm = vm!();
        let ins = instruction(Opcode::Call, Res::Op1);
        assert_eq!(
            vm.deduce_op0(&ins, None, None).unwrap(),
            (Some(mayberelocatable!(0, 1)), None)
        );
    }

    #[test]
    fn deduce_op0_assert_eq_add() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Add);
        assert_eq!(
            vm.deduce_op0(&ins, Some(&mayberelocatable!(3)), Some(&mayberelocatable!(2)))
                .unwrap(),
            (Some(mayberelocatable!(1)), Some(mayberelocatable!(3)))
        );
    }

    #[test]
    fn deduce_op0_assert_eq_mul() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Mul);
        assert_eq!(
            vm.deduce_op0(&ins, Some(&mayberelocatable!(6)), Some(&mayberelocatable!(2)))
                .unwrap(),
            (Some(mayberelocatable!(3)), Some(mayberelocatable!(6)))
        );
        // Nothing can be said when op1 is zero.
        assert_eq!(
            vm.deduce_op0(&ins, Some(&mayberelocatable!(6)), Some(&mayberelocatable!(0)))
                .unwrap(),
            (None, None)
        );
    }

    #[test]
    fn deduce_op1_assert_eq() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Op1);
        assert_eq!(
            vm.deduce_op1(&ins, Some(&mayberelocatable!(7)), None).unwrap(),
            (Some(mayberelocatable!(7)), Some(mayberelocatable!(7)))
        );
        let ins = instruction(Opcode::AssertEq, Res::Add);
        assert_eq!(
            vm.deduce_op1(&ins, Some(&mayberelocatable!(1, 7)), Some(&mayberelocatable!(4)))
                .unwrap(),
            (Some(mayberelocatable!(1, 3)), Some(mayberelocatable!(1, 7)))
        );
        let ins = instruction(Opcode::NOp, Res::Op1);
        assert_eq!(
            vm.deduce_op1(&ins, Some(&mayberelocatable!(7)), None).unwrap(),
            (None, None)
        );
    }

    #[test]
    fn compute_res_mul_of_relocatable() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Mul);
        assert_matches!(
            vm.compute_res(&ins, &mayberelocatable!(1, 0), &mayberelocatable!(2)),
            Err(VirtualMachineError::ComputeResRelocatableMul(_))
        );
        assert_eq!(
            vm.compute_res(&ins, &mayberelocatable!(4), &mayberelocatable!(2)).unwrap(),
            Some(mayberelocatable!(8))
        );
    }

    #[test]
    fn deduce_dst_without_res() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Unconstrained);
        assert_matches!(vm.deduce_dst(&ins, &None), Err(VirtualMachineError::NoDst));
    }

    #[test]
    fn opcode_assertions_diff_values() {
        let vm = vm!();
        let ins = instruction(Opcode::AssertEq, Res::Op1);
        assert_matches!(
            vm.opcode_assertions(&ins, &operands(mayberelocatable!(8), Some(mayberelocatable!(9)))),
            Err(VirtualMachineError::DiffAssertValues(bx))
                if *bx == (mayberelocatable!(8), mayberelocatable!(9))
        );
    }

    #[test]
    fn opcode_assertions_call_return_pc() {
        let vm = vm!();
        let ins = instruction(Opcode::Call, Res::Op1);
        assert_matches!(
            vm.opcode_assertions(&ins, &operands(mayberelocatable!(1, 0), None)),
            Err(VirtualMachineError::CantWriteReturnPc(bx))
                if *bx == (mayberelocatable!(0), mayberelocatable!(0, 1))
        );
    }

    #[test]
    fn step_assert_immediate() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        step(&mut vm).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 2));
        assert_eq!(vm.get_ap(), relocatable!(1, 1));
        assert_eq!(vm.get_integer(relocatable!(1, 0)).unwrap().as_ref(), &Felt252::from(5));
        assert_eq!(vm.current_step, 1);
        trace_check(vm.get_trace().unwrap(), &[(0, 0, 1)]);
        assert_eq!(vm.rc_limits, Some((32767, 32769)));
    }

    #[test]
    fn step_deduces_sum() {
        let mut vm = vm_with_program(&vec_data![(ADD_AP_PLUS_1)], 2, 2);
        vm.insert_value(relocatable!(1, 0), Felt252::from(3)).unwrap();
        vm.insert_value(relocatable!(1, 1), Felt252::from(4)).unwrap();
        step(&mut vm).unwrap();
        assert_eq!(vm.get_integer(relocatable!(1, 2)).unwrap().as_ref(), &Felt252::from(7));
        assert_eq!(vm.get_ap(), relocatable!(1, 3));
    }

    #[test]
    fn step_assert_conflicting_value() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        vm.insert_value(relocatable!(1, 0), Felt252::from(6)).unwrap();
        assert_matches!(
            step(&mut vm),
            Err(VirtualMachineError::DiffAssertValues(bx))
                if *bx == (mayberelocatable!(6), mayberelocatable!(5))
        );
    }

    #[test]
    fn step_call_then_ret() {
        let mut vm = vm_with_program(&vec_data![(CALL_REL), (3), (0), (RET)], 2, 2);
        step(&mut vm).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 3));
        assert_eq!(vm.get_ap(), relocatable!(1, 4));
        assert_eq!(vm.get_fp(), relocatable!(1, 4));
        assert_eq!(vm.get_relocatable(relocatable!(1, 2)).unwrap(), relocatable!(1, 2));
        assert_eq!(vm.get_relocatable(relocatable!(1, 3)).unwrap(), relocatable!(0, 2));
        step(&mut vm).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 2));
        assert_eq!(vm.get_fp(), relocatable!(1, 2));
        trace_check(vm.get_trace().unwrap(), &[(0, 2, 2), (3, 4, 4)]);
    }

    #[rstest]
    #[case(0, 2)]
    #[case(1, 10)]
    fn step_jnz(#[case] condition: i32, #[case] expected_pc: usize) {
        let mut vm = vm_with_program(&vec_data![(JNZ_REL), (10)], 1, 1);
        vm.insert_value(relocatable!(1, 0), Felt252::from(condition)).unwrap();
        step(&mut vm).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, expected_pc));
    }

    #[test]
    fn step_unknown_memory_at_pc() {
        let mut vm = vm_with_program(&[], 0, 0);
        assert_matches!(
            step(&mut vm),
            Err(VirtualMachineError::Memory(MemoryError::UnknownMemoryCell(bx)))
                if *bx == relocatable!(0, 0)
        );
    }

    #[test]
    fn step_instruction_not_an_int() {
        let mut vm = vm_with_program(&vec_data![((1, 0))], 0, 0);
        assert_matches!(
            step(&mut vm),
            Err(VirtualMachineError::Memory(MemoryError::ExpectedInteger(_)))
        );
    }

    #[test]
    fn skipped_instruction_only_moves_pc() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        vm.skip_next_instruction_execution();
        step(&mut vm).unwrap();
        assert_eq!(vm.get_pc(), relocatable!(0, 2));
        assert_eq!(vm.get_ap(), relocatable!(1, 0));
        assert!(vm.get_maybe(&relocatable!(1, 0)).is_none());
        assert_eq!(vm.current_step, 0);
    }

    #[test]
    fn instruction_cache_is_filled_on_fetch() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        step(&mut vm).unwrap();
        assert_matches!(vm.instruction_cache.first(), Some(Some(ins)) if ins.opcode == Opcode::AssertEq);
    }

    #[test]
    fn step_runs_hints_first() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        let hint = HintProcessorData::new_default(hint_code::ADD_SEGMENT.to_string(), HashMap::new());
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        let result = vm.step(
            &mut hint_processor,
            exec_scopes_ref!(),
            &[any_box!(hint)],
            &HashMap::new(),
        );
        // The hint wrote a pointer at [ap], so the assertion sees it.
        assert_matches!(result, Err(VirtualMachineError::DiffAssertValues(_)));
        assert_eq!(vm.get_relocatable(relocatable!(1, 0)).unwrap(), relocatable!(2, 0));
    }

    #[test]
    fn failing_hint_reports_its_index() {
        let mut vm = vm_with_program(&vec_data![(ASSERT_IMM_AP_PLUS_1), (5)], 0, 1);
        let good = HintProcessorData::new_default(hint_code::VM_ENTER_SCOPE.to_string(), HashMap::new());
        let bad = HintProcessorData::new_default("nondet %{ 1 %}".to_string(), HashMap::new());
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        assert_matches!(
            vm.step_hint(
                &mut hint_processor,
                exec_scopes_ref!(),
                &[any_box!(good), any_box!(bad)],
                &HashMap::new(),
            ),
            Err(VirtualMachineError::Hint(bx))
                if bx.0 == relocatable!(0, 0) && bx.1 == 1 && matches!(bx.3, HintError::UnknownHint(_))
        );
    }

    #[test]
    fn end_run_requires_main_scope() {
        let mut vm = vm!();
        let mut scopes = scope![];
        scopes.enter_scope(HashMap::new());
        assert_matches!(
            vm.end_run(&scopes),
            Err(VirtualMachineError::MainScopeError(ExecScopeError::NoScopeError))
        );
        scopes.exit_scope().unwrap();
        assert_matches!(vm.end_run(&scopes), Ok(()));
    }

    #[test]
    fn verify_auto_deductions_bitwise() {
        let mut builtin = BitwiseBuiltinRunner::new(Some(256), true);
        builtin.segment.base = 2;
        let mut vm = vm!();
        vm.builtin_runners.push(builtin.into());
        vm.segments = segments![((2, 0), 12), ((2, 1), 10), ((2, 2), 8)];
        assert_matches!(vm.verify_auto_deductions(), Ok(()));
        vm.segments = segments![((2, 0), 12), ((2, 1), 10), ((2, 2), 9)];
        assert_matches!(
            vm.verify_auto_deductions(),
            Err(VirtualMachineError::InconsistentAutoDeduction(bx))
                if *bx == ("bitwise_builtin", mayberelocatable!(8), Some(mayberelocatable!(9)))
        );
    }

    #[test]
    fn verify_auto_deductions_for_unset_addr() {
        let builtin: BuiltinRunner = BitwiseBuiltinRunner::new(Some(256), true).into();
        let mut vm = vm!();
        vm.segments = segments![((0, 0), 12), ((0, 1), 10)];
        assert_matches!(
            vm.verify_auto_deductions_for_addr(relocatable!(0, 3), &builtin),
            Ok(())
        );
    }

    #[test]
    fn mark_range_needs_finished_run() {
        let mut vm = vm!();
        vm.segments = segments![((0, 0), 1), ((0, 1), 2)];
        assert_matches!(
            vm.mark_address_range_as_accessed(relocatable!(0, 0), 2),
            Err(VirtualMachineError::RunNotFinished)
        );
        vm.end_run(&scope![]).unwrap();
        vm.mark_address_range_as_accessed(relocatable!(0, 0), 2).unwrap();
        assert_eq!(vm.segments.memory.get_amount_of_accessed_addresses_for_segment(0), Some(2));
    }

    #[test]
    fn return_values_below_ap() {
        let mut vm = vm!();
        vm.segments = segments![((1, 0), 1), ((1, 1), 2), ((1, 2), 3)];
        run_context!(vm, 0, 3, 0);
        assert_eq!(
            vm.get_return_values(2).unwrap(),
            vec![mayberelocatable!(2), mayberelocatable!(3)]
        );
        assert_matches!(
            vm.get_return_values(4),
            Err(MemoryError::FailedToGetReturnValues(_))
        );
    }

    #[test]
    fn missing_builtins_are_reported() {
        let mut vm = vm!();
        assert_matches!(
            vm.get_range_check_builtin(),
            Err(VirtualMachineError::NoRangeCheckBuiltin)
        );
        assert_matches!(
            vm.get_signature_builtin(),
            Err(VirtualMachineError::NoSignatureBuiltin)
        );
        let vm = vm_with_range_check!();
        assert!(vm.get_range_check_builtin().is_ok());
    }

    #[test]
    fn write_output_in_signed_form() {
        let mut vm = vm!();
        vm.builtin_runners.push(OutputBuiltinRunner::new(true).into());
        vm.segments = segments![((0, 0), (-1)), ((0, 1), 5), ((0, 3), (1, 2))];
        let mut output = String::new();
        vm.write_output(&mut output).unwrap();
        assert_eq!(output, "-1\n5\n<missing>\n1:2\n");
    }

    #[test]
    fn write_output_without_output_builtin() {
        let mut vm = vm!();
        let mut output = String::new();
        vm.write_output(&mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn public_memory_needs_relocation() {
        let vm = vm!();
        assert_matches!(
            vm.get_public_memory_addresses(),
            Err(VirtualMachineError::Memory(MemoryError::UnrelocatedMemory))
        );
    }
}
