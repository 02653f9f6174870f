use num_integer::div_ceil;

use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::builtins_instance_def::BUILTIN_INSTANCES_PER_COMPONENT;
use crate::types::instance_definitions::{
    CELLS_PER_BITWISE, CELLS_PER_EC_OP, CELLS_PER_HASH, CELLS_PER_KECCAK, CELLS_PER_POSEIDON,
    CELLS_PER_RANGE_CHECK, CELLS_PER_SIGNATURE, INPUT_CELLS_PER_BITWISE, INPUT_CELLS_PER_EC_OP,
    INPUT_CELLS_PER_HASH, INPUT_CELLS_PER_KECCAK, INPUT_CELLS_PER_POSEIDON,
    KECCAK_INSTANCES_PER_COMPONENT,
};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::memory_errors::{InsufficientAllocatedCellsError, MemoryError};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::errors::vm_errors::VirtualMachineError;
use crate::vm::vm_core::VirtualMachine;
use crate::vm::vm_memory::memory::Memory;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;

mod bitwise;
mod ec_op;
mod hash;
mod keccak;
mod output;
mod poseidon;
mod range_check;
mod signature;

pub use bitwise::BitwiseBuiltinRunner;
pub use ec_op::EcOpBuiltinRunner;
pub use hash::HashBuiltinRunner;
pub use keccak::KeccakBuiltinRunner;
pub use output::OutputBuiltinRunner;
pub use poseidon::PoseidonBuiltinRunner;
pub use range_check::RangeCheckBuiltinRunner;
pub use signature::SignatureBuiltinRunner;

const MIN_N_INSTANCES_IN_BUILTIN_SEGMENT: usize = 16;

const _: () = assert!(MIN_N_INSTANCES_IN_BUILTIN_SEGMENT.is_power_of_two());

/// Bookkeeping every builtin keeps about the segment it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinSegment {
    pub base: usize,
    pub(crate) ratio: Option<u32>,
    pub(crate) stop_ptr: Option<usize>,
    pub(crate) included: bool,
}

impl BuiltinSegment {
    pub(crate) fn new(ratio: Option<u32>, included: bool) -> Self {
        BuiltinSegment {
            base: 0,
            ratio,
            stop_ptr: None,
            included,
        }
    }

    fn initialize(&mut self, segments: &mut MemorySegmentManager) {
        // Real segments always have a non-negative index.
        self.base = segments.add().segment_index as usize;
    }

    fn initial_stack(&self) -> Vec<MaybeRelocatable> {
        if self.included {
            vec![MaybeRelocatable::from((self.base as isize, 0))]
        } else {
            vec![]
        }
    }

    fn used_cells(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        segments
            .get_segment_used_size(self.base)
            .ok_or(MemoryError::MissingSegmentUsedSizes)
    }
}

/// The builtins a run can attach to the VM.
///
/// A closed set: adding a builtin means adding a variant, and every match
/// below then points at what the new builtin has to provide.
#[derive(Debug, Clone)]
pub enum BuiltinRunner {
    Output(OutputBuiltinRunner),
    Hash(HashBuiltinRunner),
    RangeCheck(RangeCheckBuiltinRunner),
    Signature(SignatureBuiltinRunner),
    Bitwise(BitwiseBuiltinRunner),
    EcOp(EcOpBuiltinRunner),
    Keccak(KeccakBuiltinRunner),
    Poseidon(PoseidonBuiltinRunner),
}

impl BuiltinRunner {
    fn segment(&self) -> &BuiltinSegment {
        match self {
            BuiltinRunner::Output(b) => &b.segment,
            BuiltinRunner::Hash(b) => &b.segment,
            BuiltinRunner::RangeCheck(b) => &b.segment,
            BuiltinRunner::Signature(b) => &b.segment,
            BuiltinRunner::Bitwise(b) => &b.segment,
            BuiltinRunner::EcOp(b) => &b.segment,
            BuiltinRunner::Keccak(b) => &b.segment,
            BuiltinRunner::Poseidon(b) => &b.segment,
        }
    }

    fn segment_mut(&mut self) -> &mut BuiltinSegment {
        match self {
            BuiltinRunner::Output(b) => &mut b.segment,
            BuiltinRunner::Hash(b) => &mut b.segment,
            BuiltinRunner::RangeCheck(b) => &mut b.segment,
            BuiltinRunner::Signature(b) => &mut b.segment,
            BuiltinRunner::Bitwise(b) => &mut b.segment,
            BuiltinRunner::EcOp(b) => &mut b.segment,
            BuiltinRunner::Keccak(b) => &mut b.segment,
            BuiltinRunner::Poseidon(b) => &mut b.segment,
        }
    }

    pub fn name(&self) -> BuiltinName {
        match self {
            BuiltinRunner::Output(_) => BuiltinName::output,
            BuiltinRunner::Hash(_) => BuiltinName::pedersen,
            BuiltinRunner::RangeCheck(_) => BuiltinName::range_check,
            BuiltinRunner::Signature(_) => BuiltinName::ecdsa,
            BuiltinRunner::Bitwise(_) => BuiltinName::bitwise,
            BuiltinRunner::EcOp(_) => BuiltinName::ec_op,
            BuiltinRunner::Keccak(_) => BuiltinName::keccak,
            BuiltinRunner::Poseidon(_) => BuiltinName::poseidon,
        }
    }

    /// Index of the segment owned by the builtin.
    pub fn base(&self) -> usize {
        self.segment().base
    }

    pub fn ratio(&self) -> Option<u32> {
        match self {
            BuiltinRunner::Output(_) => None,
            _ => self.segment().ratio,
        }
    }

    /// Whether the program declared the builtin, as opposed to the layout
    /// adding it for proof mode.
    pub fn included(&self) -> bool {
        self.segment().included
    }

    pub(crate) fn stop_ptr(&self) -> Option<usize> {
        self.segment().stop_ptr
    }

    pub(crate) fn set_stop_ptr(&mut self, stop_ptr: usize) {
        self.segment_mut().stop_ptr = Some(stop_ptr)
    }

    /// Allocates the builtin's segment.
    pub fn initialize_segments(&mut self, segments: &mut MemorySegmentManager) {
        self.segment_mut().initialize(segments)
    }

    /// The builtin's pointer as passed to `main`, if the program uses it.
    pub fn initial_stack(&self) -> Vec<MaybeRelocatable> {
        self.segment().initial_stack()
    }

    pub fn add_validation_rule(&self, memory: &mut Memory) {
        match self {
            BuiltinRunner::RangeCheck(range_check) => range_check.add_validation_rule(memory),
            BuiltinRunner::Signature(signature) => signature.add_validation_rule(memory),
            _ => {}
        }
    }

    /// Tries to compute the value at `address`, inside the builtin's segment.
    ///
    /// `Ok(None)` means the builtin has nothing to say about the cell: it is an
    /// input cell, or some input is still missing.
    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        match self {
            BuiltinRunner::Bitwise(bitwise) => bitwise.deduce_memory_cell(address, memory),
            BuiltinRunner::EcOp(ec_op) => ec_op.deduce_memory_cell(address, memory),
            BuiltinRunner::Hash(hash) => hash.deduce_memory_cell(address, memory),
            BuiltinRunner::Keccak(keccak) => keccak.deduce_memory_cell(address, memory),
            BuiltinRunner::Poseidon(poseidon) => poseidon.deduce_memory_cell(address, memory),
            BuiltinRunner::Output(_)
            | BuiltinRunner::RangeCheck(_)
            | BuiltinRunner::Signature(_) => Ok(None),
        }
    }

    pub(crate) fn cells_per_instance(&self) -> u32 {
        match self {
            BuiltinRunner::Output(_) => 0,
            BuiltinRunner::Hash(_) => CELLS_PER_HASH,
            BuiltinRunner::RangeCheck(_) => CELLS_PER_RANGE_CHECK,
            BuiltinRunner::Signature(_) => CELLS_PER_SIGNATURE,
            BuiltinRunner::Bitwise(_) => CELLS_PER_BITWISE,
            BuiltinRunner::EcOp(_) => CELLS_PER_EC_OP,
            BuiltinRunner::Keccak(_) => CELLS_PER_KECCAK,
            BuiltinRunner::Poseidon(_) => CELLS_PER_POSEIDON,
        }
    }

    pub(crate) fn n_input_cells(&self) -> u32 {
        match self {
            BuiltinRunner::Output(_) => 0,
            BuiltinRunner::Hash(_) => INPUT_CELLS_PER_HASH,
            BuiltinRunner::RangeCheck(_) => CELLS_PER_RANGE_CHECK,
            BuiltinRunner::Signature(_) => CELLS_PER_SIGNATURE,
            BuiltinRunner::Bitwise(_) => INPUT_CELLS_PER_BITWISE,
            BuiltinRunner::EcOp(_) => INPUT_CELLS_PER_EC_OP,
            BuiltinRunner::Keccak(_) => INPUT_CELLS_PER_KECCAK,
            BuiltinRunner::Poseidon(_) => INPUT_CELLS_PER_POSEIDON,
        }
    }

    fn instances_per_component(&self) -> u32 {
        match self {
            BuiltinRunner::Keccak(_) => KECCAK_INSTANCES_PER_COMPONENT,
            _ => BUILTIN_INSTANCES_PER_COMPONENT,
        }
    }

    pub fn get_memory_segment_addresses(&self) -> (usize, Option<usize>) {
        (self.base(), self.stop_ptr())
    }

    /// Size of the builtin's segment. Needs the segments' effective sizes.
    pub fn get_used_cells(&self, segments: &MemorySegmentManager) -> Result<usize, MemoryError> {
        self.segment().used_cells(segments)
    }

    pub fn get_used_instances(
        &self,
        segments: &MemorySegmentManager,
    ) -> Result<usize, MemoryError> {
        let used_cells = self.get_used_cells(segments)?;
        match self {
            BuiltinRunner::Output(_) => Ok(used_cells),
            _ => Ok(div_ceil(used_cells, self.cells_per_instance() as usize)),
        }
    }

    /// Instances the layout grants the builtin after `vm.current_step` steps.
    pub fn get_allocated_instances(&self, vm: &VirtualMachine) -> Result<usize, MemoryError> {
        if let BuiltinRunner::Output(_) = self {
            return Ok(0);
        }
        let instances_per_component = self.instances_per_component() as usize;
        match self.ratio() {
            None => {
                let instances = self.get_used_instances(&vm.segments)?;
                let components = match instances {
                    0 => 0,
                    used => div_ceil(used, instances_per_component).next_power_of_two(),
                };
                Ok(instances_per_component * components)
            }
            Some(0) => Ok(0),
            Some(ratio) => {
                let min_step = ratio as usize * instances_per_component;
                if vm.current_step < min_step {
                    return Err(InsufficientAllocatedCellsError::MinStepNotReached(Box::new((
                        min_step,
                        self.name().to_str_with_suffix(),
                    )))
                    .into());
                }
                Ok(vm.current_step / ratio as usize)
            }
        }
    }

    pub fn get_allocated_memory_units(&self, vm: &VirtualMachine) -> Result<usize, MemoryError> {
        Ok(self.get_allocated_instances(vm)? * self.cells_per_instance() as usize)
    }

    /// Used cells of the segment, and how many it may hold.
    pub fn get_used_cells_and_allocated_size(
        &self,
        vm: &VirtualMachine,
    ) -> Result<(usize, usize), MemoryError> {
        let used_cells = self.get_used_cells(&vm.segments)?;
        if let BuiltinRunner::Output(_) = self {
            return Ok((used_cells, used_cells));
        }
        if vm.disable_trace_padding {
            // Without trace padding the instance count is still padded to a
            // power of two, and at least MIN_N_INSTANCES_IN_BUILTIN_SEGMENT.
            let num_instances = self.get_used_instances(&vm.segments)?;
            let padded_cells = match num_instances {
                0 => 0,
                n => {
                    MIN_N_INSTANCES_IN_BUILTIN_SEGMENT.max(n.next_power_of_two())
                        * self.cells_per_instance() as usize
                }
            };
            return Ok((used_cells, padded_cells));
        }
        let size = self.get_allocated_memory_units(vm)?;
        if used_cells > size {
            return Err(InsufficientAllocatedCellsError::BuiltinCells(Box::new((
                self.name().to_str_with_suffix(),
                used_cells,
                size,
            )))
            .into());
        }
        Ok((used_cells, size))
    }

    /// Smallest and largest 16-bit part checked by a range-check builtin.
    pub fn get_range_check_usage(&self, memory: &Memory) -> Option<(usize, usize)> {
        match self {
            BuiltinRunner::RangeCheck(range_check) => range_check.get_range_check_usage(memory),
            _ => None,
        }
    }

    /// Number of range-check units used by the builtin.
    pub fn get_used_perm_range_check_units(
        &self,
        vm: &VirtualMachine,
    ) -> Result<usize, MemoryError> {
        match self {
            BuiltinRunner::RangeCheck(range_check) => {
                let (used_cells, _) = self.get_used_cells_and_allocated_size(vm)?;
                Ok(used_cells * range_check.n_parts() as usize)
            }
            _ => Ok(0),
        }
    }

    /// Reads the stop pointer the program returned for this builtin.
    ///
    /// `pointer` is the current end of the return values; the stop pointer sits
    /// just below it. Returns the pointer past which the next builtin's stop
    /// pointer is found.
    pub fn final_stack(
        &mut self,
        segments: &MemorySegmentManager,
        pointer: Relocatable,
    ) -> Result<Relocatable, RunnerError> {
        if !self.included() {
            self.set_stop_ptr(0);
            return Ok(pointer);
        }
        let name = self.name();
        let stop_pointer_addr =
            (pointer - 1).map_err(|_| RunnerError::NoStopPointer(Box::new(name)))?;
        let stop_pointer = segments
            .memory
            .get_relocatable(stop_pointer_addr)
            .map_err(|_| RunnerError::NoStopPointer(Box::new(name)))?;
        if self.base() as isize != stop_pointer.segment_index {
            return Err(RunnerError::InvalidStopPointerIndex(Box::new((
                name,
                stop_pointer,
                self.base(),
            ))));
        }
        let used = match self {
            BuiltinRunner::Output(_) => self.get_used_cells(segments)?,
            _ => self.get_used_instances(segments)? * self.cells_per_instance() as usize,
        };
        if stop_pointer.offset != used {
            return Err(RunnerError::InvalidStopPointer(Box::new((
                name,
                Relocatable::from((self.base() as isize, used)),
                stop_pointer,
            ))));
        }
        self.set_stop_ptr(stop_pointer.offset);
        Ok(stop_pointer_addr)
    }

    /// Checks that every instance written to the segment is complete and that
    /// the output cells nobody wrote still deduce.
    pub fn run_security_checks(&self, vm: &VirtualMachine) -> Result<(), VirtualMachineError> {
        if let BuiltinRunner::Output(_) = self {
            return Ok(());
        }
        let cells_per_instance = self.cells_per_instance() as usize;
        let n_input_cells = self.n_input_cells() as usize;
        let base = self.base();
        let segment = match vm.segments.memory.data.get(base) {
            Some(segment) if !segment.is_empty() => segment,
            _ => return Ok(()),
        };
        let is_set = |offset: usize| matches!(segment.get(offset), Some(Some(_)));
        // The last cell of a segment is always written, so its offset bounds
        // the number of instances.
        let offset_max = segment.len() - 1;
        let offset_len = segment.iter().filter(|cell| cell.is_some()).count();
        let n = offset_max / cells_per_instance + 1;
        if n > offset_len / n_input_cells {
            return Err(
                MemoryError::MissingMemoryCells(Box::new(self.name().to_str_with_suffix())).into(),
            );
        }
        let missing_offsets: Vec<usize> = (0..n)
            .flat_map(|i| (0..n_input_cells).map(move |j| cells_per_instance * i + j))
            .filter(|offset| !is_set(*offset))
            .collect();
        if !missing_offsets.is_empty() {
            return Err(MemoryError::MissingMemoryCellsWithOffsets(Box::new((
                self.name().to_str_with_suffix(),
                missing_offsets,
            )))
            .into());
        }
        // Output cells that were written are covered by verify_auto_deductions.
        for i in 0..n {
            for offset in (cells_per_instance * i + n_input_cells)..(cells_per_instance * (i + 1)) {
                if !is_set(offset) {
                    vm.verify_auto_deductions_for_addr(
                        Relocatable::from((base as isize, offset)),
                        self,
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl From<OutputBuiltinRunner> for BuiltinRunner {
    fn from(runner: OutputBuiltinRunner) -> Self {
        BuiltinRunner::Output(runner)
    }
}

impl From<HashBuiltinRunner> for BuiltinRunner {
    fn from(runner: HashBuiltinRunner) -> Self {
        BuiltinRunner::Hash(runner)
    }
}

impl From<RangeCheckBuiltinRunner> for BuiltinRunner {
    fn from(runner: RangeCheckBuiltinRunner) -> Self {
        BuiltinRunner::RangeCheck(runner)
    }
}

impl From<SignatureBuiltinRunner> for BuiltinRunner {
    fn from(runner: SignatureBuiltinRunner) -> Self {
        BuiltinRunner::Signature(runner)
    }
}

impl From<BitwiseBuiltinRunner> for BuiltinRunner {
    fn from(runner: BitwiseBuiltinRunner) -> Self {
        BuiltinRunner::Bitwise(runner)
    }
}

impl From<EcOpBuiltinRunner> for BuiltinRunner {
    fn from(runner: EcOpBuiltinRunner) -> Self {
        BuiltinRunner::EcOp(runner)
    }
}

impl From<KeccakBuiltinRunner> for BuiltinRunner {
    fn from(runner: KeccakBuiltinRunner) -> Self {
        BuiltinRunner::Keccak(runner)
    }
}

impl From<PoseidonBuiltinRunner> for BuiltinRunner {
    fn from(runner: PoseidonBuiltinRunner) -> Self {
        BuiltinRunner::Poseidon(runner)
    }
}
