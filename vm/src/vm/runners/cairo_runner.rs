use std::{
    any::Any,
    collections::{HashMap, HashSet},
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    hint_processor::hint_processor_definition::{HintProcessor, HintReference},
    math_utils::{next_power_of_two, safe_div_usize},
    types::{
        builtin_name::{BuiltinName, CANONICAL_BUILTIN_ORDER},
        exec_scope::ExecutionScopes,
        layout::{CairoLayout, MEMORY_UNITS_PER_STEP},
        layout_name::LayoutName,
        program::{HintsCollection, Program},
        relocatable::{MaybeRelocatable, Relocatable},
    },
    utils::is_subsequence,
    vm::{
        errors::{
            cairo_run_errors::CairoRunError,
            memory_errors::{InsufficientAllocatedCellsError, MemoryError},
            runner_errors::RunnerError,
            trace_errors::TraceError,
            vm_errors::VirtualMachineError,
        },
        runners::builtin_runner::{
            BitwiseBuiltinRunner, BuiltinRunner, EcOpBuiltinRunner, HashBuiltinRunner,
            KeccakBuiltinRunner, OutputBuiltinRunner, PoseidonBuiltinRunner,
            RangeCheckBuiltinRunner, SignatureBuiltinRunner,
        },
        security::verify_secure_runner,
        trace::trace_entry::{relocate_trace_register, RelocatedTraceEntry},
        vm_core::VirtualMachine,
    },
    Felt252,
};

/// An argument passed to an entrypoint run with [`CairoRunner::run_from_entrypoint`].
#[derive(Clone, Debug, PartialEq)]
pub enum CairoArg {
    Single(MaybeRelocatable),
    Array(Vec<MaybeRelocatable>),
    Composed(Vec<CairoArg>),
}

impl From<MaybeRelocatable> for CairoArg {
    fn from(other: MaybeRelocatable) -> Self {
        CairoArg::Single(other)
    }
}

impl From<Vec<MaybeRelocatable>> for CairoArg {
    fn from(other: Vec<MaybeRelocatable>) -> Self {
        CairoArg::Array(other)
    }
}

// ================
//   RunResources
// ================

/// Maintains the resources of a cairo run. Can be used across multiple runners.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct RunResources {
    n_steps: Option<usize>,
}

/// This trait is in charge of overseeing the VM's step usage in contexts where
/// a limited amount of steps are available for a single execution (which may
/// or not be divided into several sub-executions).
/// The runner calls `consume_step` once per executed step and stops as soon
/// as `consumed` turns true.
pub trait ResourceTracker {
    /// Returns true if there are no more steps left to run
    fn consumed(&self) -> bool {
        false
    }
    /// Subtracts 1 step from the available steps
    fn consume_step(&mut self) {}
    /// Returns the available steps for the run
    fn get_n_steps(&self) -> Option<usize> {
        None
    }
    /// Returns a reference to the available resources
    fn run_resources(&self) -> &RunResources {
        &RunResources { n_steps: None }
    }
}

impl RunResources {
    pub fn new(n_steps: usize) -> Self {
        Self {
            n_steps: Some(n_steps),
        }
    }
}

impl ResourceTracker for RunResources {
    fn consumed(&self) -> bool {
        self.n_steps == Some(0)
    }

    fn consume_step(&mut self) {
        if let Some(n_steps) = self.n_steps.as_mut() {
            *n_steps = n_steps.saturating_sub(1);
        }
    }

    fn get_n_steps(&self) -> Option<usize> {
        self.n_steps
    }

    fn run_resources(&self) -> &RunResources {
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerMode {
    ExecutionMode,
    ProofModeCanonical,
}

/// Drives a [`VirtualMachine`] through a whole run of a [`Program`]: segment
/// and builtin setup, the step loop, the end-of-run checks and relocation.
pub struct CairoRunner {
    pub vm: VirtualMachine,
    pub(crate) program: Program,
    layout: CairoLayout,
    final_pc: Option<Relocatable>,
    pub program_base: Option<Relocatable>,
    execution_base: Option<Relocatable>,
    entrypoint: Option<usize>,
    initial_ap: Option<Relocatable>,
    initial_fp: Option<Relocatable>,
    initial_pc: Option<Relocatable>,
    run_ended: bool,
    segments_finalized: bool,
    execution_public_memory: Option<Vec<usize>>,
    runner_mode: RunnerMode,
    pub relocated_memory: Vec<Option<Felt252>>,
    pub exec_scopes: ExecutionScopes,
    pub relocated_trace: Option<Vec<RelocatedTraceEntry>>,
}

impl CairoRunner {
    pub fn new_v2(
        program: &Program,
        layout: LayoutName,
        mode: RunnerMode,
        trace_enabled: bool,
    ) -> Result<CairoRunner, RunnerError> {
        Ok(CairoRunner {
            program: program.clone(),
            vm: VirtualMachine::new(trace_enabled),
            layout: CairoLayout::new(layout),
            final_pc: None,
            program_base: None,
            execution_base: None,
            entrypoint: program.shared.main,
            initial_ap: None,
            initial_fp: None,
            initial_pc: None,
            run_ended: false,
            segments_finalized: false,
            runner_mode: mode,
            relocated_memory: Vec::new(),
            exec_scopes: ExecutionScopes::new(),
            execution_public_memory: match mode {
                RunnerMode::ExecutionMode => None,
                RunnerMode::ProofModeCanonical => Some(Vec::new()),
            },
            relocated_trace: None,
        })
    }

    pub fn new(
        program: &Program,
        layout: LayoutName,
        proof_mode: bool,
        trace_enabled: bool,
    ) -> Result<CairoRunner, RunnerError> {
        let mode = if proof_mode {
            RunnerMode::ProofModeCanonical
        } else {
            RunnerMode::ExecutionMode
        };
        Self::new_v2(program, layout, mode, trace_enabled)
    }

    /// Sets up builtins, segments, the entrypoint stack and the registers.
    /// Returns the pc at which the run ends.
    pub fn initialize(&mut self, allow_missing_builtins: bool) -> Result<Relocatable, RunnerError> {
        self.initialize_builtins(allow_missing_builtins)?;
        self.initialize_segments(None);
        let end = self.initialize_main_entrypoint()?;
        self.initialize_vm()?;
        debug!(
            layout = %self.layout.name,
            builtins = self.vm.builtin_runners.len(),
            %end,
            "runner initialized"
        );
        Ok(end)
    }

    fn is_proof_mode(&self) -> bool {
        self.runner_mode == RunnerMode::ProofModeCanonical
    }

    // The runner for `name` as the layout configures it, if the layout has it.
    fn layout_builtin(&self, name: BuiltinName, included: bool) -> Option<BuiltinRunner> {
        let builtins = &self.layout.builtins;
        let runner = match name {
            BuiltinName::output => {
                if !builtins.output {
                    return None;
                }
                OutputBuiltinRunner::new(included).into()
            }
            BuiltinName::pedersen => HashBuiltinRunner::new(builtins.pedersen?.ratio, included).into(),
            BuiltinName::range_check => {
                RangeCheckBuiltinRunner::new(builtins.range_check?.ratio, included).into()
            }
            BuiltinName::ecdsa => SignatureBuiltinRunner::new(builtins.ecdsa?.ratio, included).into(),
            BuiltinName::bitwise => {
                BitwiseBuiltinRunner::new(builtins.bitwise?.ratio, included).into()
            }
            BuiltinName::ec_op => EcOpBuiltinRunner::new(builtins.ec_op.as_ref()?, included).into(),
            BuiltinName::keccak => KeccakBuiltinRunner::new(builtins.keccak?.ratio, included).into(),
            BuiltinName::poseidon => {
                PoseidonBuiltinRunner::new(builtins.poseidon?.ratio, included).into()
            }
        };
        Some(runner)
    }

    /// Creates the builtin runners the program declares, in canonical order.
    ///
    /// In proof mode every builtin of the layout gets a runner, marked as not
    /// included when the program doesn't use it.
    pub fn initialize_builtins(&mut self, allow_missing_builtins: bool) -> Result<(), RunnerError> {
        if !is_subsequence(&self.program.builtins, &CANONICAL_BUILTIN_ORDER) {
            return Err(RunnerError::DisorderedBuiltins);
        }
        let mut program_builtins: HashSet<BuiltinName> =
            self.program.builtins.iter().copied().collect();

        for name in CANONICAL_BUILTIN_ORDER {
            let included = program_builtins.contains(&name);
            if !included && !self.is_proof_mode() {
                continue;
            }
            if let Some(builtin) = self.layout_builtin(name, included) {
                program_builtins.remove(&name);
                self.vm.builtin_runners.push(builtin);
            }
        }

        if !program_builtins.is_empty() && !allow_missing_builtins {
            return Err(RunnerError::NoBuiltinForInstance(Box::new((
                program_builtins,
                self.layout.name,
            ))));
        }
        Ok(())
    }

    ///Creates the necessary segments for the program, execution, and each builtin on the MemorySegmentManager and stores the first adress of each of this new segments as each owner's base
    pub fn initialize_segments(&mut self, program_base: Option<Relocatable>) {
        self.program_base = match program_base {
            Some(base) => Some(base),
            None => Some(self.vm.add_memory_segment()),
        };
        self.execution_base = Some(self.vm.add_memory_segment());
        for builtin_runner in self.vm.builtin_runners.iter_mut() {
            builtin_runner.initialize_segments(&mut self.vm.segments);
        }
    }

    fn initialize_state(
        &mut self,
        entrypoint: usize,
        stack: Vec<MaybeRelocatable>,
    ) -> Result<(), RunnerError> {
        let prog_base = self.program_base.ok_or(RunnerError::NoProgBase)?;
        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        self.initial_pc = Some((prog_base + entrypoint)?);
        self.vm
            .load_data(prog_base, &self.program.shared.data)
            .map_err(RunnerError::MemoryInitializationError)?;

        // The whole program counts as accessed, whether or not it runs.
        for i in 0..self.program.shared.data.len() {
            self.vm.segments.memory.mark_as_accessed((prog_base + i)?);
        }
        self.vm
            .segments
            .load_data(exec_base, &stack)
            .map_err(RunnerError::MemoryInitializationError)?;
        Ok(())
    }

    /// Prepares a call to the function at `entrypoint`: pushes `stack`, then
    /// `return_fp` and a pointer to a fresh end segment. Returns that end
    /// pointer, which is where the run finishes.
    pub fn initialize_function_entrypoint(
        &mut self,
        entrypoint: usize,
        mut stack: Vec<MaybeRelocatable>,
        return_fp: MaybeRelocatable,
    ) -> Result<Relocatable, RunnerError> {
        let end = self.vm.add_memory_segment();
        stack.append(&mut vec![
            return_fp,
            MaybeRelocatable::RelocatableValue(end),
        ]);
        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        self.initial_fp = Some((exec_base + stack.len())?);
        self.initial_ap = self.initial_fp;
        self.initialize_state(entrypoint, stack)?;
        self.final_pc = Some(end);
        Ok(end)
    }

    ///Initializes state for running a program from the main() entrypoint.
    ///In proof mode the execution starts from the `__start__` label rather than main()
    ///and ends at the `__end__` label.
    ///Returns the value of the program counter after returning from main.
    pub fn initialize_main_entrypoint(&mut self) -> Result<Relocatable, RunnerError> {
        let mut stack = Vec::new();
        {
            let builtin_runners = self
                .vm
                .builtin_runners
                .iter()
                .map(|b| (b.name(), b))
                .collect::<HashMap<_, _>>();
            for builtin_name in &self.program.builtins {
                match builtin_runners.get(builtin_name) {
                    Some(builtin_runner) => stack.append(&mut builtin_runner.initial_stack()),
                    None => stack.push(Felt252::ZERO.into()),
                }
            }
        }

        if self.is_proof_mode() {
            // [fp - 2] = fp and [fp - 1] = 0 let the verifier check the
            // initial frame, so both cells go to the public memory.
            let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
            let target_offset: usize = 2;
            let mut stack_prefix = vec![
                MaybeRelocatable::from((exec_base + target_offset)?),
                MaybeRelocatable::from(Felt252::ZERO),
            ];
            stack_prefix.extend(stack);

            self.execution_public_memory = Some((0..stack_prefix.len()).collect());
            let start = self.program.shared.start.ok_or(RunnerError::NoProgramStart)?;
            self.initialize_state(start, stack_prefix)?;

            self.initial_fp = Some((exec_base + target_offset)?);
            self.initial_ap = self.initial_fp;
            let end = self.program.shared.end.ok_or(RunnerError::NoProgramEnd)?;
            let final_pc = (self.program_base.ok_or(RunnerError::NoProgBase)? + end)?;
            self.final_pc = Some(final_pc);
            return Ok(final_pc);
        }

        let return_fp = self.vm.add_memory_segment();
        let main = self.entrypoint.ok_or(RunnerError::MissingMain)?;
        self.initialize_function_entrypoint(main, stack, MaybeRelocatable::RelocatableValue(return_fp))
    }

    /// Loads the initial registers and installs the builtins' validation
    /// rules, validating whatever memory is already there.
    pub fn initialize_vm(&mut self) -> Result<(), RunnerError> {
        self.vm.run_context.pc = self.initial_pc.ok_or(RunnerError::NoPC)?;
        self.vm.run_context.ap = self.initial_ap.ok_or(RunnerError::NoAP)?;
        self.vm.run_context.fp = self.initial_fp.ok_or(RunnerError::NoFP)?;
        for builtin in self.vm.builtin_runners.iter() {
            builtin.add_validation_rule(&mut self.vm.segments.memory);
        }

        self.vm
            .segments
            .memory
            .validate_existing_memory()
            .map_err(RunnerError::MemoryValidationError)
    }

    /// Intitializes the runner in order to run entrypoints other than main:
    /// builtins and segments only, the stack comes with each call.
    pub fn initialize_function_runner(&mut self) -> Result<(), RunnerError> {
        self.initialize_builtins(false)?;
        self.initialize_segments(self.program_base);
        Ok(())
    }

    /// Gets the data used by the HintProcessor to execute each hint
    pub fn get_hint_data(
        &self,
        references: &[HintReference],
        hint_executor: &mut dyn HintProcessor,
    ) -> Result<Vec<Box<dyn Any>>, VirtualMachineError> {
        self.program
            .shared
            .hints_collection
            .iter_hints()
            .map(|hint| {
                hint_executor
                    .compile_hint(
                        &hint.code,
                        &hint.flow_tracking_data.ap_tracking,
                        &hint.flow_tracking_data.reference_ids,
                        references,
                    )
                    .map_err(|_| VirtualMachineError::CompileHintFail(hint.code.clone().into()))
            })
            .collect()
    }

    /// Return CairoRunner.program
    pub fn get_program(&self) -> &Program {
        &self.program
    }

    /// Runs steps until `pc == address`, or until the hint processor's
    /// resources are used up, which is an error.
    pub fn run_until_pc(
        &mut self,
        address: Relocatable,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        let hint_data = self.get_hint_data(&self.program.shared.references, hint_processor)?;
        debug!(%address, hints = hint_data.len(), "running until pc");
        while self.vm.get_pc() != address && !hint_processor.consumed() {
            let pc_hint_data =
                hint_data_for_pc(&self.program.shared.hints_collection, &hint_data, self.vm.get_pc());
            self.vm
                .step(
                    hint_processor,
                    &mut self.exec_scopes,
                    pc_hint_data,
                    &self.program.constants,
                )
                .map_err(|err| with_hint_code(&self.program.shared.hints_collection, err))?;
            hint_processor.consume_step();
        }

        if self.vm.get_pc() != address {
            return Err(VirtualMachineError::UnfinishedExecution);
        }
        debug!(steps = self.vm.current_step, "run finished");
        Ok(())
    }

    /// Execute an exact number of steps on the program from the actual position.
    pub fn run_for_steps(
        &mut self,
        steps: usize,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        let hint_data = self.get_hint_data(&self.program.shared.references, hint_processor)?;
        for remaining_steps in (1..=steps).rev() {
            if self.final_pc == Some(self.vm.get_pc()) {
                return Err(VirtualMachineError::EndOfProgram(remaining_steps));
            }
            let pc_hint_data =
                hint_data_for_pc(&self.program.shared.hints_collection, &hint_data, self.vm.get_pc());
            self.vm
                .step(
                    hint_processor,
                    &mut self.exec_scopes,
                    pc_hint_data,
                    &self.program.constants,
                )
                .map_err(|err| with_hint_code(&self.program.shared.hints_collection, err))?;
        }
        Ok(())
    }

    /// Execute steps until a number of steps since the start of the program is reached.
    pub fn run_until_steps(
        &mut self,
        steps: usize,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.run_for_steps(steps.saturating_sub(self.vm.current_step), hint_processor)
    }

    /// Execute steps until the step counter reaches a power of two.
    pub fn run_until_next_power_of_2(
        &mut self,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        self.run_until_steps(next_power_of_two(self.vm.current_step), hint_processor)
    }

    /// Smallest and largest 16-bit value checked during the run, by the
    /// instruction offsets or by the range-check builtin.
    pub fn get_perm_range_check_limits(&self) -> Option<(isize, isize)> {
        let runner_usages = self
            .vm
            .builtin_runners
            .iter()
            .filter_map(|runner| runner.get_range_check_usage(&self.vm.segments.memory))
            .map(|(rc_min, rc_max)| (rc_min as isize, rc_max as isize));
        let rc_bounds = self.vm.rc_limits.iter().copied().chain(runner_usages);
        rc_bounds.reduce(|(min1, max1), (min2, max2)| (min1.min(min2), max1.max(max2)))
    }

    /// Checks that there are enough trace cells to fill the entire range check
    /// range.
    pub fn check_range_check_usage(&self) -> Result<(), VirtualMachineError> {
        let Some((rc_min, rc_max)) = self.get_perm_range_check_limits() else {
            return Ok(());
        };

        let rc_units_used_by_builtins: usize = self
            .vm
            .builtin_runners
            .iter()
            .map(|runner| runner.get_used_perm_range_check_units(&self.vm))
            .sum::<Result<usize, MemoryError>>()?;

        let unused_rc_units = ((self.layout.rc_units as usize - 3) * self.vm.current_step)
            .saturating_sub(rc_units_used_by_builtins);
        let rc_usage = (rc_max - rc_min) as usize;
        if unused_rc_units < rc_usage {
            return Err(MemoryError::InsufficientAllocatedCells(
                InsufficientAllocatedCellsError::RangeCheckUnits(Box::new((
                    unused_rc_units,
                    rc_usage,
                ))),
            )
            .into());
        }
        Ok(())
    }

    /// Count the number of holes present in the segments.
    pub fn get_memory_holes(&self) -> Result<usize, MemoryError> {
        // Builtin segments are excluded, except for the output builtin.
        let builtin_segment_indexes: Vec<usize> = self
            .vm
            .builtin_runners
            .iter()
            .filter(|b| b.name() != BuiltinName::output)
            .map(|b| b.base())
            .collect();

        self.vm.segments.get_memory_holes(&builtin_segment_indexes)
    }

    /// Finishes the run: relocates temporary memory, checks the
    /// auto-deduced cells and, in proof mode, pads the trace until the
    /// layout can hold every builtin cell.
    pub fn end_run(
        &mut self,
        disable_trace_padding: bool,
        disable_finalize_all: bool,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), VirtualMachineError> {
        if self.run_ended {
            return Err(RunnerError::EndRunCalledTwice.into());
        }

        self.vm.segments.memory.relocate_memory()?;
        self.vm.end_run(&self.exec_scopes)?;

        if disable_finalize_all {
            return Ok(());
        }

        self.vm.segments.compute_effective_sizes();
        if self.is_proof_mode() && !disable_trace_padding {
            self.run_until_next_power_of_2(hint_processor)?;
            loop {
                match self.check_used_cells() {
                    Ok(_) => break,
                    Err(VirtualMachineError::Memory(MemoryError::InsufficientAllocatedCells(
                        _,
                    ))) => {}
                    Err(e) => return Err(e),
                }

                self.run_for_steps(1, hint_processor)?;
                self.run_until_next_power_of_2(hint_processor)?;
            }
            debug!(steps = self.vm.current_step, "trace padded");
        }

        self.run_ended = true;
        Ok(())
    }

    ///Relocates the VM's trace, turning relocatable registers to numbered ones
    fn relocate_trace(&mut self, relocation_table: &[usize]) -> Result<(), TraceError> {
        if self.relocated_trace.is_some() {
            return Err(TraceError::AlreadyRelocated);
        }

        let trace = self.vm.trace.as_ref().ok_or(TraceError::TraceNotEnabled)?;
        let relocated_trace = trace
            .iter()
            .map(|entry| relocate_trace_register(entry, relocation_table))
            .collect::<Result<Vec<_>, _>>()?;
        self.relocated_trace = Some(relocated_trace);
        Ok(())
    }

    fn relocate_memory(&mut self, relocation_table: &[usize]) -> Result<(), MemoryError> {
        if !self.relocated_memory.is_empty() {
            return Err(MemoryError::Relocation);
        }
        self.relocated_memory = self.vm.segments.relocate_memory(relocation_table)?;
        Ok(())
    }

    /// Flattens the trace (when enabled) and, if `relocate_mem` is set, the
    /// memory. The relocation table is kept in the VM for later lookups.
    pub fn relocate(&mut self, relocate_mem: bool) -> Result<(), TraceError> {
        self.vm.segments.compute_effective_sizes();
        if !relocate_mem && self.vm.trace.is_none() {
            return Ok(());
        }
        let relocation_table = self.vm.segments.relocate_segments()?;

        if relocate_mem {
            self.relocate_memory(&relocation_table)?;
        }
        if self.vm.trace.is_some() {
            self.relocate_trace(&relocation_table)?;
        }
        debug!(
            segments = relocation_table.len(),
            memory_cells = self.relocated_memory.len(),
            "relocated run"
        );
        self.vm.relocation_table = Some(relocation_table);
        Ok(())
    }

    /// `(segment index, stop pointer offset)` of every builtin.
    pub fn get_builtin_segments_info(&self) -> Result<Vec<(usize, usize)>, RunnerError> {
        self.vm
            .builtin_runners
            .iter()
            .map(|builtin| {
                let (index, stop_ptr) = builtin.get_memory_segment_addresses();
                let stop_ptr =
                    stop_ptr.ok_or_else(|| RunnerError::NoStopPointer(Box::new(builtin.name())))?;
                Ok((index, stop_ptr))
            })
            .collect()
    }

    pub fn get_execution_resources(&self) -> Result<ExecutionResources, RunnerError> {
        let n_steps = self
            .vm
            .trace
            .as_ref()
            .map(|x| x.len())
            .unwrap_or(self.vm.current_step);
        let n_memory_holes = self.get_memory_holes()?;

        let mut builtin_instance_counter = HashMap::new();
        for builtin_runner in &self.vm.builtin_runners {
            builtin_instance_counter.insert(
                builtin_runner.name(),
                builtin_runner.get_used_instances(&self.vm.segments)?,
            );
        }

        Ok(ExecutionResources {
            n_steps,
            n_memory_holes,
            builtin_instance_counter,
        })
    }

    // Finalizes the segments.
    //     Note:
    //     1.  end_run() must precede a call to this method.
    //     2.  Call read_return_values() *before* finalize_segments(), otherwise the return values
    //         will not be included in the public memory.
    pub fn finalize_segments(&mut self) -> Result<(), RunnerError> {
        if self.segments_finalized {
            return Ok(());
        }
        if !self.run_ended {
            return Err(RunnerError::FinalizeNoEndRun);
        }
        let size = self.program.shared.data.len();
        let public_memory = (0..size).map(|i| (i, 0)).collect();
        let program_base = self.program_base.ok_or(RunnerError::NoProgBase)?;
        self.vm.segments.finalize(
            Some(size),
            program_base.segment_index as usize,
            Some(&public_memory),
        );

        let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
        let public_memory = self
            .execution_public_memory
            .as_ref()
            .ok_or(RunnerError::FinalizeSegmentsNoProofMode)?
            .iter()
            .map(|elem| (elem + exec_base.offset, 0))
            .collect();
        self.vm
            .segments
            .finalize(None, exec_base.segment_index as usize, Some(&public_memory));

        for builtin_runner in self.vm.builtin_runners.iter() {
            let (_, size) = builtin_runner
                .get_used_cells_and_allocated_size(&self.vm)
                .map_err(RunnerError::FinalizeSegements)?;
            let public_memory = match builtin_runner {
                // The whole output segment is public.
                BuiltinRunner::Output(_) => Some((0..size).map(|i| (i, 0)).collect()),
                _ => None,
            };
            self.vm
                .segments
                .finalize(Some(size), builtin_runner.base(), public_memory.as_ref());
        }
        self.segments_finalized = true;
        debug!("segments finalized");
        Ok(())
    }

    fn gen_cairo_arg(&mut self, arg: &CairoArg) -> Result<MaybeRelocatable, MemoryError> {
        match arg {
            CairoArg::Single(value) => Ok(value.clone()),
            CairoArg::Array(values) => self.vm.segments.gen_arg(values),
            CairoArg::Composed(args) => {
                let values = args
                    .iter()
                    .map(|arg| self.gen_cairo_arg(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.vm.segments.gen_arg(&values)
            }
        }
    }

    /// Runs a cairo program from a give entrypoint, indicated by its pc offset, with the given arguments.
    /// If `verify_secure` is set to true, [verify_secure_runner] will be called to run extra verifications.
    /// `program_segment_size` is only used by the [verify_secure_runner] function and will be ignored if `verify_secure` is set to false.
    pub fn run_from_entrypoint(
        &mut self,
        entrypoint: usize,
        args: &[&CairoArg],
        verify_secure: bool,
        program_segment_size: Option<usize>,
        hint_processor: &mut dyn HintProcessor,
    ) -> Result<(), CairoRunError> {
        let stack = args
            .iter()
            .map(|arg| self.gen_cairo_arg(arg))
            .collect::<Result<Vec<MaybeRelocatable>, MemoryError>>()?;
        let return_fp = MaybeRelocatable::from(Felt252::ZERO);
        let end = self.initialize_function_entrypoint(entrypoint, stack, return_fp)?;

        self.initialize_vm()?;

        self.run_until_pc(end, hint_processor)?;
        self.end_run(true, false, hint_processor)?;

        if verify_secure {
            verify_secure_runner(self, false, program_segment_size)?;
        }

        Ok(())
    }

    // Returns Ok(()) if there are enough allocated cells for the builtins.
    // If not, the number of steps should be increased or a different layout should be used.
    pub fn check_used_cells(&self) -> Result<(), VirtualMachineError> {
        self.vm
            .builtin_runners
            .iter()
            .map(|builtin_runner| builtin_runner.get_used_cells_and_allocated_size(&self.vm))
            .collect::<Result<Vec<(usize, usize)>, MemoryError>>()?;
        self.check_range_check_usage()?;
        self.check_memory_usage()?;
        Ok(())
    }

    // Checks that there are enough trace cells to fill the entire memory range.
    pub fn check_memory_usage(&self) -> Result<(), VirtualMachineError> {
        let builtins_memory_units: usize = self
            .vm
            .builtin_runners
            .iter()
            .map(|builtin_runner| builtin_runner.get_allocated_memory_units(&self.vm))
            .sum::<Result<usize, MemoryError>>()?;

        // Out of the memory units available per step, a fraction is used for
        // public memory and four are used for the instruction.
        let total_memory_units = MEMORY_UNITS_PER_STEP as usize * self.vm.current_step;
        let public_memory_units = safe_div_usize(
            total_memory_units,
            self.layout.public_memory_fraction as usize,
        )?;
        let instruction_memory_units = 4 * self.vm.current_step;

        let unused_memory_units = total_memory_units.saturating_sub(
            public_memory_units + instruction_memory_units + builtins_memory_units,
        );
        let memory_address_holes = self.get_memory_holes()?;
        if unused_memory_units < memory_address_holes {
            return Err(MemoryError::InsufficientAllocatedCells(
                InsufficientAllocatedCellsError::MemoryAddresses(Box::new((
                    unused_memory_units,
                    memory_address_holes,
                ))),
            )
            .into());
        }
        Ok(())
    }

    /// Reads the builtins' stop pointers off the stack main returned.
    /// In proof mode the return values also become public memory.
    pub fn read_return_values(&mut self, allow_missing_builtins: bool) -> Result<(), RunnerError> {
        if !self.run_ended {
            return Err(RunnerError::ReadReturnValuesNoEndRun);
        }
        let mut pointer = self.vm.get_ap();
        for builtin_name in self.program.builtins.iter().rev() {
            if let Some(builtin_runner) = self
                .vm
                .builtin_runners
                .iter_mut()
                .find(|b| b.name() == *builtin_name)
            {
                pointer = builtin_runner.final_stack(&self.vm.segments, pointer)?;
            } else {
                if !allow_missing_builtins {
                    return Err(RunnerError::MissingBuiltin(*builtin_name));
                }
                pointer.offset = pointer.offset.saturating_sub(1);

                if *self.vm.get_integer(pointer)? != Felt252::ZERO {
                    return Err(RunnerError::MissingBuiltinStopPtrNotZero(*builtin_name));
                }
            }
        }
        if self.segments_finalized {
            return Err(RunnerError::FailedAddingReturnValues);
        }
        if self.is_proof_mode() {
            let exec_base = self.execution_base.ok_or(RunnerError::NoExecBase)?;
            let begin = pointer.offset - exec_base.offset;
            let end = self.vm.get_ap().offset - exec_base.offset;
            self.execution_public_memory
                .as_mut()
                .ok_or(RunnerError::NoExecPublicMemory)?
                .extend(begin..end);
        }
        Ok(())
    }

    // Iterates over the program builtins in reverse, calling BuiltinRunner::final_stack on each of them and returns the final pointer
    pub fn get_builtins_final_stack(
        &mut self,
        stack_ptr: Relocatable,
    ) -> Result<Relocatable, RunnerError> {
        let mut stack_ptr = stack_ptr;
        let program_builtins = &self.program.builtins;
        for runner in self
            .vm
            .builtin_runners
            .iter_mut()
            .rev()
            .filter(|builtin_runner| program_builtins.contains(&builtin_runner.name()))
        {
            stack_ptr = runner.final_stack(&self.vm.segments, stack_ptr)?
        }
        Ok(stack_ptr)
    }
}

/// Attaches the source code of the failing hint to a hint error.
fn with_hint_code(hints_collection: &HintsCollection, err: VirtualMachineError) -> VirtualMachineError {
    match err {
        VirtualMachineError::Hint(mut failure) if failure.0.segment_index == 0 => {
            if let Some(hint) = hints_collection.hints_for_pc(failure.0.offset).get(failure.1) {
                failure.2 = hint.code.as_str().into();
            }
            VirtualMachineError::Hint(failure)
        }
        other => other,
    }
}

// Compiled hints attached to `pc`. Only the program segment carries hints.
fn hint_data_for_pc<'a>(
    hints_collection: &HintsCollection,
    hint_data: &'a [Box<dyn Any>],
    pc: Relocatable,
) -> &'a [Box<dyn Any>] {
    if pc.segment_index != 0 {
        return &[];
    }
    hints_collection
        .get_hint_range_for_pc(pc.offset)
        .and_then(|(start, length)| hint_data.get(start..start + length.get()))
        .unwrap_or(&[])
}

//* ----------------------
//*   ExecutionResources
//* ----------------------

#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
pub struct ExecutionResources {
    pub n_steps: usize,
    pub n_memory_holes: usize,
    pub builtin_instance_counter: HashMap<BuiltinName, usize>,
}

impl ExecutionResources {
    /// Returns a copy of the execution resources where all the builtins with a usage counter
    /// of 0 are omitted.
    pub fn filter_unused_builtins(&self) -> ExecutionResources {
        ExecutionResources {
            n_steps: self.n_steps,
            n_memory_holes: self.n_memory_holes,
            builtin_instance_counter: self
                .builtin_instance_counter
                .iter()
                .filter(|(_, counter)| **counter != 0)
                .map(|(name, counter)| (*name, *counter))
                .collect(),
        }
    }
}

impl Add<&ExecutionResources> for &ExecutionResources {
    type Output = ExecutionResources;

    fn add(self, rhs: &ExecutionResources) -> ExecutionResources {
        let mut new = self.clone();
        new.add_assign(rhs);
        new
    }
}

impl AddAssign<&ExecutionResources> for ExecutionResources {
    fn add_assign(&mut self, rhs: &ExecutionResources) {
        self.n_steps += rhs.n_steps;
        self.n_memory_holes += rhs.n_memory_holes;
        for (k, v) in rhs.builtin_instance_counter.iter() {
            *self.builtin_instance_counter.entry(*k).or_insert(0) += v;
        }
    }
}
