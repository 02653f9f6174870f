use num_traits::ToPrimitive;

use super::{
    errors::{runner_errors::RunnerError, vm_errors::VirtualMachineError},
    runners::cairo_runner::CairoRunner,
};
use crate::types::relocatable::MaybeRelocatable;

/// Verify that the completed run in a runner is safe to be relocated and be
/// used by other Cairo programs.
///
/// Checks include:
///   - (Only if `verify_builtins` is set to true) All accesses to the builtin segments must be
///     within the range defined by the builtins themselves.
///   - There must not be accesses to the program segment outside the program data range.
///     `program_segment_size` is used instead of the program data length if available.
///   - All addresses in memory must be real: no temporary segment may be left
///     with data, and no value may point into a temporary segment.
///
/// Note: Each builtin is responsible for checking its own segments' data.
pub fn verify_secure_runner(
    runner: &CairoRunner,
    verify_builtins: bool,
    program_segment_size: Option<usize>,
) -> Result<(), VirtualMachineError> {
    let vm = &runner.vm;
    let builtins_segment_info = match verify_builtins {
        true => runner.get_builtin_segments_info()?,
        false => Vec::new(),
    };
    for (index, stop_ptr) in builtins_segment_info {
        let current_size = vm
            .segments
            .memory
            .data
            .get(index)
            .map(|segment| segment.len());
        // + 1 here accounts for maximum segment offset being segment.len() -1
        if current_size >= Some(stop_ptr + 1) {
            return Err(VirtualMachineError::OutOfBoundsBuiltinSegmentAccess);
        }
    }

    let program_segment_index = runner
        .program_base
        .and_then(|rel| rel.segment_index.to_usize())
        .ok_or(RunnerError::NoProgBase)?;
    let program_segment_size = program_segment_size.unwrap_or(runner.program.shared.data.len());
    let program_length = vm
        .segments
        .memory
        .data
        .get(program_segment_index)
        .map(|segment| segment.len());
    if program_length >= Some(program_segment_size + 1) {
        return Err(VirtualMachineError::OutOfBoundsProgramSegmentAccess);
    }

    // A temporary segment still holding data was never relocated.
    if let Some(index) = vm
        .segments
        .memory
        .temp_data
        .iter()
        .position(|segment| segment.iter().any(Option::is_some))
    {
        return Err(VirtualMachineError::InvalidMemoryAddressTemporarySegment(
            -(index as isize) - 1,
        ));
    }
    for cell in vm.segments.memory.data.iter().flatten().flatten() {
        if let MaybeRelocatable::RelocatableValue(addr) = cell.get_value() {
            if addr.segment_index < 0 {
                return Err(VirtualMachineError::InvalidMemoryValueTemporaryAddress(
                    Box::new(*addr),
                ));
            }
        }
    }

    for builtin in vm.builtin_runners.iter() {
        builtin.run_security_checks(vm)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtin_name::BuiltinName;
    use crate::types::layout_name::LayoutName;
    use crate::vm::errors::memory_errors::MemoryError;
    use crate::Felt252;
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    #[test]
    fn verify_secure_runner_without_program_base() {
        let program = program!();
        let runner = cairo_runner!(program);

        assert_matches!(
            verify_secure_runner(&runner, true, None),
            Err(VirtualMachineError::RunnerError(RunnerError::NoProgBase))
        );
    }

    #[test]
    fn verify_secure_runner_empty_memory() {
        let program = program!(main = Some(0),);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments.compute_effective_sizes();
        assert_matches!(verify_secure_runner(&runner, true, None), Ok(()));
    }

    #[test]
    fn verify_secure_runner_program_access_out_of_bounds() {
        let program = program!(main = Some(0),);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments = segments![((0, 0), 100)];
        runner.vm.segments.segment_used_sizes = Some(vec![1]);

        assert_matches!(
            verify_secure_runner(&runner, true, None),
            Err(VirtualMachineError::OutOfBoundsProgramSegmentAccess)
        );
    }

    #[test]
    fn verify_secure_runner_program_with_program_size() {
        let program = program!(main = Some(0),);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments = segments![((0, 0), 100)];
        runner.vm.segments.segment_used_sizes = Some(vec![1]);

        assert_matches!(verify_secure_runner(&runner, true, Some(1)), Ok(()));
    }

    #[test]
    fn verify_secure_runner_builtin_access_out_of_bounds() {
        let program = program!(main = Some(0), builtins = vec![BuiltinName::range_check],);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.builtin_runners[0].set_stop_ptr(0);
        runner.vm.segments.memory = memory![((2, 0), 1)];
        runner.vm.segments.segment_used_sizes = Some(vec![0, 0, 0, 0]);

        assert_matches!(
            verify_secure_runner(&runner, true, None),
            Err(VirtualMachineError::OutOfBoundsBuiltinSegmentAccess)
        );
    }

    #[test]
    fn verify_secure_runner_builtin_access_correct() {
        let program = program!(main = Some(0), builtins = vec![BuiltinName::range_check],);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.builtin_runners[0].set_stop_ptr(1);
        runner.vm.segments.memory = memory![((2, 0), 1)];
        runner.vm.segments.segment_used_sizes = Some(vec![0, 0, 1, 0]);

        assert_matches!(verify_secure_runner(&runner, true, None), Ok(()));
    }

    #[test]
    fn verify_secure_runner_success() {
        let program = program!(
            data = vec![
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
            ],
            main = Some(0),
        );
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments.memory = memory![
            ((0, 0), (1, 0)),
            ((0, 1), (2, 1)),
            ((0, 2), (3, 2)),
            ((0, 3), (4, 3))
        ];
        runner.vm.segments.segment_used_sizes = Some(vec![5, 1, 2, 3, 4]);

        assert_matches!(verify_secure_runner(&runner, true, None), Ok(()));
    }

    #[test]
    fn verify_secure_runner_temporary_memory_properly_relocated() {
        let program = program!(
            data = vec![
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
            ],
            main = Some(0),
        );
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments.memory = memory![
            ((0, 1), (1, 0)),
            ((0, 2), (2, 1)),
            ((0, 3), (3, 2)),
            ((-1, 0), (1, 2))
        ];
        while runner.vm.segments.memory.data.len() < 5 {
            runner.vm.segments.memory.data.push(Vec::new());
        }
        runner
            .vm
            .add_relocation_rule(relocatable!(-1, 0), relocatable!(4, 0))
            .unwrap();
        runner.vm.segments.memory.relocate_memory().unwrap();
        runner.vm.segments.segment_used_sizes = Some(vec![5, 1, 2, 3, 1]);

        assert_matches!(verify_secure_runner(&runner, true, None), Ok(()));
    }

    #[test]
    fn verify_secure_runner_temporary_value_not_relocated() {
        let program = program!(
            data = vec![
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
                Felt252::ZERO.into(),
            ],
            main = Some(0),
        );
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments.memory = memory![
            ((0, 0), (1, 0)),
            ((0, 1), (2, 1)),
            ((0, 2), (-3, 2)),
            ((0, 3), (4, 3))
        ];
        runner.vm.segments.segment_used_sizes = Some(vec![5, 1, 2, 3, 4]);

        assert_matches!(
            verify_secure_runner(&runner, true, None),
            Err(VirtualMachineError::InvalidMemoryValueTemporaryAddress(
                x
            )) if *x == relocatable!(-3, 2)
        );
    }

    #[test]
    fn verify_secure_runner_temporary_segment_not_relocated() {
        let program = program!(main = Some(0),);
        let mut runner = cairo_runner!(program);

        runner.initialize(false).unwrap();
        runner.vm.segments.memory = memory![((0, 0), 1), ((-2, 0), 7)];
        runner.vm.segments.segment_used_sizes = Some(vec![1]);

        assert_matches!(
            verify_secure_runner(&runner, false, Some(1)),
            Err(VirtualMachineError::InvalidMemoryAddressTemporarySegment(-2))
        );
    }

    #[test]
    fn verify_secure_runner_runs_builtin_checks() {
        let program = program!(main = Some(0), builtins = vec![BuiltinName::bitwise],);
        let mut runner = cairo_runner!(program, LayoutName::all_cairo);

        runner.initialize(false).unwrap();
        // A bitwise instance with its second input missing.
        runner.vm.segments.memory = memory![((2, 0), 10), ((2, 4), 14)];
        runner.vm.segments.segment_used_sizes = Some(vec![0, 0, 5, 0]);

        assert_matches!(
            verify_secure_runner(&runner, false, None),
            Err(VirtualMachineError::Memory(
                MemoryError::MissingMemoryCellsWithOffsets(_)
            ))
        );
    }
}
