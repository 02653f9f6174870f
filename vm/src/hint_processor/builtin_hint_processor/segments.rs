use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{get_ptr_from_var_name, insert_value_from_var_name},
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

/*
Implements hint:
%{ memory.add_relocation_rule(src_ptr=ids.src_ptr, dest_ptr=ids.dest_ptr) %}
*/
pub fn relocate_segment(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let src_ptr = get_ptr_from_var_name("src_ptr", vm, ids_data, ap_tracking)?;
    let dest_ptr = get_ptr_from_var_name("dest_ptr", vm, ids_data, ap_tracking)?;

    vm.add_relocation_rule(src_ptr, dest_ptr)?;
    Ok(())
}

/*
Implements hint:
%{ ids.temporary_array = segments.add_temp_segment() %}
*/
pub fn temporary_array(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let temp_segment = vm.add_temporary_segment();
    insert_value_from_var_name("temporary_array", temp_segment, vm, ids_data, ap_tracking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hint_processor::builtin_hint_processor::hint_code, relocatable,
        types::relocatable::MaybeRelocatable, utils::test_utils::*,
        vm::errors::memory_errors::MemoryError,
    };
    use assert_matches::assert_matches;

    #[test]
    fn temporary_array_then_relocate() {
        let mut vm = vm!();
        vm.segments = segments![((1, 1), (2, 0))];
        add_segments!(vm, 1);
        run_context!(vm, 0, 2, 2);

        // ids.temporary_array lives at fp - 2.
        assert_matches!(
            run_hint!(vm, ids_data!["temporary_array", "dest"], hint_code::TEMPORARY_ARRAY),
            Ok(())
        );
        assert_eq!(
            vm.get_maybe(&relocatable!(1, 0)),
            Some(MaybeRelocatable::from((-1, 0)))
        );

        vm.insert_value(relocatable!(-1, 0), 7_usize).unwrap();
        assert_matches!(
            run_hint!(vm, ids_data!["src_ptr", "dest_ptr"], hint_code::RELOCATE_SEGMENT),
            Ok(())
        );
        vm.segments.memory.relocate_memory().unwrap();
        check_memory![vm.segments.memory, ((2, 0), 7)];
    }

    #[test]
    fn relocate_segment_from_real_segment() {
        let mut vm = vm!();
        vm.segments = segments![((1, 0), (2, 0)), ((1, 1), (3, 0))];
        add_segments!(vm, 2);
        run_context!(vm, 0, 2, 2);

        assert_matches!(
            run_hint!(vm, ids_data!["src_ptr", "dest_ptr"], hint_code::RELOCATE_SEGMENT),
            Err(HintError::Memory(MemoryError::AddressNotInTemporarySegment(2)))
        );
    }

    #[test]
    fn relocate_segment_missing_ids() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        let temp = vm.add_temporary_segment();
        vm.insert_value(relocatable!(1, 0), temp).unwrap();
        run_context!(vm, 0, 1, 1);

        assert_matches!(
            run_hint!(vm, ids_data!["src_ptr"], hint_code::RELOCATE_SEGMENT),
            Err(HintError::UnknownIdentifier(name)) if &*name == "dest_ptr"
        );
    }
}
