use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            hint_utils::{get_integer_from_var_name, insert_value_into_ap},
            memset_utils::decrement_counter,
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::exec_scope::{ExecutionScopes, ScopeValue},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

//Implements hint: memory[ap] = segments.add()
pub fn add_segment(vm: &mut VirtualMachine) -> Result<(), HintError> {
    let new_segment_base = vm.add_memory_segment();
    insert_value_into_ap(vm, new_segment_base)
}

//Implements hint: vm_enter_scope()
pub fn enter_scope(exec_scopes: &mut ExecutionScopes) -> Result<(), HintError> {
    exec_scopes.enter_scope(HashMap::new());
    Ok(())
}

//  Implements hint:
//  %{ vm_exit_scope() %}
pub fn exit_scope(exec_scopes: &mut ExecutionScopes) -> Result<(), HintError> {
    exec_scopes.exit_scope().map_err(HintError::FromScopeError)
}

//  Implements hint:
//  %{ vm_enter_scope({'n': ids.len}) %}
pub fn memcpy_enter_scope(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let len = get_integer_from_var_name("len", vm, ids_data, ap_tracking)?.into_owned();
    exec_scopes.enter_scope(HashMap::from([(String::from("n"), ScopeValue::Felt(len))]));
    Ok(())
}

/* Implements hint:
%{
    n -= 1
    ids.continue_copying = 1 if n > 0 else 0
%}
*/
pub fn memcpy_continue_copying(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    decrement_counter("continue_copying", vm, exec_scopes, ids_data, ap_tracking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hint_processor::builtin_hint_processor::hint_code,
        relocatable,
        types::relocatable::MaybeRelocatable,
        utils::test_utils::*,
        vm::errors::exec_scope_errors::ExecScopeError,
        Felt252,
    };
    use assert_matches::assert_matches;

    #[test]
    fn add_segment_writes_base_at_ap() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        run_context!(vm, 0, 3, 3);

        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::ADD_SEGMENT),
            Ok(())
        );
        assert_eq!(vm.segments.num_segments(), 3);
        assert_eq!(
            vm.get_maybe(&relocatable!(1, 3)),
            Some(MaybeRelocatable::from((2, 0)))
        );
    }

    #[test]
    fn enter_and_exit_scope() {
        let mut vm = vm!();
        let mut exec_scopes = ExecutionScopes::new();

        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::VM_ENTER_SCOPE, &mut exec_scopes),
            Ok(())
        );
        assert_eq!(exec_scopes.data.len(), 2);
        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::VM_EXIT_SCOPE, &mut exec_scopes),
            Ok(())
        );
        assert_eq!(exec_scopes.data.len(), 1);
    }

    #[test]
    fn exit_main_scope_fails() {
        let mut vm = vm!();
        assert_matches!(
            run_hint!(vm, HashMap::new(), hint_code::VM_EXIT_SCOPE),
            Err(HintError::FromScopeError(ExecScopeError::ExitMainScopeError))
        );
    }

    #[test]
    fn memcpy_enter_scope_stores_len() {
        let mut vm = vm!();
        vm.segments = segments![((1, 0), 3)];
        run_context!(vm, 0, 1, 1);
        let ids_data = ids_data!["len"];
        let mut exec_scopes = ExecutionScopes::new();

        assert_matches!(
            run_hint!(vm, ids_data, hint_code::MEMCPY_ENTER_SCOPE, &mut exec_scopes),
            Ok(())
        );
        check_scope_value(&exec_scopes, "n", ScopeValue::Felt(Felt252::from(3)));
    }

    #[test]
    fn memcpy_enter_scope_missing_len() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        run_context!(vm, 0, 1, 1);
        let ids_data = ids_data!["size"];

        assert_matches!(
            run_hint!(vm, ids_data, hint_code::MEMCPY_ENTER_SCOPE),
            Err(HintError::UnknownIdentifier(name)) if &*name == "len"
        );
    }

    #[test]
    fn memcpy_continue_copying_counts_down() {
        let mut vm = vm!();
        add_segments!(vm, 3);
        run_context!(vm, 0, 1, 1);
        let ids_data = ids_data!["continue_copying"];
        let mut exec_scopes = scope![("n", Felt252::from(2))];

        assert_matches!(
            run_hint!(vm, ids_data.clone(), hint_code::MEMCPY_CONTINUE_COPYING, &mut exec_scopes),
            Ok(())
        );
        check_memory![vm.segments.memory, ((1, 0), 1)];

        // Second pass writes into a fresh frame.
        vm.run_context.fp = relocatable!(2, 1);
        assert_matches!(
            run_hint!(vm, ids_data, hint_code::MEMCPY_CONTINUE_COPYING, &mut exec_scopes),
            Ok(())
        );
        check_memory![vm.segments.memory, ((2, 0), 0)];
        check_scope_value(&exec_scopes, "n", ScopeValue::Felt(Felt252::ZERO));
    }
}
