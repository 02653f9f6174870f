use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{
            get_integer_from_var_name, insert_value_from_var_name,
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::exec_scope::{ExecutionScopes, ScopeValue},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

//  Implements hint:
//  %{ vm_enter_scope({'n': ids.n}) %}
pub fn memset_enter_scope(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let n = get_integer_from_var_name("n", vm, ids_data, ap_tracking)?.into_owned();
    exec_scopes.enter_scope(HashMap::from([(String::from("n"), ScopeValue::Felt(n))]));
    Ok(())
}

/* Implements hint:
%{
    n -= 1
    ids.continue_loop = 1 if n > 0 else 0
%}
*/
pub fn memset_continue_loop(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    decrement_counter("continue_loop", vm, exec_scopes, ids_data, ap_tracking)
}

/// Decrements the scope variable `n` and writes `1` into `flag_name` while
/// it stays positive, `0` once it reaches zero.
pub(crate) fn decrement_counter(
    flag_name: &str,
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let n = exec_scopes.get_felt("n")?;
    let should_continue = if n > Felt252::ONE {
        Felt252::ONE
    } else {
        Felt252::ZERO
    };
    insert_value_from_var_name(flag_name, should_continue, vm, ids_data, ap_tracking)?;
    exec_scopes.assign_or_update_variable("n", ScopeValue::Felt(n - Felt252::ONE));
    Ok(())
}
