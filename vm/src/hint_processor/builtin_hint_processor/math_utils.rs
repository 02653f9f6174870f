use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{
            get_integer_from_var_name, get_maybe_relocatable_from_var_name, insert_value_into_ap,
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::relocatable::MaybeRelocatable,
    utils::PRIME_STR,
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

//Implements hint: memory[ap] = 0 if 0 <= (ids.a % PRIME) < range_check_builtin.bound else 1
pub fn is_nn(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?.into_owned();
    let bound = vm.get_range_check_builtin()?.bound();
    let value = if &a >= bound {
        Felt252::ONE
    } else {
        Felt252::ZERO
    };
    insert_value_into_ap(vm, value)
}

/* Implements hint:
from starkware.cairo.common.math_utils import assert_integer
%{
    assert_integer(ids.a)
    assert 0 <= ids.a % PRIME < range_check_builtin.bound, f'a = {ids.a} is out of range.'
%}
*/
pub fn assert_nn(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let a = get_integer_from_var_name("a", vm, ids_data, ap_tracking)?;
    let range_check_builtin = vm.get_range_check_builtin()?;
    if a.as_ref() >= range_check_builtin.bound() {
        return Err(HintError::AssertNNValueOutOfRange(Box::new(a.into_owned())));
    }
    Ok(())
}

/* Implements hint:
%{
    from starkware.cairo.common.math_utils import assert_integer
    assert_integer(ids.value)
    assert ids.value % PRIME != 0, f'assert_not_zero failed: {ids.value} = 0.'
%}
*/
pub fn assert_not_zero(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let value = get_integer_from_var_name("value", vm, ids_data, ap_tracking)?;
    if *value == Felt252::ZERO {
        return Err(HintError::AssertNotZero(Box::new((
            value.into_owned(),
            PRIME_STR.to_string(),
        ))));
    }
    Ok(())
}

/* Implements hint:
%{
    from starkware.cairo.lang.vm.relocatable import RelocatableValue
    both_ints = isinstance(ids.a, int) and isinstance(ids.b, int)
    both_relocatable = (
        isinstance(ids.a, RelocatableValue) and isinstance(ids.b, RelocatableValue) and
        ids.a.segment_index == ids.b.segment_index)
    assert both_ints or both_relocatable, \
        f'assert_not_equal failed: non-comparable values: {ids.a}, {ids.b}.'
    assert (ids.a - ids.b) % PRIME != 0, f'assert_not_equal failed: {ids.a} = {ids.b}.'
%}
*/
pub fn assert_not_equal(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let maybe_rel_a = get_maybe_relocatable_from_var_name("a", vm, ids_data, ap_tracking)?;
    let maybe_rel_b = get_maybe_relocatable_from_var_name("b", vm, ids_data, ap_tracking)?;
    let equal = match (&maybe_rel_a, &maybe_rel_b) {
        (MaybeRelocatable::Int(a), MaybeRelocatable::Int(b)) => a == b,
        (MaybeRelocatable::RelocatableValue(a), MaybeRelocatable::RelocatableValue(b))
            if a.segment_index == b.segment_index =>
        {
            a.offset == b.offset
        }
        _ => {
            return Err(HintError::AssertNotEqualNonComparable(Box::new((
                maybe_rel_a,
                maybe_rel_b,
            ))))
        }
    };
    if equal {
        return Err(HintError::AssertNotEqualFail(Box::new((
            maybe_rel_a,
            maybe_rel_b,
        ))));
    }
    Ok(())
}
