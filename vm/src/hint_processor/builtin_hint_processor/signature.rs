use std::collections::HashMap;

use crate::{
    hint_processor::{
        builtin_hint_processor::hint_utils::{get_integer_from_var_name, get_ptr_from_var_name},
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::instance_definitions::CELLS_PER_SIGNATURE,
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

/*
Implements hint:
%{ ecdsa_builtin.add_signature(ids.ecdsa_ptr.address_, (ids.signature_r, ids.signature_s)) %}
*/
pub fn verify_ecdsa_signature(
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let signature_r =
        get_integer_from_var_name("signature_r", vm, ids_data, ap_tracking)?.into_owned();
    let signature_s =
        get_integer_from_var_name("signature_s", vm, ids_data, ap_tracking)?.into_owned();
    let ecdsa_ptr = get_ptr_from_var_name("ecdsa_ptr", vm, ids_data, ap_tracking)?;
    let ecdsa_builtin = vm.get_signature_builtin()?;
    if ecdsa_ptr.segment_index != ecdsa_builtin.segment.base as isize {
        return Err(HintError::AddSignatureWrongEcdsaPtr(Box::new(ecdsa_ptr)));
    }
    if ecdsa_ptr.offset % CELLS_PER_SIGNATURE as usize != 0 {
        return Err(HintError::AddSignatureNotAPublicKey(Box::new(ecdsa_ptr)));
    }
    ecdsa_builtin.add_signature(ecdsa_ptr, &(signature_r, signature_s));
    Ok(())
}
