use std::{borrow::Cow, collections::HashMap};

use crate::{
    hint_processor::{
        hint_processor_definition::HintReference,
        hint_processor_utils::{
            compute_addr_from_reference, get_integer_from_reference,
            get_maybe_relocatable_from_reference, get_ptr_from_reference,
        },
    },
    serde::deserialize_program::ApTracking,
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

fn unknown_identifier(var_name: &str) -> HintError {
    HintError::UnknownIdentifier(var_name.into())
}

pub fn get_reference_from_var_name<'a>(
    var_name: &str,
    ids_data: &'a HashMap<String, HintReference>,
) -> Result<&'a HintReference, HintError> {
    ids_data
        .get(var_name)
        .ok_or_else(|| unknown_identifier(var_name))
}

//Gets the address, as a Relocatable of the variable given by the ids name
pub fn get_relocatable_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    compute_addr_from_reference(reference, vm, ap_tracking)
        .ok_or_else(|| unknown_identifier(var_name))
}

//Inserts value into the address of the given ids variable
pub fn insert_value_from_var_name(
    var_name: &str,
    value: impl Into<MaybeRelocatable>,
    vm: &mut VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let var_address = get_relocatable_from_var_name(var_name, vm, ids_data, ap_tracking)?;
    vm.insert_value(var_address, value)
        .map_err(HintError::Memory)
}

//Inserts value into ap
pub fn insert_value_into_ap(
    vm: &mut VirtualMachine,
    value: impl Into<MaybeRelocatable>,
) -> Result<(), HintError> {
    vm.insert_value(vm.get_ap(), value)
        .map_err(HintError::Memory)
}

/// The pointer held by (or, for a non dereferenced reference, the address
/// of) the given ids variable.
pub fn get_ptr_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_ptr_from_reference(vm, reference, ap_tracking).map_err(|err| match err {
        HintError::WrongIdentifierTypeInternal(var_addr) => {
            HintError::IdentifierNotRelocatable(Box::new((var_name.to_string(), *var_addr)))
        }
        _ => unknown_identifier(var_name),
    })
}

/// The integer value of the given ids variable.
pub fn get_integer_from_var_name<'a>(
    var_name: &str,
    vm: &'a VirtualMachine,
    ids_data: &'a HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<Cow<'a, Felt252>, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_integer_from_reference(vm, reference, ap_tracking).map_err(|err| match err {
        HintError::WrongIdentifierTypeInternal(var_addr) => {
            HintError::IdentifierNotInteger(Box::new((var_name.to_string(), *var_addr)))
        }
        _ => unknown_identifier(var_name),
    })
}

//Gets the value of a variable name as a MaybeRelocatable
pub fn get_maybe_relocatable_from_var_name(
    var_name: &str,
    vm: &VirtualMachine,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<MaybeRelocatable, HintError> {
    let reference = get_reference_from_var_name(var_name, ids_data)?;
    get_maybe_relocatable_from_reference(vm, reference, ap_tracking)
        .ok_or_else(|| unknown_identifier(var_name))
}
