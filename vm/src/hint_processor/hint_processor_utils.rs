use std::borrow::Cow;

use num_traits::ToPrimitive;

use super::hint_processor_definition::HintReference;
use crate::{
    serde::deserialize_program::{ApTracking, OffsetValue},
    types::{
        errors::math_errors::MathError,
        instruction::Register,
        relocatable::{MaybeRelocatable, Relocatable},
    },
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
    Felt252,
};

///Inserts value into the address of the given ids variable
pub fn insert_value_from_reference(
    value: impl Into<MaybeRelocatable>,
    vm: &mut VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    vm.insert_value(var_addr, value).map_err(HintError::Memory)
}

///Returns the Integer value stored in the given ids variable
/// Returns an internal error, users should map it into a more informative type
pub fn get_integer_from_reference<'a>(
    vm: &'a VirtualMachine,
    hint_reference: &'a HintReference,
    ap_tracking: &ApTracking,
) -> Result<Cow<'a, Felt252>, HintError> {
    // Constants are inlined in the reference itself.
    if let OffsetValue::Immediate(value) = &hint_reference.offset1 {
        return Ok(Cow::Borrowed(value));
    }

    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    vm.get_integer(var_addr)
        .map_err(|_| HintError::WrongIdentifierTypeInternal(Box::new(var_addr)))
}

///Returns the Relocatable value stored in the given ids variable
pub fn get_ptr_from_reference(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Result<Relocatable, HintError> {
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)
        .ok_or(HintError::UnknownIdentifierInternal)?;
    if !hint_reference.dereference {
        return Ok(var_addr);
    }
    vm.get_relocatable(var_addr)
        .map_err(|_| HintError::WrongIdentifierTypeInternal(Box::new(var_addr)))
}

///Returns the value given by a reference as [MaybeRelocatable]
pub fn get_maybe_relocatable_from_reference(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    ap_tracking: &ApTracking,
) -> Option<MaybeRelocatable> {
    if let OffsetValue::Immediate(value) = &hint_reference.offset1 {
        return Some(value.into());
    }
    let var_addr = compute_addr_from_reference(hint_reference, vm, ap_tracking)?;
    if hint_reference.dereference {
        vm.get_maybe(&var_addr)
    } else {
        Some(var_addr.into())
    }
}

/// Address of an ids variable: `offset1` must resolve to a pointer, and
/// `offset2` shifts it by a constant or by an integer read from memory.
/// Returns `None` if the reference can't be resolved with the current
/// registers and memory.
pub fn compute_addr_from_reference(
    hint_reference: &HintReference,
    vm: &VirtualMachine,
    hint_ap_tracking: &ApTracking,
) -> Option<Relocatable> {
    let base = resolve_register_offset(vm, hint_reference, hint_ap_tracking, &hint_reference.offset1)?
        .get_relocatable()?;

    match &hint_reference.offset2 {
        OffsetValue::Value(value) => (base + *value).ok(),
        register_offset @ OffsetValue::Reference(..) => {
            let shift = resolve_register_offset(vm, hint_reference, hint_ap_tracking, register_offset)?;
            (base + shift.get_int_ref()?.to_usize()?).ok()
        }
        OffsetValue::Immediate(_) => None,
    }
}

// Ap based references are written against the ap of the instruction that
// defined them; ap may have moved since, within the same tracking group.
fn apply_ap_tracking_correction(
    ap: Relocatable,
    ref_ap_tracking: &ApTracking,
    hint_ap_tracking: &ApTracking,
) -> Option<Relocatable> {
    if ref_ap_tracking.group != hint_ap_tracking.group {
        return None;
    }
    let ap_diff = hint_ap_tracking.offset.checked_sub(ref_ap_tracking.offset)?;
    (ap - ap_diff).ok()
}

//Tries to convert a Felt252 value to usize
pub fn felt_to_usize(felt: &Felt252) -> Result<usize, MathError> {
    felt.to_usize()
        .ok_or_else(|| MathError::Felt252ToUsizeConversion(Box::new(*felt)))
}

// `register + offset`, read from memory when the term is dereferenced.
fn resolve_register_offset(
    vm: &VirtualMachine,
    hint_reference: &HintReference,
    hint_ap_tracking: &ApTracking,
    offset_value: &OffsetValue,
) -> Option<MaybeRelocatable> {
    let OffsetValue::Reference(register, offset, deref) = offset_value else {
        return None;
    };

    let base_addr = match register {
        Register::FP => vm.get_fp(),
        Register::AP => apply_ap_tracking_correction(
            vm.get_ap(),
            hint_reference.ap_tracking_data.as_ref()?,
            hint_ap_tracking,
        )?,
    };
    let addr = (base_addr + *offset).ok()?;

    if *deref {
        vm.get_maybe(&addr)
    } else {
        Some(addr.into())
    }
}
