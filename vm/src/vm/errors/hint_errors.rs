// The `(*.0).0` syntax of thiserror falsely triggers this clippy warning
#![allow(clippy::explicit_auto_deref)]

use thiserror::Error;

use crate::types::{
    errors::math_errors::MathError,
    relocatable::{MaybeRelocatable, Relocatable},
};
use crate::Felt252;

use super::{
    exec_scope_errors::ExecScopeError, memory_errors::MemoryError, vm_errors::VirtualMachineError,
};

#[derive(Debug, Error)]
pub enum HintError {
    #[error(transparent)]
    FromScopeError(#[from] ExecScopeError),
    #[error(transparent)]
    Internal(#[from] VirtualMachineError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Math(#[from] MathError),
    #[error("HintProcessor failed retrieve the compiled data necessary for hint execution")]
    WrongHintData,
    #[error("Unknown identifier {0}")]
    UnknownIdentifier(Box<str>),
    #[error("Expected ids.{} at address {} to be an Integer value", (*.0).0, (*.0).1)]
    IdentifierNotInteger(Box<(String, Relocatable)>),
    #[error("Expected ids.{} at address {} to be a Relocatable value", (*.0).0, (*.0).1)]
    IdentifierNotRelocatable(Box<(String, Relocatable)>),
    #[error("Unknown identifier")]
    UnknownIdentifierInternal,
    #[error("Wrong identifier type at address {0}")]
    WrongIdentifierTypeInternal(Box<Relocatable>),
    #[error("Custom Hint Error: {0}")]
    CustomHint(Box<str>),
    #[error("Variable {0} not present in current execution scope")]
    VariableNotInScopeError(Box<str>),
    #[error("DictManagerError: Tried to create tracker for a dictionary on segment: {0} when there is already a tracker for a dictionary on this segment")]
    CantCreateDictionaryOnTakenSegment(isize),
    #[error("Dict Error: No dict tracker found for segment {0}")]
    NoDictTracker(isize),
    #[error("Dict Error: No value found for key: {0}")]
    NoValueForKey(Box<MaybeRelocatable>),
    #[error("Wrong dict pointer supplied. Got {}, expected {}.", (*.0).0, (*.0).1)]
    MismatchedDictPtr(Box<(Relocatable, Relocatable)>),
    #[error("assert_not_equal failed: {} =  {}", (*.0).0, (*.0).1)]
    AssertNotEqualFail(Box<(MaybeRelocatable, MaybeRelocatable)>),
    #[error("assert_not_equal failed: non-comparable values: {}, {}.", (*.0).0, (*.0).1)]
    AssertNotEqualNonComparable(Box<(MaybeRelocatable, MaybeRelocatable)>),
    #[error("Assertion failed, 0 <= ids.a % PRIME < range_check_builtin.bound \n a = {0} is out of range")]
    AssertNNValueOutOfRange(Box<Felt252>),
    #[error("Assertion failed, {} % {} is equal to 0", (*.0).0, (*.0).1)]
    AssertNotZero(Box<(Felt252, String)>),
    #[error("Unknown Hint: {0}")]
    UnknownHint(Box<str>),
    #[error("Signature hint must point to the signature builtin segment, not {0}.")]
    AddSignatureWrongEcdsaPtr(Box<Relocatable>),
    #[error("Signature hint must point to the public key cell, not {0}.")]
    AddSignatureNotAPublicKey(Box<Relocatable>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_felt_variant_message_format() {
        let x = Felt252::from(15131);
        let error_msg = HintError::AssertNNValueOutOfRange(Box::new(x)).to_string();
        let expected_msg = format!(
            "Assertion failed, 0 <= ids.a % PRIME < range_check_builtin.bound \n a = {x} is out of range"
        );
        assert_eq!(error_msg, expected_msg)
    }

    #[test]
    fn test_hint_error_size() {
        let size = core::mem::size_of::<HintError>();
        assert!(size <= 32, "{size}")
    }
}
