// The `(*.0).0` syntax of thiserror falsely triggers this clippy warning
#![allow(clippy::explicit_auto_deref)]

use thiserror::Error;

use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::Felt252;

#[derive(Debug, Error, PartialEq)]
pub enum MathError {
    #[error("Attempted to divide by zero")]
    DividedByZero,
    #[error("{} is not divisible by {}", (*.0).0, (*.0).1)]
    SafeDivFailUsize(Box<(usize, usize)>),
    #[error("Operation failed: {} - {}, offsets cant be negative", (*.0).0, (*.0).1)]
    RelocatableSubFelt252NegOffset(Box<(Relocatable, Felt252)>),
    #[error("Operation failed: {} - {}, offsets cant be negative", (*.0).0, (*.0).1)]
    RelocatableSubUsizeNegOffset(Box<(Relocatable, usize)>),
    #[error("Operation failed: {} + {}, maximum offset value exceeded", (*.0).0, (*.0).1)]
    RelocatableAddFelt252OffsetExceeded(Box<(Relocatable, Felt252)>),
    #[error("Operation failed: {} + {}, maximum offset value exceeded", (*.0).0, (*.0).1)]
    RelocatableAddUsizeOffsetExceeded(Box<(Relocatable, usize)>),
    #[error("Operation failed: {} + {}, offset out of range", (*.0).0, (*.0).1)]
    RelocatableAddIsizeOffsetOutOfRange(Box<(Relocatable, isize)>),
    #[error("Operation failed: {} + {}, can't add two relocatable values", (*.0).0, (*.0).1)]
    RelocatableAdd(Box<(Relocatable, Relocatable)>),
    #[error("Operation failed: {} - {}, can't subtract two relocatable values with different segment indexes", (*.0).0, (*.0).1)]
    RelocatableSubDiffIndex(Box<(Relocatable, Relocatable)>),
    #[error("Operation failed {} - {}, can't subtract a relocatable value from an integer", (*.0).0, (*.0).1)]
    SubRelocatableFromInt(Box<(Felt252, Relocatable)>),
    #[error("Operation failed: {} * {}, multiplication is only defined between integers", (*.0).0, (*.0).1)]
    MulWrongType(Box<(MaybeRelocatable, MaybeRelocatable)>),
    #[error("Conversion to usize failed for Felt252 {0}")]
    Felt252ToUsizeConversion(Box<Felt252>),
}
