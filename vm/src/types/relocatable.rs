use core::fmt::{self, Display};
use core::ops::{Add, AddAssign, Sub};

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    relocatable, types::errors::math_errors::MathError, vm::errors::memory_errors::MemoryError,
    Felt252,
};

/// An address inside a memory segment, before relocation.
///
/// Negative segment indexes belong to temporary segments, which must be merged
/// into real segments before the memory is relocated.
#[derive(Eq, Ord, Hash, PartialEq, PartialOrd, Clone, Copy, Debug, Serialize, Deserialize, Default)]
pub struct Relocatable {
    pub segment_index: isize,
    pub offset: usize,
}

/// The content of a memory cell: either a field element or an address.
#[derive(Eq, Ord, Hash, PartialEq, PartialOrd, Clone, Serialize, Deserialize, Debug)]
pub enum MaybeRelocatable {
    RelocatableValue(Relocatable),
    Int(Felt252),
}

impl From<(isize, usize)> for Relocatable {
    fn from(index_offset: (isize, usize)) -> Self {
        Relocatable {
            segment_index: index_offset.0,
            offset: index_offset.1,
        }
    }
}

impl From<(isize, usize)> for MaybeRelocatable {
    fn from(index_offset: (isize, usize)) -> Self {
        MaybeRelocatable::RelocatableValue(Relocatable::from(index_offset))
    }
}

impl From<usize> for MaybeRelocatable {
    fn from(num: usize) -> Self {
        MaybeRelocatable::Int(Felt252::from(num))
    }
}

impl From<Felt252> for MaybeRelocatable {
    fn from(num: Felt252) -> Self {
        MaybeRelocatable::Int(num)
    }
}

impl From<&Felt252> for MaybeRelocatable {
    fn from(num: &Felt252) -> Self {
        MaybeRelocatable::Int(*num)
    }
}

impl From<&Relocatable> for MaybeRelocatable {
    fn from(rel: &Relocatable) -> Self {
        MaybeRelocatable::RelocatableValue(*rel)
    }
}

impl From<Relocatable> for MaybeRelocatable {
    fn from(rel: Relocatable) -> Self {
        MaybeRelocatable::RelocatableValue(rel)
    }
}

impl Display for MaybeRelocatable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MaybeRelocatable::RelocatableValue(rel) => rel.fmt(f),
            MaybeRelocatable::Int(num) => write!(f, "{num}"),
        }
    }
}

impl Display for Relocatable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.segment_index, self.offset)
    }
}

impl Add<usize> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn add(self, other: usize) -> Result<Self, MathError> {
        self.offset
            .checked_add(other)
            .map(|offset| Relocatable {
                segment_index: self.segment_index,
                offset,
            })
            .ok_or_else(|| MathError::RelocatableAddUsizeOffsetExceeded(Box::new((self, other))))
    }
}

impl AddAssign<usize> for Relocatable {
    fn add_assign(&mut self, rhs: usize) {
        self.offset += rhs
    }
}

/// Used for instruction offsets, which are signed.
impl Add<isize> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn add(self, other: isize) -> Result<Self, MathError> {
        let offset = if other.is_negative() {
            self.offset.checked_sub(other.unsigned_abs())
        } else {
            self.offset.checked_add(other as usize)
        };
        offset
            .map(|offset| Relocatable {
                segment_index: self.segment_index,
                offset,
            })
            .ok_or_else(|| MathError::RelocatableAddIsizeOffsetOutOfRange(Box::new((self, other))))
    }
}

/// Used for hint reference offsets.
impl Add<i32> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn add(self, other: i32) -> Result<Self, MathError> {
        self + other as isize
    }
}

impl Add<&Felt252> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn add(self, other: &Felt252) -> Result<Relocatable, MathError> {
        let new_offset = (Felt252::from(self.offset) + other)
            .to_usize()
            .ok_or_else(|| {
                MathError::RelocatableAddFelt252OffsetExceeded(Box::new((self, *other)))
            })?;
        Ok((self.segment_index, new_offset).into())
    }
}

/// Adds a MaybeRelocatable to self.
/// Fails if the other value is also relocatable.
impl Add<&MaybeRelocatable> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn add(self, other: &MaybeRelocatable) -> Result<Relocatable, MathError> {
        let num_ref = match other {
            MaybeRelocatable::RelocatableValue(rel) => {
                return Err(MathError::RelocatableAdd(Box::new((self, *rel))))
            }
            MaybeRelocatable::Int(num) => num,
        };
        self + num_ref
    }
}

impl Sub<usize> for Relocatable {
    type Output = Result<Relocatable, MathError>;
    fn sub(self, other: usize) -> Result<Self, MathError> {
        if self.offset < other {
            return Err(MathError::RelocatableSubUsizeNegOffset(Box::new((
                self, other,
            ))));
        }
        let new_offset = self.offset - other;
        Ok(relocatable!(self.segment_index, new_offset))
    }
}

impl Sub<Relocatable> for Relocatable {
    type Output = Result<usize, MathError>;
    fn sub(self, other: Self) -> Result<usize, MathError> {
        if self.segment_index != other.segment_index {
            return Err(MathError::RelocatableSubDiffIndex(Box::new((self, other))));
        }
        if self.offset < other.offset {
            return Err(MathError::RelocatableSubUsizeNegOffset(Box::new((
                self,
                other.offset,
            ))));
        }
        Ok(self.offset - other.offset)
    }
}

impl From<&Relocatable> for Relocatable {
    fn from(other: &Relocatable) -> Self {
        *other
    }
}

impl TryFrom<&MaybeRelocatable> for Relocatable {
    type Error = MemoryError;
    fn try_from(other: &MaybeRelocatable) -> Result<Self, MemoryError> {
        match other {
            MaybeRelocatable::RelocatableValue(rel) => Ok(*rel),
            MaybeRelocatable::Int(_) => Err(MemoryError::AddressNotRelocatable),
        }
    }
}

impl TryFrom<MaybeRelocatable> for Relocatable {
    type Error = MemoryError;
    fn try_from(other: MaybeRelocatable) -> Result<Self, MemoryError> {
        Relocatable::try_from(&other)
    }
}

impl From<&MaybeRelocatable> for MaybeRelocatable {
    fn from(other: &MaybeRelocatable) -> Self {
        other.clone()
    }
}

impl MaybeRelocatable {
    /// Adds a MaybeRelocatable to self.
    /// Adding two relocatable values is an error.
    pub fn add(&self, other: &MaybeRelocatable) -> Result<MaybeRelocatable, MathError> {
        match (self, other) {
            (MaybeRelocatable::Int(num_a_ref), MaybeRelocatable::Int(num_b)) => {
                Ok(MaybeRelocatable::Int(num_a_ref + num_b))
            }
            (MaybeRelocatable::RelocatableValue(rel_a), MaybeRelocatable::RelocatableValue(rel_b)) => {
                Err(MathError::RelocatableAdd(Box::new((*rel_a, *rel_b))))
            }
            (MaybeRelocatable::RelocatableValue(rel), MaybeRelocatable::Int(num_ref))
            | (MaybeRelocatable::Int(num_ref), MaybeRelocatable::RelocatableValue(rel)) => {
                Ok((*rel + num_ref)?.into())
            }
        }
    }

    /// Subtracts `other` from self.
    /// Two relocatable values are only subtractable within the same segment and
    /// yield their offset difference as an integer.
    pub fn sub(&self, other: &MaybeRelocatable) -> Result<MaybeRelocatable, MathError> {
        match (self, other) {
            (MaybeRelocatable::Int(num_a), MaybeRelocatable::Int(num_b)) => {
                Ok(MaybeRelocatable::Int(num_a - num_b))
            }
            (MaybeRelocatable::RelocatableValue(rel_a), MaybeRelocatable::RelocatableValue(rel_b)) => {
                if rel_a.segment_index == rel_b.segment_index {
                    return Ok(MaybeRelocatable::from(
                        Felt252::from(rel_a.offset) - Felt252::from(rel_b.offset),
                    ));
                }
                Err(MathError::RelocatableSubDiffIndex(Box::new((*rel_a, *rel_b))))
            }
            (MaybeRelocatable::RelocatableValue(rel_a), MaybeRelocatable::Int(num_b)) => {
                let new_offset = (Felt252::from(rel_a.offset) - num_b)
                    .to_usize()
                    .filter(|offset| *offset <= rel_a.offset)
                    .ok_or_else(|| {
                        MathError::RelocatableSubFelt252NegOffset(Box::new((*rel_a, *num_b)))
                    })?;
                Ok(MaybeRelocatable::from((rel_a.segment_index, new_offset)))
            }
            (MaybeRelocatable::Int(int), MaybeRelocatable::RelocatableValue(rel)) => {
                Err(MathError::SubRelocatableFromInt(Box::new((*int, *rel))))
            }
        }
    }

    /// Multiplies two integer values; relocatable operands are rejected.
    pub fn mul(&self, other: &MaybeRelocatable) -> Result<MaybeRelocatable, MathError> {
        match (self, other) {
            (MaybeRelocatable::Int(num_a), MaybeRelocatable::Int(num_b)) => {
                Ok(MaybeRelocatable::Int(num_a * num_b))
            }
            _ => Err(MathError::MulWrongType(Box::new((self.clone(), other.clone())))),
        }
    }

    /// Zero-ness is only defined for integer values.
    pub fn is_zero(&self) -> bool {
        match self {
            MaybeRelocatable::Int(num) => *num == Felt252::ZERO,
            MaybeRelocatable::RelocatableValue(_) => false,
        }
    }

    pub fn get_int(&self) -> Option<Felt252> {
        match self {
            MaybeRelocatable::Int(num) => Some(*num),
            MaybeRelocatable::RelocatableValue(_) => None,
        }
    }

    pub fn get_int_ref(&self) -> Option<&Felt252> {
        match self {
            MaybeRelocatable::Int(num) => Some(num),
            MaybeRelocatable::RelocatableValue(_) => None,
        }
    }

    pub fn get_relocatable(&self) -> Option<Relocatable> {
        match self {
            MaybeRelocatable::RelocatableValue(rel) => Some(*rel),
            MaybeRelocatable::Int(_) => None,
        }
    }
}

/// Turns a relocatable value into an integer using the per-segment base
/// addresses of `relocation_table`. Integers are returned unchanged.
pub fn relocate_value(
    value: MaybeRelocatable,
    relocation_table: &[usize],
) -> Result<Felt252, MemoryError> {
    match value {
        MaybeRelocatable::Int(num) => Ok(num),
        MaybeRelocatable::RelocatableValue(relocatable) => Ok(Felt252::from(relocate_address(
            relocatable,
            relocation_table,
        )?)),
    }
}

/// Flattens `relocatable` into `relocation_table[segment] + offset`.
pub fn relocate_address(
    relocatable: Relocatable,
    relocation_table: &[usize],
) -> Result<usize, MemoryError> {
    if relocatable.segment_index < 0 {
        return Err(MemoryError::TemporarySegmentInRelocation(
            relocatable.segment_index,
        ));
    }
    let segment_base = relocation_table
        .get(relocatable.segment_index as usize)
        .ok_or(MemoryError::Relocation)?;
    Ok(segment_base + relocatable.offset)
}
