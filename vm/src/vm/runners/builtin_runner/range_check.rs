use lazy_static::lazy_static;

use super::BuiltinSegment;
use crate::types::instance_definitions::{INNER_RC_BOUND_SHIFT, RANGE_CHECK_N_PARTS};
use crate::types::relocatable::Relocatable;
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::vm_memory::memory::{Memory, ValidationRule};
use crate::Felt252;

const INNER_RC_BOUND_MASK: u64 = u16::MAX as u64;

lazy_static! {
    /// Every value in a range-check segment must be below this bound.
    pub static ref RANGE_CHECK_BOUND: Felt252 =
        Felt252::TWO.pow((RANGE_CHECK_N_PARTS * INNER_RC_BOUND_SHIFT) as u128);
}

/// Asserts that every value written to its segment is in `[0, 2^128)`.
#[derive(Debug, Clone)]
pub struct RangeCheckBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
}

impl RangeCheckBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> RangeCheckBuiltinRunner {
        RangeCheckBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
        }
    }

    pub fn n_parts(&self) -> u32 {
        RANGE_CHECK_N_PARTS
    }

    pub fn bound(&self) -> &'static Felt252 {
        &RANGE_CHECK_BOUND
    }

    pub fn add_validation_rule(&self, memory: &mut Memory) {
        let rule = ValidationRule(Box::new(
            |memory: &Memory, address: Relocatable| -> Result<Vec<Relocatable>, MemoryError> {
                let num = memory
                    .get_integer(address)
                    .map_err(|_| MemoryError::RangeCheckFoundNonInt(Box::new(address)))?;
                if num.bits() as u32 <= RANGE_CHECK_N_PARTS * INNER_RC_BOUND_SHIFT {
                    Ok(vec![address])
                } else {
                    Err(MemoryError::RangeCheckNumOutOfBounds(Box::new((
                        num.into_owned(),
                        *RANGE_CHECK_BOUND,
                    ))))
                }
            },
        ));
        memory.add_validation_rule(self.segment.base, rule);
    }

    /// Smallest and largest 16-bit part among the values in the segment, or
    /// `None` if the segment is empty.
    pub fn get_range_check_usage(&self, memory: &Memory) -> Option<(usize, usize)> {
        let segment = memory.data.get(self.segment.base)?;
        if segment.is_empty() {
            return None;
        }
        let mut bounds = (usize::MAX, usize::MIN);
        for value in segment.iter().flatten() {
            let Some(num) = value.get_value().get_int_ref() else {
                continue;
            };
            let digits = num.to_le_digits();
            let parts = digits.iter().take(2).flat_map(|digit| {
                (0..4).map(move |i| ((digit >> (i * INNER_RC_BOUND_SHIFT)) & INNER_RC_BOUND_MASK))
            });
            for part in parts.take(RANGE_CHECK_N_PARTS as usize) {
                bounds = (bounds.0.min(part as usize), bounds.1.max(part as usize));
            }
        }
        Some(bounds)
    }
}
