use super::BuiltinSegment;
use crate::types::instance_definitions::{BITWISE_TOTAL_N_BITS, CELLS_PER_BITWISE};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::Felt252;

/// Deduces `x & y`, `x ^ y` and `x | y` from the two input cells of an
/// instance.
#[derive(Debug, Clone)]
pub struct BitwiseBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
}

impl BitwiseBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        BitwiseBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
        }
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_BITWISE as usize;
        let op: fn(u8, u8) -> u8 = match index {
            2 => |x, y| x & y,
            3 => |x, y| x ^ y,
            4 => |x, y| x | y,
            _ => return Ok(None),
        };
        let x_addr = (address - index)?;
        let y_addr = (x_addr + 1_usize)?;
        let (Ok(x), Ok(y)) = (memory.get_integer(x_addr), memory.get_integer(y_addr)) else {
            return Ok(None);
        };
        let x_bytes = Self::input_bytes(x_addr, &x)?;
        let y_bytes = Self::input_bytes(y_addr, &y)?;
        let mut result = [0u8; 32];
        for (r, (x, y)) in result.iter_mut().zip(x_bytes.iter().zip(y_bytes.iter())) {
            *r = op(*x, *y);
        }
        Ok(Some(Felt252::from_bytes_le(&result).into()))
    }

    /// Little-endian bytes of an input, which must fit in 251 bits.
    fn input_bytes(addr: Relocatable, value: &Felt252) -> Result<[u8; 32], RunnerError> {
        if value.bits() > BITWISE_TOTAL_N_BITS as usize {
            return Err(RunnerError::IntegerBiggerThanPowerOfTwo(Box::new((
                addr,
                BITWISE_TOTAL_N_BITS,
                *value,
            ))));
        }
        Ok(value.to_bytes_le())
    }
}
