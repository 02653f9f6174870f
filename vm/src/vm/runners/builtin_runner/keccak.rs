use std::{cell::RefCell, collections::HashMap};

use super::BuiltinSegment;
use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{
    CELLS_PER_KECCAK, INPUT_CELLS_PER_KECCAK, KECCAK_INPUT_BITS,
};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::Felt252;

// 200 bits per state word.
const KECCAK_FELT_BYTE_SIZE: usize = KECCAK_INPUT_BITS as usize / 8;
const KECCAK_STATE_BYTES: usize = 200;

/// Applies the Keccak-f[1600] permutation to eight 200-bit words.
#[derive(Debug, Clone)]
pub struct KeccakBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
    cache: RefCell<HashMap<Relocatable, Felt252>>,
}

impl KeccakBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        KeccakBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_KECCAK as usize;
        if index < INPUT_CELLS_PER_KECCAK as usize {
            return Ok(None);
        }
        if let Some(felt) = self.cache.borrow().get(&address) {
            return Ok(Some(felt.into()));
        }
        let first_input = (address - index)?;
        let first_output = (first_input + INPUT_CELLS_PER_KECCAK as usize)?;

        let mut state = [0u8; KECCAK_STATE_BYTES];
        for (i, chunk) in state.chunks_exact_mut(KECCAK_FELT_BYTE_SIZE).enumerate() {
            let input_addr = (first_input + i)?;
            let Some(value) = memory.get(&input_addr) else {
                return Ok(None);
            };
            let num = value.get_int_ref().ok_or_else(|| {
                RunnerError::BuiltinExpectedInteger(Box::new((BuiltinName::keccak, input_addr)))
            })?;
            if num.bits() > KECCAK_INPUT_BITS as usize {
                return Err(RunnerError::IntegerBiggerThanPowerOfTwo(Box::new((
                    input_addr,
                    KECCAK_INPUT_BITS,
                    *num,
                ))));
            }
            chunk.copy_from_slice(&num.to_bytes_le()[..KECCAK_FELT_BYTE_SIZE]);
        }

        let output = Self::keccak_f(&state);
        let mut cache = self.cache.borrow_mut();
        for (i, chunk) in output.chunks_exact(KECCAK_FELT_BYTE_SIZE).enumerate() {
            cache.insert(
                (first_output + i)?,
                Felt252::from_bytes_le_slice(chunk),
            );
        }
        Ok(cache.get(&address).map(MaybeRelocatable::from))
    }

    fn keccak_f(input: &[u8; KECCAK_STATE_BYTES]) -> [u8; KECCAK_STATE_BYTES] {
        let mut words = [0u64; 25];
        for (word, bytes) in words.iter_mut().zip(input.chunks_exact(8)) {
            let mut le = [0u8; 8];
            le.copy_from_slice(bytes);
            *word = u64::from_le_bytes(le);
        }
        keccak::f1600(&mut words);
        let mut output = [0u8; KECCAK_STATE_BYTES];
        for (bytes, word) in output.chunks_exact_mut(8).zip(words) {
            bytes.copy_from_slice(&word.to_le_bytes());
        }
        output
    }
}
