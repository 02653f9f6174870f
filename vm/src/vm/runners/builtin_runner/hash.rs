use std::cell::RefCell;

use starknet_types_core::hash::{Pedersen, StarkHash};

use super::BuiltinSegment;
use crate::types::instance_definitions::CELLS_PER_HASH;
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;

/// Pedersen builtin: the third cell of an instance is the hash of the first two.
#[derive(Debug, Clone)]
pub struct HashBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
    // Offsets whose hash was already handed out, indexed by offset.
    verified_addresses: RefCell<Vec<bool>>,
}

impl HashBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        HashBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
            verified_addresses: RefCell::new(Vec::new()),
        }
    }

    fn is_verified(&self, offset: usize) -> bool {
        self.verified_addresses
            .borrow()
            .get(offset)
            .copied()
            .unwrap_or(false)
    }

    fn mark_verified(&self, offset: usize) {
        let mut verified = self.verified_addresses.borrow_mut();
        if verified.len() <= offset {
            verified.resize(offset + 1, false);
        }
        verified[offset] = true;
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        if address.offset % CELLS_PER_HASH as usize != 2 || self.is_verified(address.offset) {
            return Ok(None);
        }
        let (Ok(x), Ok(y)) = (
            memory.get_integer((address - 2)?),
            memory.get_integer((address - 1)?),
        ) else {
            return Ok(None);
        };
        self.mark_verified(address.offset);
        Ok(Some(Pedersen::hash(&x, &y).into()))
    }
}
