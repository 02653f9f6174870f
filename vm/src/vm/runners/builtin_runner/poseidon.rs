use std::{cell::RefCell, collections::HashMap};

use starknet_crypto::poseidon_permute_comp;

use super::BuiltinSegment;
use crate::types::instance_definitions::{CELLS_PER_POSEIDON, INPUT_CELLS_PER_POSEIDON};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::Felt252;

/// The last three cells of an instance hold the Poseidon permutation of the
/// first three.
#[derive(Debug, Clone)]
pub struct PoseidonBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
    cache: RefCell<HashMap<Relocatable, Felt252>>,
}

impl PoseidonBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        PoseidonBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let index = address.offset % CELLS_PER_POSEIDON as usize;
        if index < INPUT_CELLS_PER_POSEIDON as usize {
            return Ok(None);
        }
        if let Some(felt) = self.cache.borrow().get(&address) {
            return Ok(Some(felt.into()));
        }
        let first_input = (address - index)?;
        let first_output = (first_input + INPUT_CELLS_PER_POSEIDON as usize)?;
        let mut state = [Felt252::ZERO; 3];
        for (i, slot) in state.iter_mut().enumerate() {
            match memory.get_integer((first_input + i)?) {
                Ok(value) => *slot = *value,
                Err(_) => return Ok(None),
            }
        }
        poseidon_permute_comp(&mut state);
        let mut cache = self.cache.borrow_mut();
        for (i, value) in state.into_iter().enumerate() {
            cache.insert((first_output + i)?, value);
        }
        Ok(cache.get(&address).map(MaybeRelocatable::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;

    #[test]
    fn deduce_permutation_of_zeros() {
        let memory = memory![((0, 0), 0), ((0, 1), 0), ((0, 2), 0)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        let mut expected = [Felt252::ZERO; 3];
        poseidon_permute_comp(&mut expected);
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(
                builtin.deduce_memory_cell(relocatable!(0, 3 + i), &memory),
                Ok(Some(value.into()))
            );
        }
        assert_eq!(builtin.cache.borrow().len(), 3);
    }

    #[test]
    fn second_instance_uses_its_own_inputs() {
        let memory = memory![
            ((0, 0), 1),
            ((0, 1), 2),
            ((0, 2), 3),
            ((0, 6), 4),
            ((0, 7), 5),
            ((0, 8), 6)
        ];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        let mut expected = [Felt252::from(4), Felt252::from(5), Felt252::from(6)];
        poseidon_permute_comp(&mut expected);
        assert_eq!(
            builtin.deduce_memory_cell(relocatable!(0, 10), &memory),
            Ok(Some(expected[1].into()))
        );
        assert!(builtin.cache.borrow().get(&relocatable!(0, 3)).is_none());
        assert_eq!(
            builtin.cache.borrow().get(&relocatable!(0, 11)),
            Some(&expected[2])
        );
    }

    #[test]
    fn input_cells_are_not_deduced() {
        let memory = memory![((0, 0), 1), ((0, 1), 2), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 2), &memory), Ok(None));
    }

    #[test]
    fn deduce_with_missing_input() {
        let memory = memory![((0, 0), 1), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 4), &memory), Ok(None));
        assert!(builtin.cache.borrow().is_empty());
    }

    #[test]
    fn deduce_with_relocatable_input() {
        let memory = memory![((0, 0), 1), ((0, 1), (2, 0)), ((0, 2), 3)];
        let builtin = PoseidonBuiltinRunner::new(Some(32), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 5), &memory), Ok(None));
    }
}
