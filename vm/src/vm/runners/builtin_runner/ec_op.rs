use std::{cell::RefCell, collections::HashMap};

use lazy_static::lazy_static;

use super::BuiltinSegment;
use crate::math_utils::{ec_add, ec_double, point_on_curve};
use crate::types::builtin_name::BuiltinName;
use crate::types::instance_definitions::{EcOpInstanceDef, CELLS_PER_EC_OP, INPUT_CELLS_PER_EC_OP};
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::runner_errors::RunnerError;
use crate::vm::vm_memory::memory::Memory;
use crate::Felt252;

// Cell layout of an instance: P = (0, 1), Q = (2, 3), m = 4, R = (5, 6).
const EC_POINT_INDICES: [(usize, usize); 3] = [(0, 1), (2, 3), (5, 6)];
const M_INDEX: usize = 4;
const ALPHA: Felt252 = Felt252::ONE;

lazy_static! {
    static ref BETA: Felt252 = Felt252::from_hex_unchecked(
        "0x6f21413efbe40de150e596d72f7a8c5609ad26c15c915c1f4cdfcb99cee9e89"
    );
}

/// Computes `R = P + m * Q` on the STARK curve.
#[derive(Debug, Clone)]
pub struct EcOpBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
    scalar_height: u32,
    cache: RefCell<HashMap<Relocatable, Felt252>>,
}

impl EcOpBuiltinRunner {
    pub fn new(instance_def: &EcOpInstanceDef, included: bool) -> Self {
        EcOpBuiltinRunner {
            segment: BuiltinSegment::new(instance_def.ratio, included),
            scalar_height: instance_def.scalar_height,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Double-and-add over `height` rounds, failing whenever the running sum
    /// and the doubled point share an x coordinate, the one case the
    /// builtin's constraints cannot express.
    fn ec_op_impl(
        partial_sum: (Felt252, Felt252),
        doubled_point: (Felt252, Felt252),
        m: &Felt252,
        height: u32,
    ) -> Result<(Felt252, Felt252), RunnerError> {
        let mut scalar = m.to_biguint();
        let mut partial = partial_sum;
        let mut doubled = doubled_point;
        for _ in 0..height {
            if doubled.0 == partial.0 {
                return Err(RunnerError::EcOpSameXCoordinate(
                    Self::format_ec_op_error(partial_sum, m, doubled_point).into_boxed_str(),
                ));
            }
            if scalar.bit(0) {
                partial = ec_add(partial, doubled)?;
            }
            doubled = ec_double(doubled, &ALPHA)?;
            scalar >>= 1u32;
        }
        Ok(partial)
    }

    fn format_ec_op_error(
        p: (Felt252, Felt252),
        m: &Felt252,
        q: (Felt252, Felt252),
    ) -> String {
        format!(
            "Cannot apply EC operation: computation reached two points with the same x coordinate. \n\
             Attempting to compute P + m * Q where:\n\
             P = ({}, {}) \n\
             m = {}\n\
             Q = ({}, {}).",
            p.0, p.1, m, q.0, q.1
        )
    }

    pub fn deduce_memory_cell(
        &self,
        address: Relocatable,
        memory: &Memory,
    ) -> Result<Option<MaybeRelocatable>, RunnerError> {
        let (out_x, out_y) = EC_POINT_INDICES[2];
        let index = address.offset % CELLS_PER_EC_OP as usize;
        if index != out_x && index != out_y {
            return Ok(None);
        }
        if let Some(felt) = self.cache.borrow().get(&address) {
            return Ok(Some(felt.into()));
        }
        let instance = (address - index)?;

        let mut inputs = [Felt252::ZERO; INPUT_CELLS_PER_EC_OP as usize];
        for (i, input) in inputs.iter_mut().enumerate() {
            let input_addr = (instance + i)?;
            match memory.get(&input_addr) {
                None => return Ok(None),
                Some(value) => {
                    *input = *value.get_int_ref().ok_or_else(|| {
                        RunnerError::BuiltinExpectedInteger(Box::new((
                            BuiltinName::ec_op,
                            input_addr,
                        )))
                    })?;
                }
            }
        }

        for &(x, y) in &EC_POINT_INDICES[..2] {
            if !point_on_curve(&inputs[x], &inputs[y], &ALPHA, &BETA) {
                return Err(RunnerError::PointNotOnCurve(Box::new((inputs[x], inputs[y]))));
            }
        }

        let result = Self::ec_op_impl(
            (inputs[0], inputs[1]),
            (inputs[2], inputs[3]),
            &inputs[M_INDEX],
            self.scalar_height,
        )?;
        let x_addr = (instance + out_x)?;
        let mut cache = self.cache.borrow_mut();
        cache.insert(x_addr, result.0);
        cache.insert((x_addr + 1_usize)?, result.1);
        Ok(Some(if index == out_x { result.0 } else { result.1 }.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::utils::test_utils::*;
    use assert_matches::assert_matches;

    const P_X: &str = "2962412995502985605007699495352191122971573493113767820301112397466445942584";
    const P_Y: &str = "214950771763870898744428659242275426967582168179217139798831865603966154129";
    const Q_X: &str = "874739451078007766457464989774322083649278607533249481151382481072868806602";
    const Q_Y: &str = "152666792071518830868575557812948353041420400780739481342941381225525861407";
    const R_X: &str = "2778063437308421278851140253538604815869848682781135193774472480292420096757";
    const R_Y: &str = "3598390311618116577316045819420613574162151407434885460365915347732568210029";

    fn memory_with_inputs(values: &[(usize, Felt252)]) -> Memory {
        let mut memory = Memory::new();
        memory.data.push(Vec::new());
        for (offset, value) in values {
            memory.insert(relocatable!(0, *offset), *value).unwrap();
        }
        memory
    }

    fn valid_inputs() -> Vec<(usize, Felt252)> {
        vec![
            (0, felt_str!(P_X)),
            (1, felt_str!(P_Y)),
            (2, felt_str!(Q_X)),
            (3, felt_str!(Q_Y)),
            (4, Felt252::from(34)),
        ]
    }

    #[test]
    fn ec_op_impl_valid() {
        let result = EcOpBuiltinRunner::ec_op_impl(
            (felt_str!(P_X), felt_str!(P_Y)),
            (felt_str!(Q_X), felt_str!(Q_Y)),
            &Felt252::from(34),
            256,
        );
        assert_eq!(result, Ok((felt_str!(R_X), felt_str!(R_Y))));
    }

    #[test]
    fn ec_op_impl_same_x_coordinate() {
        let p = (Felt252::ONE, Felt252::from(9));
        let q = (Felt252::ONE, Felt252::from(12));
        let m = Felt252::from(34);
        assert_eq!(
            EcOpBuiltinRunner::ec_op_impl(p, q, &m, 256),
            Err(RunnerError::EcOpSameXCoordinate(
                EcOpBuiltinRunner::format_ec_op_error(p, &m, q).into_boxed_str()
            ))
        );
    }

    #[test]
    fn deduce_both_coordinates() {
        let memory = memory_with_inputs(&valid_inputs());
        let builtin = EcOpBuiltinRunner::new(&EcOpInstanceDef::default(), true);
        assert_eq!(
            builtin.deduce_memory_cell(relocatable!(0, 6), &memory),
            Ok(Some(felt_str!(R_Y).into()))
        );
        // The x coordinate comes out of the cache filled by the first call.
        assert_eq!(
            builtin.cache.borrow().get(&relocatable!(0, 5)),
            Some(&felt_str!(R_X))
        );
        assert_eq!(
            builtin.deduce_memory_cell(relocatable!(0, 5), &memory),
            Ok(Some(felt_str!(R_X).into()))
        );
    }

    #[test]
    fn input_cells_are_not_deduced() {
        let memory = memory_with_inputs(&valid_inputs());
        let builtin = EcOpBuiltinRunner::new(&EcOpInstanceDef::default(), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 4), &memory), Ok(None));
    }

    #[test]
    fn deduce_with_missing_input() {
        let mut inputs = valid_inputs();
        inputs.remove(0);
        let memory = memory_with_inputs(&inputs);
        let builtin = EcOpBuiltinRunner::new(&EcOpInstanceDef::default(), true);
        assert_eq!(builtin.deduce_memory_cell(relocatable!(0, 5), &memory), Ok(None));
    }

    #[test]
    fn deduce_with_relocatable_input() {
        let mut memory = memory_with_inputs(&valid_inputs()[1..]);
        memory
            .insert(relocatable!(0, 0), &MaybeRelocatable::from((1, 2)))
            .unwrap();
        let builtin = EcOpBuiltinRunner::new(&EcOpInstanceDef::default(), true);
        assert_matches!(
            builtin.deduce_memory_cell(relocatable!(0, 5), &memory),
            Err(RunnerError::BuiltinExpectedInteger(bx)) if *bx == (BuiltinName::ec_op, relocatable!(0, 0))
        );
    }

    #[test]
    fn deduce_point_not_on_curve() {
        let mut inputs = valid_inputs();
        inputs[1].1 = inputs[1].1 + Felt252::ONE;
        let memory = memory_with_inputs(&inputs);
        let builtin = EcOpBuiltinRunner::new(&EcOpInstanceDef::default(), true);
        assert_matches!(
            builtin.deduce_memory_cell(relocatable!(0, 6), &memory),
            Err(RunnerError::PointNotOnCurve(bx)) if bx.0 == felt_str!(P_X)
        );
    }
}
