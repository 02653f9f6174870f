//! Cell geometry of every builtin plus the per-layout instance definitions.
//!
//! A builtin instance is a fixed run of cells in the builtin's segment: the
//! first `INPUT_CELLS_PER_*` are written by the program, the rest are deduced.

use serde::Serialize;

pub mod builtins_instance_def;

pub(crate) const CELLS_PER_BITWISE: u32 = 5;
pub(crate) const INPUT_CELLS_PER_BITWISE: u32 = 2;
/// Bitwise inputs must fit in this many bits.
pub(crate) const BITWISE_TOTAL_N_BITS: u32 = 251;

pub(crate) const CELLS_PER_HASH: u32 = 3;
pub(crate) const INPUT_CELLS_PER_HASH: u32 = 2;

pub(crate) const CELLS_PER_POSEIDON: u32 = 6;
pub(crate) const INPUT_CELLS_PER_POSEIDON: u32 = 3;

pub(crate) const CELLS_PER_EC_OP: u32 = 7;
pub(crate) const INPUT_CELLS_PER_EC_OP: u32 = 5;

pub(crate) const CELLS_PER_RANGE_CHECK: u32 = 1;
/// Number of 16-bit parts a range-checked value is split into.
pub(crate) const RANGE_CHECK_N_PARTS: u32 = 8;
pub(crate) const INNER_RC_BOUND_SHIFT: u32 = 16;

pub(crate) const CELLS_PER_SIGNATURE: u32 = 2;

pub(crate) const CELLS_PER_KECCAK: u32 = 16;
pub(crate) const INPUT_CELLS_PER_KECCAK: u32 = 8;
/// Keccak inputs must fit in this many bits.
pub(crate) const KECCAK_INPUT_BITS: u32 = 200;
pub(crate) const KECCAK_INSTANCES_PER_COMPONENT: u32 = 16;

/// Steps-per-instance ratio of a builtin in a layout. `None` means the
/// builtin is sized to its actual usage (dynamic layout).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceDef {
    pub(crate) ratio: Option<u32>,
}

impl InstanceDef {
    pub(crate) const fn with_ratio(ratio: u32) -> Self {
        InstanceDef { ratio: Some(ratio) }
    }

    pub(crate) const fn dynamic() -> Self {
        InstanceDef { ratio: None }
    }
}

/// The ec_op builtin additionally fixes how many doubling rounds the
/// scalar multiplication runs.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcOpInstanceDef {
    pub(crate) ratio: Option<u32>,
    pub(crate) scalar_height: u32,
    pub(crate) _scalar_bits: u32,
}

impl EcOpInstanceDef {
    pub(crate) const fn new(ratio: Option<u32>) -> Self {
        EcOpInstanceDef {
            ratio,
            scalar_height: 256,
            _scalar_bits: 252,
        }
    }
}

impl Default for EcOpInstanceDef {
    fn default() -> Self {
        EcOpInstanceDef::new(Some(256))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_cells_fit_in_instance() {
        for (cells, inputs) in [
            (CELLS_PER_BITWISE, INPUT_CELLS_PER_BITWISE),
            (CELLS_PER_HASH, INPUT_CELLS_PER_HASH),
            (CELLS_PER_POSEIDON, INPUT_CELLS_PER_POSEIDON),
            (CELLS_PER_EC_OP, INPUT_CELLS_PER_EC_OP),
            (CELLS_PER_KECCAK, INPUT_CELLS_PER_KECCAK),
        ] {
            assert!(inputs < cells);
        }
    }

    #[test]
    fn ec_op_defaults() {
        let def = EcOpInstanceDef::default();
        assert_eq!(def.ratio, Some(256));
        assert_eq!(def.scalar_height, 256);
        assert_eq!(EcOpInstanceDef::new(None).ratio, None);
    }
}
