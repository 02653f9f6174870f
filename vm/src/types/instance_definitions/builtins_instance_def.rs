use serde::Serialize;

use super::{EcOpInstanceDef, InstanceDef};
use crate::types::builtin_name::BuiltinName;

pub(crate) const BUILTIN_INSTANCES_PER_COMPONENT: u32 = 1;

/// Which builtins a layout offers and at what ratio.
#[derive(Serialize, Debug, PartialEq, Clone)]
pub(crate) struct BuiltinsInstanceDef {
    pub(crate) output: bool,
    pub(crate) pedersen: Option<InstanceDef>,
    pub(crate) range_check: Option<InstanceDef>,
    pub(crate) ecdsa: Option<InstanceDef>,
    pub(crate) bitwise: Option<InstanceDef>,
    pub(crate) ec_op: Option<EcOpInstanceDef>,
    pub(crate) keccak: Option<InstanceDef>,
    pub(crate) poseidon: Option<InstanceDef>,
}

impl BuiltinsInstanceDef {
    pub(crate) fn plain() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: false,
            pedersen: None,
            range_check: None,
            ecdsa: None,
            bitwise: None,
            ec_op: None,
            keccak: None,
            poseidon: None,
        }
    }

    /// Shared by the `small` and `dex` layouts.
    pub(crate) fn small() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::with_ratio(8)),
            range_check: Some(InstanceDef::with_ratio(8)),
            ecdsa: Some(InstanceDef::with_ratio(512)),
            ..Self::plain()
        }
    }

    pub(crate) fn recursive() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::with_ratio(128)),
            range_check: Some(InstanceDef::with_ratio(8)),
            bitwise: Some(InstanceDef::with_ratio(8)),
            ..Self::plain()
        }
    }

    pub(crate) fn starknet() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::with_ratio(32)),
            range_check: Some(InstanceDef::with_ratio(16)),
            ecdsa: Some(InstanceDef::with_ratio(2048)),
            bitwise: Some(InstanceDef::with_ratio(64)),
            ec_op: Some(EcOpInstanceDef::new(Some(1024))),
            keccak: None,
            poseidon: Some(InstanceDef::with_ratio(32)),
        }
    }

    pub(crate) fn starknet_with_keccak() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            keccak: Some(InstanceDef::with_ratio(2048)),
            ..Self::starknet()
        }
    }

    pub(crate) fn recursive_large_output() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            pedersen: Some(InstanceDef::with_ratio(32)),
            ..Self::recursive()
        }
    }

    pub(crate) fn all_cairo() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::with_ratio(256)),
            range_check: Some(InstanceDef::with_ratio(8)),
            ecdsa: Some(InstanceDef::with_ratio(2048)),
            bitwise: Some(InstanceDef::with_ratio(16)),
            ec_op: Some(EcOpInstanceDef::new(Some(1024))),
            keccak: Some(InstanceDef::with_ratio(2048)),
            poseidon: Some(InstanceDef::with_ratio(256)),
        }
    }

    pub(crate) fn all_solidity() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::with_ratio(8)),
            range_check: Some(InstanceDef::with_ratio(8)),
            ecdsa: Some(InstanceDef::with_ratio(512)),
            bitwise: Some(InstanceDef::with_ratio(256)),
            ec_op: Some(EcOpInstanceDef::new(Some(256))),
            keccak: None,
            poseidon: None,
        }
    }

    /// Every builtin, each sized to what the run actually uses.
    pub(crate) fn dynamic() -> BuiltinsInstanceDef {
        BuiltinsInstanceDef {
            output: true,
            pedersen: Some(InstanceDef::dynamic()),
            range_check: Some(InstanceDef::dynamic()),
            ecdsa: Some(InstanceDef::dynamic()),
            bitwise: Some(InstanceDef::dynamic()),
            ec_op: Some(EcOpInstanceDef::new(None)),
            keccak: Some(InstanceDef::dynamic()),
            poseidon: Some(InstanceDef::dynamic()),
        }
    }

    /// Whether the layout can host `name`.
    pub(crate) fn contains(&self, name: BuiltinName) -> bool {
        match name {
            BuiltinName::output => self.output,
            BuiltinName::pedersen => self.pedersen.is_some(),
            BuiltinName::range_check => self.range_check.is_some(),
            BuiltinName::ecdsa => self.ecdsa.is_some(),
            BuiltinName::bitwise => self.bitwise.is_some(),
            BuiltinName::ec_op => self.ec_op.is_some(),
            BuiltinName::keccak => self.keccak.is_some(),
            BuiltinName::poseidon => self.poseidon.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtin_name::CANONICAL_BUILTIN_ORDER;

    #[test]
    fn plain_has_no_builtins() {
        let plain = BuiltinsInstanceDef::plain();
        assert!(CANONICAL_BUILTIN_ORDER.iter().all(|b| !plain.contains(*b)));
    }

    #[test]
    fn small_builtins() {
        let small = BuiltinsInstanceDef::small();
        assert!(small.output);
        assert_eq!(small.pedersen, Some(InstanceDef::with_ratio(8)));
        assert_eq!(small.ecdsa, Some(InstanceDef::with_ratio(512)));
        assert!(!small.contains(BuiltinName::bitwise));
    }

    #[test]
    fn starknet_with_keccak_extends_starknet() {
        let starknet = BuiltinsInstanceDef::starknet();
        let with_keccak = BuiltinsInstanceDef::starknet_with_keccak();
        assert!(!starknet.contains(BuiltinName::keccak));
        assert_eq!(with_keccak.keccak, Some(InstanceDef::with_ratio(2048)));
        assert_eq!(with_keccak.poseidon, starknet.poseidon);
        assert_eq!(with_keccak.ec_op, starknet.ec_op);
    }

    #[test]
    fn recursive_large_output_pedersen_ratio() {
        let def = BuiltinsInstanceDef::recursive_large_output();
        assert_eq!(def.pedersen, Some(InstanceDef::with_ratio(32)));
        assert_eq!(def.bitwise, BuiltinsInstanceDef::recursive().bitwise);
    }

    #[test]
    fn all_cairo_and_dynamic_host_everything() {
        for def in [BuiltinsInstanceDef::all_cairo(), BuiltinsInstanceDef::dynamic()] {
            assert!(CANONICAL_BUILTIN_ORDER.iter().all(|b| def.contains(*b)));
        }
        let dynamic = BuiltinsInstanceDef::dynamic();
        assert_eq!(dynamic.bitwise, Some(InstanceDef::dynamic()));
        assert_eq!(dynamic.ec_op.map(|d| d.ratio), Some(None));
    }
}
