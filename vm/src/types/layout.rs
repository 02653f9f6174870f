use serde::Serialize;

use super::{
    instance_definitions::builtins_instance_def::BuiltinsInstanceDef, layout_name::LayoutName,
};

pub(crate) const MEMORY_UNITS_PER_STEP: u32 = 8;

/// Resources a layout provides per step: range-check units, builtin ratios
/// and the share of memory units reserved for public memory.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CairoLayout {
    pub(crate) name: LayoutName,
    pub(crate) rc_units: u32,
    pub(crate) builtins: BuiltinsInstanceDef,
    pub(crate) public_memory_fraction: u32,
}

impl CairoLayout {
    pub(crate) fn new(name: LayoutName) -> CairoLayout {
        let (rc_units, builtins, public_memory_fraction) = match name {
            LayoutName::plain => (16, BuiltinsInstanceDef::plain(), 4),
            LayoutName::small => (16, BuiltinsInstanceDef::small(), 4),
            LayoutName::dex => (4, BuiltinsInstanceDef::small(), 4),
            LayoutName::recursive => (4, BuiltinsInstanceDef::recursive(), 8),
            LayoutName::starknet => (4, BuiltinsInstanceDef::starknet(), 8),
            LayoutName::starknet_with_keccak => {
                (4, BuiltinsInstanceDef::starknet_with_keccak(), 8)
            }
            LayoutName::recursive_large_output => {
                (4, BuiltinsInstanceDef::recursive_large_output(), 8)
            }
            LayoutName::all_solidity => (8, BuiltinsInstanceDef::all_solidity(), 8),
            LayoutName::all_cairo => (4, BuiltinsInstanceDef::all_cairo(), 8),
            LayoutName::dynamic => (16, BuiltinsInstanceDef::dynamic(), 8),
        };
        CairoLayout {
            name,
            rc_units,
            builtins,
            public_memory_fraction,
        }
    }

    pub fn name(&self) -> LayoutName {
        self.name
    }
}
