#[cfg(feature = "clap")]
use clap::{builder::PossibleValue, ValueEnum};
use core::fmt::{self, Display};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::vm::errors::runner_errors::RunnerError;

/// Name of a Cairo layout: a fixed set of builtins and their step ratios.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum LayoutName {
    #[default]
    plain,
    small,
    dex,
    recursive,
    starknet,
    starknet_with_keccak,
    recursive_large_output,
    all_solidity,
    all_cairo,
    dynamic,
}

const ALL_LAYOUTS: [LayoutName; 10] = [
    LayoutName::plain,
    LayoutName::small,
    LayoutName::dex,
    LayoutName::recursive,
    LayoutName::starknet,
    LayoutName::starknet_with_keccak,
    LayoutName::recursive_large_output,
    LayoutName::all_solidity,
    LayoutName::all_cairo,
    LayoutName::dynamic,
];

impl LayoutName {
    pub fn to_str(self) -> &'static str {
        match self {
            LayoutName::plain => "plain",
            LayoutName::small => "small",
            LayoutName::dex => "dex",
            LayoutName::recursive => "recursive",
            LayoutName::starknet => "starknet",
            LayoutName::starknet_with_keccak => "starknet_with_keccak",
            LayoutName::recursive_large_output => "recursive_large_output",
            LayoutName::all_solidity => "all_solidity",
            LayoutName::all_cairo => "all_cairo",
            LayoutName::dynamic => "dynamic",
        }
    }
}

impl Display for LayoutName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_str().fmt(f)
    }
}

impl FromStr for LayoutName {
    type Err = RunnerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ALL_LAYOUTS
            .iter()
            .copied()
            .find(|layout| layout.to_str() == name)
            .ok_or_else(|| RunnerError::InvalidLayoutName(name.into()))
    }
}

#[cfg(feature = "clap")]
impl ValueEnum for LayoutName {
    fn value_variants<'a>() -> &'a [Self] {
        &ALL_LAYOUTS
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.to_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn every_layout_parses_from_its_name() {
        for layout in ALL_LAYOUTS {
            assert_eq!(layout.to_str().parse::<LayoutName>().unwrap(), layout);
        }
    }

    #[test]
    fn unknown_layout_is_rejected() {
        assert_matches!(
            "recursive_with_poseidon".parse::<LayoutName>(),
            Err(RunnerError::InvalidLayoutName(name)) if &*name == "recursive_with_poseidon"
        );
    }

    #[test]
    fn default_layout_is_plain() {
        assert_eq!(LayoutName::default(), LayoutName::plain);
        assert_eq!(LayoutName::default().to_string(), "plain");
    }
}
