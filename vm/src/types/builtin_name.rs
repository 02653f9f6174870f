use core::fmt;

use serde::{Deserialize, Serialize};

/// Name of a builtin as declared in a compiled program's `builtins` list.
#[derive(Serialize, Deserialize, Debug, PartialEq, Copy, Clone, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum BuiltinName {
    output,
    pedersen,
    range_check,
    ecdsa,
    bitwise,
    ec_op,
    keccak,
    poseidon,
}

/// Order in which builtin segments are allocated. A program's builtin list must
/// be a subsequence of it.
pub const CANONICAL_BUILTIN_ORDER: [BuiltinName; 8] = [
    BuiltinName::output,
    BuiltinName::pedersen,
    BuiltinName::range_check,
    BuiltinName::ecdsa,
    BuiltinName::bitwise,
    BuiltinName::ec_op,
    BuiltinName::keccak,
    BuiltinName::poseidon,
];

impl BuiltinName {
    /// Name used by compiled programs, e.g. `"bitwise"`.
    pub fn to_str(self) -> &'static str {
        match self {
            BuiltinName::output => "output",
            BuiltinName::pedersen => "pedersen",
            BuiltinName::range_check => "range_check",
            BuiltinName::ecdsa => "ecdsa",
            BuiltinName::bitwise => "bitwise",
            BuiltinName::ec_op => "ec_op",
            BuiltinName::keccak => "keccak",
            BuiltinName::poseidon => "poseidon",
        }
    }

    /// Name used in execution resources and error messages, e.g. `"bitwise_builtin"`.
    pub fn to_str_with_suffix(self) -> &'static str {
        match self {
            BuiltinName::output => "output_builtin",
            BuiltinName::pedersen => "pedersen_builtin",
            BuiltinName::range_check => "range_check_builtin",
            BuiltinName::ecdsa => "ecdsa_builtin",
            BuiltinName::bitwise => "bitwise_builtin",
            BuiltinName::ec_op => "ec_op_builtin",
            BuiltinName::keccak => "keccak_builtin",
            BuiltinName::poseidon => "poseidon_builtin",
        }
    }

    // `FromStr` is left unimplemented on purpose: `Display` prints the suffixed form.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<Self> {
        CANONICAL_BUILTIN_ORDER
            .iter()
            .copied()
            .find(|builtin| builtin.to_str() == name)
    }

    pub fn from_str_with_suffix(name: &str) -> Option<Self> {
        name.strip_suffix("_builtin").and_then(Self::from_str)
    }
}

impl fmt::Display for BuiltinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_str_with_suffix().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BuiltinName::output, "output")]
    #[case(BuiltinName::pedersen, "pedersen")]
    #[case(BuiltinName::range_check, "range_check")]
    #[case(BuiltinName::ecdsa, "ecdsa")]
    #[case(BuiltinName::bitwise, "bitwise")]
    #[case(BuiltinName::ec_op, "ec_op")]
    #[case(BuiltinName::keccak, "keccak")]
    #[case(BuiltinName::poseidon, "poseidon")]
    fn names_round_trip(#[case] builtin: BuiltinName, #[case] name: &str) {
        assert_eq!(builtin.to_str(), name);
        assert_eq!(BuiltinName::from_str(name), Some(builtin));
        let suffixed = format!("{name}_builtin");
        assert_eq!(builtin.to_str_with_suffix(), suffixed);
        assert_eq!(BuiltinName::from_str_with_suffix(&suffixed), Some(builtin));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(BuiltinName::from_str("segment_arena"), None);
        assert_eq!(BuiltinName::from_str_with_suffix("output"), None);
    }

    #[test]
    fn display_uses_suffix() {
        assert_eq!(BuiltinName::range_check.to_string(), "range_check_builtin");
    }

    #[test]
    fn deserializes_program_names() {
        let names: Vec<BuiltinName> =
            serde_json::from_str(r#"["output", "range_check", "bitwise"]"#).unwrap();
        assert_eq!(
            names,
            vec![
                BuiltinName::output,
                BuiltinName::range_check,
                BuiltinName::bitwise
            ]
        );
        assert!(serde_json::from_str::<BuiltinName>(r#""segment_arena""#).is_err());
    }
}
