//! Compiled program JSON, as emitted by `cairo-compile`.
//!
//! [`ProgramJson`] mirrors the artifact one-to-one; [`parse_program_json`] turns it
//! into a [`Program`], resolving the entrypoint, the proof mode labels and the
//! program constants on the way.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use num_bigint::BigInt;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Number;
use tracing::debug;

use crate::{
    math_utils::felt_from_bigint,
    serde::deserialize_utils,
    types::{
        builtin_name::BuiltinName,
        errors::program_errors::ProgramError,
        instruction::Register,
        program::{HintsCollection, Program, ProgramData},
        relocatable::MaybeRelocatable,
    },
    utils::PRIME_STR,
    Felt252,
};

#[derive(Deserialize, Debug)]
pub struct ProgramJson {
    pub prime: String,
    pub builtins: Vec<BuiltinName>,
    #[serde(deserialize_with = "deserialize_data")]
    pub data: Vec<MaybeRelocatable>,
    pub identifiers: HashMap<String, Identifier>,
    pub hints: BTreeMap<usize, Vec<HintParams>>,
    pub reference_manager: ReferenceManager,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HintParams {
    pub code: String,
    pub accessible_scopes: Vec<String>,
    pub flow_tracking_data: FlowTrackingData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowTrackingData {
    pub ap_tracking: ApTracking,
    pub reference_ids: HashMap<String, usize>,
}

/// Tracks how far `ap` moved since the start of a group, so references taken
/// relative to `ap` can be corrected later in the same group.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApTracking {
    pub group: usize,
    pub offset: usize,
}

impl ApTracking {
    pub fn new() -> ApTracking {
        ApTracking::default()
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct Identifier {
    pub pc: Option<usize>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default, deserialize_with = "felt_from_number")]
    pub value: Option<Felt252>,
    pub full_name: Option<String>,
    pub members: Option<HashMap<String, Member>>,
    pub cairo_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub cairo_type: String,
    pub offset: usize,
}

/// A program attribute. Only `error_message` attributes survive parsing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub start_pc: usize,
    pub end_pc: usize,
    pub value: String,
    pub flow_tracking_data: Option<FlowTrackingData>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ReferenceManager {
    pub references: Vec<Reference>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Reference {
    pub ap_tracking_data: ApTracking,
    pub pc: Option<usize>,
    #[serde(rename = "value", deserialize_with = "deserialize_value_address")]
    pub value_address: ValueAddress,
}

/// One term of a reference expression.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum OffsetValue {
    /// A literal felt.
    Immediate(Felt252),
    /// A plain offset.
    Value(i32),
    /// `register + offset`, dereferenced if the flag is set.
    Reference(Register, i32, bool),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ValueAddress {
    pub offset1: OffsetValue,
    pub offset2: OffsetValue,
    pub dereference: bool,
    pub value_type: String,
}

impl ValueAddress {
    /// Placeholder for references whose text couldn't be parsed. Such references
    /// are harmless until a hint tries to use them.
    pub fn no_hint_reference_default() -> ValueAddress {
        ValueAddress {
            offset1: OffsetValue::Value(99),
            offset2: OffsetValue::Value(99),
            dereference: false,
            value_type: String::from("felt"),
        }
    }
}

struct DataVisitor;

impl<'de> de::Visitor<'de> for DataVisitor {
    type Value = Vec<MaybeRelocatable>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of hexadecimal strings")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut data = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(word) = seq.next_element::<String>()? {
            let word = deserialize_utils::maybe_add_padding(word.trim_start_matches("0x").to_string());
            let felt = Felt252::from_hex(&word).map_err(de::Error::custom)?;
            data.push(MaybeRelocatable::Int(felt));
        }
        Ok(data)
    }
}

fn deserialize_data<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<MaybeRelocatable>, D::Error> {
    d.deserialize_seq(DataVisitor)
}

struct ValueAddressVisitor;

impl<'de> de::Visitor<'de> for ValueAddressVisitor {
    type Value = ValueAddress;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a reference expression such as [cast(fp + (-3), felt*)]")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(deserialize_utils::parse_value(value)
            .map(|(_, address)| address)
            .unwrap_or_else(|_| ValueAddress::no_hint_reference_default()))
    }
}

fn deserialize_value_address<'de, D: Deserializer<'de>>(d: D) -> Result<ValueAddress, D::Error> {
    d.deserialize_str(ValueAddressVisitor)
}

/// Constant values are JSON numbers of arbitrary size, possibly negative and
/// occasionally in scientific notation (`1e27`).
fn felt_from_number<'de, D>(deserializer: D) -> Result<Option<Felt252>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    parse_integer(&number.to_string())
        .map(|n| Some(felt_from_bigint(&n)))
        .ok_or_else(|| de::Error::custom(format!("invalid constant value {number}")))
}

fn parse_integer(text: &str) -> Option<BigInt> {
    let text = text.to_ascii_lowercase();
    match text.split_once('e') {
        None => text.parse().ok(),
        Some((mantissa, exponent)) => {
            let exponent: u32 = exponent.trim_start_matches('+').parse().ok()?;
            let (int_part, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
            let fraction = fraction.trim_end_matches('0');
            let shift = exponent.checked_sub(u32::try_from(fraction.len()).ok()?)?;
            let digits: BigInt = format!("{int_part}{fraction}").parse().ok()?;
            Some(digits * BigInt::from(10).pow(shift))
        }
    }
}

pub fn deserialize_program_json(reader: &[u8]) -> Result<ProgramJson, ProgramError> {
    Ok(serde_json::from_slice(reader)?)
}

pub fn deserialize_and_parse_program(
    reader: &[u8],
    entrypoint: Option<&str>,
) -> Result<Program, ProgramError> {
    parse_program_json(deserialize_program_json(reader)?, entrypoint)
}

pub fn parse_program_json(
    program_json: ProgramJson,
    entrypoint: Option<&str>,
) -> Result<Program, ProgramError> {
    if program_json.prime != PRIME_STR {
        return Err(ProgramError::PrimeDiffers(program_json.prime));
    }

    let main = match entrypoint {
        Some(name) => Some(
            program_json
                .identifiers
                .get(&format!("__main__.{name}"))
                .ok_or_else(|| ProgramError::EntrypointNotFound(name.to_string()))?
                .pc,
        )
        .flatten(),
        None => None,
    };
    let label = |name: &str| program_json.identifiers.get(name).and_then(|id| id.pc);
    let start = label("__main__.__start__");
    let end = label("__main__.__end__");

    let constants = Program::extract_constants(&program_json.identifiers)?;
    let hints_collection = HintsCollection::new(&program_json.hints, program_json.data.len())?;

    debug!(
        data_len = program_json.data.len(),
        builtins = program_json.builtins.len(),
        hints = program_json.hints.len(),
        "parsed program"
    );

    Ok(Program {
        shared: Arc::new(ProgramData {
            data: program_json.data,
            hints_collection,
            main,
            start,
            end,
            error_message_attributes: program_json
                .attributes
                .into_iter()
                .filter(|attribute| attribute.name == "error_message")
                .collect(),
            identifiers: program_json.identifiers,
            references: Program::get_reference_list(&program_json.reference_manager),
        }),
        constants,
        builtins: program_json.builtins,
    })
}
