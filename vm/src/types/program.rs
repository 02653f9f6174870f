use std::{
    collections::{BTreeMap, HashMap},
    num::NonZeroUsize,
    path::Path,
    sync::Arc,
};

use crate::{
    hint_processor::hint_processor_definition::HintReference,
    serde::deserialize_program::{
        deserialize_and_parse_program, Attribute, HintParams, Identifier, OffsetValue,
        ReferenceManager,
    },
    types::{
        builtin_name::BuiltinName, errors::program_errors::ProgramError, instruction::Register,
        relocatable::MaybeRelocatable,
    },
    utils::PRIME_STR,
    Felt252,
};

// The bulk of a program lives behind an `Arc` so runners can clone `Program`
// freely; only the fields the step loop reads often stay inline.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub(crate) struct ProgramData {
    pub(crate) data: Vec<MaybeRelocatable>,
    pub(crate) hints_collection: HintsCollection,
    pub(crate) main: Option<usize>,
    // Proof mode labels.
    pub(crate) start: Option<usize>,
    pub(crate) end: Option<usize>,
    pub(crate) error_message_attributes: Vec<Attribute>,
    pub(crate) identifiers: HashMap<String, Identifier>,
    pub(crate) references: Vec<HintReference>,
}

/// `(first index into the flat hint list, number of hints)` for one pc.
pub(crate) type HintRange = Option<(usize, NonZeroUsize)>;

/// All the hints of a program, flattened, with a per-pc index into them.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub(crate) struct HintsCollection {
    hints: Vec<HintParams>,
    pub(crate) hints_ranges: Vec<HintRange>,
}

impl HintsCollection {
    pub(crate) fn new(
        hints: &BTreeMap<usize, Vec<HintParams>>,
        program_length: usize,
    ) -> Result<Self, ProgramError> {
        // Keys are sorted, so the last one is the highest hint pc.
        let Some(max_hint_pc) = hints.keys().next_back().copied() else {
            return Ok(HintsCollection::default());
        };
        if max_hint_pc >= program_length {
            return Err(ProgramError::InvalidHintPc(max_hint_pc, program_length));
        }

        let mut flat_hints = Vec::with_capacity(hints.values().map(Vec::len).sum());
        let mut hints_ranges = vec![None; max_hint_pc + 1];
        for (pc, pc_hints) in hints {
            if let Some(len) = NonZeroUsize::new(pc_hints.len()) {
                hints_ranges[*pc] = Some((flat_hints.len(), len));
                flat_hints.extend_from_slice(pc_hints);
            }
        }

        Ok(HintsCollection {
            hints: flat_hints,
            hints_ranges,
        })
    }

    pub fn iter_hints(&self) -> impl Iterator<Item = &HintParams> {
        self.hints.iter()
    }

    pub fn get_hint_range_for_pc(&self, pc: usize) -> HintRange {
        self.hints_ranges.get(pc).copied().flatten()
    }

    /// Hints attached to `pc`, in declaration order.
    pub fn hints_for_pc(&self, pc: usize) -> &[HintParams] {
        match self.get_hint_range_for_pc(pc) {
            Some((start, len)) => &self.hints[start..start + len.get()],
            None => &[],
        }
    }
}

/// A compiled Cairo program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub(crate) shared: Arc<ProgramData>,
    pub(crate) constants: HashMap<String, Felt252>,
    pub(crate) builtins: Vec<BuiltinName>,
}

impl Program {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        builtins: Vec<BuiltinName>,
        data: Vec<MaybeRelocatable>,
        main: Option<usize>,
        hints: BTreeMap<usize, Vec<HintParams>>,
        reference_manager: ReferenceManager,
        identifiers: HashMap<String, Identifier>,
        error_message_attributes: Vec<Attribute>,
    ) -> Result<Program, ProgramError> {
        let constants = Self::extract_constants(&identifiers)?;
        let hints_collection = HintsCollection::new(&hints, data.len())?;
        Ok(Program {
            shared: Arc::new(ProgramData {
                data,
                hints_collection,
                main,
                start: None,
                end: None,
                error_message_attributes,
                identifiers,
                references: Self::get_reference_list(&reference_manager),
            }),
            constants,
            builtins,
        })
    }

    pub fn from_file(path: &Path, entrypoint: Option<&str>) -> Result<Program, ProgramError> {
        let file_content = std::fs::read(path)?;
        deserialize_and_parse_program(&file_content, entrypoint)
    }

    pub fn from_bytes(bytes: &[u8], entrypoint: Option<&str>) -> Result<Program, ProgramError> {
        deserialize_and_parse_program(bytes, entrypoint)
    }

    pub fn prime(&self) -> &str {
        PRIME_STR
    }

    pub fn iter_builtins(&self) -> impl Iterator<Item = &BuiltinName> {
        self.builtins.iter()
    }

    pub fn builtins_len(&self) -> usize {
        self.builtins.len()
    }

    pub fn data_len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn get_identifier(&self, id: &str) -> Option<&Identifier> {
        self.shared.identifiers.get(id)
    }

    pub fn iter_identifiers(&self) -> impl Iterator<Item = (&str, &Identifier)> {
        self.shared
            .identifiers
            .iter()
            .map(|(name, identifier)| (name.as_str(), identifier))
    }

    pub fn constants(&self) -> &HashMap<String, Felt252> {
        &self.constants
    }

    /// The `error_message` attributes whose pc range covers `pc`.
    pub fn error_messages_for_pc(&self, pc: usize) -> impl Iterator<Item = &str> {
        self.shared
            .error_message_attributes
            .iter()
            .filter(move |attribute| attribute.start_pc <= pc && pc < attribute.end_pc)
            .map(|attribute| attribute.value.as_str())
    }

    pub(crate) fn get_reference_list(reference_manager: &ReferenceManager) -> Vec<HintReference> {
        reference_manager
            .references
            .iter()
            .map(|reference| {
                let address = &reference.value_address;
                let uses_ap = matches!(
                    (&address.offset1, &address.offset2),
                    (OffsetValue::Reference(Register::AP, _, _), _)
                        | (_, OffsetValue::Reference(Register::AP, _, _))
                );
                HintReference {
                    offset1: address.offset1.clone(),
                    offset2: address.offset2.clone(),
                    dereference: address.dereference,
                    // Tracking data only matters for ap based references.
                    ap_tracking_data: uses_ap.then_some(reference.ap_tracking_data),
                    cairo_type: Some(address.value_type.clone()),
                }
            })
            .collect()
    }

    pub(crate) fn extract_constants(
        identifiers: &HashMap<String, Identifier>,
    ) -> Result<HashMap<String, Felt252>, ProgramError> {
        identifiers
            .iter()
            .filter(|(_, identifier)| identifier.type_.as_deref() == Some("const"))
            .map(|(name, identifier)| {
                identifier
                    .value
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| ProgramError::ConstWithoutValue(name.clone()))
            })
            .collect()
    }
}

impl Default for Program {
    fn default() -> Self {
        Program {
            shared: Arc::new(ProgramData::default()),
            constants: HashMap::new(),
            builtins: Vec::new(),
        }
    }
}
