use std::{any::Any, collections::HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    serde::deserialize_program::{ApTracking, OffsetValue},
    types::{exec_scope::ExecutionScopes, instruction::Register},
    vm::{
        errors::{hint_errors::HintError, vm_errors::VirtualMachineError},
        runners::cairo_runner::ResourceTracker,
        vm_core::VirtualMachine,
    },
    Felt252,
};

/// Compiles and runs the hints embedded in a program.
///
/// Every hint is compiled once, before the run starts, into an opaque value
/// that is handed back to [`HintProcessorLogic::execute_hint`] each time the
/// hint's pc is reached.
pub trait HintProcessorLogic {
    // Executes the hint which's data is provided by a dynamic structure previously created by compile_hint
    fn execute_hint(
        &mut self,
        //Proxy to VM, contains refrences to necessary data
        //+ MemoryProxy, which provides the necessary methods to manipulate memory
        vm: &mut VirtualMachine,
        //Proxy to ExecutionScopes, provides the necessary methods to manipulate the scopes and
        //access current scope variables
        exec_scopes: &mut ExecutionScopes,
        //Data structure that can be downcasted to the structure generated by compile_hint
        hint_data: &Box<dyn Any>,
        //Constant values declared by the compiled program.
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), HintError>;

    //Transforms hint data outputed by the VM into whichever format will be later used by execute_hint
    fn compile_hint(
        &self,
        //Block of hint code as String
        hint_code: &str,
        //Ap Tracking Data corresponding to the Hint
        ap_tracking_data: &ApTracking,
        //Map from variable name to reference id number
        //(may contain other variables aside from those used by the hint)
        reference_ids: &HashMap<String, usize>,
        //List of all references (key corresponds to element of the previous dictionary)
        references: &[HintReference],
    ) -> Result<Box<dyn Any>, VirtualMachineError>;
}

/// A hint processor the runner can drive: it compiles and runs hints and keeps
/// track of the steps it allows.
pub trait HintProcessor: HintProcessorLogic + ResourceTracker {}
impl<T> HintProcessor for T where T: HintProcessorLogic + ResourceTracker {}

/// Resolves the `ids` a hint can see: each name, stripped of its scope
/// path, maps to the reference it is bound to.
///
/// A reference id with no matching reference is skipped with a warning; the
/// hint fails later only if it actually reads that identifier.
pub fn get_ids_data(
    reference_ids: &HashMap<String, usize>,
    references: &[HintReference],
) -> Result<HashMap<String, HintReference>, VirtualMachineError> {
    let mut ids_data = HashMap::<String, HintReference>::new();
    for (path, ref_id) in reference_ids {
        let name = path.rsplit('.').next().unwrap_or(path);
        match references.get(*ref_id) {
            Some(reference) => {
                ids_data.insert(name.to_string(), reference.clone());
            }
            None => warn!(identifier = %path, ref_id, "hint references an unknown identifier"),
        }
    }
    Ok(ids_data)
}

/// How a hint locates one of its `ids`: `[offset1 + offset2]`, or the address
/// itself when `dereference` is false.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct HintReference {
    pub offset1: OffsetValue,
    pub offset2: OffsetValue,
    pub dereference: bool,
    pub ap_tracking_data: Option<ApTracking>,
    pub cairo_type: Option<String>,
}

impl HintReference {
    /// `[fp + offset1]`
    pub fn new_simple(offset1: i32) -> Self {
        HintReference {
            offset1: OffsetValue::Reference(Register::FP, offset1, false),
            offset2: OffsetValue::Value(0),
            ap_tracking_data: None,
            dereference: true,
            cairo_type: None,
        }
    }

    pub fn new(offset1: i32, offset2: i32, inner_dereference: bool, dereference: bool) -> Self {
        HintReference {
            offset1: OffsetValue::Reference(Register::FP, offset1, inner_dereference),
            offset2: OffsetValue::Value(offset2),
            ap_tracking_data: None,
            dereference,
            cairo_type: None,
        }
    }
}
