use std::{any::Any, collections::HashMap, rc::Rc};

use super::{
    dict_hint_utils::{default_dict_new, dict_read, dict_write},
    hint_code,
    math_utils::{assert_nn, assert_not_equal, assert_not_zero, is_nn},
    memcpy_hint_utils::{
        add_segment, enter_scope, exit_scope, memcpy_continue_copying, memcpy_enter_scope,
    },
    memset_utils::{memset_continue_loop, memset_enter_scope},
    segments::{relocate_segment, temporary_array},
    signature::verify_ecdsa_signature,
};
use crate::{
    any_box,
    hint_processor::hint_processor_definition::{get_ids_data, HintProcessorLogic, HintReference},
    serde::deserialize_program::ApTracking,
    types::exec_scope::ExecutionScopes,
    vm::{
        errors::{hint_errors::HintError, vm_errors::VirtualMachineError},
        runners::cairo_runner::{ResourceTracker, RunResources},
        vm_core::VirtualMachine,
    },
    Felt252,
};

type HintFuncPointer = Option<
    fn(
        &mut VirtualMachine,
        &mut ExecutionScopes,
        &HashMap<String, HintReference>,
        &ApTracking,
        &HashMap<String, Felt252>,
    ) -> Result<(), HintError>,
>;

/// Compiled form of a hint: its code, the ids it can see and, for a bundled
/// hint, the function implementing it.
pub struct HintProcessorData {
    pub code: String,
    pub ap_tracking: ApTracking,
    pub ids_data: HashMap<String, HintReference>,
    pub f: HintFuncPointer,
}

impl HintProcessorData {
    pub fn new_default(code: String, ids_data: HashMap<String, HintReference>) -> Self {
        let f = bundled_hint(&code);
        HintProcessorData {
            code,
            ap_tracking: ApTracking::default(),
            ids_data,
            f,
        }
    }
}

#[allow(clippy::type_complexity)]
pub struct HintFunc(
    pub  Box<
        dyn Fn(
                &mut VirtualMachine,
                &mut ExecutionScopes,
                &HashMap<String, HintReference>,
                &ApTracking,
                &HashMap<String, Felt252>,
            ) -> Result<(), HintError>
            + Sync,
    >,
);

/// Runs the bundled hints natively, plus any hint registered with
/// [`BuiltinHintProcessor::add_hint`]. A registered hint shadows a bundled
/// one with the same code.
pub struct BuiltinHintProcessor {
    pub extra_hints: HashMap<String, Rc<HintFunc>>,
    run_resources: RunResources,
}

impl BuiltinHintProcessor {
    pub fn new_empty() -> Self {
        BuiltinHintProcessor {
            extra_hints: HashMap::new(),
            run_resources: RunResources::default(),
        }
    }

    pub fn new(extra_hints: HashMap<String, Rc<HintFunc>>, run_resources: RunResources) -> Self {
        BuiltinHintProcessor {
            extra_hints,
            run_resources,
        }
    }

    pub fn add_hint(&mut self, hint_code: String, hint_func: Rc<HintFunc>) {
        self.extra_hints.insert(hint_code, hint_func);
    }
}

impl Default for BuiltinHintProcessor {
    fn default() -> Self {
        Self::new_empty()
    }
}

// Hints that don't read ids are wrapped to fit the common signature.
fn bundled_hint(hint_code: &str) -> HintFuncPointer {
    let f: fn(
        &mut VirtualMachine,
        &mut ExecutionScopes,
        &HashMap<String, HintReference>,
        &ApTracking,
        &HashMap<String, Felt252>,
    ) -> Result<(), HintError> = match hint_code {
        hint_code::ADD_SEGMENT => |vm, _, _, _, _| add_segment(vm),
        hint_code::VM_ENTER_SCOPE => |_, exec_scopes, _, _, _| enter_scope(exec_scopes),
        hint_code::VM_EXIT_SCOPE => |_, exec_scopes, _, _, _| exit_scope(exec_scopes),
        hint_code::MEMCPY_ENTER_SCOPE => |vm, exec_scopes, ids_data, ap_tracking, _| {
            memcpy_enter_scope(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::MEMCPY_CONTINUE_COPYING => |vm, exec_scopes, ids_data, ap_tracking, _| {
            memcpy_continue_copying(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::MEMSET_ENTER_SCOPE => |vm, exec_scopes, ids_data, ap_tracking, _| {
            memset_enter_scope(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::MEMSET_CONTINUE_LOOP => |vm, exec_scopes, ids_data, ap_tracking, _| {
            memset_continue_loop(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::IS_NN => |vm, _, ids_data, ap_tracking, _| is_nn(vm, ids_data, ap_tracking),
        hint_code::ASSERT_NN => {
            |vm, _, ids_data, ap_tracking, _| assert_nn(vm, ids_data, ap_tracking)
        }
        hint_code::ASSERT_NOT_ZERO => {
            |vm, _, ids_data, ap_tracking, _| assert_not_zero(vm, ids_data, ap_tracking)
        }
        hint_code::ASSERT_NOT_EQUAL => {
            |vm, _, ids_data, ap_tracking, _| assert_not_equal(vm, ids_data, ap_tracking)
        }
        hint_code::DEFAULT_DICT_NEW => |vm, exec_scopes, ids_data, ap_tracking, _| {
            default_dict_new(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::DICT_READ => |vm, exec_scopes, ids_data, ap_tracking, _| {
            dict_read(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::DICT_WRITE => |vm, exec_scopes, ids_data, ap_tracking, _| {
            dict_write(vm, exec_scopes, ids_data, ap_tracking)
        },
        hint_code::VERIFY_ECDSA_SIGNATURE => |vm, _, ids_data, ap_tracking, _| {
            verify_ecdsa_signature(vm, ids_data, ap_tracking)
        },
        hint_code::RELOCATE_SEGMENT => {
            |vm, _, ids_data, ap_tracking, _| relocate_segment(vm, ids_data, ap_tracking)
        }
        hint_code::TEMPORARY_ARRAY => {
            |vm, _, ids_data, ap_tracking, _| temporary_array(vm, ids_data, ap_tracking)
        }
        _ => return None,
    };
    Some(f)
}

impl HintProcessorLogic for BuiltinHintProcessor {
    fn execute_hint(
        &mut self,
        vm: &mut VirtualMachine,
        exec_scopes: &mut ExecutionScopes,
        hint_data: &Box<dyn Any>,
        constants: &HashMap<String, Felt252>,
    ) -> Result<(), HintError> {
        let hint_data = hint_data
            .downcast_ref::<HintProcessorData>()
            .ok_or(HintError::WrongHintData)?;

        if let Some(hint_func) = self.extra_hints.get(&hint_data.code) {
            return hint_func.0(
                vm,
                exec_scopes,
                &hint_data.ids_data,
                &hint_data.ap_tracking,
                constants,
            );
        }

        let hint_func = hint_data
            .f
            .ok_or_else(|| HintError::UnknownHint(hint_data.code.as_str().into()))?;
        hint_func(
            vm,
            exec_scopes,
            &hint_data.ids_data,
            &hint_data.ap_tracking,
            constants,
        )
    }

    fn compile_hint(
        &self,
        hint_code: &str,
        ap_tracking_data: &ApTracking,
        reference_ids: &HashMap<String, usize>,
        references: &[HintReference],
    ) -> Result<Box<dyn Any>, VirtualMachineError> {
        let ids_data = get_ids_data(reference_ids, references)?;
        let f = if self.extra_hints.contains_key(hint_code) {
            None
        } else {
            bundled_hint(hint_code)
        };
        Ok(any_box!(HintProcessorData {
            code: hint_code.to_string(),
            ap_tracking: *ap_tracking_data,
            ids_data,
            f,
        }))
    }
}

impl ResourceTracker for BuiltinHintProcessor {
    fn consume_step(&mut self) {
        self.run_resources.consume_step();
    }

    fn consumed(&self) -> bool {
        self.run_resources.consumed()
    }

    fn get_n_steps(&self) -> Option<usize> {
        self.run_resources.get_n_steps()
    }

    fn run_resources(&self) -> &RunResources {
        &self.run_resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    #[test]
    fn run_unknown_hint() {
        let mut vm = vm!();
        assert_matches!(
            run_hint!(vm, HashMap::new(), "random_invalid_code"),
            Err(HintError::UnknownHint(code)) if &*code == "random_invalid_code"
        );
    }

    #[test]
    fn execute_with_wrong_hint_data() {
        let mut vm = vm!();
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        assert_matches!(
            hint_processor.execute_hint(
                &mut vm,
                exec_scopes_ref!(),
                &any_box!(17_usize),
                &HashMap::new()
            ),
            Err(HintError::WrongHintData)
        );
    }

    #[test]
    fn compiled_hint_resolves_ids() {
        let hint_processor = BuiltinHintProcessor::new_empty();
        let references = vec![HintReference::new_simple(-2), HintReference::new_simple(-1)];
        let reference_ids = HashMap::from([
            ("__main__.main.a".to_string(), 0),
            ("__main__.main.b".to_string(), 1),
        ]);

        let hint_data = hint_processor
            .compile_hint(
                hint_code::ASSERT_NOT_EQUAL,
                &ApTracking::new(),
                &reference_ids,
                &references,
            )
            .unwrap();
        let hint_data = hint_data.downcast_ref::<HintProcessorData>().unwrap();
        assert!(hint_data.f.is_some());
        assert_eq!(hint_data.ids_data["a"], HintReference::new_simple(-2));
        assert_eq!(hint_data.ids_data["b"], HintReference::new_simple(-1));
    }

    #[test]
    fn compiled_unknown_hint_fails_when_run() {
        let mut vm = vm!();
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        let hint_data = hint_processor
            .compile_hint("print(ids.x)", &ApTracking::new(), &HashMap::new(), &[])
            .unwrap();

        assert_matches!(
            hint_processor.execute_hint(&mut vm, exec_scopes_ref!(), &hint_data, &HashMap::new()),
            Err(HintError::UnknownHint(_))
        );
    }

    #[test]
    fn extra_hint_reads_constants() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        run_context!(vm, 0, 0, 0);
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        let hint_func = HintFunc(Box::new(
            |vm: &mut VirtualMachine,
             _: &mut ExecutionScopes,
             _: &HashMap<String, HintReference>,
             _: &ApTracking,
             constants: &HashMap<String, Felt252>|
             -> Result<(), HintError> {
                let value = constants
                    .get("__main__.MAX")
                    .ok_or_else(|| HintError::UnknownIdentifier("MAX".into()))?;
                vm.insert_value(vm.get_ap(), *value)?;
                Ok(())
            },
        ));
        hint_processor.add_hint("memory[ap] = MAX".to_string(), Rc::new(hint_func));

        let hint_data = hint_processor
            .compile_hint("memory[ap] = MAX", &ApTracking::new(), &HashMap::new(), &[])
            .unwrap();
        let constants = HashMap::from([("__main__.MAX".to_string(), Felt252::from(99))]);
        hint_processor
            .execute_hint(&mut vm, exec_scopes_ref!(), &hint_data, &constants)
            .unwrap();

        assert_eq!(
            vm.get_integer(relocatable!(1, 0)).unwrap().into_owned(),
            Felt252::from(99)
        );
    }

    #[test]
    fn extra_hint_shadows_bundled_hint() {
        let mut vm = vm!();
        let mut hint_processor = BuiltinHintProcessor::new_empty();
        hint_processor.add_hint(
            hint_code::ADD_SEGMENT.to_string(),
            Rc::new(HintFunc(Box::new(
                |_: &mut VirtualMachine,
                 _: &mut ExecutionScopes,
                 _: &HashMap<String, HintReference>,
                 _: &ApTracking,
                 _: &HashMap<String, Felt252>|
                 -> Result<(), HintError> {
                    Err(HintError::CustomHint("shadowed".into()))
                },
            ))),
        );
        let hint_data = hint_processor
            .compile_hint(hint_code::ADD_SEGMENT, &ApTracking::new(), &HashMap::new(), &[])
            .unwrap();

        assert_matches!(
            hint_processor.execute_hint(&mut vm, exec_scopes_ref!(), &hint_data, &HashMap::new()),
            Err(HintError::CustomHint(msg)) if &*msg == "shadowed"
        );
        assert_eq!(vm.segments.num_segments(), 0);
    }

    #[test]
    fn resources_are_tracked() {
        let mut hint_processor = BuiltinHintProcessor::new(HashMap::new(), RunResources::new(1));
        assert!(!hint_processor.consumed());
        hint_processor.consume_step();
        assert!(hint_processor.consumed());
        assert_eq!(hint_processor.get_n_steps(), Some(0));
    }
}
